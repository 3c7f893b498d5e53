use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use newswire_quality_engine::{
    app::{ComponentRegistry, build_router},
    config::Config,
    observability,
};

/// Probe the local control plane. Exit code 0 on success, 1 on failure.
/// Used as the container health check.
fn run_healthcheck() -> i32 {
    let bind = env::var("HTTP_BIND").unwrap_or_else(|_| "0.0.0.0:9007".to_string());
    let port = bind.rsplit(':').next().unwrap_or("9007");
    let url = format!("http://127.0.0.1:{port}/health/live");

    let client = match reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(error) => {
            eprintln!("healthcheck failed: failed to create client: {error}");
            return 1;
        }
    };

    match client.get(&url).send() {
        Ok(response) if response.status().is_success() => 0,
        Ok(response) => {
            eprintln!("healthcheck failed: status {}", response.status());
            1
        }
        Err(error) => {
            eprintln!("healthcheck failed: {error}");
            1
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => error!(error = %error, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() > 1 && args[1] == "healthcheck" {
        // The blocking client must not run on a runtime worker thread.
        let code = std::thread::spawn(run_healthcheck).join().unwrap_or(1);
        std::process::exit(code);
    }

    observability::init();

    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| {
                panic_info
                    .payload()
                    .downcast_ref::<String>()
                    .map(String::as_str)
            })
            .unwrap_or("unknown panic payload");

        if let Some(location) = panic_info.location() {
            error!(
                thread = thread_name,
                file = location.file(),
                line = location.line(),
                message,
                "panic occurred"
            );
        } else {
            error!(thread = thread_name, message, "panic occurred");
        }
    }));

    let config = Config::from_env().context("failed to load configuration")?;
    let bind_addr = config.http_bind();

    // Startup health checks run inside build; store failures exit non-zero.
    let registry = Arc::new(
        ComponentRegistry::build(config)
            .await
            .context("failed to build component registry")?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let service_handles = registry.spawn_services(shutdown_rx.clone());

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let router = build_router(Arc::clone(&registry));
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind listener on {bind_addr}"))?;
    info!(%bind_addr, "listening");

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.changed().await;
        })
        .await
        .context("server exited with error")?;

    // Give the workers a bounded window to finish in-flight work.
    let drain = futures::future::join_all(service_handles);
    if tokio::time::timeout(Duration::from_secs(30), drain).await.is_err() {
        warn!("services did not drain within the shutdown window");
    }

    info!("clean shutdown");
    Ok(())
}
