//! Component wiring: builds the shared services once at boot, exposes the
//! control-plane router, and spawns the long-running daemons.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::analysis::ner::NerExtractor;
use crate::analysis::validator;
use crate::api;
use crate::cleanup::CleanupDaemon;
use crate::config::Config;
use crate::eqis::EqisComputer;
use crate::grouping::manager::ConfigManager;
use crate::health;
use crate::ingest;
use crate::ingest::ingester::{ArticleIngester, HttpFetcher};
use crate::ingest::scheduler::FetchScheduler;
use crate::store::dao::Dao;
use crate::worker::composition::CompositionWorker;

#[derive(Clone)]
pub struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    config: Config,
    dao: Arc<Dao>,
    ner: Arc<NerExtractor>,
    config_manager: Arc<ConfigManager>,
    eqis: Arc<EqisComputer>,
    ingester: Arc<ArticleIngester>,
}

impl AppState {
    pub(crate) fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self { registry }
    }

    pub(crate) fn dao(&self) -> &Dao {
        &self.registry.dao
    }

    pub(crate) fn config_manager(&self) -> &ConfigManager {
        &self.registry.config_manager
    }

    pub(crate) fn eqis_computer(&self) -> &EqisComputer {
        &self.registry.eqis
    }
}

impl ComponentRegistry {
    /// Connect to the store, run startup health checks, and wire every
    /// component. Store failures here are fatal for the process.
    pub async fn build(config: Config) -> Result<Self> {
        let dao = Arc::new(Dao::connect(&config).await?);
        health::run_store_checks(&dao)
            .await
            .context("startup health check failed")?;

        let ner = Arc::new(NerExtractor::new());
        health::run_ner_check(&ner);

        validator::log_startup_report(&dao).await;

        let config_manager = Arc::new(ConfigManager::new(
            Arc::clone(&dao),
            config.service_instance(),
        ));
        let startup_config = config_manager.load_startup_configuration().await;
        info!(?startup_config, "grouping configuration loaded");

        let eqis = Arc::new(EqisComputer::new(
            Arc::clone(&dao),
            config.eqis_weights(),
            config.eqis_params(),
        ));

        let client = reqwest::Client::builder()
            .user_agent(ingest::USER_AGENT)
            .gzip(true)
            .build()
            .context("failed to build HTTP client")?;
        let fetcher = HttpFetcher::new(
            client,
            config.http_max_retries(),
            Duration::from_millis(config.http_backoff_base_ms()),
            Duration::from_millis(config.http_backoff_cap_ms()),
        );
        let ingester = Arc::new(ArticleIngester::new(
            Arc::clone(&dao),
            fetcher,
            config.feed_timeout(),
            config.article_timeout(),
        ));

        Ok(Self {
            config,
            dao,
            ner,
            config_manager,
            eqis,
            ingester,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Spawn the long-running services. Each honors the shutdown signal
    /// cooperatively.
    pub fn spawn_services(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let scheduler = FetchScheduler::new(
            Arc::clone(&self.dao),
            Arc::clone(&self.ingester),
            self.config.fetch_tick(),
            self.config.fetch_interval(),
            self.config.fetch_workers(),
        );
        handles.push(tokio::spawn(scheduler.run(shutdown.clone())));

        let worker = CompositionWorker::new(
            Arc::clone(&self.dao),
            Arc::clone(&self.ner),
            Arc::clone(&self.config_manager),
            self.config.batch_size(),
            self.config.sleep_interval(),
        );
        handles.push(tokio::spawn(worker.run(shutdown.clone())));

        let cleanup = CleanupDaemon::new(Arc::clone(&self.dao), self.config.cleanup_interval());
        handles.push(tokio::spawn(cleanup.run(shutdown.clone())));

        let eqis = Arc::clone(&self.eqis);
        let interval = self.config.eqis_interval();
        let mut eqis_shutdown = shutdown;
        handles.push(tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "EQIS daemon started");
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = eqis_shutdown.changed() => break,
                }
                if let Err(err) = eqis.recompute_all().await {
                    error!(error = %err, "periodic EQIS recompute failed");
                }
            }
            info!("EQIS daemon stopped");
        }));

        handles
    }
}

/// Control-plane routes. JSON only; the store remains the read surface
/// for scored data.
#[must_use]
pub fn build_router(registry: Arc<ComponentRegistry>) -> Router {
    Router::new()
        .route("/health/live", get(api::health::live))
        .route("/health/ready", get(api::health::ready))
        .route("/validation/report", get(api::admin::validation_report))
        .route(
            "/grouping/config",
            get(api::admin::get_grouping_config).put(api::admin::update_grouping_config),
        )
        .route("/eqis/recompute", post(api::admin::recompute_eqis))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(registry))
}
