//! Fetch scheduler: fixed-tick polling of due feeds through a bounded
//! worker pool with per-host spacing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::ingest::ingester::ArticleIngester;
use crate::store::dao::Dao;
use crate::store::models::Feed;

/// Minimum spacing between requests to the same host.
const PER_HOST_MIN_INTERVAL: Duration = Duration::from_secs(2);
/// Running fetch tasks get this long to drain on shutdown.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

/// Serializes request start times per host: each caller is assigned the
/// next free slot at least the minimum interval after the previous one.
pub(crate) struct HostThrottle {
    min_interval: Duration,
    slots: Mutex<HashMap<String, Instant>>,
}

impl HostThrottle {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn wait_turn(&self, host: &str) {
        let scheduled = {
            let mut slots = self.slots.lock().await;
            let now = Instant::now();
            let slot = match slots.get(host) {
                Some(&previous) if previous + self.min_interval > now => {
                    previous + self.min_interval
                }
                _ => now,
            };
            slots.insert(host.to_string(), slot);
            slot
        };

        tokio::time::sleep_until(scheduled).await;
    }
}

fn host_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

pub(crate) struct FetchScheduler {
    dao: Arc<Dao>,
    ingester: Arc<ArticleIngester>,
    tick: Duration,
    default_poll_interval: Duration,
    workers: Arc<Semaphore>,
    throttle: Arc<HostThrottle>,
}

impl FetchScheduler {
    pub(crate) fn new(
        dao: Arc<Dao>,
        ingester: Arc<ArticleIngester>,
        tick: Duration,
        default_poll_interval: Duration,
        worker_count: usize,
    ) -> Self {
        Self {
            dao,
            ingester,
            tick,
            default_poll_interval,
            workers: Arc::new(Semaphore::new(worker_count.max(1))),
            throttle: Arc::new(HostThrottle::new(PER_HOST_MIN_INTERVAL)),
        }
    }

    /// Outer loop: every tick, enqueue one fetch task per due feed. On a
    /// shutdown signal, stop enqueueing and give running tasks a bounded
    /// drain window.
    pub(crate) async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            tick_secs = self.tick.as_secs(),
            "fetch scheduler started"
        );
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut tasks: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.enqueue_due_feeds(&mut tasks).await;
                    // Reap finished tasks without blocking the tick.
                    while tasks.try_join_next().is_some() {}
                }
                _ = shutdown.changed() => {
                    info!("fetch scheduler draining");
                    break;
                }
            }
        }

        if tokio::time::timeout(SHUTDOWN_DRAIN, async {
            while tasks.join_next().await.is_some() {}
        })
        .await
        .is_err()
        {
            warn!("fetch tasks did not drain in time, aborting remainder");
            tasks.abort_all();
        }
        info!("fetch scheduler stopped");
    }

    async fn enqueue_due_feeds(&self, tasks: &mut JoinSet<()>) {
        let feeds = match self.dao.list_active_feeds().await {
            Ok(feeds) => feeds,
            Err(error) => {
                error!(error = %error, "failed to list active feeds");
                return;
            }
        };

        let now = chrono::Utc::now();
        for feed in feeds {
            let poll_interval = poll_interval_of(&feed, self.default_poll_interval);
            let due = match feed.last_fetched {
                None => true,
                Some(last) => (now - last).num_seconds() >= poll_interval.as_secs() as i64,
            };
            if !due {
                continue;
            }

            // Claiming advances last_fetched atomically so a slow fetch is
            // not enqueued again on the next tick.
            match self
                .dao
                .claim_feed_due(feed.id, poll_interval.as_secs_f64())
                .await
            {
                Ok(true) => {}
                Ok(false) => continue,
                Err(error) => {
                    error!(feed_id = feed.id, error = %error, "failed to claim feed");
                    continue;
                }
            }

            let dao = Arc::clone(&self.dao);
            let ingester = Arc::clone(&self.ingester);
            let workers = Arc::clone(&self.workers);
            let throttle = Arc::clone(&self.throttle);

            tasks.spawn(async move {
                let Ok(_permit) = workers.acquire().await else {
                    return;
                };
                throttle.wait_turn(&host_of(&feed.url)).await;

                if let Err(error) = ingester.process_feed(&feed).await {
                    // Feed-boundary failure: log and still advance
                    // last_fetched below so an outage never hot-loops.
                    error!(feed_id = feed.id, outlet = %feed.outlet_name, error = %error, "feed task failed");
                }

                if let Err(error) = dao.touch_feed_last_fetched(feed.id).await {
                    error!(feed_id = feed.id, error = %error, "failed to update last_fetched");
                }
            });
        }
    }
}

fn poll_interval_of(feed: &Feed, default_interval: Duration) -> Duration {
    match feed.poll_interval_minutes {
        Some(minutes) if minutes > 0 => Duration::from_secs(minutes as u64 * 60),
        _ => default_interval,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_with_interval(poll_interval_minutes: Option<i32>) -> Feed {
        Feed {
            id: 1,
            url: "https://feeds.example.com/world".to_string(),
            outlet_name: "Example Wire".to_string(),
            last_fetched: None,
            poll_interval_minutes,
        }
    }

    #[test]
    fn poll_interval_prefers_feed_setting() {
        let feed = feed_with_interval(Some(15));
        assert_eq!(
            poll_interval_of(&feed, Duration::from_secs(300)),
            Duration::from_secs(900)
        );
    }

    #[test]
    fn poll_interval_falls_back_to_default() {
        assert_eq!(
            poll_interval_of(&feed_with_interval(None), Duration::from_secs(300)),
            Duration::from_secs(300)
        );
        assert_eq!(
            poll_interval_of(&feed_with_interval(Some(0)), Duration::from_secs(300)),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn host_of_extracts_hostname() {
        assert_eq!(host_of("https://feeds.example.com/world"), "feeds.example.com");
        assert_eq!(host_of("not a url"), "not a url");
    }

    #[tokio::test(start_paused = true)]
    async fn host_throttle_spaces_same_host_requests() {
        let throttle = HostThrottle::new(Duration::from_secs(2));

        let start = Instant::now();
        throttle.wait_turn("example.com").await;
        assert!(start.elapsed() < Duration::from_millis(10));

        throttle.wait_turn("example.com").await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn host_throttle_does_not_block_other_hosts() {
        let throttle = HostThrottle::new(Duration::from_secs(2));

        throttle.wait_turn("one.example.com").await;
        let start = Instant::now();
        throttle.wait_turn("two.example.com").await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }
}
