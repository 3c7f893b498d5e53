//! Quality-composition worker.
//!
//! Claims batches of unprocessed articles, computes writing quality,
//! outlet reputation and recency into the composite quality score,
//! extracts claims and NER columns, persists everything in one update per
//! article, then hands the batch to the grouping engine and records the
//! batch's performance. On shutdown the in-flight article finishes and
//! the loop exits before the next batch.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::claims::extract_claims;
use crate::analysis::ner::NerExtractor;
use crate::analysis::reputation::ReputationAnalyzer;
use crate::analysis::validator;
use crate::analysis::writing;
use crate::grouping::engine::group_articles;
use crate::grouping::manager::ConfigManager;
use crate::grouping::scorer::BatchMetrics;
use crate::store::dao::Dao;
use crate::store::models::{ArticleRecord, NewClaim};
use crate::util::text::truncate_chars;

const MAX_CLAIM_TEXT_CHARS: usize = 1000;

/// Recency bonus: 0-5 points from the published instant. An absent
/// publication time earns nothing; a date that was present at ingest but
/// failed to parse gets the minimum bonus rather than none.
#[must_use]
pub(crate) fn recency_bonus(
    published_at: Option<DateTime<Utc>>,
    parse_failed: bool,
    now: DateTime<Utc>,
) -> i32 {
    let Some(published_at) = published_at else {
        return i32::from(parse_failed);
    };
    let hours = (now - published_at).num_seconds() as f64 / 3600.0;

    if hours <= 6.0 {
        5
    } else if hours <= 24.0 {
        3
    } else if hours <= 48.0 {
        1
    } else {
        0
    }
}

/// Quality rounding: fractional part at or below 0.5 rounds down,
/// above it rounds up.
#[must_use]
pub(crate) fn round_quality(composite: f64) -> i32 {
    let floor = composite.floor();
    let fraction = composite - floor;
    if fraction <= 0.5 {
        floor as i32
    } else {
        floor as i32 + 1
    }
}

/// Composite quality: 60% writing quality, 40% outlet reputation (capped
/// at 40 points), plus the recency bonus; rounded and clamped to 0-100.
#[must_use]
pub(crate) fn compose_quality(writing_total: i32, reputation_score: i32, recency: i32) -> i32 {
    let writing_weighted = f64::from(writing_total) * 0.6;
    let reputation_weighted = (f64::from(reputation_score) * 0.4).min(40.0);
    let composite = writing_weighted + reputation_weighted + f64::from(recency);

    round_quality(composite).clamp(0, 100)
}

pub(crate) struct CompositionWorker {
    dao: Arc<Dao>,
    ner: Arc<NerExtractor>,
    reputation: ReputationAnalyzer,
    config_manager: Arc<ConfigManager>,
    batch_size: usize,
    sleep_interval: std::time::Duration,
}

impl CompositionWorker {
    pub(crate) fn new(
        dao: Arc<Dao>,
        ner: Arc<NerExtractor>,
        config_manager: Arc<ConfigManager>,
        batch_size: usize,
        sleep_interval: std::time::Duration,
    ) -> Self {
        let reputation = ReputationAnalyzer::new(Arc::clone(&dao));
        Self {
            dao,
            ner,
            reputation,
            config_manager,
            batch_size,
            sleep_interval,
        }
    }

    pub(crate) async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(batch_size = self.batch_size, "composition worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let processed = match self.process_batch(&shutdown).await {
                Ok(count) => count,
                Err(error) => {
                    error!(error = %error, "batch processing failed");
                    0
                }
            };

            // An empty batch doubles the sleep so an idle store is not
            // polled aggressively.
            let sleep = if processed == 0 {
                self.sleep_interval * 2
            } else {
                self.sleep_interval
            };

            tokio::select! {
                _ = tokio::time::sleep(sleep) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("composition worker stopped");
    }

    async fn process_batch(&self, shutdown: &watch::Receiver<bool>) -> anyhow::Result<usize> {
        let batch = self
            .dao
            .select_unprocessed_articles(self.batch_size as i64)
            .await?;
        if batch.is_empty() {
            info!("no articles need processing");
            return Ok(0);
        }

        let batch_id = Uuid::new_v4();
        info!(%batch_id, articles = batch.len(), "processing batch");
        let config = self.config_manager.current_config().await;
        let filter = config.entity_filter();
        let started = Instant::now();

        let mut processed = 0usize;
        let mut entities_total = 0usize;
        let mut interrupted = false;

        for article in &batch {
            match self.process_article(article, &filter).await {
                Ok(entity_count) => {
                    entities_total += entity_count;
                    processed += 1;
                }
                Err(error) => {
                    // Article-boundary failure: the batch continues.
                    error!(article_id = article.id, error = %error, "failed to process article");
                }
            }

            if *shutdown.borrow() {
                interrupted = true;
                break;
            }
        }

        if interrupted {
            info!(processed, "shutdown requested, exiting before grouping");
            return Ok(processed);
        }

        let events = group_articles(&batch, &config, &self.ner);
        let mut events_created = 0usize;
        let mut articles_in_events = 0usize;
        let mut singleton_events = 0usize;
        for event in &events {
            match self
                .dao
                .insert_event_with_articles(&event.title, &event.description, &event.article_ids)
                .await
            {
                Ok(event_id) => {
                    events_created += 1;
                    articles_in_events += event.article_ids.len();
                    if event.article_ids.len() == 1 {
                        singleton_events += 1;
                    }
                    info!(
                        event_id,
                        members = event.article_ids.len(),
                        title = %truncate_chars(&event.title, 50),
                        "event created"
                    );
                }
                Err(error) => {
                    // Event-boundary failure: siblings continue.
                    error!(error = %error, members = event.article_ids.len(), "failed to persist event");
                }
            }
        }

        let metrics = BatchMetrics::from_counts(
            batch.len(),
            events_created,
            articles_in_events,
            singleton_events,
            entities_total,
            started.elapsed().as_millis() as u64,
        );
        self.config_manager.record_batch(metrics).await;

        info!(
            %batch_id,
            processed,
            events = events_created,
            coverage_pct = metrics.coverage_percentage,
            elapsed_ms = metrics.processing_time_ms,
            "batch complete"
        );
        Ok(processed)
    }

    /// Score, claim-extract and NER one article; everything lands in one
    /// row update. Returns the number of entities extracted.
    async fn process_article(
        &self,
        article: &ArticleRecord,
        filter: &crate::analysis::ner::EntityFilter,
    ) -> anyhow::Result<usize> {
        let writing = writing::analyze_article(&article.body, &article.title);
        let reputation = self.outlet_reputation(&article.outlet_name).await;
        let recency = recency_bonus(
            article.published_at,
            article.published_parse_failed,
            Utc::now(),
        );
        let quality = compose_quality(writing.total_score, reputation, recency);

        let entities = self.ner.categorized(&article.title, &article.body, filter);
        let entity_count = entities.total();

        if !self.dao.article_has_claims(article.id).await? {
            self.persist_claims(article).await?;
        }

        self.dao
            .update_article_scores_and_ner(article.id, quality, &entities)
            .await?;

        Ok(entity_count)
    }

    /// Validated agency score first, then the reputation analyzer with its
    /// own authority/default fallback chain.
    async fn outlet_reputation(&self, outlet_name: &str) -> i32 {
        match validator::validated_agency_score(&self.dao, outlet_name).await {
            Ok(Some(score)) => score,
            Ok(None) => {
                warn!(outlet = outlet_name, "no validated agency score, using analyzer");
                self.reputation.outlet_reputation(outlet_name).await
            }
            Err(error) => {
                warn!(outlet = outlet_name, error = %error, "agency validation failed, using analyzer");
                self.reputation.outlet_reputation(outlet_name).await
            }
        }
    }

    async fn persist_claims(&self, article: &ArticleRecord) -> anyhow::Result<()> {
        let claims = extract_claims(&article.title, &article.body, &article.outlet_name);

        if claims.is_empty() {
            self.dao.insert_placeholder_claim(article.id).await?;
            return Ok(());
        }

        for claim in claims {
            let row = NewClaim {
                article_id: article.id,
                claim_text: truncate_chars(&claim.text, MAX_CLAIM_TEXT_CHARS).to_string(),
                claim_type: claim.claim_type,
                verified_state: claim.verified_state,
                verification_source: claim.verification_source,
                confidence: claim.confidence,
            };
            self.dao.insert_claim(&row).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
    }

    #[rstest]
    #[case(2, 5)]
    #[case(6, 5)]
    #[case(12, 3)]
    #[case(24, 3)]
    #[case(36, 1)]
    #[case(48, 1)]
    #[case(72, 0)]
    fn recency_bands(#[case] hours_ago: i64, #[case] expected: i32) {
        let published = now() - chrono::Duration::hours(hours_ago);
        assert_eq!(recency_bonus(Some(published), false, now()), expected);
    }

    #[test]
    fn unknown_publication_time_earns_no_bonus() {
        assert_eq!(recency_bonus(None, false, now()), 0);
    }

    #[test]
    fn unparseable_publication_date_earns_minimum_bonus() {
        assert_eq!(recency_bonus(None, true, now()), 1);
    }

    #[test]
    fn parse_flag_is_ignored_when_a_date_is_present() {
        let published = now() - chrono::Duration::hours(2);
        assert_eq!(recency_bonus(Some(published), true, now()), 5);
    }

    // The rounding law: fractional part at or below 0.5 rounds down, above
    // rounds up.
    #[rstest]
    #[case(67.0 * 0.6 + 40.0, 80)] // 80.2
    #[case(68.0 * 0.6 + 40.0, 81)] // 80.8
    #[case(83.0 * 0.6 + 25.0, 75)] // 74.8
    #[case(54.0 * 0.6 + 25.0, 57)] // 57.4
    #[case(60.0 * 0.6 + 25.0, 61)] // 61.0
    #[case(80.5, 80)]
    #[case(80.51, 81)]
    fn quality_rounding_law(#[case] composite: f64, #[case] expected: i32) {
        assert_eq!(round_quality(composite), expected);
    }

    #[test]
    fn compose_quality_weights_and_caps() {
        // writing 80 -> 48, reputation 100 -> capped 40, fresh article +5
        assert_eq!(compose_quality(80, 100, 5), 93);
        // same article three days old loses the bonus
        assert_eq!(compose_quality(80, 100, 0), 88);
        // reputation weighting caps at 40 even for out-of-range inputs
        assert_eq!(compose_quality(80, 120, 0), 88);
    }

    #[test]
    fn compose_quality_clamps_at_one_hundred() {
        assert_eq!(compose_quality(100, 100, 5), 100);
    }

    #[test]
    fn compose_quality_is_bounded_below() {
        assert_eq!(compose_quality(0, 0, 0), 0);
    }
}
