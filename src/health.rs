//! Startup health checks.
//!
//! Store reachability and required tables are fatal; an unavailable NER
//! rule pipeline only downgrades extraction to the fallback path with a
//! warning.

use anyhow::{Context, bail};
use tracing::{info, warn};

use crate::analysis::ner::{EntityFilter, NerExtractor};
use crate::store::dao::Dao;

const REQUIRED_TABLES: &[&str] = &[
    "rss_feeds",
    "articles",
    "claims",
    "events",
    "event_articles",
    "event_metrics",
    "system_config",
    "performance_config_snapshots",
];

/// Verify the store is usable: connectivity (the pool connects with its
/// own retry budget before this runs), required tables, and a few counts
/// for the startup log.
pub(crate) async fn run_store_checks(dao: &Dao) -> anyhow::Result<()> {
    dao.ping().await.context("store ping failed")?;

    for table in REQUIRED_TABLES {
        let present = dao
            .table_exists(table)
            .await
            .with_context(|| format!("failed to probe table {table}"))?;
        if !present {
            bail!("required table missing: {table}");
        }
    }

    let (articles, events, unprocessed) = dao
        .startup_counts()
        .await
        .context("failed to read startup counts")?;
    info!(articles, events, unprocessed, "store health check passed");

    Ok(())
}

/// Exercise the NER extractor against a fixture sentence. Never fatal:
/// the fallback path returns the same shape at lower confidence.
pub(crate) fn run_ner_check(ner: &NerExtractor) {
    if !ner.model_available() {
        warn!("NER rule pipeline unavailable, extraction degrades to proper-noun fallback");
        return;
    }

    let sample = "Director Maria Lopez of the World Health Organization spoke in Geneva \
        about the agency's response plan.";
    let entities = ner.categorized("", sample, &EntityFilter::default());

    if entities.total() == 0 {
        warn!("NER self-test extracted no entities from fixture text");
    } else {
        info!(entities = entities.total(), "NER health check passed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ner_check_finds_entities_in_fixture() {
        let ner = NerExtractor::new();
        assert!(ner.model_available());

        let sample = "Director Maria Lopez of the World Health Organization spoke in Geneva \
            about the agency's response plan.";
        let entities = ner.categorized("", sample, &EntityFilter::default());
        assert!(entities.total() > 0);
    }
}
