//! Performance-driven configuration loop.
//!
//! Loads the best historical configuration at startup, appends a snapshot
//! after event-producing batches (and at most every five minutes
//! otherwise), and writes advisory auto-tune suggestions to the change
//! log when the overall score falls well below the acceptance threshold.
//! Suggestions are never applied automatically.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::grouping::config::{ConfigUpdateError, GroupingConfig};
use crate::grouping::scorer::{self, BatchMetrics, ScoreBreakdown};
use crate::store::dao::Dao;
use crate::store::error::StoreError;
use crate::store::models::{ConfigSource, NewConfigChangeEvent, SnapshotRow};

const PERFORMANCE_THRESHOLD: f64 = 70.0;
/// Tolerance below the threshold before auto-tune suggestions fire.
const AUTO_TUNE_TOLERANCE: f64 = 10.0;
const SNAPSHOT_MIN_INTERVAL_SECS: u64 = 300;

/// Snapshot payload handed to the store adapter. Startup and manual
/// snapshots carry no batch metrics.
#[derive(Debug, Clone)]
pub(crate) struct NewSnapshot {
    pub(crate) config: GroupingConfig,
    pub(crate) metrics: Option<BatchMetrics>,
    pub(crate) scores: Option<ScoreBreakdown>,
    pub(crate) config_source: ConfigSource,
    pub(crate) service_instance: String,
    pub(crate) notes: String,
    pub(crate) config_generation: i32,
}

#[derive(Debug, Error)]
pub(crate) enum UpdateError {
    #[error(transparent)]
    Invalid(#[from] ConfigUpdateError),
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

struct ManagerState {
    config: GroupingConfig,
    generation: i32,
    previous_score: Option<f64>,
    last_snapshot_at: Option<Instant>,
}

pub(crate) struct ConfigManager {
    dao: Arc<Dao>,
    service_instance: String,
    state: Mutex<ManagerState>,
}

impl ConfigManager {
    pub(crate) fn new(dao: Arc<Dao>, service_instance: impl Into<String>) -> Self {
        Self {
            dao,
            service_instance: service_instance.into(),
            state: Mutex::new(ManagerState {
                config: GroupingConfig::default(),
                generation: 1,
                previous_score: None,
                last_snapshot_at: None,
            }),
        }
    }

    /// Load the startup configuration: the best-scoring recent snapshot,
    /// else the latest one, else conservative defaults. Always records a
    /// `startup` snapshot. Store failures degrade to defaults.
    pub(crate) async fn load_startup_configuration(&self) -> GroupingConfig {
        let mut state = self.state.lock().await;

        match self.dao.load_best_recent_snapshot(PERFORMANCE_THRESHOLD).await {
            Ok(Some(row)) => {
                info!(
                    score = ?row.performance_score,
                    generation = row.config_generation,
                    "loaded high-performing startup configuration"
                );
                state.config = config_from_row(&row);
                state.generation = row.config_generation + 1;
            }
            Ok(None) => match self.dao.load_latest_snapshot().await {
                Ok(Some(row)) => {
                    info!(
                        score = ?row.performance_score,
                        "no high-scoring configuration found, using latest available"
                    );
                    state.config = config_from_row(&row);
                    state.generation = row.config_generation.max(1);
                }
                Ok(None) => {
                    info!("no configuration history found, using conservative defaults");
                    state.config = GroupingConfig::default();
                }
                Err(error) => {
                    warn!(error = %error, "failed to load latest snapshot, using defaults");
                    state.config = GroupingConfig::default();
                }
            },
            Err(error) => {
                warn!(error = %error, "failed to load startup configuration, using defaults");
                state.config = GroupingConfig::default();
            }
        }

        let snapshot = NewSnapshot {
            config: state.config,
            metrics: None,
            scores: None,
            config_source: ConfigSource::Startup,
            service_instance: self.service_instance.clone(),
            notes: format!(
                "Startup configuration loaded for instance {}",
                self.service_instance
            ),
            config_generation: state.generation,
        };
        if let Err(error) = self.dao.insert_snapshot(&snapshot).await {
            warn!(error = %error, "failed to save startup snapshot");
        }

        state.config
    }

    pub(crate) async fn current_config(&self) -> GroupingConfig {
        self.state.lock().await.config
    }

    /// Score a finished batch, persist a runtime snapshot when due, and
    /// emit auto-tune suggestions when performance is well below target.
    /// Advisory work: failures are logged, never propagated.
    pub(crate) async fn record_batch(&self, metrics: BatchMetrics) {
        let mut state = self.state.lock().await;

        let breakdown = scorer::overall_score(&metrics, state.previous_score, None);
        state.previous_score = Some(breakdown.overall);

        info!(
            score = breakdown.overall,
            effectiveness = breakdown.effectiveness,
            efficiency = breakdown.efficiency,
            coverage = breakdown.coverage,
            precision = breakdown.precision,
            trend = breakdown.trend.as_str(),
            "batch performance scored"
        );

        let due = snapshot_due(
            metrics.events_created,
            state.last_snapshot_at.map(|at| at.elapsed().as_secs()),
        );
        let mut snapshot_id = None;
        if due {
            state.generation += 1;
            let snapshot = NewSnapshot {
                config: state.config,
                metrics: Some(metrics),
                scores: Some(breakdown),
                config_source: ConfigSource::Runtime,
                service_instance: self.service_instance.clone(),
                notes: format!(
                    "Runtime performance snapshot - {} trend",
                    breakdown.trend.as_str()
                ),
                config_generation: state.generation,
            };
            match self.dao.insert_snapshot(&snapshot).await {
                Ok(id) => {
                    state.last_snapshot_at = Some(Instant::now());
                    snapshot_id = Some(id);
                }
                Err(error) => error!(error = %error, "failed to save performance snapshot"),
            }
        }

        if breakdown.overall < PERFORMANCE_THRESHOLD - AUTO_TUNE_TOLERANCE {
            let component = breakdown.worst_component();
            warn!(
                score = breakdown.overall,
                worst_component = component,
                "performance significantly below threshold, generating suggestions"
            );

            let adjustments = auto_tune_adjustments(component, &state.config, &metrics);
            for (parameter, new_value) in adjustments {
                let old_value = state.config.value_of(&parameter).unwrap_or_default();
                let event = NewConfigChangeEvent {
                    parameter_name: parameter,
                    old_value,
                    new_value,
                    change_reason: format!("auto_tune_suggestion_{component}"),
                    previous_score: Some(breakdown.overall),
                    target_improvement: Some(format!("improve_{component}")),
                    config_snapshot_id: snapshot_id,
                    triggered_by: format!("auto_tuner_{}", self.service_instance),
                };
                if let Err(error) = self.dao.insert_config_change_event(&event).await {
                    error!(error = %error, "failed to log auto-tune suggestion");
                }
            }
        }
    }

    /// Apply a validated partial update, log the changes, and write a
    /// snapshot carrying the new configuration.
    pub(crate) async fn update_configuration(
        &self,
        updates: &serde_json::Map<String, serde_json::Value>,
        reason: &str,
    ) -> Result<GroupingConfig, UpdateError> {
        let mut state = self.state.lock().await;

        let changes = state.config.apply_updates(updates)?;
        if changes.is_empty() {
            return Ok(state.config);
        }

        state.generation += 1;
        let source = if reason.starts_with("auto_tune") {
            ConfigSource::AutoTune
        } else {
            ConfigSource::Manual
        };

        let snapshot = NewSnapshot {
            config: state.config,
            metrics: None,
            scores: None,
            config_source: source,
            service_instance: self.service_instance.clone(),
            notes: format!("Configuration updated: {reason}"),
            config_generation: state.generation,
        };
        let snapshot_id = self.dao.insert_snapshot(&snapshot).await?;

        for (parameter, old_value, new_value) in changes {
            info!(
                parameter = %parameter,
                old = %old_value,
                new = %new_value,
                reason,
                "configuration updated"
            );
            let event = NewConfigChangeEvent {
                parameter_name: parameter,
                old_value,
                new_value,
                change_reason: reason.to_string(),
                previous_score: state.previous_score,
                target_improvement: None,
                config_snapshot_id: Some(snapshot_id),
                triggered_by: self.service_instance.clone(),
            };
            self.dao.insert_config_change_event(&event).await?;
        }

        Ok(state.config)
    }
}

fn config_from_row(row: &SnapshotRow) -> GroupingConfig {
    GroupingConfig {
        min_shared_entities: row.min_shared_entities,
        entity_overlap_threshold: row.entity_overlap_threshold,
        min_title_keywords: row.min_title_keywords,
        title_keyword_bonus: row.title_keyword_bonus,
        max_time_diff_hours: row.max_time_diff_hours,
        allow_same_outlet: row.allow_same_outlet,
        min_entity_length: row.min_entity_length,
        max_entity_length: row.max_entity_length,
        entity_noise_threshold: row.entity_noise_threshold,
    }
    .clamped()
}

/// A snapshot is written whenever the batch created events, otherwise at
/// most once every five minutes.
fn snapshot_due(events_created: usize, secs_since_last: Option<u64>) -> bool {
    events_created > 0
        || match secs_since_last {
            None => true,
            Some(elapsed) => elapsed >= SNAPSHOT_MIN_INTERVAL_SECS,
        }
}

/// Suggested parameter changes for the worst-scoring component, rendered
/// as (parameter, new value) pairs for the change log.
fn auto_tune_adjustments(
    component: &str,
    config: &GroupingConfig,
    metrics: &BatchMetrics,
) -> Vec<(String, String)> {
    let mut adjustments = Vec::new();

    match component {
        "effectiveness" => {
            if metrics.event_creation_rate < 0.15 {
                if config.min_shared_entities > 1 {
                    adjustments.push((
                        "min_shared_entities".to_string(),
                        (config.min_shared_entities - 1).max(1).to_string(),
                    ));
                }
                if config.entity_overlap_threshold > 0.150 {
                    adjustments.push((
                        "entity_overlap_threshold".to_string(),
                        format!("{:.3}", (config.entity_overlap_threshold - 0.050).max(0.150)),
                    ));
                }
                if config.max_time_diff_hours < 72 {
                    adjustments.push((
                        "max_time_diff_hours".to_string(),
                        (config.max_time_diff_hours + 12).min(72).to_string(),
                    ));
                }
            }
        }
        "efficiency" => {
            if config.max_entity_length > 30 {
                adjustments.push(("max_entity_length".to_string(), "30".to_string()));
            }
            if config.entity_noise_threshold < 0.300 {
                adjustments.push(("entity_noise_threshold".to_string(), "0.300".to_string()));
            }
        }
        "coverage" => {
            if config.min_shared_entities > 1 {
                adjustments.push((
                    "min_shared_entities".to_string(),
                    (config.min_shared_entities - 1).to_string(),
                ));
            }
            if config.entity_overlap_threshold > 0.200 {
                adjustments.push((
                    "entity_overlap_threshold".to_string(),
                    format!("{:.3}", (config.entity_overlap_threshold - 0.030).max(0.200)),
                ));
            }
        }
        "precision" => {
            if metrics.avg_articles_per_event < 1.8 {
                // Under-grouping looks like a coverage problem.
                return auto_tune_adjustments("coverage", config, metrics);
            }
            if metrics.avg_articles_per_event > 4.5 {
                if config.min_shared_entities < 3 {
                    adjustments.push((
                        "min_shared_entities".to_string(),
                        (config.min_shared_entities + 1).to_string(),
                    ));
                }
                if config.entity_overlap_threshold < 0.350 {
                    adjustments.push((
                        "entity_overlap_threshold".to_string(),
                        format!("{:.3}", (config.entity_overlap_threshold + 0.050).min(0.350)),
                    ));
                }
            }
        }
        _ => {}
    }

    adjustments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics_with(rate: f64, avg: f64) -> BatchMetrics {
        BatchMetrics {
            articles_processed: 50,
            events_created: 5,
            processing_time_ms: 2000,
            entities_extracted_total: 100,
            event_creation_rate: rate,
            coverage_percentage: 30.0,
            avg_articles_per_event: avg,
            singleton_events_count: 0,
            entities_per_article: 2.0,
        }
    }

    #[test]
    fn snapshot_due_when_events_created() {
        assert!(snapshot_due(3, Some(10)));
    }

    #[test]
    fn snapshot_due_after_interval_without_events() {
        assert!(!snapshot_due(0, Some(100)));
        assert!(snapshot_due(0, Some(301)));
        assert!(snapshot_due(0, None));
    }

    #[test]
    fn effectiveness_suggestions_relax_matching() {
        let config = GroupingConfig::default();
        let adjustments =
            auto_tune_adjustments("effectiveness", &config, &metrics_with(0.10, 2.5));

        assert!(adjustments.contains(&("min_shared_entities".to_string(), "1".to_string())));
        assert!(adjustments.contains(&("entity_overlap_threshold".to_string(), "0.200".to_string())));
        assert!(adjustments.contains(&("max_time_diff_hours".to_string(), "60".to_string())));
    }

    #[test]
    fn effectiveness_suggestions_need_low_rate() {
        let config = GroupingConfig::default();
        let adjustments =
            auto_tune_adjustments("effectiveness", &config, &metrics_with(0.25, 2.5));
        assert!(adjustments.is_empty());
    }

    #[test]
    fn efficiency_suggestions_tighten_entity_processing() {
        let config = GroupingConfig::default();
        let adjustments = auto_tune_adjustments("efficiency", &config, &metrics_with(0.2, 2.5));

        assert!(adjustments.contains(&("max_entity_length".to_string(), "30".to_string())));
        assert!(adjustments.contains(&("entity_noise_threshold".to_string(), "0.300".to_string())));
    }

    #[test]
    fn precision_under_grouping_defers_to_coverage_arm() {
        let config = GroupingConfig::default();
        let adjustments = auto_tune_adjustments("precision", &config, &metrics_with(0.2, 1.2));

        assert!(adjustments.contains(&("min_shared_entities".to_string(), "1".to_string())));
    }

    #[test]
    fn precision_over_grouping_tightens_requirements() {
        let config = GroupingConfig::default();
        let adjustments = auto_tune_adjustments("precision", &config, &metrics_with(0.2, 5.0));

        assert!(adjustments.contains(&("min_shared_entities".to_string(), "3".to_string())));
        assert!(adjustments.contains(&("entity_overlap_threshold".to_string(), "0.300".to_string())));
    }

    #[test]
    fn unknown_component_yields_no_suggestions() {
        let config = GroupingConfig::default();
        assert!(auto_tune_adjustments("novelty", &config, &metrics_with(0.1, 2.0)).is_empty());
    }
}
