//! Batch performance scoring for the grouping engine.
//!
//! Combines effectiveness, efficiency, coverage and precision into a
//! weighted 0-100 overall score, and classifies the trend against the
//! previous batch.

use serde::Serialize;

use crate::store::models::ScoreTrend;

pub(crate) const WEIGHT_EFFECTIVENESS: f64 = 0.35;
pub(crate) const WEIGHT_EFFICIENCY: f64 = 0.25;
pub(crate) const WEIGHT_COVERAGE: f64 = 0.25;
pub(crate) const WEIGHT_PRECISION: f64 = 0.15;

const EVENT_RATE_TARGET: f64 = 0.30;
const COVERAGE_TARGET: f64 = 60.0;
const PROCESSING_TIME_TARGET_MS: f64 = 100.0;
const ARTICLES_PER_EVENT_MIN: f64 = 2.0;
const ARTICLES_PER_EVENT_MAX: f64 = 4.0;
const ARTICLES_PER_EVENT_LIMIT: f64 = 6.0;

/// Raw measurements from one composition batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct BatchMetrics {
    pub articles_processed: usize,
    pub events_created: usize,
    pub processing_time_ms: u64,
    pub entities_extracted_total: usize,
    pub event_creation_rate: f64,
    pub coverage_percentage: f64,
    pub avg_articles_per_event: f64,
    pub singleton_events_count: usize,
    pub entities_per_article: f64,
}

impl BatchMetrics {
    /// Derive the ratio fields from the base counters.
    #[must_use]
    pub fn from_counts(
        articles_processed: usize,
        events_created: usize,
        articles_in_events: usize,
        singleton_events_count: usize,
        entities_extracted_total: usize,
        processing_time_ms: u64,
    ) -> Self {
        let articles = articles_processed.max(1) as f64;
        Self {
            articles_processed,
            events_created,
            processing_time_ms,
            entities_extracted_total,
            event_creation_rate: if articles_processed == 0 {
                0.0
            } else {
                events_created as f64 / articles
            },
            coverage_percentage: if articles_processed == 0 {
                0.0
            } else {
                articles_in_events as f64 / articles * 100.0
            },
            avg_articles_per_event: if events_created == 0 {
                0.0
            } else {
                articles_in_events as f64 / events_created as f64
            },
            singleton_events_count,
            entities_per_article: if articles_processed == 0 {
                0.0
            } else {
                entities_extracted_total as f64 / articles
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct ScoreBreakdown {
    pub overall: f64,
    pub effectiveness: f64,
    pub efficiency: f64,
    pub coverage: f64,
    pub precision: f64,
    pub trend: ScoreTrend,
}

impl ScoreBreakdown {
    /// Name of the lowest-scoring component, driving auto-tune suggestions.
    #[must_use]
    pub fn worst_component(&self) -> &'static str {
        let components = [
            ("effectiveness", self.effectiveness),
            ("efficiency", self.efficiency),
            ("coverage", self.coverage),
            ("precision", self.precision),
        ];
        components
            .iter()
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(name, _)| *name)
            .unwrap_or("effectiveness")
    }
}

/// Event-creation effectiveness: linear to the 0.30 target, a diversity
/// bonus up to 15, minus a singleton penalty up to 25.
#[must_use]
pub(crate) fn effectiveness_score(metrics: &BatchMetrics) -> f64 {
    let rate_score = if metrics.event_creation_rate >= EVENT_RATE_TARGET {
        100.0
    } else {
        metrics.event_creation_rate / EVENT_RATE_TARGET * 100.0
    };

    let diversity_bonus = if metrics.events_created > 0 {
        let diversity_ratio =
            metrics.events_created as f64 / metrics.articles_processed.max(1) as f64;
        (diversity_ratio * 50.0).min(15.0)
    } else {
        0.0
    };

    let singleton_penalty = if metrics.events_created > 0 {
        metrics.singleton_events_count as f64 / metrics.events_created as f64 * 25.0
    } else {
        0.0
    };

    (rate_score + diversity_bonus - singleton_penalty).clamp(0.0, 100.0)
}

/// Processing efficiency against the 100ms/article target. 100 at or under
/// target, linear to 50 at twice the target, then a steep decline with a
/// floor of 10. Missing data scores neutral 50.
#[must_use]
pub(crate) fn efficiency_score(metrics: &BatchMetrics) -> f64 {
    if metrics.processing_time_ms == 0 || metrics.articles_processed == 0 {
        return 50.0;
    }

    let time_per_article = metrics.processing_time_ms as f64 / metrics.articles_processed as f64;

    let score = if time_per_article <= PROCESSING_TIME_TARGET_MS {
        100.0
    } else if time_per_article <= PROCESSING_TIME_TARGET_MS * 2.0 {
        let excess = (time_per_article - PROCESSING_TIME_TARGET_MS) / PROCESSING_TIME_TARGET_MS;
        100.0 - excess * 50.0
    } else {
        let excess =
            (time_per_article - PROCESSING_TIME_TARGET_MS * 2.0) / PROCESSING_TIME_TARGET_MS;
        (50.0 - excess * 20.0).max(10.0)
    };

    score.clamp(0.0, 100.0)
}

/// Coverage against the 60% target: 0..70 up to two thirds of target,
/// 70..100 from there to target, 100 beyond.
#[must_use]
pub(crate) fn coverage_score(metrics: &BatchMetrics) -> f64 {
    let coverage = metrics.coverage_percentage;
    let two_thirds = COVERAGE_TARGET * 0.67;

    let score = if coverage >= COVERAGE_TARGET {
        100.0
    } else if coverage >= two_thirds {
        let progress = (coverage - two_thirds) / (COVERAGE_TARGET * 0.33);
        70.0 + progress * 30.0
    } else {
        coverage / two_thirds * 70.0
    };

    score.clamp(0.0, 100.0)
}

/// Grouping precision from average articles per event: 100 inside the
/// optimal 2.0-4.0 band, decaying to the acceptable 6.0 limit, collapsing
/// below 2.0. An optional manual validation rating blends in 70/30.
#[must_use]
pub(crate) fn precision_score(metrics: &BatchMetrics, validation_rating: Option<f64>) -> f64 {
    let avg = metrics.avg_articles_per_event;

    let mut base = if (ARTICLES_PER_EVENT_MIN..=ARTICLES_PER_EVENT_MAX).contains(&avg) {
        100.0
    } else if avg < ARTICLES_PER_EVENT_MIN {
        if avg >= 1.5 {
            60.0 + (avg - 1.5) / (ARTICLES_PER_EVENT_MIN - 1.5) * 40.0
        } else {
            (avg * 40.0).max(20.0)
        }
    } else if avg <= ARTICLES_PER_EVENT_LIMIT {
        let excess = avg - ARTICLES_PER_EVENT_MAX;
        let max_excess = ARTICLES_PER_EVENT_LIMIT - ARTICLES_PER_EVENT_MAX;
        100.0 - excess / max_excess * 30.0
    } else {
        (70.0 - (avg - ARTICLES_PER_EVENT_LIMIT) * 10.0).max(10.0)
    };

    if let Some(rating) = validation_rating {
        base = base * 0.7 + rating * 100.0 * 0.3;
    }

    base.clamp(0.0, 100.0)
}

/// Weighted overall score plus the trend against the previous batch.
#[must_use]
pub(crate) fn overall_score(
    metrics: &BatchMetrics,
    previous_score: Option<f64>,
    validation_rating: Option<f64>,
) -> ScoreBreakdown {
    let effectiveness = effectiveness_score(metrics);
    let efficiency = efficiency_score(metrics);
    let coverage = coverage_score(metrics);
    let precision = precision_score(metrics, validation_rating);

    let overall = effectiveness * WEIGHT_EFFECTIVENESS
        + efficiency * WEIGHT_EFFICIENCY
        + coverage * WEIGHT_COVERAGE
        + precision * WEIGHT_PRECISION;
    let overall = (overall * 100.0).round() / 100.0;

    ScoreBreakdown {
        overall,
        effectiveness,
        efficiency,
        coverage,
        precision,
        trend: classify_trend(overall, previous_score),
    }
}

/// Stable within ±2 points of the previous score.
#[must_use]
pub(crate) fn classify_trend(current: f64, previous: Option<f64>) -> ScoreTrend {
    match previous {
        None => ScoreTrend::Initial,
        Some(previous) => {
            let diff = current - previous;
            if diff.abs() < 2.0 {
                ScoreTrend::Stable
            } else if diff > 0.0 {
                ScoreTrend::Improving
            } else {
                ScoreTrend::Declining
            }
        }
    }
}
