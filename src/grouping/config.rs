//! Grouping parameters with bounded domains.
//!
//! The parameter set is persisted with every performance snapshot and can
//! be adjusted at runtime through validated partial updates; out-of-range
//! values are clamped into their domain rather than rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::analysis::ner::EntityFilter;

pub const PARAMETER_NAMES: &[&str] = &[
    "min_shared_entities",
    "entity_overlap_threshold",
    "min_title_keywords",
    "title_keyword_bonus",
    "max_time_diff_hours",
    "allow_same_outlet",
    "min_entity_length",
    "max_entity_length",
    "entity_noise_threshold",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupingConfig {
    /// Absolute minimum of shared entities between two articles (1-6).
    pub min_shared_entities: i32,
    /// Minimum shared fraction of the smaller entity set (0.150-0.500).
    pub entity_overlap_threshold: f64,
    /// Minimum shared title keywords; 0 disables the gate (0-5).
    pub min_title_keywords: i32,
    /// Entity-requirement reduction per shared title keyword (0.000-0.300).
    pub title_keyword_bonus: f64,
    /// Maximum publication-time gap within an event (6-96 hours).
    pub max_time_diff_hours: i32,
    pub allow_same_outlet: bool,
    /// NER post-filter pass-throughs.
    pub min_entity_length: i32,
    pub max_entity_length: i32,
    pub entity_noise_threshold: f64,
}

impl Default for GroupingConfig {
    /// Conservative defaults for safe startup when no snapshot history
    /// exists.
    fn default() -> Self {
        Self {
            min_shared_entities: 2,
            entity_overlap_threshold: 0.250,
            min_title_keywords: 0,
            title_keyword_bonus: 0.100,
            max_time_diff_hours: 48,
            allow_same_outlet: false,
            min_entity_length: 3,
            max_entity_length: 50,
            entity_noise_threshold: 0.200,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigUpdateError {
    #[error("unknown configuration parameter: {0}")]
    UnknownParameter(String),
    #[error("invalid value for {parameter}: {value}")]
    InvalidValue { parameter: String, value: String },
}

impl GroupingConfig {
    /// Clamp every parameter into its bounded domain.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.min_shared_entities = self.min_shared_entities.clamp(1, 6);
        self.entity_overlap_threshold = self.entity_overlap_threshold.clamp(0.150, 0.500);
        self.min_title_keywords = self.min_title_keywords.clamp(0, 5);
        self.title_keyword_bonus = self.title_keyword_bonus.clamp(0.0, 0.300);
        self.max_time_diff_hours = self.max_time_diff_hours.clamp(6, 96);
        self.min_entity_length = self.min_entity_length.clamp(2, 6);
        self.max_entity_length = self.max_entity_length.clamp(30, 80);
        self.entity_noise_threshold = self.entity_noise_threshold.clamp(0.100, 0.400);
        self
    }

    /// The NER post-filter view of this configuration.
    #[must_use]
    pub fn entity_filter(&self) -> EntityFilter {
        EntityFilter {
            min_entity_length: self.min_entity_length as usize,
            max_entity_length: self.max_entity_length as usize,
            noise_threshold: self.entity_noise_threshold,
        }
    }

    /// Current value of a parameter rendered for the change log.
    #[must_use]
    pub fn value_of(&self, parameter: &str) -> Option<String> {
        match parameter {
            "min_shared_entities" => Some(self.min_shared_entities.to_string()),
            "entity_overlap_threshold" => Some(format!("{:.3}", self.entity_overlap_threshold)),
            "min_title_keywords" => Some(self.min_title_keywords.to_string()),
            "title_keyword_bonus" => Some(format!("{:.3}", self.title_keyword_bonus)),
            "max_time_diff_hours" => Some(self.max_time_diff_hours.to_string()),
            "allow_same_outlet" => Some(self.allow_same_outlet.to_string()),
            "min_entity_length" => Some(self.min_entity_length.to_string()),
            "max_entity_length" => Some(self.max_entity_length.to_string()),
            "entity_noise_threshold" => Some(format!("{:.3}", self.entity_noise_threshold)),
            _ => None,
        }
    }

    /// Apply a partial update from JSON values. Unknown keys are rejected;
    /// accepted values are clamped into their domain. Returns the list of
    /// (parameter, old, new) changes actually applied.
    pub fn apply_updates(
        &mut self,
        updates: &serde_json::Map<String, Value>,
    ) -> Result<Vec<(String, String, String)>, ConfigUpdateError> {
        for key in updates.keys() {
            if !PARAMETER_NAMES.contains(&key.as_str()) {
                return Err(ConfigUpdateError::UnknownParameter(key.clone()));
            }
        }

        let mut changes = Vec::new();
        let mut next = *self;

        for (key, value) in updates {
            let applied = match key.as_str() {
                "min_shared_entities" => set_i32(&mut next.min_shared_entities, value),
                "entity_overlap_threshold" => set_f64(&mut next.entity_overlap_threshold, value),
                "min_title_keywords" => set_i32(&mut next.min_title_keywords, value),
                "title_keyword_bonus" => set_f64(&mut next.title_keyword_bonus, value),
                "max_time_diff_hours" => set_i32(&mut next.max_time_diff_hours, value),
                "allow_same_outlet" => set_bool(&mut next.allow_same_outlet, value),
                "min_entity_length" => set_i32(&mut next.min_entity_length, value),
                "max_entity_length" => set_i32(&mut next.max_entity_length, value),
                "entity_noise_threshold" => set_f64(&mut next.entity_noise_threshold, value),
                _ => unreachable!("keys validated above"),
            };
            if !applied {
                return Err(ConfigUpdateError::InvalidValue {
                    parameter: key.clone(),
                    value: value.to_string(),
                });
            }
        }

        next = next.clamped();
        for key in updates.keys() {
            let old = self.value_of(key).expect("known parameter");
            let new = next.value_of(key).expect("known parameter");
            if old != new {
                changes.push((key.clone(), old, new));
            }
        }

        *self = next;
        Ok(changes)
    }
}

fn set_i32(slot: &mut i32, value: &Value) -> bool {
    match value.as_i64() {
        Some(v) => {
            *slot = v as i32;
            true
        }
        None => false,
    }
}

fn set_f64(slot: &mut f64, value: &Value) -> bool {
    match value.as_f64() {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}

fn set_bool(slot: &mut bool, value: &Value) -> bool {
    match value.as_bool() {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_conservative() {
        let config = GroupingConfig::default();
        assert_eq!(config.min_shared_entities, 2);
        assert!((config.entity_overlap_threshold - 0.250).abs() < f64::EPSILON);
        assert_eq!(config.min_title_keywords, 0);
        assert_eq!(config.max_time_diff_hours, 48);
        assert!(!config.allow_same_outlet);
    }

    #[test]
    fn clamped_pulls_values_into_domain() {
        let config = GroupingConfig {
            min_shared_entities: 99,
            entity_overlap_threshold: 0.9,
            min_title_keywords: -3,
            title_keyword_bonus: 1.0,
            max_time_diff_hours: 2,
            allow_same_outlet: true,
            min_entity_length: 0,
            max_entity_length: 500,
            entity_noise_threshold: 0.01,
        }
        .clamped();

        assert_eq!(config.min_shared_entities, 6);
        assert!((config.entity_overlap_threshold - 0.500).abs() < f64::EPSILON);
        assert_eq!(config.min_title_keywords, 0);
        assert!((config.title_keyword_bonus - 0.300).abs() < f64::EPSILON);
        assert_eq!(config.max_time_diff_hours, 6);
        assert_eq!(config.min_entity_length, 2);
        assert_eq!(config.max_entity_length, 80);
        assert!((config.entity_noise_threshold - 0.100).abs() < f64::EPSILON);
    }

    #[test]
    fn apply_updates_rejects_unknown_keys() {
        let mut config = GroupingConfig::default();
        let updates = json!({"no_such_parameter": 3});
        let error = config
            .apply_updates(updates.as_object().unwrap())
            .unwrap_err();
        assert_eq!(
            error,
            ConfigUpdateError::UnknownParameter("no_such_parameter".to_string())
        );
    }

    #[test]
    fn apply_updates_changes_and_reports_values() {
        let mut config = GroupingConfig::default();
        let updates = json!({
            "min_shared_entities": 3,
            "allow_same_outlet": true
        });
        let changes = config.apply_updates(updates.as_object().unwrap()).unwrap();

        assert_eq!(config.min_shared_entities, 3);
        assert!(config.allow_same_outlet);
        assert_eq!(changes.len(), 2);
        assert!(changes.contains(&(
            "min_shared_entities".to_string(),
            "2".to_string(),
            "3".to_string()
        )));
    }

    #[test]
    fn apply_updates_rejects_wrong_types() {
        let mut config = GroupingConfig::default();
        let updates = json!({"min_shared_entities": "three"});
        let error = config
            .apply_updates(updates.as_object().unwrap())
            .unwrap_err();
        assert!(matches!(error, ConfigUpdateError::InvalidValue { .. }));
    }

    #[test]
    fn entity_filter_reflects_pass_throughs() {
        let config = GroupingConfig {
            min_entity_length: 4,
            max_entity_length: 40,
            entity_noise_threshold: 0.300,
            ..GroupingConfig::default()
        };
        let filter = config.entity_filter();
        assert_eq!(filter.min_entity_length, 4);
        assert_eq!(filter.max_entity_length, 40);
        assert!((filter.noise_threshold - 0.300).abs() < f64::EPSILON);
    }
}
