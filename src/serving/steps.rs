//! # Loading Step Table
//!
//! Ordered progress-weight table for the model loading pipeline. Each entry
//! pairs a step id with a human-readable label and the cumulative progress
//! reached when that step begins.
//!
//! The table is static configuration, not something computed at runtime: it
//! ships with defaults for the standard pipeline (model weights, featurizer,
//! tokenizer, generation config, compilation) and can be replaced wholesale
//! through [`ServingConfig`](crate::config::ServingConfig) when a different
//! loading pipeline is plugged in.

use serde::{Deserialize, Serialize};

/// One entry of the loading-step table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEntry {
    /// Stable step identifier reported by the loading operation
    pub id: String,

    /// Human-readable label for UI display
    pub label: String,

    /// Cumulative progress in [0, 1] reached when this step begins
    pub progress: f32,
}

impl StepEntry {
    pub fn new(id: impl Into<String>, label: impl Into<String>, progress: f32) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            progress,
        }
    }
}

/// Ordered lookup table from step id to label and cumulative progress.
///
/// ## Lookup rules:
/// - A step that is not registered maps to progress `0.0` and its own id as
///   the label, so an unknown pipeline stage degrades to "no progress yet"
///   instead of failing.
/// - `None` (no step reported yet) also maps to progress `0.0`.
#[derive(Debug, Clone)]
pub struct StepTable {
    entries: Vec<StepEntry>,
}

impl StepTable {
    pub fn new(entries: Vec<StepEntry>) -> Self {
        Self { entries }
    }

    /// Cumulative progress for the given step, or `0.0` when no step has
    /// been reported yet or the step is not in the table.
    pub fn progress(&self, step: Option<&str>) -> f32 {
        step.and_then(|id| self.entries.iter().find(|entry| entry.id == id))
            .map(|entry| entry.progress)
            .unwrap_or(0.0)
    }

    /// Display label for a step id; unregistered ids fall back to the id
    /// itself.
    pub fn label(&self, step_id: &str) -> String {
        self.entries
            .iter()
            .find(|entry| entry.id == step_id)
            .map(|entry| entry.label.clone())
            .unwrap_or_else(|| step_id.to_string())
    }

    /// Entries in table order.
    pub fn entries(&self) -> &[StepEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServingConfig;

    fn default_table() -> StepTable {
        StepTable::new(ServingConfig::default().steps)
    }

    #[test]
    fn test_progress_lookup() {
        let table = default_table();
        assert_eq!(table.progress(Some("loading_model")), 0.0);
        assert_eq!(table.progress(Some("loading_featurizer")), 0.50);
        assert_eq!(table.progress(Some("compiling")), 0.75);
    }

    /// Unknown or missing steps never contribute progress.
    #[test]
    fn test_unknown_step_progress() {
        let table = default_table();
        assert_eq!(table.progress(None), 0.0);
        assert_eq!(table.progress(Some("warming_cache")), 0.0);
    }

    #[test]
    fn test_label_lookup() {
        let table = default_table();
        assert_eq!(table.label("loading_tokenizer"), "Loading tokenizer");
        // Unregistered ids stringify to themselves.
        assert_eq!(table.label("warming_cache"), "warming_cache");
    }

    /// Progress weights of the shipped table are non-decreasing and in [0, 1].
    #[test]
    fn test_default_table_monotonic() {
        let table = default_table();
        let mut previous = 0.0f32;
        for entry in table.entries() {
            assert!((0.0..=1.0).contains(&entry.progress));
            assert!(entry.progress >= previous);
            previous = entry.progress;
        }
    }
}
