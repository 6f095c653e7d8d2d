//! # Configuration Management
//!
//! Loading and managing serving-manager configuration from multiple sources:
//! - TOML configuration files (serving.toml)
//! - Environment variables (with SERVING_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (SERVING_MANAGER_TICK_INTERVAL_MS, etc.)
//! 2. Configuration file (serving.toml)
//! 3. Default values (defined in the Default impl)
//!
//! The step table is deliberately configuration rather than code: the stages
//! and weights belong to whatever loading pipeline is plugged in, and a
//! different pipeline ships a different table without touching the manager.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::serving::steps::StepEntry;

/// Main configuration for the serving lifecycle manager.
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (manager, worker, steps) keeps
/// the control-loop knobs apart from the fixed worker parameters handed to
/// the supervisor on every start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingConfig {
    pub manager: ManagerConfig,
    pub worker: WorkerConfig,
    /// Ordered loading-step table; progress weights must be non-decreasing.
    pub steps: Vec<StepEntry>,
}

/// Control-loop tuning.
///
/// ## Fields:
/// - `tick_interval_ms`: how often the elapsed-time ticker re-broadcasts the
///   `Loading` status (default 1000ms)
/// - `bus_capacity`: ring-buffer capacity of the status event bus; slow
///   subscribers past this lag skip old events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    pub tick_interval_ms: u64,
    pub bus_capacity: usize,
}

/// Fixed parameters handed to the worker supervisor on every start.
///
/// ## Tuning guidelines:
/// - Larger batches: better throughput on GPU, higher per-request latency
/// - Longer batch timeout: fuller batches, but slower first response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub batch_size: usize,
    pub batch_timeout_ms: u64,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            manager: ManagerConfig {
                tick_interval_ms: 1000, // one elapsed-time refresh per second
                bus_capacity: 64,
            },
            worker: WorkerConfig {
                batch_size: 8,
                batch_timeout_ms: 100,
            },
            steps: vec![
                StepEntry::new("loading_model", "Loading model", 0.0),
                StepEntry::new("loading_featurizer", "Loading featurizer", 0.50),
                StepEntry::new("loading_tokenizer", "Loading tokenizer", 0.60),
                StepEntry::new("loading_generation_config", "Loading generation config", 0.70),
                StepEntry::new("compiling", "Compiling", 0.75),
            ],
        }
    }
}

impl ServingConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from serving.toml (if it exists)
    /// 3. Override with environment variables prefixed with SERVING_
    ///
    /// ## Environment Variable Examples:
    /// - `SERVING_MANAGER_TICK_INTERVAL_MS=500`: faster elapsed refresh
    /// - `SERVING_WORKER_BATCH_SIZE=16`: larger inference batches
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&ServingConfig::default())?)
            .add_source(config::File::with_name("serving").required(false))
            .add_source(config::Environment::with_prefix("SERVING").separator("_"));

        let config: ServingConfig = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Tick interval and bus capacity are non-zero
    /// - Worker batch size is non-zero
    /// - Step ids are non-empty, weights are in [0, 1] and non-decreasing
    ///   in table order
    pub fn validate(&self) -> Result<()> {
        if self.manager.tick_interval_ms == 0 {
            return Err(anyhow::anyhow!("Tick interval must be greater than 0"));
        }

        if self.manager.bus_capacity == 0 {
            return Err(anyhow::anyhow!("Bus capacity must be greater than 0"));
        }

        if self.worker.batch_size == 0 {
            return Err(anyhow::anyhow!("Worker batch size must be greater than 0"));
        }

        let mut previous = 0.0f32;
        for step in &self.steps {
            if step.id.trim().is_empty() {
                return Err(anyhow::anyhow!("Step id cannot be empty"));
            }
            if !(0.0..=1.0).contains(&step.progress) {
                return Err(anyhow::anyhow!(
                    "Step '{}' progress {} is outside [0, 1]",
                    step.id,
                    step.progress
                ));
            }
            if step.progress < previous {
                return Err(anyhow::anyhow!(
                    "Step '{}' progress {} decreases below {}",
                    step.id,
                    step.progress,
                    previous
                ));
            }
            previous = step.progress;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The default configuration must be valid and carry the standard
    /// loading pipeline table.
    #[test]
    fn test_default_config() {
        let config = ServingConfig::default();
        assert_eq!(config.manager.tick_interval_ms, 1000);
        assert_eq!(config.steps.len(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ServingConfig::default();
        config.manager.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ServingConfig::default();
        config.worker.batch_size = 0;
        assert!(config.validate().is_err());
    }

    /// A step table with decreasing weights must be rejected.
    #[test]
    fn test_step_table_validation() {
        let mut config = ServingConfig::default();
        config.steps = vec![
            StepEntry::new("a", "A", 0.5),
            StepEntry::new("b", "B", 0.2),
        ];
        assert!(config.validate().is_err());

        let mut config = ServingConfig::default();
        config.steps = vec![StepEntry::new("a", "A", 1.5)];
        assert!(config.validate().is_err());
    }

    /// The configuration round-trips through the on-disk TOML format.
    #[test]
    fn test_toml_round_trip() {
        let config = ServingConfig::default();
        let rendered = toml::to_string(&config).expect("serialize config");
        let parsed: ServingConfig = toml::from_str(&rendered).expect("parse config");
        assert_eq!(parsed.manager.tick_interval_ms, config.manager.tick_interval_ms);
        assert_eq!(parsed.steps.len(), config.steps.len());
        assert!(parsed.validate().is_ok());
    }
}
