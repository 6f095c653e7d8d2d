//! # Error Handling
//!
//! Custom error types for the serving lifecycle manager.
//!
//! ## Error Categories:
//! - **Load / worker-start / crash errors**: surfaced through the `Error`
//!   status variant so the manager stays alive and can accept a new `load`
//! - **API errors**: invalid input or a torn-down control channel, returned
//!   directly to the caller
//! - **Config errors**: invalid configuration detected before startup
//!
//! No error here is fatal to the manager: every failure path leaves it in a
//! recoverable `Error` or `Idle` state. Stale signals and best-effort worker
//! teardown failures are logged and swallowed rather than surfaced, since the
//! resource they refer to is being discarded regardless.

use std::fmt;

/// Custom error types for the serving manager.
///
/// ## Usage Example:
/// ```rust
/// use serving_manager::ServingError;
///
/// fn check(model: &str) -> Result<(), ServingError> {
///     if model.trim().is_empty() {
///         return Err(ServingError::InvalidModel("model id is empty".to_string()));
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub enum ServingError {
    /// The loading operation reported an error
    LoadFailure(String),

    /// A loaded descriptor could not be turned into a running worker
    WorkerStartFailure(String),

    /// The background loading task terminated abnormally (panic/abort)
    TaskCrash(String),

    /// A control command carried an invalid model identifier
    InvalidModel(String),

    /// The manager loop is gone and can no longer accept commands
    ControlChannelClosed,

    /// Configuration file or environment variable problems
    ConfigError(String),
}

impl fmt::Display for ServingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServingError::LoadFailure(msg) => write!(f, "model load failed: {}", msg),
            ServingError::WorkerStartFailure(msg) => write!(f, "worker start failed: {}", msg),
            ServingError::TaskCrash(msg) => write!(f, "load task crashed: {}", msg),
            ServingError::InvalidModel(msg) => write!(f, "invalid model: {}", msg),
            ServingError::ControlChannelClosed => write!(f, "serving manager is not running"),
            ServingError::ConfigError(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ServingError {}

/// Automatic conversion from anyhow::Error to ServingError.
///
/// Collaborator contracts (loader, worker supervisor) report failures as
/// `anyhow::Error`; by the time they reach the public API they have already
/// been classified, so the generic conversion maps to a load failure.
impl From<anyhow::Error> for ServingError {
    fn from(err: anyhow::Error) -> Self {
        ServingError::LoadFailure(err.to_string())
    }
}

/// Automatic conversion from configuration errors to ServingError.
///
/// ## When this happens:
/// - serving.toml has invalid syntax
/// - an override value fails to deserialize
/// - configuration values fail validation
impl From<config::ConfigError> for ServingError {
    fn from(err: config::ConfigError) -> Self {
        ServingError::ConfigError(err.to_string())
    }
}

/// Type alias for Results that use our custom error type.
pub type ServingResult<T> = Result<T, ServingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServingError::LoadFailure("weights missing".to_string());
        assert_eq!(err.to_string(), "model load failed: weights missing");

        let err = ServingError::ControlChannelClosed;
        assert_eq!(err.to_string(), "serving manager is not running");
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: ServingError = anyhow::anyhow!("checkpoint corrupt").into();
        assert!(matches!(err, ServingError::LoadFailure(msg) if msg == "checkpoint corrupt"));
    }
}
