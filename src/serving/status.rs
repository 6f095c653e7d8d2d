//! # Serving Status
//!
//! The status sum type owned by the serving manager, and the immutable
//! event snapshot pushed to subscribers on every transition.
//!
//! ## State Transitions:
//! Idle → Loading → Ready, with Error reachable from Loading on any
//! failure. `load` restarts the cycle from any state; `stop` returns to
//! Idle from any state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Topic on which status events are published.
pub const SERVING_STATUS_TOPIC: &str = "serving_status";

/// Current status of the serving lifecycle.
///
/// Modeled as a closed sum type with per-variant payload so that every
/// consumer handles all four shapes exhaustively at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServingStatus {
    /// No model loaded and nothing in flight
    Idle,

    /// A load is in flight on a background task
    Loading {
        /// Model identifier being loaded
        model: String,
        /// Most recent loading step, if any has been reported yet
        step: Option<String>,
        /// Seconds since the load started
        elapsed_seconds: u64,
        /// Weighted progress in [0, 1] derived from the step table
        progress: f32,
    },

    /// A worker is live and answering inference requests
    Ready {
        /// Model identifier served by the worker
        model: String,
        /// How long the load took, in seconds
        elapsed_seconds: u64,
    },

    /// The last load or worker start failed; recoverable via a new load
    Error {
        /// Model identifier whose load failed
        model: String,
        /// Failure reason
        reason: String,
    },
}

impl ServingStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, ServingStatus::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ServingStatus::Loading { .. })
    }

    /// Check if a worker is live and ready for inference.
    pub fn is_ready(&self) -> bool {
        matches!(self, ServingStatus::Ready { .. })
    }

    /// Model identifier carried by the current status, if any.
    pub fn model(&self) -> Option<&str> {
        match self {
            ServingStatus::Idle => None,
            ServingStatus::Loading { model, .. }
            | ServingStatus::Ready { model, .. }
            | ServingStatus::Error { model, .. } => Some(model),
        }
    }

    /// Get a human-readable status description.
    pub fn description(&self) -> String {
        match self {
            ServingStatus::Idle => "No model loaded".to_string(),
            ServingStatus::Loading {
                model, progress, ..
            } => {
                format!("Loading {} ({}%)", model, (progress * 100.0).round() as u32)
            }
            ServingStatus::Ready { model, .. } => format!("Serving {}", model),
            ServingStatus::Error { model, reason } => {
                format!("Failed to load {}: {}", model, reason)
            }
        }
    }
}

/// Immutable snapshot published on the `serving_status` topic.
///
/// Broadcast verbatim on every committed transition and on every ticker
/// refresh while loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Topic name, always [`SERVING_STATUS_TOPIC`]
    pub topic: String,

    /// Status snapshot at publish time
    pub status: ServingStatus,

    /// When the snapshot was committed
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    /// Snapshot the given status at the current time.
    pub fn now(status: ServingStatus) -> Self {
        Self {
            topic: SERVING_STATUS_TOPIC.to_string(),
            status,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_helpers() {
        assert!(ServingStatus::Idle.is_idle());
        assert_eq!(ServingStatus::Idle.model(), None);

        let loading = ServingStatus::Loading {
            model: "whisper-medium".to_string(),
            step: Some("compiling".to_string()),
            elapsed_seconds: 12,
            progress: 0.75,
        };
        assert!(loading.is_loading());
        assert!(!loading.is_ready());
        assert_eq!(loading.model(), Some("whisper-medium"));
        assert_eq!(loading.description(), "Loading whisper-medium (75%)");
    }

    /// Events serialize with the fixed topic and the full status payload.
    #[test]
    fn test_event_serialization() {
        let event = StatusEvent::now(ServingStatus::Ready {
            model: "whisper-medium".to_string(),
            elapsed_seconds: 42,
        });
        assert_eq!(event.topic, SERVING_STATUS_TOPIC);

        let json = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(json["topic"], "serving_status");
        assert_eq!(json["status"]["Ready"]["model"], "whisper-medium");
        assert_eq!(json["status"]["Ready"]["elapsed_seconds"], 42);
    }
}
