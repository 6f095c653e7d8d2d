//! # Serving Lifecycle Module
//!
//! Coordinates loading a heavyweight local inference model in the background
//! and supervising the worker that serves it, without ever blocking the
//! control surface.
//!
//! ## Key Components:
//! - **Manager**: single-writer control core owning status and the worker slot
//! - **Step Table**: ordered progress weights for the loading pipeline
//! - **Ticker**: elapsed-time refresh while a load is in flight
//! - **Task Runner**: background load execution with token correlation
//! - **Status Broadcaster**: pub/sub fan-out of every status change
//!
//! ## Lifecycle:
//! ```text
//! Idle --load--> Loading --success--> Ready
//!                 Loading --failure/crash--> Error
//!                 Loading --stop--> Idle
//! Ready/Error --load--> Loading   (old worker stopped first)
//! Ready/Error --stop--> Idle
//! ```

pub mod broadcast;
pub mod manager;
pub mod status;
pub mod steps;
pub mod task;
pub(crate) mod ticker;
pub mod worker;

pub use broadcast::StatusBroadcaster;
pub use manager::{ServingHandle, ServingManager};
pub use status::{ServingStatus, StatusEvent, SERVING_STATUS_TOPIC};
pub use steps::{StepEntry, StepTable};
pub use task::{ProgressReporter, TaskToken};
pub use worker::{ModelLoader, WorkerSupervisor};
