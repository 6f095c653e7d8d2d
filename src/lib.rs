//! # serving-manager
//!
//! Lifecycle manager for a locally served inference model. Loads a
//! heavyweight model on a background task, reports weighted step progress,
//! survives load failures and crashes, and guarantees that at most one
//! serving worker is ever live.
//!
//! ## Application Architecture:
//! - **config**: configuration (TOML file + environment variables), including
//!   the replaceable loading-step table
//! - **error**: typed error taxonomy for the control surface
//! - **serving**: the control core (manager, step table, ticker, task runner,
//!   status broadcaster) and the collaborator traits an engine implements
//!
//! ## Usage:
//! Implement [`ModelLoader`] and [`WorkerSupervisor`] for your engine, then
//! spawn the manager and drive it through the returned handle:
//!
//! ```rust,no_run
//! use serving_manager::{ServingConfig, ServingManager};
//! # use anyhow::Result;
//! # use async_trait::async_trait;
//! # use serving_manager::{ModelLoader, ProgressReporter, WorkerConfig, WorkerSupervisor};
//! # struct MyLoader;
//! # #[async_trait]
//! # impl ModelLoader for MyLoader {
//! #     type Descriptor = ();
//! #     async fn load(&self, _m: &str, _p: ProgressReporter) -> Result<()> { Ok(()) }
//! # }
//! # struct MySupervisor;
//! # #[async_trait]
//! # impl WorkerSupervisor for MySupervisor {
//! #     type Descriptor = ();
//! #     type Handle = ();
//! #     async fn start(&self, _d: (), _c: &WorkerConfig) -> Result<()> { Ok(()) }
//! #     async fn stop(&self, _h: ()) -> Result<()> { Ok(()) }
//! # }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let config = ServingConfig::load()?;
//! config.validate()?;
//!
//! let handle = ServingManager::spawn(config, MyLoader, MySupervisor);
//! let mut events = handle.subscribe();
//!
//! handle.load("whisper-medium")?;
//! while let Ok(event) = events.recv().await {
//!     println!("{}", event.status.description());
//!     if event.status.is_ready() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod serving;

pub use config::{ManagerConfig, ServingConfig, WorkerConfig};
pub use error::{ServingError, ServingResult};
pub use serving::{
    ModelLoader, ProgressReporter, ServingHandle, ServingManager, ServingStatus, StatusBroadcaster,
    StatusEvent, StepEntry, StepTable, TaskToken, WorkerSupervisor, SERVING_STATUS_TOPIC,
};
