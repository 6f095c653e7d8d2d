//! # Collaborator Contracts
//!
//! The two seams through which an actual inference engine plugs into the
//! lifecycle manager: a loader that turns a model identifier into a worker
//! descriptor, and a supervisor that turns that descriptor into a running
//! serving worker.
//!
//! The manager treats both as opaque asynchronous units of work. It never
//! inspects a descriptor or a handle; it only moves them between the loader,
//! the supervisor, and its own single worker slot.

use anyhow::Result;
use async_trait::async_trait;

use crate::config::WorkerConfig;
use crate::serving::task::ProgressReporter;

/// Loading operation: turns a model identifier into a worker descriptor.
///
/// Implementations should call `progress.step(..)` as the pipeline advances;
/// step ids are matched against the configured step table for weighted
/// progress. The loader owns its own timeout policy; the manager imposes
/// none.
///
/// # Example
/// ```rust
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use serving_manager::{ModelLoader, ProgressReporter};
///
/// struct CheckpointLoader;
///
/// #[async_trait]
/// impl ModelLoader for CheckpointLoader {
///     type Descriptor = Vec<u8>;
///
///     async fn load(&self, model: &str, progress: ProgressReporter) -> Result<Vec<u8>> {
///         progress.step("loading_model");
///         // read weights, build the servable...
///         progress.step("compiling");
///         Ok(model.as_bytes().to_vec())
///     }
/// }
/// ```
#[async_trait]
pub trait ModelLoader: Send + Sync + 'static {
    /// Opaque payload produced by a successful load and consumed by the
    /// worker supervisor.
    type Descriptor: Send + 'static;

    /// Load the given model, reporting pipeline steps along the way.
    async fn load(&self, model: &str, progress: ProgressReporter) -> Result<Self::Descriptor>;
}

/// Serving-worker lifecycle: start a worker from a loaded descriptor, stop
/// it when it is being replaced or shut down.
///
/// At most one worker is ever live under the manager's authority; `stop` is
/// always called on the previous handle before a replacement is started.
/// Stop failures are logged and swallowed by the caller, so implementations
/// need not retry.
#[async_trait]
pub trait WorkerSupervisor: Send + Sync + 'static {
    /// Descriptor type accepted from the loader.
    type Descriptor: Send + 'static;

    /// Reference to a live worker.
    type Handle: Send + 'static;

    /// Start a serving worker with the fixed batching parameters.
    async fn start(
        &self,
        descriptor: Self::Descriptor,
        config: &WorkerConfig,
    ) -> Result<Self::Handle>;

    /// Stop a worker that is being discarded. Best-effort.
    async fn stop(&self, handle: Self::Handle) -> Result<()>;
}
