//! # Serving Manager
//!
//! The stateful control core of the crate. Owns the serving status, the
//! single live-worker slot, and the in-flight load, and serializes every
//! mutation through one message loop so the state needs no locks.
//!
//! ## Key Responsibilities:
//! - **Command handling**: `load` and `stop` from any state, always accepted
//! - **Signal correlation**: step/completion/failure/tick signals applied
//!   only when they carry the current task token; stale ones are discarded
//! - **Worker slot**: at most one live worker; replacement stops the old one
//!   first, best-effort
//! - **Publishing**: every committed status change goes out on the
//!   `serving_status` topic and into the lock-free status snapshot
//!
//! ## Concurrency:
//! The manager runs as a single consumer over two channels (commands from
//! handles, signals from load tasks and the ticker). Load tasks and workers
//! run as independent tokio tasks; cancellation of a superseded load is
//! non-preemptive, its result simply goes stale.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::{ServingConfig, WorkerConfig};
use crate::error::{ServingError, ServingResult};
use crate::serving::broadcast::StatusBroadcaster;
use crate::serving::status::{ServingStatus, StatusEvent};
use crate::serving::steps::StepTable;
use crate::serving::task::{spawn_load, LoadSignal, TaskToken};
use crate::serving::ticker::Ticker;
use crate::serving::worker::{ModelLoader, WorkerSupervisor};

/// Control commands accepted by the manager loop.
enum Command {
    Load { model: String },
    Stop,
}

/// Cloneable control handle to a spawned [`ServingManager`].
///
/// All methods are safe to call from any task. `load`/`stop` are
/// fire-and-forget acknowledgements: they enqueue the command and return;
/// the resulting transitions are observable through `status()` and
/// `subscribe()`. Dropping the last handle shuts the manager down.
#[derive(Clone)]
pub struct ServingHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ServingStatus>,
    events: StatusBroadcaster,
    steps: Arc<StepTable>,
}

impl ServingHandle {
    /// Request a (re)load of the given model.
    ///
    /// Always accepted for a non-empty identifier, regardless of current
    /// state: any existing worker is stopped and any in-flight load is
    /// superseded.
    pub fn load(&self, model: impl Into<String>) -> ServingResult<()> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(ServingError::InvalidModel("model id is empty".to_string()));
        }
        self.commands
            .send(Command::Load { model })
            .map_err(|_| ServingError::ControlChannelClosed)
    }

    /// Stop the worker (if any), cancel any in-flight load, and return to
    /// `Idle`. Idempotent.
    pub fn stop(&self) -> ServingResult<()> {
        self.commands
            .send(Command::Stop)
            .map_err(|_| ServingError::ControlChannelClosed)
    }

    /// Snapshot of the latest committed status. Lock-free; safe to call
    /// concurrently with command processing.
    pub fn status(&self) -> ServingStatus {
        self.status.borrow().clone()
    }

    /// Display label for a loading step id (pure step-table lookup).
    pub fn step_label(&self, step_id: &str) -> String {
        self.steps.label(step_id)
    }

    /// Weighted progress for a loading step id (pure step-table lookup).
    pub fn step_progress(&self, step_id: Option<&str>) -> f32 {
        self.steps.progress(step_id)
    }

    /// Subscribe to status events on the `serving_status` topic.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }
}

/// The serving lifecycle manager.
///
/// Generic over the loader and worker supervisor so the heavy engine stays
/// a collaborator: the manager only coordinates. Constructed and started
/// with [`ServingManager::spawn`], controlled through the returned
/// [`ServingHandle`].
pub struct ServingManager<L, S>
where
    L: ModelLoader,
    S: WorkerSupervisor<Descriptor = L::Descriptor>,
{
    loader: Arc<L>,
    supervisor: Arc<S>,
    steps: Arc<StepTable>,
    worker_config: WorkerConfig,
    tick_period: Duration,
    events: StatusBroadcaster,
    status_tx: watch::Sender<ServingStatus>,
    signals_tx: mpsc::UnboundedSender<LoadSignal<L::Descriptor>>,

    // Mutable state, touched only from the manager loop.
    status: ServingStatus,
    next_token: u64,
    active_token: Option<TaskToken>,
    active_model: Option<String>,
    worker: Option<S::Handle>,
    load_started_at: Option<Instant>,
    ticker: Option<Ticker>,
}

impl<L, S> ServingManager<L, S>
where
    L: ModelLoader,
    S: WorkerSupervisor<Descriptor = L::Descriptor>,
{
    /// Spawn the manager loop and return a control handle.
    ///
    /// The manager starts in `Idle` and runs until the last handle is
    /// dropped; teardown stops any outstanding worker and cancels the
    /// ticker.
    pub fn spawn(config: ServingConfig, loader: L, supervisor: S) -> ServingHandle {
        let steps = Arc::new(StepTable::new(config.steps.clone()));
        let events = StatusBroadcaster::new(config.manager.bus_capacity);
        let (status_tx, status_rx) = watch::channel(ServingStatus::Idle);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();

        let manager = ServingManager {
            loader: Arc::new(loader),
            supervisor: Arc::new(supervisor),
            steps: steps.clone(),
            worker_config: config.worker.clone(),
            tick_period: Duration::from_millis(config.manager.tick_interval_ms),
            events: events.clone(),
            status_tx,
            signals_tx,
            status: ServingStatus::Idle,
            next_token: 0,
            active_token: None,
            active_model: None,
            worker: None,
            load_started_at: None,
            ticker: None,
        };

        tokio::spawn(manager.run(commands_rx, signals_rx));

        ServingHandle {
            commands: commands_tx,
            status: status_rx,
            events,
            steps,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut signals: mpsc::UnboundedReceiver<LoadSignal<L::Descriptor>>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Load { model }) => self.handle_load(model),
                    Some(Command::Stop) => self.handle_stop(),
                    // All handles dropped: shut down.
                    None => break,
                },
                Some(signal) = signals.recv() => self.handle_signal(signal).await,
            }
        }

        debug!("Serving manager shutting down");
        self.ticker = None;
        self.stop_worker();
    }

    /// `load` command: supersede whatever is running and start fresh.
    fn handle_load(&mut self, model: String) {
        info!("Loading model '{}'", model);

        self.stop_worker();
        self.ticker = None;

        self.next_token += 1;
        let token = TaskToken(self.next_token);
        self.active_token = Some(token);
        self.active_model = Some(model.clone());
        self.load_started_at = Some(Instant::now());

        spawn_load(
            self.loader.clone(),
            model.clone(),
            token,
            self.signals_tx.clone(),
        );

        let tick_tx = self.signals_tx.clone();
        self.ticker = Some(Ticker::spawn(self.tick_period, move || {
            let _ = tick_tx.send(LoadSignal::Tick { token });
        }));

        self.commit(ServingStatus::Loading {
            model,
            step: None,
            elapsed_seconds: 0,
            progress: 0.0,
        });
    }

    /// `stop` command: tear everything down and return to `Idle`.
    fn handle_stop(&mut self) {
        if !self.status.is_idle() {
            info!("Stopping serving ({})", self.status.description());
        }

        self.stop_worker();
        self.clear_load_tracking();
        self.commit(ServingStatus::Idle);
    }

    async fn handle_signal(&mut self, signal: LoadSignal<L::Descriptor>) {
        // Token mismatch means the task was superseded or stopped; its
        // signals are dead on arrival.
        if self.active_token != Some(signal.token()) {
            debug!("Discarding stale signal from {}", signal.token());
            return;
        }

        match signal {
            LoadSignal::Step { step, .. } => self.apply_step(step),
            LoadSignal::Tick { .. } => self.refresh_loading(),
            LoadSignal::Completed { descriptor, .. } => self.finish_load(descriptor).await,
            LoadSignal::Failed {
                reason, crashed, ..
            } => self.fail_load(reason, crashed),
        }
    }

    /// Step update from the active load: re-derive progress and broadcast.
    fn apply_step(&mut self, step: String) {
        if let ServingStatus::Loading { model, .. } = &self.status {
            let model = model.clone();
            let progress = self.steps.progress(Some(&step));
            debug!(
                "Load step '{}' for '{}' ({}%)",
                step,
                model,
                (progress * 100.0).round() as u32
            );
            self.commit(ServingStatus::Loading {
                model,
                step: Some(step),
                elapsed_seconds: self.elapsed_seconds(),
                progress,
            });
        }
    }

    /// Ticker refresh: same variant, updated elapsed time and progress.
    fn refresh_loading(&mut self) {
        if let ServingStatus::Loading { model, step, .. } = &self.status {
            let model = model.clone();
            let step = step.clone();
            let progress = self.steps.progress(step.as_deref());
            self.commit(ServingStatus::Loading {
                model,
                step,
                elapsed_seconds: self.elapsed_seconds(),
                progress,
            });
        }
    }

    /// Completion of the active load: hand the descriptor to the worker
    /// supervisor.
    ///
    /// The start is awaited here, as the terminal phase of the load;
    /// commands arriving meanwhile queue up and are applied afterwards.
    /// Loading-state tracking is cleared first so any ticks already queued
    /// behind this signal go stale.
    async fn finish_load(&mut self, descriptor: L::Descriptor) {
        let elapsed = self.elapsed_seconds();
        let model = self.take_active_model();
        self.clear_load_tracking();

        let started = self
            .supervisor
            .start(descriptor, &self.worker_config)
            .await;
        match started {
            Ok(handle) => {
                self.worker = Some(handle);
                info!("Model '{}' ready after {}s", model, elapsed);
                self.commit(ServingStatus::Ready {
                    model,
                    elapsed_seconds: elapsed,
                });
            }
            Err(err) => {
                warn!("Worker start for '{}' failed: {:#}", model, err);
                self.commit(ServingStatus::Error {
                    model,
                    reason: format!("{:#}", err),
                });
            }
        }
    }

    /// Failure or crash of the active load.
    fn fail_load(&mut self, reason: String, crashed: bool) {
        let model = self.take_active_model();
        self.clear_load_tracking();

        if crashed {
            warn!("Load task for '{}' crashed: {}", model, reason);
        } else {
            warn!("Loading '{}' failed: {}", model, reason);
        }
        self.commit(ServingStatus::Error { model, reason });
    }

    /// Stop the current worker, if any, without blocking the control loop.
    ///
    /// The worker is being discarded regardless, so a stop failure is logged
    /// and swallowed.
    fn stop_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            debug!("Stopping previous serving worker");
            let supervisor = self.supervisor.clone();
            tokio::spawn(async move {
                if let Err(err) = supervisor.stop(handle).await {
                    warn!("Failed to stop serving worker: {:#}", err);
                }
            });
        }
    }

    /// Clear everything tied to an in-flight load. Dropping the ticker
    /// cancels it.
    fn clear_load_tracking(&mut self) {
        self.ticker = None;
        self.active_token = None;
        self.active_model = None;
        self.load_started_at = None;
    }

    fn take_active_model(&mut self) -> String {
        self.active_model
            .take()
            .or_else(|| self.status.model().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn elapsed_seconds(&self) -> u64 {
        self.load_started_at
            .map(|started| started.elapsed().as_secs())
            .unwrap_or(0)
    }

    /// Commit a status mutation: record it, refresh the snapshot, publish.
    fn commit(&mut self, status: ServingStatus) {
        self.status = status.clone();
        let _ = self.status_tx.send(status.clone());
        self.events.publish(StatusEvent::now(status));
    }
}
