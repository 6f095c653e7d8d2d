//! # Background Load Task
//!
//! Runs the loading operation on an independent tokio task so the control
//! loop never blocks, and correlates everything the task sends back against
//! a generation token.
//!
//! ## Correlation model:
//! Every spawned load gets a monotonically increasing [`TaskToken`]. Step
//! updates, completion, and failure all carry that token; the manager applies
//! a signal only when the token matches its current one. A load that was
//! superseded or stopped keeps running to its natural end, but whatever it
//! reports is silently discarded. Nothing is ever forcibly interrupted.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::serving::worker::ModelLoader;

/// Generation token identifying one spawned load task.
///
/// Minted fresh for every `load` command; compared against the manager's
/// current token to discard results from superseded tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskToken(pub(crate) u64);

impl fmt::Display for TaskToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load-{}", self.0)
    }
}

/// Signals posted back to the manager by load tasks and the ticker.
pub(crate) enum LoadSignal<D> {
    /// The loading operation entered a new pipeline step
    Step { token: TaskToken, step: String },

    /// The loading operation produced a worker descriptor
    Completed { token: TaskToken, descriptor: D },

    /// The loading operation failed, or its task terminated abnormally
    Failed {
        token: TaskToken,
        reason: String,
        crashed: bool,
    },

    /// Periodic elapsed-time refresh while loading
    Tick { token: TaskToken },
}

impl<D> LoadSignal<D> {
    pub fn token(&self) -> TaskToken {
        match self {
            LoadSignal::Step { token, .. }
            | LoadSignal::Completed { token, .. }
            | LoadSignal::Failed { token, .. }
            | LoadSignal::Tick { token } => *token,
        }
    }
}

/// Step-progress callback handed to the loading operation.
///
/// Cloneable and cheap; each `step` call posts a step-update signal carrying
/// the owning task's token back to the manager. Reporting never blocks the
/// loader and never fails: if the manager is gone the update is dropped.
#[derive(Clone)]
pub struct ProgressReporter {
    token: TaskToken,
    sink: Arc<dyn Fn(TaskToken, String) + Send + Sync>,
}

impl ProgressReporter {
    pub(crate) fn new(
        token: TaskToken,
        sink: Arc<dyn Fn(TaskToken, String) + Send + Sync>,
    ) -> Self {
        Self { token, sink }
    }

    /// Report that the loading pipeline entered the given step.
    pub fn step(&self, step_id: impl Into<String>) {
        (self.sink)(self.token, step_id.into());
    }
}

/// Spawn the loading operation and a watcher that translates its outcome
/// into a terminal signal.
///
/// The watcher distinguishes three outcomes:
/// - the loader returned a descriptor → `Completed`
/// - the loader returned an error → `Failed` (load failure)
/// - the task itself died (panic/abort) → `Failed` with `crashed` set
pub(crate) fn spawn_load<L: ModelLoader>(
    loader: Arc<L>,
    model: String,
    token: TaskToken,
    signals: mpsc::UnboundedSender<LoadSignal<L::Descriptor>>,
) {
    let reporter = ProgressReporter::new(token, {
        let signals = signals.clone();
        Arc::new(move |token, step| {
            let _ = signals.send(LoadSignal::Step { token, step });
        })
    });

    let task = tokio::spawn(async move { loader.load(&model, reporter).await });

    tokio::spawn(async move {
        let signal = match task.await {
            Ok(Ok(descriptor)) => LoadSignal::Completed { token, descriptor },
            Ok(Err(err)) => LoadSignal::Failed {
                token,
                reason: format!("{:#}", err),
                crashed: false,
            },
            Err(err) => {
                let reason = if err.is_panic() {
                    "loading task panicked".to_string()
                } else {
                    "loading task was aborted".to_string()
                };
                debug!("Load task {} terminated abnormally: {}", token, err);
                LoadSignal::Failed {
                    token,
                    reason,
                    crashed: true,
                }
            }
        };
        let _ = signals.send(signal);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    struct ScriptedLoader {
        fail: bool,
        panic: bool,
    }

    #[async_trait]
    impl ModelLoader for ScriptedLoader {
        type Descriptor = String;

        async fn load(&self, model: &str, progress: ProgressReporter) -> Result<String> {
            progress.step("loading_model");
            progress.step("compiling");
            if self.panic {
                panic!("mmap failed");
            }
            if self.fail {
                return Err(anyhow!("weights missing"));
            }
            Ok(model.to_string())
        }
    }

    #[tokio::test]
    async fn test_steps_arrive_before_completion() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = TaskToken(7);
        spawn_load(
            Arc::new(ScriptedLoader {
                fail: false,
                panic: false,
            }),
            "m1".to_string(),
            token,
            tx,
        );

        let first = rx.recv().await.expect("step signal");
        assert!(matches!(first, LoadSignal::Step { step, .. } if step == "loading_model"));
        let second = rx.recv().await.expect("step signal");
        assert!(matches!(second, LoadSignal::Step { step, .. } if step == "compiling"));
        let last = rx.recv().await.expect("terminal signal");
        match last {
            LoadSignal::Completed {
                token: t,
                descriptor,
            } => {
                assert_eq!(t, token);
                assert_eq!(descriptor, "m1");
            }
            _ => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn test_loader_error_becomes_failure_signal() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_load(
            Arc::new(ScriptedLoader {
                fail: true,
                panic: false,
            }),
            "m1".to_string(),
            TaskToken(1),
            tx,
        );

        // Skip the two step updates.
        rx.recv().await.expect("step");
        rx.recv().await.expect("step");
        let last = rx.recv().await.expect("terminal signal");
        match last {
            LoadSignal::Failed {
                reason, crashed, ..
            } => {
                assert!(reason.contains("weights missing"));
                assert!(!crashed);
            }
            _ => panic!("expected failure"),
        }
    }

    /// A panicking loader is reported as a crash, not swallowed.
    #[tokio::test]
    async fn test_panic_becomes_crash_signal() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_load(
            Arc::new(ScriptedLoader {
                fail: false,
                panic: true,
            }),
            "m1".to_string(),
            TaskToken(2),
            tx,
        );

        rx.recv().await.expect("step");
        rx.recv().await.expect("step");
        let last = rx.recv().await.expect("terminal signal");
        assert!(matches!(last, LoadSignal::Failed { crashed: true, .. }));
    }
}
