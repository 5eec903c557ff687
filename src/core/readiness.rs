use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::backend::{BackendError, StatusProbe, StatusReport};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub const CONNECTING_MESSAGE: &str = "Connecting to the backend...";
pub const INITIALIZING_MESSAGE: &str = "The model is initializing...";
pub const INITIALIZATION_FAILED_MESSAGE: &str = "Model initialization failed.";
pub const BACKEND_UNREACHABLE_MESSAGE: &str = "Cannot connect to the backend.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreachableCause {
    BackendUnreachable,
    InitializationFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Ready,
    Initializing,
    Unreachable(UnreachableCause),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readiness {
    pub state: ReadinessState,
    /// Banner text for the user. Empty exactly when ready.
    pub status: &'static str,
}

impl Readiness {
    #[must_use]
    pub const fn ready() -> Self {
        Self {
            state: ReadinessState::Ready,
            status: "",
        }
    }

    /// Published before the first poll has completed.
    #[must_use]
    pub const fn connecting() -> Self {
        Self {
            state: ReadinessState::Initializing,
            status: CONNECTING_MESSAGE,
        }
    }

    #[must_use]
    pub const fn initializing() -> Self {
        Self {
            state: ReadinessState::Initializing,
            status: INITIALIZING_MESSAGE,
        }
    }

    #[must_use]
    pub const fn unreachable(cause: UnreachableCause) -> Self {
        let status = match cause {
            UnreachableCause::BackendUnreachable => BACKEND_UNREACHABLE_MESSAGE,
            UnreachableCause::InitializationFailed => INITIALIZATION_FAILED_MESSAGE,
        };
        Self {
            state: ReadinessState::Unreachable(cause),
            status,
        }
    }

    #[must_use]
    pub fn from_probe(result: &Result<StatusReport, BackendError>) -> Self {
        match result {
            Ok(report) if report.ready => Self::ready(),
            Ok(_) => Self::initializing(),
            Err(err) if err.status().is_some() => {
                Self::unreachable(UnreachableCause::InitializationFailed)
            }
            Err(_) => Self::unreachable(UnreachableCause::BackendUnreachable),
        }
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, ReadinessState::Ready)
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::connecting()
    }
}

/// Periodically probes the backend and publishes the derived [`Readiness`].
pub struct ReadinessMonitor {
    probe: Arc<dyn StatusProbe>,
    interval: Duration,
}

impl ReadinessMonitor {
    #[must_use]
    pub fn new(probe: Arc<dyn StatusProbe>) -> Self {
        Self {
            probe,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn poll(&self) -> Readiness {
        let result = self.probe.status().await;
        if let Err(err) = &result {
            tracing::debug!(error = %err, "Status poll failed");
        }
        Readiness::from_probe(&result)
    }

    /// Spawns the polling task. The first poll runs immediately.
    #[must_use]
    pub fn start(self) -> MonitorHandle {
        let (tx, rx) = watch::channel(Readiness::connecting());
        let active = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(Notify::new());

        let task = tokio::spawn(self.run(tx, Arc::clone(&active), Arc::clone(&shutdown)));

        MonitorHandle {
            active,
            shutdown,
            readiness: rx,
            task: Some(task),
        }
    }

    async fn run(
        self,
        tx: watch::Sender<Readiness>,
        active: Arc<AtomicBool>,
        shutdown: Arc<Notify>,
    ) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = shutdown.notified() => break,
                _ = ticker.tick() => {}
            }

            let readiness = self.poll().await;

            // The poll is never aborted, so deactivation may have happened
            // while it was in flight.
            if !active.load(Ordering::Acquire) {
                tracing::debug!("Discarding status poll that completed after deactivation");
                break;
            }

            let previous = tx.send_replace(readiness.clone());
            if previous != readiness {
                tracing::info!(
                    state = ?readiness.state,
                    status = readiness.status,
                    "Backend readiness changed"
                );
            }
        }

        tracing::debug!("Readiness monitor stopped");
    }
}

/// Owned handle to a running monitor. Dropping it deactivates polling.
pub struct MonitorHandle {
    active: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    readiness: watch::Receiver<Readiness>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Readiness> {
        self.readiness.clone()
    }

    #[must_use]
    pub fn current(&self) -> Readiness {
        self.readiness.borrow().clone()
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
        self.shutdown.notify_one();
    }

    /// Deactivates and waits for the polling task, including any poll still
    /// in flight, to wind down.
    pub async fn stop(mut self) {
        self.deactivate();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!("Readiness monitor task failed: {e}");
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.deactivate();
    }
}
