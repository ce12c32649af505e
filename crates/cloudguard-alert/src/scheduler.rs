use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// The three periodic cycles driven by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SweepKind {
    Resolution,
    Anomaly,
    Retention,
}

impl SweepKind {
    pub const ALL: [SweepKind; 3] = [SweepKind::Resolution, SweepKind::Anomaly, SweepKind::Retention];
}

impl std::fmt::Display for SweepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweepKind::Resolution => write!(f, "resolution"),
            SweepKind::Anomaly => write!(f, "anomaly"),
            SweepKind::Retention => write!(f, "retention"),
        }
    }
}

struct SweepTask {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Runs each sweep on its own task with its own ticker and stop signal.
///
/// A stop request takes effect before the next firing; a sweep already in
/// progress is left to finish. Every firing of a kind holds that kind's
/// gate, which outlives restarts, so a loop started right after a stop
/// waits for the previous run to drain. Dropping the scheduler stops every
/// sweep.
#[derive(Default)]
pub struct Scheduler {
    tasks: Mutex<HashMap<SweepKind, SweepTask>>,
    gates: Mutex<HashMap<SweepKind, Arc<tokio::sync::Mutex<()>>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `kind`, firing `run` every `period` (first firing after one
    /// period). Returns `false` if it was already running or could not be
    /// started.
    pub fn start<F, Fut>(&self, kind: SweepKind, period: Duration, run: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        if tasks.get(&kind).is_some_and(|t| !t.handle.is_finished()) {
            return false;
        }
        if period.is_zero() {
            tracing::warn!(sweep = %kind, "Sweep interval must be non-zero, not starting");
            return false;
        }
        let Ok(runtime) = Handle::try_current() else {
            tracing::error!(sweep = %kind, "No async runtime available, sweep not started");
            return false;
        };

        let gate = self.gates.lock().entry(kind).or_default().clone();
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                }
                let _running = gate.lock().await;
                if *stop_rx.borrow() {
                    break;
                }
                run().await;
            }
            tracing::info!(sweep = %kind, "Sweep stopped");
        });

        tracing::info!(sweep = %kind, interval_secs = period.as_secs(), "Sweep started");
        tasks.insert(kind, SweepTask { stop_tx, handle });
        true
    }

    /// Signals `kind` to stop. Returns `false` if it was not running.
    pub fn stop(&self, kind: SweepKind) -> bool {
        match self.tasks.lock().remove(&kind) {
            Some(task) => {
                let _ = task.stop_tx.send(true);
                !task.handle.is_finished()
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        for kind in SweepKind::ALL {
            self.stop(kind);
        }
    }

    pub fn is_running(&self, kind: SweepKind) -> bool {
        self.tasks
            .lock()
            .get(&kind)
            .is_some_and(|t| !t.handle.is_finished())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.get_mut().drain() {
            let _ = task.stop_tx.send(true);
        }
    }
}
