use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

struct ScheduledTask {
    fingerprint: u64,
    handle: JoinHandle<()>,
}

/// Owns one background refresh task per widget.
///
/// A task runs its job once immediately, then every `period` if one is set.
/// A zero period counts as unset.
/// Rescheduling with an unchanged fingerprint keeps the running task, so
/// unrelated edits to a widget do not restart its timer.
#[derive(Default)]
pub struct RefreshScheduler {
    tasks: Mutex<HashMap<String, ScheduledTask>>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<String, ScheduledTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ensures a task with `fingerprint` runs for `id`. Returns true when a
    /// new task was started, replacing any previous one.
    pub fn schedule<F, Fut>(&self, id: &str, fingerprint: u64, period: Option<Duration>, job: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks();
        if let Some(existing) = tasks.get(id) {
            if existing.fingerprint == fingerprint {
                return false;
            }
            debug!(%id, "Refresh inputs changed, restarting task");
            existing.handle.abort();
        }

        let handle = tokio::spawn(async move {
            job().await;
            let Some(period) = period.filter(|p| !p.is_zero()) else {
                return;
            };
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                job().await;
            }
        });

        tasks.insert(
            id.to_string(),
            ScheduledTask {
                fingerprint,
                handle,
            },
        );
        true
    }

    /// Stops the task for `id`. Returns false if none was scheduled.
    pub fn cancel(&self, id: &str) -> bool {
        match self.tasks().remove(id) {
            Some(task) => {
                task.handle.abort();
                debug!(%id, "Cancelled refresh task");
                true
            }
            None => false,
        }
    }

    /// Cancels every task whose id does not satisfy `keep`.
    pub fn retain(&self, keep: impl Fn(&str) -> bool) {
        self.tasks().retain(|id, task| {
            let kept = keep(id);
            if !kept {
                task.handle.abort();
                debug!(%id, "Cancelled refresh task");
            }
            kept
        });
    }

    pub fn is_scheduled(&self, id: &str) -> bool {
        self.tasks().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tasks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks().is_empty()
    }

    pub fn shutdown(&self) {
        for (_, task) in self.tasks().drain() {
            task.handle.abort();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
