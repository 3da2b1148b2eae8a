//! Periodic Task
//!
//! Recurring background work bound to the lifetime of its owner.

use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Shortest interval a periodic task will run at.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Spawns a task that calls `tick` on `target` every `interval`.
///
/// The task only holds a weak reference: it stops on its own once the owner is
/// dropped. The first tick happens one full interval after spawning.
///
/// # Returns
/// A JoinHandle for the spawned task, used to abort it on restart or shutdown.
///
/// # Example
/// ```ignore
/// let monitor = Arc::new(CacheMonitor::new());
/// let handle = spawn_periodic("monitor", Arc::downgrade(&monitor), interval, |m| {
///     m.clean_expired_entries();
/// });
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_periodic<T, F>(
    label: &'static str,
    target: Weak<T>,
    interval: Duration,
    tick: F,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    F: Fn(&T) + Send + 'static,
{
    let interval = interval.max(MIN_INTERVAL);

    tokio::spawn(async move {
        info!(
            task = label,
            interval_ms = interval.as_millis() as u64,
            "starting periodic task"
        );

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(interval).await;

            let Some(target) = target.upgrade() else {
                debug!(task = label, "owner dropped, stopping periodic task");
                break;
            };
            tick(&target);
        }
    })
}

// == Periodic Task ==
/// Owns at most one running periodic task.
///
/// Starting while running aborts the previous task first, so there is never
/// more than one timer per owner. Dropping the handle stops the task.
#[derive(Debug)]
pub struct PeriodicTask {
    label: &'static str,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            handle: Mutex::new(None),
        }
    }

    /// Starts (or restarts) the task. Must be called within a tokio runtime.
    ///
    /// Returns true if a previously running task was replaced.
    pub fn start<T, F>(&self, target: Weak<T>, interval: Duration, tick: F) -> bool
    where
        T: Send + Sync + 'static,
        F: Fn(&T) + Send + 'static,
    {
        let handle = spawn_periodic(self.label, target, interval, tick);
        match self.handle.lock().replace(handle) {
            Some(previous) => {
                previous.abort();
                debug!(task = self.label, "restarted periodic task");
                true
            }
            None => false,
        }
    }

    /// Stops the task. Returns false if it was not running.
    pub fn stop(&self) -> bool {
        match self.handle.lock().take() {
            Some(handle) => {
                handle.abort();
                info!(task = self.label, "stopped periodic task");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counter {
        ticks: AtomicUsize,
    }

    fn bump(counter: &Counter) {
        counter.ticks.fetch_add(1, Ordering::SeqCst);
    }

    #[tokio::test]
    async fn test_periodic_task_ticks() {
        let counter = Arc::new(Counter::default());
        let task = PeriodicTask::new("test");

        task.start(Arc::downgrade(&counter), Duration::from_millis(20), bump);

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(task.is_running());
        assert!(counter.ticks.load(Ordering::SeqCst) >= 2);
        assert!(task.stop());
    }

    #[tokio::test]
    async fn test_restart_replaces_previous_task() {
        let counter = Arc::new(Counter::default());
        let task = PeriodicTask::new("test");

        assert!(!task.start(Arc::downgrade(&counter), Duration::from_secs(3600), bump));
        assert!(task.start(Arc::downgrade(&counter), Duration::from_secs(3600), bump));

        assert!(task.is_running());
        assert!(task.stop());
        assert!(!task.stop(), "stopping twice is a no-op");
        assert!(!task.is_running());
    }

    #[tokio::test]
    async fn test_task_exits_when_owner_dropped() {
        let counter = Arc::new(Counter::default());
        let handle = spawn_periodic(
            "test",
            Arc::downgrade(&counter),
            Duration::from_millis(10),
            bump,
        );

        drop(counter);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(handle.is_finished(), "task should stop once its owner is gone");
    }

    #[tokio::test]
    async fn test_stop_aborts_task() {
        let counter = Arc::new(Counter::default());
        let task = PeriodicTask::new("test");
        task.start(Arc::downgrade(&counter), Duration::from_millis(10), bump);

        task.stop();
        let before = counter.ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(counter.ticks.load(Ordering::SeqCst), before);
    }
}
