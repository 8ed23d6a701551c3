// ─── Worker Pool ───
// Bounded pool for blocking units of work. Each unit holds a semaphore
// permit while it runs on tokio's blocking threads. Joining a unit goes
// through an error boundary: errors and panics are logged, never propagated.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info_span, Instrument};

use crate::core::error::{LauncherError, LauncherResult};

pub const DEFAULT_POOL_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// How a submitted unit ended.
#[derive(Debug)]
pub enum TaskOutcome<T> {
    Completed(T),
    Failed(LauncherError),
    Panicked(String),
}

impl<T> TaskOutcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            TaskOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed(_))
    }
}

/// A unit submitted to the pool.
pub struct TaskHandle<T> {
    name: &'static str,
    handle: JoinHandle<TaskOutcome<T>>,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run `work` on the pool once a permit is free.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<T, F>(&self, name: &'static str, work: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> LauncherResult<T> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let span = info_span!("unit", name);

        let handle = tokio::spawn(
            async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return TaskOutcome::Failed(LauncherError::Task {
                            name: name.to_string(),
                            message: e.to_string(),
                        })
                    }
                };
                debug!("Started");

                match tokio::task::spawn_blocking(work).await {
                    Ok(Ok(value)) => TaskOutcome::Completed(value),
                    Ok(Err(e)) => TaskOutcome::Failed(e),
                    Err(e) if e.is_panic() => TaskOutcome::Panicked(panic_message(e.into_panic())),
                    Err(e) => TaskOutcome::Failed(LauncherError::Task {
                        name: name.to_string(),
                        message: e.to_string(),
                    }),
                }
            }
            .instrument(span),
        );

        TaskHandle { name, handle }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

impl<T> TaskHandle<T> {
    /// Wait for the unit and log anything other than a clean completion.
    pub async fn join(self) -> TaskOutcome<T> {
        let outcome = match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => TaskOutcome::Panicked(panic_message(e.into_panic())),
            Err(e) => TaskOutcome::Failed(LauncherError::Task {
                name: self.name.to_string(),
                message: e.to_string(),
            }),
        };

        match &outcome {
            TaskOutcome::Completed(_) => debug!("Unit `{}` completed", self.name),
            TaskOutcome::Failed(e) => error!("Unit `{}` failed: {}", self.name, e),
            TaskOutcome::Panicked(message) => error!("Unit `{}` panicked: {}", self.name, message),
        }
        outcome
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".into()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn completed_unit_returns_value() {
        let pool = WorkerPool::new(2);

        let outcome = pool.submit("answer", || Ok(42)).join().await;

        assert_eq!(outcome.ok(), Some(42));
    }

    #[tokio::test]
    async fn failures_and_panics_are_contained() {
        let pool = WorkerPool::new(2);

        let failed = pool
            .submit("fails", || -> LauncherResult<()> {
                Err(LauncherError::Other("boom".into()))
            })
            .join()
            .await;
        let panicked = pool
            .submit("panics", || -> LauncherResult<()> { panic!("kaboom") })
            .join()
            .await;

        assert!(matches!(failed, TaskOutcome::Failed(LauncherError::Other(_))));
        match panicked {
            TaskOutcome::Panicked(message) => assert_eq!(message, "kaboom"),
            other => panic!("expected a panic outcome, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_is_bounded_by_capacity() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.submit("sleepy", move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(30));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().await.is_completed());
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        assert_eq!(WorkerPool::new(0).capacity(), 1);
    }
}
