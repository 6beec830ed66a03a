//! Worker pool abstraction for capture post-processing.
//!
//! The application owns the pool and hands it to the session; the core
//! keeps no process-wide thread pool of its own.

/// A unit of work submitted to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs off the control context.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

/// Runs every job immediately on the submitting thread.
///
/// Results still travel through the session's event queue, so ordering is
/// the same as with a real pool. Used by tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        job();
    }
}

/// Runs jobs on the runtime's blocking pool.
impl Executor for tokio::runtime::Handle {
    fn execute(&self, job: Job) {
        // Completion is reported through the session's queue, not the handle.
        drop(self.spawn_blocking(job));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_inline_executor_runs_immediately() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        InlineExecutor.execute(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_runtime_handle_executes_job() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::runtime::Handle::current().execute(Box::new(move || {
            let _ = tx.send(42);
        }));
        assert_eq!(rx.await.unwrap(), 42);
    }
}
