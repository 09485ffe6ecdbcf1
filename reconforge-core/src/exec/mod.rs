//! Subprocess execution: runner seam, supervision, cancellation

pub mod runner;
pub mod supervisor;

use tokio::sync::watch;

pub use runner::{ProcessRunner, RunOutcome, TokioProcessRunner, MAX_OUTPUT_SIZE};
pub use supervisor::{ExecutionResult, ExecutionStatus, ProcessSupervisor};

/// Create a linked cancellation pair. The handle side requests cancellation,
/// any number of signal clones observe it.
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(rx))
}

/// Requests cooperative cancellation of an in-flight plan
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

/// Observes a cancellation request
#[derive(Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolve once cancellation is requested. Never resolves if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_observed() {
        let (handle, signal) = cancellation();
        assert!(!signal.is_cancelled());
        handle.cancel();
        assert!(signal.is_cancelled());

        let mut waiter = signal.clone();
        waiter.cancelled().await; // must not hang
    }

    #[tokio::test]
    async fn test_dropped_handle_never_cancels() {
        let (handle, signal) = cancellation();
        drop(handle);

        let mut waiter = signal.clone();
        let woke = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            waiter.cancelled(),
        )
        .await;
        assert!(woke.is_err(), "dropped handle must not read as cancelled");
        assert!(!signal.is_cancelled());
    }
}
