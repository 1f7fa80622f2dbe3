use std::future::Future;

use tracing::trace;

/// Single-slot gate serializing heavy vision work.
///
/// At most one admitted operation runs at a time; waiters queue in FIFO
/// submission order (tokio's mutex is fair). The slot is released when the
/// operation resolves, on success and failure alike, so an erroring backend
/// call can never wedge the gate.
#[derive(Debug, Default)]
pub struct VisionThrottle {
    gate: tokio::sync::Mutex<()>,
}

impl VisionThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `operation` while holding the exclusive slot. The operation's own
    /// suspension points complete before the next waiter is admitted.
    pub async fn run_exclusive<F>(&self, operation: F) -> F::Output
    where
        F: Future,
    {
        let _slot = self.gate.lock().await;
        trace!("Vision throttle slot acquired");
        operation.await
    }
}
