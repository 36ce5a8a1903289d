use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-way stop signal shared between the driver and the batch worker.
///
/// Clones share the same flag. Once cancelled it stays cancelled; there is
/// deliberately no reset, a new run gets a new token.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Returns `true` if this call set the flag.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
