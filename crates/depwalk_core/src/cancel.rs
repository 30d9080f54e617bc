use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared flag used to abort an in-flight analysis run.
///
/// Clones observe the same flag. A cancelled token stays cancelled; start a
/// new run with a fresh token.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
