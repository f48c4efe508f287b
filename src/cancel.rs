//! Cooperative cancellation shared between a caller and a running operation.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Cloneable stop signal for a single scan or build.
///
/// Workers poll [`CancelToken::is_canceled`] at safe points (between hash
/// chunks, between files) and stop starting new work once it flips. Nothing is
/// ever interrupted forcibly.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that has not been signalled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let worker_view = token.clone();
        assert!(!worker_view.is_canceled());
        token.cancel();
        assert!(worker_view.is_canceled());
        token.cancel();
        assert!(token.is_canceled());
    }
}
