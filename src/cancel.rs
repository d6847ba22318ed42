//! Cooperative cancellation shared between the presentation layer and a run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Single-set cancellation signal.
///
/// The presentation layer holds one clone and calls [`cancel`](Self::cancel);
/// the running stage holds another and polls [`is_cancelled`](Self::is_cancelled)
/// at its checkpoints. Once set it stays set until [`reset`](Self::reset) is
/// called before the next run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Returns false if it was already requested.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag for a new run. Only the presentation layer calls this,
    /// and only while no run is in flight.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_is_not_cancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn test_cancel_is_visible_through_clones() {
        let token = CancellationToken::new();
        let worker_view = token.clone();

        assert!(token.cancel());
        assert!(worker_view.is_cancelled());
    }

    #[test]
    fn test_second_cancel_reports_already_set() {
        let token = CancellationToken::new();
        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_reset_clears_flag() {
        let token = CancellationToken::new();
        token.cancel();
        token.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_from_other_thread() {
        let token = CancellationToken::new();
        let remote = token.clone();
        std::thread::spawn(move || {
            remote.cancel();
        })
        .join()
        .unwrap();
        assert!(token.is_cancelled());
    }
}
