//! Cancellation handles observed by the delivery loop.
//!
//! A tuner keeps a stream alive for as long as it holds its tune. The
//! engine never owns or changes that state, it only polls it between
//! reads, so cancellation latency is bounded by the data-socket read
//! timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Externally owned "still tuned" signal.
pub trait HoldSignal: Send + Sync {
    /// Whether the owning tuner still wants data.
    fn is_held(&self) -> bool;
}

/// A tuner lock counts as held while someone has it locked.
impl<T: ?Sized + Send> HoldSignal for parking_lot::Mutex<T> {
    fn is_held(&self) -> bool {
        self.is_locked()
    }
}

impl<S: HoldSignal + ?Sized> HoldSignal for Arc<S> {
    fn is_held(&self) -> bool {
        (**self).is_held()
    }
}

/// Explicit cancellation token.
///
/// Starts held; [`release`](Self::release) ends every delivery observing
/// a clone of it at its next poll.
#[derive(Debug, Clone)]
pub struct TuneToken {
    held: Arc<AtomicBool>,
}

impl TuneToken {
    pub fn new() -> Self {
        Self {
            held: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn release(&self) {
        if self.held.swap(false, Ordering::SeqCst) {
            tracing::debug!("tune token released");
        }
    }
}

impl Default for TuneToken {
    fn default() -> Self {
        Self::new()
    }
}

impl HoldSignal for TuneToken {
    fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn token_release_is_shared() {
        let token = TuneToken::new();
        let observer = token.clone();
        assert!(observer.is_held());
        token.release();
        assert!(!observer.is_held());
        token.release();
        assert!(!observer.is_held());
    }

    #[test]
    fn mutex_held_while_locked() {
        let lock = Arc::new(Mutex::new(()));
        let signal: Arc<dyn HoldSignal> = lock.clone();
        assert!(!signal.is_held());

        let guard = lock.lock();
        assert!(signal.is_held());
        drop(guard);
        assert!(!signal.is_held());
    }
}
