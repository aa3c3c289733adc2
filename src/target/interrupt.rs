use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation token for long running resumes.
///
/// Cloning yields a handle to the same flag, so another thread (a signal
/// handler, a watchdog, a test) can preempt a `Continue` that the session
/// thread is blocked in. Backends that honor interrupts poll
/// [`Interrupt::is_set`] from their step loop.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Interrupt {
        Interrupt::default()
    }

    /// Request that the current resume stop at the next step boundary.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = Interrupt::new();
        let b = a.clone();
        b.raise();
        assert!(a.is_set());
        assert!(a.take());
        assert!(!b.is_set());
        assert!(!a.take());
    }
}
