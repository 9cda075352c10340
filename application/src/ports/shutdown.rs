//! Shutdown signal port

/// An external boolean condition polled by the scheduler each iteration.
/// Once signaled, the scheduler stops issuing new rounds and drains.
pub trait ShutdownSignal: Send + Sync {
    fn is_signaled(&self) -> bool;
}

/// A signal that never fires.
pub struct NeverSignaled;

impl ShutdownSignal for NeverSignaled {
    fn is_signaled(&self) -> bool {
        false
    }
}
