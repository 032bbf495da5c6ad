use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A machine word whose compare-and-swap is emulated in software: a mutex,
/// held only for the compare-and-maybe-store, stands in for the hardware
/// instruction. Same signature and atomicity as the hardware backend.
#[derive(Debug)]
pub struct CasWord {
    inner: AtomicUsize,
    lock: Mutex<()>,
}

impl CasWord {
    pub const fn new(value: usize) -> Self {
        Self {
            inner: AtomicUsize::new(value),
            lock: Mutex::new(()),
        }
    }

    pub fn load(&self) -> usize {
        self.inner.load(Ordering::Acquire)
    }

    /// Compares the word to `expected` and, if equal, stores `new`, as one
    /// indivisible step. Returns the value observed before the operation:
    /// `expected` when the store happened, the conflicting current value
    /// otherwise.
    pub fn cas(&self, expected: usize, new: usize) -> usize {
        let _window = self.lock.lock().expect("CAS emulation mutex poisoned");
        let observed = self.inner.load(Ordering::Acquire);
        if observed == expected {
            self.inner.store(new, Ordering::Release);
        }
        observed
    }
}
