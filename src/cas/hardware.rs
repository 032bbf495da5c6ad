use std::sync::atomic::{AtomicUsize, Ordering};

/// A machine word updated through the processor's compare-exchange
/// instruction.
#[derive(Debug)]
pub struct CasWord {
    inner: AtomicUsize,
}

impl CasWord {
    pub const fn new(value: usize) -> Self {
        Self {
            inner: AtomicUsize::new(value),
        }
    }

    pub fn load(&self) -> usize {
        self.inner.load(Ordering::Acquire)
    }

    /// Atomically compares the word to `expected` and, if equal, stores
    /// `new`. Returns the value observed before the operation: `expected`
    /// when the store happened, the conflicting current value otherwise.
    pub fn cas(&self, expected: usize, new: usize) -> usize {
        match self
            .inner
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(previous) => previous,
            Err(current) => current,
        }
    }
}
