use std::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard};

use crate::pool::{self, Node, NIL};
use crate::stack::{check_lists, StackError};

/// Both list heads, guarded jointly: a push or pop moves a node between the
/// lists as one critical section, so no thread ever observes a node in
/// flight.
#[derive(Debug)]
struct Heads {
    live: usize,
    free: usize,
}

/// The mutex-synchronized bounded stack.
///
/// One lock covers the whole detach-mutate-attach sequence of each
/// operation. Threads may block on the lock; in exchange the recycling step
/// is indivisible and the ABA hazard of the lock-free engine cannot arise.
///
/// ```
/// use recycling_stack_aba::BoundedStack;
///
/// let stack = BoundedStack::with_capacity(2);
/// stack.push(1).unwrap();
/// stack.push(2).unwrap();
/// assert!(stack.push(3).is_err());
/// assert_eq!(stack.pop(), Some(2));
/// ```
#[derive(Debug)]
pub struct BoundedStack {
    pool: Box<[Node]>,
    heads: Mutex<Heads>,
}

impl BoundedStack {
    /// Creates a stack with room for `capacity` values. All nodes are
    /// allocated here, linked into the free list; the live list starts
    /// empty. No further allocation happens for the stack's lifetime.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pool: pool::preallocate(capacity),
            heads: Mutex::new(Heads {
                live: NIL,
                free: pool::initial_free_head(capacity),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().live == NIL
    }

    pub fn is_full(&self) -> bool {
        self.lock().free == NIL
    }

    /// Pushes `value`, or reports [`StackError::Full`] when the free list is
    /// exhausted.
    pub fn push(&self, value: usize) -> Result<(), StackError> {
        let mut heads = self.lock();
        let node = heads.free;
        if node == NIL {
            return Err(StackError::Full);
        }
        heads.free = self.pool[node].next.load(Ordering::Relaxed);
        self.pool[node].value.store(value, Ordering::Relaxed);
        self.pool[node].next.store(heads.live, Ordering::Relaxed);
        heads.live = node;
        Ok(())
    }

    /// Pops the most recently pushed value, or `None` when the live list is
    /// exhausted.
    pub fn pop(&self) -> Option<usize> {
        let mut heads = self.lock();
        let node = heads.live;
        if node == NIL {
            return None;
        }
        heads.live = self.pool[node].next.load(Ordering::Relaxed);
        let value = self.pool[node].value.load(Ordering::Relaxed);
        self.pool[node].next.store(heads.free, Ordering::Relaxed);
        heads.free = node;
        Some(value)
    }

    /// Number of nodes on the live list.
    pub fn live_len(&self) -> usize {
        let heads = self.lock();
        self.list_len(heads.live)
    }

    /// Number of nodes on the free list.
    pub fn free_len(&self) -> usize {
        let heads = self.lock();
        self.list_len(heads.free)
    }

    fn list_len(&self, mut cursor: usize) -> usize {
        let mut len = 0;
        while cursor != NIL {
            len += 1;
            cursor = self.pool[cursor].next.load(Ordering::Relaxed);
        }
        len
    }

    /// Debug-only structural assertion over both lists. No-op in release
    /// builds.
    pub fn check(&self) {
        let heads = self.lock();
        check_lists(&self.pool, heads.live, heads.free);
    }

    fn lock(&self) -> MutexGuard<'_, Heads> {
        self.heads.lock().expect("stack mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::BoundedStack;

    /// Recycling happens inside the critical section, so a full stack
    /// regains exactly one slot per pop.
    #[test]
    fn pop_frees_exactly_one_slot() {
        let stack = BoundedStack::with_capacity(2);
        stack.push(1).unwrap();
        stack.push(2).unwrap();
        assert!(stack.is_full());

        assert_eq!(stack.pop(), Some(2));
        assert!(stack.push(3).is_ok());
        assert!(stack.push(4).is_err());
        stack.check();
    }
}
