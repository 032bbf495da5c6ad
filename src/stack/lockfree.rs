use std::sync::atomic::Ordering;
use std::thread;

use crossbeam_utils::Backoff;

use crate::cas::CasWord;
use crate::pool::{self, Node, NIL};
use crate::stack::{check_lists, RaceGate, StackError};

/// The lock-free bounded stack.
///
/// Every operation is two phases. The *acquire* phase detaches the head node
/// of the source list with a CAS retry loop; winning that CAS transfers
/// exclusive custody of the node to the calling thread. The *publish* phase
/// writes or reads the payload and reattaches the node at the head of the
/// destination list, again by CAS, relinquishing custody. A thread only ever
/// retries because another thread moved the relevant head, so some thread is
/// always making progress.
///
/// The acquire CAS validates the head by *value*: it cannot tell a node that
/// never moved from one that was popped, recycled through the free list, and
/// pushed back. That gap is left open deliberately; no generation tags, no
/// reclamation fences. [`BoundedStack::pop_expose_acquire`] and
/// [`BoundedStack::pop_expose_publish`] widen it on demand so the hazard can
/// be reproduced on schedule.
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
    live: CasWord,
    free: CasWord,
}

impl BoundedStack {
    /// Creates a stack with room for `capacity` values. All nodes are
    /// allocated here, linked into the free list; the live list starts
    /// empty. No further allocation happens for the stack's lifetime.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pool: pool::preallocate(capacity),
            live: CasWord::new(NIL),
            free: CasWord::new(pool::initial_free_head(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.load() == NIL
    }

    pub fn is_full(&self) -> bool {
        self.free.load() == NIL
    }

    /// Pushes `value`, or reports [`StackError::Full`] when the free list is
    /// exhausted. Never blocks; may spin under contention.
    pub fn push(&self, value: usize) -> Result<(), StackError> {
        let node = match self.acquire(&self.free) {
            Some(node) => node,
            None => return Err(StackError::Full),
        };
        self.pool[node].value.store(value, Ordering::Relaxed);
        self.publish(&self.live, node);
        Ok(())
    }

    /// Pops the most recently pushed value, or `None` when the live list is
    /// exhausted. Never blocks; may spin under contention.
    pub fn pop(&self) -> Option<usize> {
        let node = self.acquire(&self.live)?;
        let value = self.pool[node].value.load(Ordering::Relaxed);
        self.publish(&self.free, node);
        Some(value)
    }

    /// Acquire phase: detach the head node of `list`, taking exclusive
    /// custody of it. A failed CAS means another thread moved the head; the
    /// retry restarts from a fresh snapshot.
    fn acquire(&self, list: &CasWord) -> Option<usize> {
        let backoff = Backoff::new();
        loop {
            let head = list.load();
            if head == NIL {
                return None;
            }
            let next = self.pool[head].next.load(Ordering::Relaxed);
            if list.cas(head, next) == head {
                return Some(head);
            }
            if backoff.is_completed() {
                thread::yield_now();
            } else {
                backoff.spin();
            }
        }
    }

    /// Publish phase: attach `node` as the new head of `list`, relinquishing
    /// custody of it.
    fn publish(&self, list: &CasWord, node: usize) {
        let backoff = Backoff::new();
        loop {
            let head = list.load();
            self.pool[node].next.store(head, Ordering::Relaxed);
            if list.cas(head, node) == head {
                return;
            }
            if backoff.is_completed() {
                thread::yield_now();
            } else {
                backoff.spin();
            }
        }
    }

    /// A pop that pauses between the head snapshot and the CAS on that
    /// snapshot. While the thread is paused the snapshot can go stale: if
    /// other threads pop the snapshotted node and recycle it back to the
    /// head, the CAS still succeeds even though the node changed identity,
    /// and its remembered `next` link drags a free node into the live list.
    ///
    /// When the stack is observed empty the gate is never engaged and `None`
    /// is returned immediately. If the CAS fails after the pause the window
    /// simply closed without interference; the call finishes as a plain pop.
    pub fn pop_expose_acquire(&self, gate: &RaceGate) -> Option<usize> {
        let head = self.live.load();
        if head == NIL {
            return None;
        }
        let next = self.pool[head].next.load(Ordering::Relaxed);
        gate.pause();
        let node = if self.live.cas(head, next) == head {
            head
        } else {
            self.acquire(&self.live)?
        };
        let value = self.pool[node].value.load(Ordering::Relaxed);
        self.publish(&self.free, node);
        Some(value)
    }

    /// A pop that pauses between winning the acquire CAS and publishing the
    /// detached node to the free list. The paused thread holds the node in
    /// flight, invisible to both lists, while the coordinator lets other
    /// threads rearrange the stack around it.
    ///
    /// When the stack is observed empty the gate is never engaged and `None`
    /// is returned immediately.
    pub fn pop_expose_publish(&self, gate: &RaceGate) -> Option<usize> {
        let node = self.acquire(&self.live)?;
        let value = self.pool[node].value.load(Ordering::Relaxed);
        gate.pause();
        self.publish(&self.free, node);
        Some(value)
    }

    /// Structural oracle for the engineered interleaving: true when the live
    /// head is also the node directly behind the free head, i.e. one node is
    /// currently reachable from both lists. Meaningful only at a quiescent
    /// point; a correctly synchronized history never produces this shape.
    pub fn aba_detected(&self) -> bool {
        let free = self.free.load();
        if free == NIL {
            return false;
        }
        let live = self.live.load();
        live != NIL && live == self.pool[free].next.load(Ordering::Relaxed)
    }

    /// Number of nodes on the live list. Walks the list; only meaningful at
    /// a quiescent point.
    pub fn live_len(&self) -> usize {
        self.list_len(self.live.load())
    }

    /// Number of nodes on the free list. Walks the list; only meaningful at
    /// a quiescent point.
    pub fn free_len(&self) -> usize {
        self.list_len(self.free.load())
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
    /// builds; only meaningful at a quiescent point.
    pub fn check(&self) {
        check_lists(&self.pool, self.live.load(), self.free.load());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::BoundedStack;
    use crate::stack::RaceGate;

    /// With the coordinator releasing each gate as soon as it is reached,
    /// the split pops are ordinary pops.
    #[test]
    fn split_pops_compose_into_a_plain_pop() {
        let stack = Arc::new(BoundedStack::with_capacity(4));
        stack.push(1).unwrap();
        stack.push(2).unwrap();

        let (gate, control) = RaceGate::pair();
        let popper = {
            let stack = Arc::clone(&stack);
            thread::spawn(move || stack.pop_expose_acquire(&gate))
        };
        control.wait_reached();
        control.release();
        assert_eq!(popper.join().unwrap(), Some(2));

        let (gate, control) = RaceGate::pair();
        let popper = {
            let stack = Arc::clone(&stack);
            thread::spawn(move || stack.pop_expose_publish(&gate))
        };
        control.wait_reached();
        control.release();
        assert_eq!(popper.join().unwrap(), Some(1));

        assert!(stack.is_empty());
        stack.check();
    }

    /// The three-thread interleaving that manufactures the hazard.
    ///
    /// Thread A snapshots the live head and stalls before its CAS. Thread B
    /// detaches that same node, holds it in flight while thread C pops the
    /// next node (recycling it to the free list), then publishes and
    /// immediately pushes, which recycles the node A snapshotted back to the
    /// live head. A's CAS now succeeds on a head whose identity changed,
    /// installing A's stale `next` pointer: a node that sits on the free
    /// list becomes the live head.
    #[test]
    fn engineered_interleaving_reproduces_aba() {
        let stack = Arc::new(BoundedStack::with_capacity(3));
        for v in [10, 20, 30] {
            stack.push(v).unwrap();
        }

        let (gate_a, control_a) = RaceGate::pair();
        let (gate_b, control_b) = RaceGate::pair();

        let a = {
            let stack = Arc::clone(&stack);
            thread::spawn(move || stack.pop_expose_acquire(&gate_a))
        };
        control_a.wait_reached();

        let b = {
            let stack = Arc::clone(&stack);
            thread::spawn(move || {
                let popped = stack.pop_expose_publish(&gate_b);
                stack.push(40).unwrap();
                popped
            })
        };
        control_b.wait_reached();

        let c = {
            let stack = Arc::clone(&stack);
            thread::spawn(move || stack.pop())
        };
        assert_eq!(c.join().unwrap(), Some(20));

        control_b.release();
        assert_eq!(b.join().unwrap(), Some(30));

        control_a.release();
        // A pops the node B recycled, observing B's payload.
        assert_eq!(a.join().unwrap(), Some(40));

        // The lists now overlap: the node A installed as the live head also
        // sits one behind the free head. No further operations on this stack;
        // its invariants are gone, which is what the oracle certifies.
        assert!(stack.aba_detected());
    }
}
