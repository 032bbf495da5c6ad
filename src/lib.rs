//! A fixed-capacity concurrent stack that recycles its nodes through a
//! free list and, in its lock-free configurations, deliberately reproduces
//! the classic ABA problem.
//!
//! Every node is preallocated at construction time. A push moves a node from
//! the free list to the live list, a pop moves it back; nothing is allocated
//! or reclaimed afterwards. Because a recycled node can reappear at the very
//! address (pool slot) a stalled thread still holds a snapshot of, a
//! compare-and-swap on the list head can succeed against a node that changed
//! identity in between. The [`BoundedStack`] keeps that hazard intact on
//! purpose and ships the diagnostics to trigger and observe it; see
//! [`stack`] for the demonstration entry points.
//!
//! The synchronization discipline is chosen when the crate is compiled:
//!
//! | build                      | discipline                               |
//! |----------------------------|------------------------------------------|
//! | default                    | lock-free, hardware compare-and-swap     |
//! | `--features software-cas`  | lock-free loops over a mutex-emulated CAS |
//! | `--features mutex`         | one mutex around each whole operation    |
//!
//! All three expose the same interface. The emulated CAS exists so the
//! lock-free algorithm can be studied on its own terms: callers cannot tell
//! it apart from the hardware one except by performance.

#[cfg(all(feature = "mutex", feature = "software-cas"))]
compile_error!(
    "features `mutex` and `software-cas` select different synchronization modes; enable at most one"
);

pub mod cas;
mod pool;
pub mod stack;

pub use cas::CasWord;
pub use stack::{BoundedStack, StackError};
#[cfg(not(feature = "mutex"))]
pub use stack::{RaceGate, RaceGateControl};
