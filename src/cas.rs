//! Single-word compare-and-swap, the primitive the lock-free stack engine is
//! built on.
//!
//! Two interchangeable backends provide the same [`CasWord`] type: the
//! default one maps straight onto the processor's atomic compare-exchange,
//! the `software-cas` one emulates that instruction with a mutex scoped to
//! the compare-and-maybe-store. Callers cannot distinguish the two by
//! behavior, only by performance, so retry-loop algorithms written against
//! [`CasWord`] run unchanged on either.

#[cfg_attr(feature = "software-cas", path = "cas/emulated.rs")]
#[cfg_attr(not(feature = "software-cas"), path = "cas/hardware.rs")]
mod imp;

pub use imp::CasWord;
