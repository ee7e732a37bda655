//! A barrier layer for a region-based garbage collector that marks and evacuates concurrently
//! with the application.
//!
//! Objects carry a Brooks-style forwarding pointer: one word that refers to the object itself
//! until the object is evacuated, and to its copy afterwards.  The barriers here are what the
//! application threads (mutators) run on heap reference accesses so that the heap stays
//! consistent while the collector works:
//!
//! * every reference that is followed is resolved through its forwarding pointer,
//! * an object in the collection set is evacuated by the mutator that is about to write it,
//! * overwritten references are recorded while concurrent marking runs (snapshot at the
//!   beginning),
//! * stores optionally record region-to-region connections,
//! * array copies and clones apply the same concerns in bulk.
//!
//! The collector itself (marking, choosing the collection set, updating references, draining
//! the recorded references) is not part of this crate.  It drives the barriers through the
//! phase published in the [`BarrierSet`].
//!
//! A runtime binds to the barrier layer by implementing [`vm::VMBinding`], and calls the
//! barriers through [`memory_manager`].

#[macro_use]
extern crate log;
#[cfg(any(test, feature = "mock_test"))]
#[macro_use]
extern crate lazy_static;

mod barrier_set;
mod global_state;

pub mod memory_manager;
pub mod plan;
pub mod policy;
pub mod util;
pub mod vm;

pub use crate::barrier_set::BarrierSet;
pub use crate::barrier_set::BarrierSetBuilder;
pub use crate::global_state::GcPhase;
pub use crate::global_state::PhaseSnapshot;
pub use crate::plan::Mutator;

#[cfg(test)]
mod tests;
