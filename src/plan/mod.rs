//! The barriers executed by mutator threads, and the per-thread mutator state.

mod arraycopy;
mod barriers;
pub mod evacuation;
mod mutator_context;

pub use arraycopy::{
    ArrayCopyConfig, ArraySlice, ArrayStoreError, EvacuateStoreVal, NoStoreVal, ResolveStoreVal,
    StoreValPolicy,
};
pub use barriers::{BrooksBarrier, StoreValMode};
pub use evacuation::{EvacuationGate, EvacuationScope};
pub use mutator_context::Mutator;
