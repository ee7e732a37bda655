use downcast_rs::{impl_downcast, Downcast};

use crate::util::{Address, ObjectReference};

/// Allocation of evacuation copies.
///
/// The barrier layer does not allocate.  Each mutator is bound with an `EvacuationAllocator`
/// (typically a thread-local buffer in a to-space region) that it uses when a barrier has to
/// evacuate an object.  A mutator may lose the race to forward an object, in which case its
/// copy was never published and is handed back through [`EvacuationAllocator::discard_copy`].
pub trait EvacuationAllocator: Downcast + Send {
    /// Allocate `bytes` bytes aligned to `align` for a copy of `original`.  Returns `None` if no
    /// memory is available for evacuation.
    fn alloc_copy(&mut self, original: ObjectReference, bytes: usize, align: usize) -> Option<Address>;

    /// Give back a copy that lost the forwarding race.  It was never visible to other threads.
    /// The default implementation leaves the space to be reclaimed with its region.
    fn discard_copy(&mut self, start: Address, bytes: usize) {
        let _ = (start, bytes);
    }
}

impl_downcast!(EvacuationAllocator);
