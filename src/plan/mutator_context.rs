//! Mutator context for each application thread.

use crate::barrier_set::BarrierSet;
use crate::plan::barriers::BrooksBarrier;
use crate::util::copy::EvacuationAllocator;
use crate::vm::VMBinding;

/// A mutator is the per-thread state of the barrier layer.  A runtime creates one for each of
/// its threads with [`crate::memory_manager::bind_mutator`] and keeps it where the thread can
/// reach it cheaply, usually in thread-local storage.
///
/// The mutator owns the thread's snapshot buffer and its evacuation allocator, so barrier calls
/// on one mutator must come from one thread at a time.
pub struct Mutator<VM: VMBinding> {
    pub barrier: BrooksBarrier<VM>,
}

impl<VM: VMBinding> Mutator<VM> {
    pub(crate) fn new(
        barrier_set: &'static BarrierSet<VM>,
        allocator: Box<dyn EvacuationAllocator>,
    ) -> Self {
        Self {
            barrier: BrooksBarrier::new(barrier_set, allocator),
        }
    }

    pub fn barrier(&mut self) -> &mut BrooksBarrier<VM> {
        &mut self.barrier
    }

    /// Hand over the thread-local snapshot entries.  Called at handshakes and before the
    /// mutator is destroyed.
    pub fn flush(&mut self) {
        self.barrier.flush();
    }

    /// Get the evacuation allocator as its concrete type.
    pub fn evacuation_allocator<A: EvacuationAllocator>(&self) -> Option<&A> {
        self.barrier.evacuation_allocator().downcast_ref::<A>()
    }

    pub fn evacuation_allocator_mut<A: EvacuationAllocator>(&mut self) -> Option<&mut A> {
        self.barrier.evacuation_allocator_mut().downcast_mut::<A>()
    }
}

impl<VM: VMBinding> Drop for Mutator<VM> {
    fn drop(&mut self) {
        self.flush();
    }
}
