//! The interface a runtime uses to call the barriers.
//!
//! A runtime sets up the barrier layer in these steps:
//!
//! 1. Create a [`BarrierSetBuilder`] and set options on it.
//! 2. Create the barrier set for its heap with [`barrier_set_init`], and make it `'static`,
//!    e.g. with `Box::leak()`.
//! 3. Create a mutator for each of its threads with [`bind_mutator`].
//!
//! The runtime then calls the barrier functions here on every heap reference access, or
//! inlines the fast paths on its side and calls these as slow paths.  The phase driver of the
//! collector publishes phase changes through [`BarrierSet::set_phase`] and
//! [`BarrierSet::set_has_forwarded_objects`].

use crate::barrier_set::{BarrierSet, BarrierSetBuilder};
use crate::plan::{evacuation, ArraySlice, ArrayStoreError, Mutator};
use crate::util::copy::EvacuationAllocator;
use crate::util::object_forwarding;
use crate::util::{Address, ObjectReference};
use crate::vm::VMBinding;

/// Create a barrier set for the heap `[heap_start, heap_start + heap_bytes)`.
///
/// Note that this function will attempt to initialize a logger.  If the runtime would like to
/// use its own logger, it should initialize the logger before calling this function.
///
/// Arguments:
/// * `builder`: The builder with the options for the barrier set.
/// * `heap_start`: The start of the heap.  It must be aligned to the region size.
/// * `heap_bytes`: The size of the heap in bytes.
pub fn barrier_set_init<VM: VMBinding>(
    builder: &BarrierSetBuilder,
    heap_start: Address,
    heap_bytes: usize,
) -> Box<BarrierSet<VM>> {
    match crate::util::logger::try_init() {
        Ok(_) => debug!("The barrier set initialized the logger."),
        Err(_) => debug!(
            "The barrier set failed to initialize the logger. Possibly a logger has been initialized by user."
        ),
    }
    let barrier_set = builder.build::<VM>(heap_start, heap_bytes);
    info!(
        "Initialized barrier set for {} regions with {:?}",
        barrier_set.regions().regions(),
        barrier_set.get_options()
    );
    Box::new(barrier_set)
}

/// Create a mutator for a thread.  The mutator uses `allocator` for the copies it makes when a
/// barrier has to evacuate an object.
pub fn bind_mutator<VM: VMBinding>(
    barrier_set: &'static BarrierSet<VM>,
    allocator: Box<dyn EvacuationAllocator>,
) -> Box<Mutator<VM>> {
    Box::new(Mutator::new(barrier_set, allocator))
}

/// Flush the mutator's thread-local snapshot buffer to the shared pool.
pub fn flush_mutator<VM: VMBinding>(mutator: &mut Mutator<VM>) {
    mutator.flush()
}

/// Reclaim a mutator that is no longer needed.  Its remaining snapshot entries are flushed.
pub fn destroy_mutator<VM: VMBinding>(mutator: Box<Mutator<VM>>) {
    drop(mutator);
}

/// Return the current location of `object`.  Null stays null.
#[inline(always)]
pub fn resolve_forwarded<VM: VMBinding>(object: Option<ObjectReference>) -> Option<ObjectReference> {
    object_forwarding::resolve_forwarded::<VM>(object)
}

/// Return the current location of a non-null `object`.
#[inline(always)]
pub fn resolve_forwarded_not_null<VM: VMBinding>(object: ObjectReference) -> ObjectReference {
    object_forwarding::resolve_forwarded_not_null::<VM>(object)
}

/// Evacuate `object`, which must be in the collection set, and return its canonical location.
///
/// If evacuation has run out of memory, this blocks until no other evacuation is in flight, and
/// returns the object's location at that point.
pub fn evacuate_object<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    object: ObjectReference,
) -> ObjectReference {
    let barrier_set = mutator.barrier.barrier_set();
    evacuation::evacuate_object(
        barrier_set,
        mutator.barrier.evacuation_allocator_mut(),
        object,
    )
}

/// Record `object` in the mutator's snapshot buffer.  The caller checks that snapshot recording
/// is active.
pub fn satb_enqueue<VM: VMBinding>(mutator: &mut Mutator<VM>, object: ObjectReference) {
    mutator.barrier.enqueue(object)
}

/// Record in the connection matrix that the slot at `slot_address` references `object`.  Does
/// nothing if the connection matrix is disabled.
pub fn record_connection<VM: VMBinding>(
    mutator: &Mutator<VM>,
    slot_address: Address,
    object: ObjectReference,
) {
    mutator.barrier.record_connection(slot_address, object)
}

/// The store barrier.  Store `target` into `slot`.
///
/// Arguments:
/// * `mutator`: The mutator for the current thread.
/// * `slot`: The heap slot to be written.
/// * `target`: The reference to store, or `None` for null.
#[inline(always)]
pub fn object_reference_write<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    slot: VM::VMSlot,
    target: Option<ObjectReference>,
) {
    mutator.barrier.object_reference_write(slot, target);
}

/// The atomic exchange barrier.  Store `target` into `slot` and return the previous value.
pub fn object_reference_swap<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    slot: VM::VMSlot,
    target: Option<ObjectReference>,
) -> Option<ObjectReference> {
    mutator.barrier.object_reference_swap(slot, target)
}

/// The compare-and-exchange barrier.  Store `new` into `slot` if it refers to the same object
/// as `current`, even through a different location of the object.
///
/// Returns `Ok(previous)` if `new` was stored, or `Err(observed)` with the value in the slot.
pub fn object_reference_compare_exchange<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    slot: VM::VMSlot,
    current: Option<ObjectReference>,
    new: Option<ObjectReference>,
) -> Result<Option<ObjectReference>, Option<ObjectReference>> {
    mutator
        .barrier
        .object_reference_compare_exchange(slot, current, new)
}

/// The clone barrier.  Copy `bytes` bytes of `src`, starting at its object reference, into
/// `dst`.
pub fn object_clone<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    src: ObjectReference,
    dst: ObjectReference,
    bytes: usize,
) {
    mutator.barrier.object_clone(src, dst, bytes)
}

/// The array copy barrier.  Copy `length` reference slots from `src` to `dst`.
///
/// Arguments:
/// * `mutator`: The mutator for the current thread.
/// * `src`: The source array and the offset of the first source slot.
/// * `dst`: The destination array and the offset of the first destination slot.
/// * `length`: The number of slots to copy.
/// * `checkcast`: Check each element against the destination's element type.
pub fn array_copy<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    src: ArraySlice,
    dst: ArraySlice,
    length: usize,
    checkcast: bool,
) -> Result<(), ArrayStoreError> {
    mutator.barrier.array_copy(src, dst, length, checkcast)
}
