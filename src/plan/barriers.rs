//! The element store barrier.

use enum_map::Enum;

use crate::barrier_set::BarrierSet;
use crate::global_state::PhaseSnapshot;
use crate::plan::evacuation;
use crate::util::copy::EvacuationAllocator;
use crate::util::object_forwarding;
use crate::util::satb::SatbBuffer;
use crate::util::{Address, ObjectReference};
use crate::vm::slot::Slot;
use crate::vm::VMBinding;

/// How a reference is treated before it is stored into the heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Enum)]
pub enum StoreValMode {
    /// Store the reference as it is.
    None,
    /// Store the current location of the referenced object.
    Resolve,
    /// Evacuate the referenced object if it is in the collection set, store its new location and
    /// record the stored reference in the snapshot buffer.
    Evacuate,
}

/// A Brooks-style barrier.
///
/// Every reference read goes through the forwarding pointer (the read barrier), and an object
/// that is about to be written is evacuated first if it is in the collection set (the write
/// barrier), so a mutator never writes into a stale copy.  On top of that, stores into heap
/// slots keep the snapshot of concurrent marking and the region connection matrix up to date.
///
/// A `BrooksBarrier` belongs to one mutator.  It owns the mutator's snapshot buffer and the
/// allocator it uses for evacuation copies.
pub struct BrooksBarrier<VM: VMBinding> {
    barrier_set: &'static BarrierSet<VM>,
    satb: SatbBuffer,
    allocator: Box<dyn EvacuationAllocator>,
}

impl<VM: VMBinding> BrooksBarrier<VM> {
    pub fn new(barrier_set: &'static BarrierSet<VM>, allocator: Box<dyn EvacuationAllocator>) -> Self {
        Self {
            barrier_set,
            satb: SatbBuffer::new(barrier_set.options.satb_buffer_size),
            allocator,
        }
    }

    pub fn barrier_set(&self) -> &'static BarrierSet<VM> {
        self.barrier_set
    }

    pub fn satb_buffer(&self) -> &SatbBuffer {
        &self.satb
    }

    pub fn evacuation_allocator(&self) -> &dyn EvacuationAllocator {
        self.allocator.as_ref()
    }

    pub fn evacuation_allocator_mut(&mut self) -> &mut dyn EvacuationAllocator {
        self.allocator.as_mut()
    }

    /// The read barrier: the current location of `object`.
    #[inline(always)]
    pub fn read_barrier(&self, object: ObjectReference) -> ObjectReference {
        object_forwarding::resolve_forwarded_not_null::<VM>(object)
    }

    /// The write barrier: the location of `object` that may be written to.
    pub fn write_barrier(&mut self, object: ObjectReference) -> ObjectReference {
        let snapshot = self.barrier_set.snapshot();
        self.write_barrier_in(snapshot, object)
    }

    pub(crate) fn write_barrier_in(
        &mut self,
        snapshot: PhaseSnapshot,
        object: ObjectReference,
    ) -> ObjectReference {
        let forwarded = object_forwarding::resolve_forwarded_not_null::<VM>(object);
        if forwarded == object
            && snapshot.is_evacuation_in_progress()
            && self.barrier_set.regions().in_collection_set(object)
        {
            self.evacuate(object)
        } else {
            forwarded
        }
    }

    /// Evacuate `object`, which is in the collection set, and return its canonical location.
    pub fn evacuate(&mut self, object: ObjectReference) -> ObjectReference {
        evacuation::evacuate_object(self.barrier_set, self.allocator.as_mut(), object)
    }

    /// Is snapshot-at-the-beginning recording active for this barrier invocation?
    #[inline(always)]
    pub(crate) fn is_satb_active(&self, snapshot: PhaseSnapshot) -> bool {
        self.barrier_set.options.satb_barrier && snapshot.is_concurrent_mark_in_progress()
    }

    #[inline(always)]
    pub(crate) fn is_matrix_active(&self) -> bool {
        self.barrier_set.connection_matrix().is_some()
    }

    /// Record `object` in the snapshot buffer.  A full buffer is handed to the shared pool.
    #[inline(always)]
    pub fn enqueue(&mut self, object: ObjectReference) {
        self.satb.push(object);
        let stats = self.barrier_set.stats();
        stats.count(&stats.satb_enqueued);
        if self.satb.is_full() {
            self.flush_satb();
        }
    }

    /// Apply `mode` to a reference that is about to be stored.
    #[inline(always)]
    pub fn storeval(&mut self, value: ObjectReference, mode: StoreValMode) -> ObjectReference {
        let value = self.storeval_location(value, mode);
        if mode == StoreValMode::Evacuate {
            self.enqueue(value);
        }
        value
    }

    /// The location part of [`BrooksBarrier::storeval`]: resolve or evacuate `value` as `mode`
    /// requires, without recording it.
    #[inline(always)]
    fn storeval_location(&mut self, value: ObjectReference, mode: StoreValMode) -> ObjectReference {
        match mode {
            StoreValMode::None => value,
            StoreValMode::Resolve => object_forwarding::resolve_forwarded_not_null::<VM>(value),
            StoreValMode::Evacuate => {
                if !self.barrier_set.regions().in_collection_set(value) {
                    return value;
                }
                let forwarded = object_forwarding::resolve_forwarded_not_null::<VM>(value);
                if forwarded == value {
                    self.evacuate(value)
                } else {
                    forwarded
                }
            }
        }
    }

    /// Record that the slot at `slot_address` references `object`.
    #[inline(always)]
    pub fn record_connection(&self, slot_address: Address, object: ObjectReference) {
        let Some(matrix) = self.barrier_set.connection_matrix() else {
            return;
        };
        let regions = self.barrier_set.regions();
        let from = regions.region_index(slot_address);
        let to = regions.region_of(object);
        if matrix.set_connected(from, to) {
            let stats = self.barrier_set.stats();
            stats.count(&stats.connections_recorded);
        }
    }

    /// Store `value` into a heap slot.
    pub fn object_reference_write(&mut self, slot: VM::VMSlot, value: Option<ObjectReference>) {
        let snapshot = self.barrier_set.snapshot();
        let mode = snapshot.store_val_mode();
        let value = value.map(|v| self.storeval(v, mode));
        if self.is_satb_active(snapshot) {
            if let Some(old) = slot.load() {
                self.enqueue(old);
            }
        }
        if let Some(v) = value {
            if self.is_matrix_active() {
                self.record_connection(slot.as_address(), v);
            }
        }
        slot.store(value);
    }

    /// Atomically store `value` into a heap slot and return the previous value.
    pub fn object_reference_swap(
        &mut self,
        slot: VM::VMSlot,
        value: Option<ObjectReference>,
    ) -> Option<ObjectReference> {
        let snapshot = self.barrier_set.snapshot();
        let value = value.map(|v| self.storeval(v, snapshot.store_val_mode()));
        let previous = slot.swap(value);
        if self.is_satb_active(snapshot) {
            if let Some(old) = previous {
                self.enqueue(old);
            }
        }
        if let Some(v) = value {
            if self.is_matrix_active() {
                self.record_connection(slot.as_address(), v);
            }
        }
        previous
    }

    /// Atomically store `new` into a heap slot if the slot holds `current`.
    ///
    /// Two references to the same object compare equal even if one of them is stale: if the
    /// slot holds another location of the object `current` refers to, the exchange is retried
    /// against the value in the slot.  The result follows `AtomicUsize::compare_exchange`:
    /// `Ok(previous)` on success, `Err(observed)` if the slot refers to a different object.
    ///
    /// `new` is resolved or evacuated before the exchange, but it is only recorded in the
    /// snapshot buffer if the exchange succeeds.
    pub fn object_reference_compare_exchange(
        &mut self,
        slot: VM::VMSlot,
        current: Option<ObjectReference>,
        new: Option<ObjectReference>,
    ) -> Result<Option<ObjectReference>, Option<ObjectReference>> {
        let snapshot = self.barrier_set.snapshot();
        let mode = snapshot.store_val_mode();
        let new = new.map(|v| self.storeval_location(v, mode));
        let mut expected = current;
        let result = loop {
            match slot.compare_exchange(expected, new) {
                Ok(previous) => break Ok(previous),
                Err(observed) => {
                    if object_forwarding::resolve_forwarded::<VM>(observed)
                        == object_forwarding::resolve_forwarded::<VM>(expected)
                    {
                        let stats = self.barrier_set.stats();
                        stats.count(&stats.spurious_cas_retries);
                        trace!("retry cas on {:?}: {:?} aliases {:?}", slot, observed, expected);
                        expected = observed;
                    } else {
                        break Err(observed);
                    }
                }
            }
        };
        if let Ok(previous) = result {
            if let (Some(v), StoreValMode::Evacuate) = (new, mode) {
                self.enqueue(v);
            }
            if self.is_satb_active(snapshot) {
                if let Some(old) = previous {
                    self.enqueue(old);
                }
            }
            if let Some(v) = new {
                if self.is_matrix_active() {
                    self.record_connection(slot.as_address(), v);
                }
            }
        }
        result
    }

    #[cold]
    fn flush_satb(&mut self) {
        if !self.satb.is_empty() {
            self.barrier_set.satb_queues().push_buffer(self.satb.take());
        }
    }

    /// Hand the thread-local snapshot entries to the shared pool.
    pub fn flush(&mut self) {
        self.flush_satb();
    }
}
