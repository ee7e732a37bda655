//! Evacuation by mutators.
//!
//! A mutator that finds an unforwarded object of the collection set where it needs the object's
//! final location copies the object itself.  Several threads may do so for the same object at
//! the same time.  Each makes its own copy and races to install it in the forwarding pointer;
//! exactly one copy wins and every thread returns the winner.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::Backoff;

use crate::barrier_set::BarrierSet;
use crate::util::copy::EvacuationAllocator;
use crate::util::object_forwarding;
use crate::util::ObjectReference;
use crate::vm::ObjectModel;
use crate::vm::VMBinding;

/// The out-of-memory bit of the gate word.  The other bits count evacuations in flight.
const OOM_BIT: usize = 1 << (usize::BITS - 1);

/// Tracks evacuations in flight and the evacuation out-of-memory condition.
///
/// Every mutator evacuation holds an [`EvacuationScope`] until the forwarding pointer of its
/// object is settled.  The count and the out-of-memory flag share one word, so an evacuation
/// either registers before the flag is set, or sees the flag and never registers.
///
/// Once the flag is set, a thread must not use an unmoved object of the collection set before
/// every registered evacuation has left: one of them may still install a copy of it.  Scopes
/// must not nest, as a thread waiting for the count to drop would wait for itself.
///
/// The phase driver uses [`EvacuationGate::wait_for_in_flight`] before it declares evacuation
/// finished.
#[derive(Default)]
pub struct EvacuationGate {
    state: AtomicUsize,
}

impl EvacuationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an evacuation.  It stays registered until the scope is dropped.  Returns `None`
    /// without registering if the out-of-memory flag is set.
    pub fn try_enter(&self) -> Option<EvacuationScope<'_>> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & OOM_BIT != 0 {
                return None;
            }
            debug_assert!(current + 1 < OOM_BIT);
            match self.state.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(EvacuationScope { gate: self }),
                Err(observed) => current = observed,
            }
        }
    }

    /// The number of registered evacuations.
    pub fn in_flight(&self) -> usize {
        self.state.load(Ordering::Acquire) & !OOM_BIT
    }

    pub fn is_evacuation_in_flight(&self) -> bool {
        self.in_flight() != 0
    }

    /// Spin until no evacuation is registered.
    pub fn wait_for_in_flight(&self) {
        let backoff = Backoff::new();
        while self.is_evacuation_in_flight() {
            backoff.snooze();
        }
    }

    /// Did an evacuation fail to allocate its copy?  While set, evacuations only resolve.
    pub fn is_oom(&self) -> bool {
        self.state.load(Ordering::Acquire) & OOM_BIT != 0
    }

    pub(crate) fn set_oom(&self) {
        self.state.fetch_or(OOM_BIT, Ordering::AcqRel);
    }

    pub fn clear_oom(&self) {
        debug!("Evacuation OOM cleared");
        self.state.fetch_and(!OOM_BIT, Ordering::AcqRel);
    }
}

/// A registered evacuation.  See [`EvacuationGate::try_enter`].
#[must_use]
pub struct EvacuationScope<'a> {
    gate: &'a EvacuationGate,
}

impl EvacuationScope<'_> {
    /// Leave the gate, then wait until every other registered evacuation has left.
    pub fn leave_and_wait(self) {
        let gate = self.gate;
        drop(self);
        gate.wait_for_in_flight();
    }
}

impl Drop for EvacuationScope<'_> {
    fn drop(&mut self) {
        let old = self.gate.state.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(old & !OOM_BIT > 0);
    }
}

/// Evacuate `object` and return its canonical location.
///
/// `object` must be in the collection set.  If it was forwarded already, this only resolves
/// it.  If evacuation is out of memory, this waits until no other evacuation is in flight and
/// then resolves it, so the returned location does not change afterwards.
pub fn evacuate_object<VM: VMBinding>(
    barrier_set: &BarrierSet<VM>,
    allocator: &mut dyn EvacuationAllocator,
    object: ObjectReference,
) -> ObjectReference {
    debug_assert!(
        barrier_set.regions().in_collection_set(object),
        "evacuating {} which is not in the collection set",
        object
    );
    let gate = barrier_set.evacuation_gate();
    let stats = barrier_set.stats();
    let Some(scope) = gate.try_enter() else {
        gate.wait_for_in_flight();
        return object_forwarding::resolve_forwarded_not_null::<VM>(object);
    };

    let forwarded = object_forwarding::resolve_forwarded_not_null::<VM>(object);
    if forwarded != object {
        return forwarded;
    }

    let bytes = VM::VMObjectModel::get_size_when_copied(object);
    let align = VM::VMObjectModel::get_align_when_copied(object).max(VM::MIN_ALIGNMENT);
    let Some(to) = allocator.alloc_copy(object, bytes, align) else {
        gate.set_oom();
        stats.count(&stats.evacuations_failed);
        warn!(
            "Failed to allocate {} bytes to evacuate {}, continuing without evacuation",
            bytes, object
        );
        scope.leave_and_wait();
        return object_forwarding::resolve_forwarded_not_null::<VM>(object);
    };

    let copy = VM::VMObjectModel::copy_to(object, to);
    object_forwarding::initialize_forwarding_pointer::<VM>(copy);
    match object_forwarding::attempt_to_forward::<VM>(object, copy) {
        Ok(()) => stats.count(&stats.evacuations_won),
        Err(_winner) => {
            allocator.discard_copy(to, bytes);
            stats.count(&stats.evacuations_lost);
        }
    }
    drop(scope);
    object_forwarding::resolve_forwarded_not_null::<VM>(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_util::panic_after;
    use std::sync::Arc;

    #[test]
    fn scope_registers_in_flight() {
        let gate = EvacuationGate::new();
        assert!(!gate.is_evacuation_in_flight());
        {
            let _a = gate.try_enter();
            let _b = gate.try_enter();
            assert_eq!(gate.in_flight(), 2);
        }
        assert!(!gate.is_evacuation_in_flight());
        gate.wait_for_in_flight();
    }

    #[test]
    fn wait_for_in_flight_returns_after_scope_ends() {
        let gate = Arc::new(EvacuationGate::new());
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let worker = {
            let gate = gate.clone();
            std::thread::spawn(move || {
                let _scope = gate.try_enter();
                entered_tx.send(()).unwrap();
                std::thread::sleep(std::time::Duration::from_millis(20));
            })
        };
        entered_rx.recv().unwrap();
        assert!(gate.is_evacuation_in_flight());
        panic_after(1000, move || gate.wait_for_in_flight());
        worker.join().unwrap();
    }

    #[test]
    fn oom_flag() {
        let gate = EvacuationGate::new();
        assert!(!gate.is_oom());
        gate.set_oom();
        assert!(gate.is_oom());
        gate.clear_oom();
        assert!(!gate.is_oom());
    }

    #[test]
    fn oom_keeps_count_and_refuses_new_scopes() {
        let gate = EvacuationGate::new();
        let scope = gate.try_enter();
        assert!(scope.is_some());
        gate.set_oom();
        assert!(gate.try_enter().is_none());
        assert_eq!(gate.in_flight(), 1);
        drop(scope);
        assert!(gate.is_oom());
        assert!(!gate.is_evacuation_in_flight());
        gate.clear_oom();
        assert!(gate.try_enter().is_some());
    }

    #[test]
    fn leave_and_wait_waits_for_other_scopes() {
        let gate: &'static EvacuationGate = Box::leak(Box::new(EvacuationGate::new()));
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let worker = std::thread::spawn(move || {
            let _scope = gate.try_enter();
            entered_tx.send(()).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(20));
        });
        entered_rx.recv().unwrap();
        let own = gate.try_enter().unwrap();
        assert_eq!(gate.in_flight(), 2);
        panic_after(1000, move || own.leave_and_wait());
        assert!(!gate.is_evacuation_in_flight());
        worker.join().unwrap();
    }
}
