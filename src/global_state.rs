use std::sync::atomic::{AtomicBool, Ordering};

use atomic::Atomic;
use bytemuck::NoUninit;
use strum_macros::{Display, EnumIter, EnumString};

use crate::plan::StoreValMode;

/// The phase of the concurrent collector.
///
/// Exactly one phase is active at a time.  The phase driver moves the collector between phases;
/// the barriers only read the phase.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, NoUninit, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum GcPhase {
    /// No collection work is happening.
    Idle,
    /// Concurrent marking.  Overwritten references are recorded in snapshot buffers.
    ConcurrentMark,
    /// Concurrent traversal.  Marking and evacuation happen in the same pass, so stored
    /// references are evacuated out of the collection set.
    ConcurrentTraversal,
    /// References to evacuated objects are updated to their copies.
    UpdateRefs,
    /// Objects in the collection set are being evacuated.
    Evacuation,
}

/// This stores the collector state the barriers depend on.
///
/// The phase and the "heap has forwarded objects" flag are set by the phase driver through
/// [`crate::BarrierSet`].  Barriers take a [`PhaseSnapshot`] once per call and make all their
/// decisions from that snapshot, so one barrier invocation never sees two different phases.
pub struct GlobalState {
    /// The current phase.
    pub(crate) phase: Atomic<GcPhase>,
    /// Does the heap contain objects whose forwarding pointer is not self-referential?  This is
    /// set when evacuation starts and cleared after references have been updated.
    pub(crate) has_forwarded_objects: AtomicBool,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            phase: Atomic::new(GcPhase::Idle),
            has_forwarded_objects: AtomicBool::new(false),
        }
    }
}

impl GlobalState {
    pub fn phase(&self) -> GcPhase {
        self.phase.load(Ordering::Acquire)
    }

    pub(crate) fn set_phase(&self, phase: GcPhase) {
        let old = self.phase.swap(phase, Ordering::AcqRel);
        debug!("GC phase: {} -> {}", old, phase);
    }

    pub fn has_forwarded_objects(&self) -> bool {
        self.has_forwarded_objects.load(Ordering::Acquire)
    }

    pub(crate) fn set_has_forwarded_objects(&self, value: bool) {
        debug!("Heap has forwarded objects: {}", value);
        self.has_forwarded_objects.store(value, Ordering::Release);
    }

    /// Read the state once for one barrier invocation.
    #[inline(always)]
    pub fn snapshot(&self) -> PhaseSnapshot {
        PhaseSnapshot {
            phase: self.phase(),
            has_forwarded_objects: self.has_forwarded_objects(),
        }
    }
}

/// The collector state as observed by one barrier invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseSnapshot {
    pub phase: GcPhase,
    pub has_forwarded_objects: bool,
}

impl PhaseSnapshot {
    pub fn is_concurrent_mark_in_progress(&self) -> bool {
        self.phase == GcPhase::ConcurrentMark
    }

    /// May barriers evacuate objects out of the collection set?
    pub fn is_evacuation_in_progress(&self) -> bool {
        matches!(
            self.phase,
            GcPhase::Evacuation | GcPhase::ConcurrentTraversal
        )
    }

    /// How a reference is treated before it is stored into the heap.  This depends only on the
    /// phase and on whether there are forwarded objects.
    pub fn store_val_mode(&self) -> StoreValMode {
        if !self.has_forwarded_objects {
            return StoreValMode::None;
        }
        match self.phase {
            GcPhase::ConcurrentTraversal => StoreValMode::Evacuate,
            GcPhase::ConcurrentMark | GcPhase::UpdateRefs => StoreValMode::Resolve,
            GcPhase::Idle | GcPhase::Evacuation => StoreValMode::None,
        }
    }
}
