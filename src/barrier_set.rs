//! The barrier set: the state shared by the barriers of all mutators.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::global_state::{GcPhase, GlobalState, PhaseSnapshot};
use crate::plan::EvacuationGate;
use crate::policy::{ConnectionMatrix, RegionTable};
use crate::util::options::Options;
use crate::util::satb::SatbQueueSet;
use crate::util::statistics::BarrierStats;
use crate::util::Address;
use crate::vm::VMBinding;

/// A builder for a [`BarrierSet`].  Options are set on the builder before the barrier set is
/// created, and cannot change afterwards.
pub struct BarrierSetBuilder {
    /// The options for the barrier set.
    pub options: Options,
}

impl BarrierSetBuilder {
    /// Create a builder with options from the defaults and from environment variables.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Create a builder with the given options.
    pub fn with_options(options: Options) -> Self {
        Self { options }
    }

    /// Set an option.  Returns false if `name` is not an option, or if `value` is not valid for
    /// it.
    pub fn set_option(&mut self, name: &str, value: &str) -> bool {
        if !Options::is_option(name) {
            warn!("Unknown option {}", name);
            return false;
        }
        self.options.set_from_str(name, value)
    }

    /// Create the barrier set for the heap `[heap_start, heap_start + heap_bytes)`.  The heap
    /// start must be aligned to the region size.
    pub fn build<VM: VMBinding>(&self, heap_start: Address, heap_bytes: usize) -> BarrierSet<VM> {
        BarrierSet::new(Arc::new(self.options.clone()), heap_start, heap_bytes)
    }
}

impl Default for BarrierSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The barrier state of one heap.
///
/// Barriers hold a `&'static BarrierSet`.  A runtime usually creates the barrier set once with
/// [`crate::memory_manager::barrier_set_init`] and leaks it.  The phase driver uses the
/// accessors here to publish phase changes and to consume what the barriers record.
pub struct BarrierSet<VM: VMBinding> {
    pub(crate) options: Arc<Options>,
    pub(crate) state: GlobalState,
    regions: RegionTable,
    connection_matrix: Option<ConnectionMatrix>,
    satb_queues: SatbQueueSet,
    evacuation_gate: EvacuationGate,
    stats: BarrierStats,
    _vm: PhantomData<VM>,
}

impl<VM: VMBinding> BarrierSet<VM> {
    pub(crate) fn new(options: Arc<Options>, heap_start: Address, heap_bytes: usize) -> Self {
        let regions = RegionTable::new(heap_start, heap_bytes, options.log_bytes_in_region);
        let connection_matrix = options
            .connection_matrix
            .then(|| ConnectionMatrix::new(regions.regions()));
        Self {
            state: GlobalState::default(),
            regions,
            connection_matrix,
            satb_queues: SatbQueueSet::new(),
            evacuation_gate: EvacuationGate::new(),
            stats: BarrierStats::new(options.barrier_stats),
            options,
            _vm: PhantomData,
        }
    }

    pub fn get_options(&self) -> &Options {
        &self.options
    }

    pub fn phase(&self) -> GcPhase {
        self.state.phase()
    }

    /// Publish a new collector phase.
    pub fn set_phase(&self, phase: GcPhase) {
        self.state.set_phase(phase);
    }

    pub fn has_forwarded_objects(&self) -> bool {
        self.state.has_forwarded_objects()
    }

    /// Publish whether the heap contains forwarded objects.
    pub fn set_has_forwarded_objects(&self, value: bool) {
        self.state.set_has_forwarded_objects(value);
    }

    /// Read the collector state for one barrier invocation.
    #[inline(always)]
    pub fn snapshot(&self) -> PhaseSnapshot {
        self.state.snapshot()
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    /// The connection matrix, if the `connection_matrix` option is set.
    pub fn connection_matrix(&self) -> Option<&ConnectionMatrix> {
        self.connection_matrix.as_ref()
    }

    pub fn satb_queues(&self) -> &SatbQueueSet {
        &self.satb_queues
    }

    pub fn evacuation_gate(&self) -> &EvacuationGate {
        &self.evacuation_gate
    }

    pub fn stats(&self) -> &BarrierStats {
        &self.stats
    }
}
