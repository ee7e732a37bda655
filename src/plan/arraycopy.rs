//! Bulk copy barriers: object clone and reference array copy.
//!
//! An array copy decides once per call which barrier concerns apply ([`ArrayCopyConfig`]).  If
//! none does, the elements are copied with one `memmove`.  Otherwise one of the specialised
//! element loops is selected, so the per-element code contains only the concerns that apply.

use std::fmt;

use crate::global_state::PhaseSnapshot;
use crate::plan::barriers::{BrooksBarrier, StoreValMode};
use crate::util::constants::BYTES_IN_ADDRESS;
use crate::util::options::Options;
use crate::util::{Address, ByteSize, ObjectReference};
use crate::vm::slot::Slot;
use crate::vm::{ObjectModel, VMBinding};

/// A position inside a reference array: the array and the byte offset of an element slot from
/// the array's object reference.
///
/// The array may move before the copy happens, so a slice is kept relative to its array and the
/// absolute address is computed from the resolved array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArraySlice {
    pub array: ObjectReference,
    pub offset: ByteSize,
}

impl ArraySlice {
    pub fn new(array: ObjectReference, offset: ByteSize) -> Self {
        Self { array, offset }
    }

    /// The address of the first slot of this slice in `array`, which is the array or a copy of
    /// it.
    fn start_in(&self, array: ObjectReference) -> Address {
        array.to_raw_address() + self.offset
    }
}

/// An element of a checked array copy was not an instance of the destination's element type.
///
/// `index` is the position of the element in the copied range.  The elements copied before it
/// stay copied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArrayStoreError {
    pub index: usize,
}

impl fmt::Display for ArrayStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "element {} is not an instance of the destination element type",
            self.index
        )
    }
}

impl std::error::Error for ArrayStoreError {}

/// The barrier concerns of one array copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArrayCopyConfig {
    /// Record overwritten elements in the snapshot buffer.
    pub satb: bool,
    /// Check every element against the destination's element type.
    pub checkcast: bool,
    /// Record connections in the connection matrix.
    pub matrix: bool,
    pub store_val: StoreValMode,
}

impl ArrayCopyConfig {
    pub fn new(snapshot: PhaseSnapshot, options: &Options, checkcast: bool) -> Self {
        Self {
            satb: options.satb_barrier && snapshot.is_concurrent_mark_in_progress(),
            checkcast,
            matrix: options.connection_matrix,
            store_val: snapshot.store_val_mode(),
        }
    }

    /// Can the elements be copied as raw memory?
    pub fn is_fast_path(&self) -> bool {
        !self.satb && !self.checkcast && !self.matrix && self.store_val == StoreValMode::None
    }
}

/// The store-value treatment of an element loop, fixed at compile time.
pub trait StoreValPolicy {
    const MODE: StoreValMode;
}

pub struct NoStoreVal;
pub struct ResolveStoreVal;
pub struct EvacuateStoreVal;

impl StoreValPolicy for NoStoreVal {
    const MODE: StoreValMode = StoreValMode::None;
}

impl StoreValPolicy for ResolveStoreVal {
    const MODE: StoreValMode = StoreValMode::Resolve;
}

impl StoreValPolicy for EvacuateStoreVal {
    const MODE: StoreValMode = StoreValMode::Evacuate;
}

type TypeBound<VM> = <<VM as VMBinding>::VMObjectModel as ObjectModel<VM>>::TypeBound;

type ElementLoop<VM> =
    fn(&mut BrooksBarrier<VM>, Address, Address, usize, TypeBound<VM>) -> Result<(), ArrayStoreError>;

/// Select the element loop for a config.
macro_rules! select_element_loop {
    ($config: expr; $($mode: ident => $policy: ty),*) => {
        match ($config.store_val, $config.checkcast, $config.satb, $config.matrix) {
            $(
                (StoreValMode::$mode, false, false, false) => copy_elements::<VM, $policy, false, false, false> as ElementLoop<VM>,
                (StoreValMode::$mode, false, false, true) => copy_elements::<VM, $policy, false, false, true>,
                (StoreValMode::$mode, false, true, false) => copy_elements::<VM, $policy, false, true, false>,
                (StoreValMode::$mode, false, true, true) => copy_elements::<VM, $policy, false, true, true>,
                (StoreValMode::$mode, true, false, false) => copy_elements::<VM, $policy, true, false, false>,
                (StoreValMode::$mode, true, false, true) => copy_elements::<VM, $policy, true, false, true>,
                (StoreValMode::$mode, true, true, false) => copy_elements::<VM, $policy, true, true, false>,
                (StoreValMode::$mode, true, true, true) => copy_elements::<VM, $policy, true, true, true>,
            )*
        }
    };
}

/// Copy `length` slots from `src` to `dst` with the barrier concerns given by the parameters.
///
/// The ranges may overlap.  If the source starts above the destination, elements are copied
/// from low to high addresses, otherwise from high to low, so every element is read before it
/// is overwritten.
fn copy_elements<
    VM: VMBinding,
    S: StoreValPolicy,
    const CHECKCAST: bool,
    const SATB: bool,
    const MATRIX: bool,
>(
    barrier: &mut BrooksBarrier<VM>,
    src: Address,
    dst: Address,
    length: usize,
    bound: TypeBound<VM>,
) -> Result<(), ArrayStoreError> {
    let element = |i: usize| {
        (
            VM::VMSlot::from_address(src + i * VM::VMSlot::BYTES),
            VM::VMSlot::from_address(dst + i * VM::VMSlot::BYTES),
        )
    };
    if src > dst {
        for index in 0..length {
            let (from, to) = element(index);
            if !copy_element::<VM, S, CHECKCAST, SATB, MATRIX>(barrier, from, to, bound) {
                return Err(ArrayStoreError { index });
            }
        }
    } else {
        for index in (0..length).rev() {
            let (from, to) = element(index);
            if !copy_element::<VM, S, CHECKCAST, SATB, MATRIX>(barrier, from, to, bound) {
                return Err(ArrayStoreError { index });
            }
        }
    }
    Ok(())
}

#[inline(always)]
fn copy_element<
    VM: VMBinding,
    S: StoreValPolicy,
    const CHECKCAST: bool,
    const SATB: bool,
    const MATRIX: bool,
>(
    barrier: &mut BrooksBarrier<VM>,
    from: VM::VMSlot,
    to: VM::VMSlot,
    bound: TypeBound<VM>,
) -> bool {
    let value = from.load();
    if SATB {
        if let Some(previous) = to.load() {
            barrier.enqueue(previous);
        }
    }
    let Some(object) = value else {
        to.store(None);
        return true;
    };
    if CHECKCAST && !VM::VMObjectModel::is_instance_of(object, bound) {
        return false;
    }
    let object = barrier.storeval(object, S::MODE);
    if MATRIX {
        barrier.record_connection(to.as_address(), object);
    }
    to.store(Some(object));
    true
}

impl<VM: VMBinding> BrooksBarrier<VM> {
    /// Copy `length` elements from `src` to `dst`, which may be slices of the same array.
    ///
    /// With `checkcast`, every non-null element is checked against the element type of the
    /// destination array, and the copy stops at the first element that fails.
    pub fn array_copy(
        &mut self,
        src: ArraySlice,
        dst: ArraySlice,
        length: usize,
        checkcast: bool,
    ) -> Result<(), ArrayStoreError> {
        let snapshot = self.barrier_set().snapshot();
        let src_array = self.read_barrier(src.array);
        let dst_array = self.write_barrier_in(snapshot, dst.array);
        let src_start = src.start_in(src_array);
        let dst_start = dst.start_in(dst_array);
        let bytes = length * VM::VMSlot::BYTES;
        debug_assert!(
            src_start + bytes <= VM::VMObjectModel::get_object_end_address(src_array),
            "source range {}+{} is out of the bounds of {}",
            src_start,
            bytes,
            src_array
        );
        debug_assert!(
            dst_start + bytes <= VM::VMObjectModel::get_object_end_address(dst_array),
            "destination range {}+{} is out of the bounds of {}",
            dst_start,
            bytes,
            dst_array
        );
        if length == 0 {
            return Ok(());
        }

        let config = ArrayCopyConfig::new(snapshot, &self.barrier_set().options, checkcast);
        let stats = self.barrier_set().stats();
        if config.is_fast_path() {
            stats.count(&stats.arraycopy_fast);
            unsafe {
                std::ptr::copy(src_start.to_ptr::<u8>(), dst_start.to_mut_ptr::<u8>(), bytes);
            }
            return Ok(());
        }

        stats.count(&stats.arraycopy_slow[config.store_val]);
        trace!("array copy {:?} with {:?}", (src_start, dst_start, length), config);
        let bound = VM::VMObjectModel::array_element_bound(dst_array);
        let element_loop: ElementLoop<VM> = select_element_loop!(config;
            None => NoStoreVal,
            Resolve => ResolveStoreVal,
            Evacuate => EvacuateStoreVal
        );
        element_loop(self, src_start, dst_start, length, bound)
    }

    /// Copy `bytes` bytes of `src`, starting at its object reference, into `dst`.
    ///
    /// The copied references bypass the element barriers.  Instead, the regions of `dst` are
    /// marked dirty and will be rescanned.  If the forwarding pointer of `dst` lies in the copied
    /// range, it is left out of the copy.
    pub fn object_clone(&mut self, src: ObjectReference, dst: ObjectReference, bytes: usize) {
        let src = self.read_barrier(src);
        let dst = self.write_barrier(dst);
        let from = src.to_raw_address();
        let to = dst.to_raw_address();
        let end = to + bytes;
        let word = VM::VMObjectModel::ref_to_forwarding_pointer(dst);
        let word_end = word + BYTES_IN_ADDRESS;
        if word < end && to < word_end {
            let head = word.max(to) - to;
            let tail = word_end.min(end) - to;
            unsafe {
                std::ptr::copy(from.to_ptr::<u8>(), to.to_mut_ptr::<u8>(), head);
                std::ptr::copy(
                    (from + tail).to_ptr::<u8>(),
                    (to + tail).to_mut_ptr::<u8>(),
                    bytes - tail,
                );
            }
        } else {
            unsafe {
                std::ptr::copy(from.to_ptr::<u8>(), to.to_mut_ptr::<u8>(), bytes);
            }
        }
        self.barrier_set().regions().mark_dirty(to..end);
    }
}
