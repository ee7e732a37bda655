//! A mock runtime for tests and benchmarks.
//!
//! The mock heap is a real, region-aligned block of memory.  Mock objects are laid out as
//!
//! ```text
//! [forwarding pointer][field count][type ids][field 0][field 1]...
//!                     ^ object reference
//! ```
//!
//! where the type id word holds the object's type in its low 16 bits and, for arrays, the
//! element type in the next 16 bits.  Fields are full-width [`SimpleSlot`]s.  Arrays are objects
//! whose fields are the elements.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::memory_manager;
use crate::util::constants::BYTES_IN_WORD;
use crate::util::copy::EvacuationAllocator;
use crate::util::object_forwarding;
use crate::util::options::Options;
use crate::util::{Address, ByteOffset, ByteSize, ObjectReference};
use crate::vm::{ObjectModel, SimpleSlot, Slot, VMBinding};
use crate::{BarrierSet, BarrierSetBuilder, Mutator};

pub const MOCK_LOG_BYTES_IN_REGION: usize = 12;
pub const MOCK_BYTES_IN_REGION: usize = 1 << MOCK_LOG_BYTES_IN_REGION;

/// The type id of arrays.
pub const ARRAY_TYPE: u16 = 0xffff;

const HEADER_WORDS: usize = 2;
const TYPE_MASK: usize = 0xffff;
const ELEMENT_TYPE_SHIFT: usize = 16;

#[derive(Default)]
pub struct MockVM;

impl VMBinding for MockVM {
    type VMObjectModel = MockObjectModel;
    type VMSlot = SimpleSlot;
}

/// The type bound of a mock array.  `MockType::ANY` accepts every object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockType(pub u16);

impl MockType {
    pub const ANY: MockType = MockType(0);
}

pub struct MockObjectModel;

impl MockObjectModel {
    fn num_fields(object: ObjectReference) -> usize {
        unsafe { object.to_raw_address().load::<usize>() }
    }

    fn type_word(object: ObjectReference) -> usize {
        unsafe { (object.to_raw_address() + BYTES_IN_WORD).load::<usize>() }
    }
}

impl ObjectModel<MockVM> for MockObjectModel {
    const FORWARDING_POINTER_OFFSET: ByteOffset = -(BYTES_IN_WORD as isize);

    type TypeBound = MockType;

    fn get_current_size(object: ObjectReference) -> usize {
        (1 + HEADER_WORDS + Self::num_fields(object)) * BYTES_IN_WORD
    }

    fn get_size_when_copied(object: ObjectReference) -> usize {
        Self::get_current_size(object)
    }

    fn get_align_when_copied(_object: ObjectReference) -> usize {
        BYTES_IN_WORD
    }

    fn copy_to(from: ObjectReference, to: Address) -> ObjectReference {
        let bytes = Self::get_current_size(from);
        unsafe {
            std::ptr::copy_nonoverlapping(
                Self::ref_to_object_start(from).to_ptr::<u8>(),
                to.to_mut_ptr::<u8>(),
                bytes,
            );
        }
        ObjectReference::from_raw_address(to + BYTES_IN_WORD).unwrap()
    }

    fn ref_to_object_start(object: ObjectReference) -> Address {
        object.to_raw_address() - BYTES_IN_WORD
    }

    fn array_element_bound(array: ObjectReference) -> MockType {
        MockType(((Self::type_word(array) >> ELEMENT_TYPE_SHIFT) & TYPE_MASK) as u16)
    }

    fn is_instance_of(object: ObjectReference, bound: MockType) -> bool {
        bound == MockType::ANY || type_id(object) == bound.0
    }
}

/// The type id of a mock object.
pub fn type_id(object: ObjectReference) -> u16 {
    (MockObjectModel::type_word(object) & TYPE_MASK) as u16
}

pub fn num_fields(object: ObjectReference) -> usize {
    MockObjectModel::num_fields(object)
}

/// The offset of a field (or array element) from the object reference.
pub fn field_offset(index: usize) -> ByteSize {
    (HEADER_WORDS + index) * BYTES_IN_WORD
}

/// The slot of a field (or array element).
pub fn field_slot(object: ObjectReference, index: usize) -> SimpleSlot {
    debug_assert!(index < num_fields(object), "field {} of {}", index, object);
    SimpleSlot::from_address(object.to_raw_address() + field_offset(index))
}

/// Read a field without a barrier.
pub fn read_field(object: ObjectReference, index: usize) -> Option<ObjectReference> {
    field_slot(object, index).load()
}

/// Write a field without a barrier.
pub fn write_field(object: ObjectReference, index: usize, value: Option<ObjectReference>) {
    field_slot(object, index).store(value)
}

/// The mock heap: `regions` regions of `MOCK_BYTES_IN_REGION` bytes with a bump pointer each.
pub struct MockHeap {
    start: Address,
    layout: Layout,
    cursors: Box<[AtomicUsize]>,
}

impl MockHeap {
    pub fn new(regions: usize) -> Self {
        let layout = Layout::from_size_align(regions * MOCK_BYTES_IN_REGION, MOCK_BYTES_IN_REGION)
            .unwrap();
        let start = unsafe { alloc_zeroed(layout) };
        assert!(!start.is_null(), "failed to allocate the mock heap");
        Self {
            start: Address::from_mut_ptr(start),
            layout,
            cursors: (0..regions).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn bytes(&self) -> usize {
        self.layout.size()
    }

    pub fn regions(&self) -> usize {
        self.cursors.len()
    }

    pub fn region_start(&self, region: usize) -> Address {
        self.start + region * MOCK_BYTES_IN_REGION
    }

    /// Bytes allocated in a region so far.
    pub fn used_bytes(&self, region: usize) -> usize {
        self.cursors[region].load(Ordering::Relaxed)
    }

    /// Allocate zeroed, word-aligned memory in a region.  Thread-safe.
    pub fn alloc_in_region(&self, region: usize, bytes: usize) -> Option<Address> {
        let bytes = crate::util::conversions::raw_align_up(bytes, BYTES_IN_WORD);
        self.cursors[region]
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                (used + bytes <= MOCK_BYTES_IN_REGION).then_some(used + bytes)
            })
            .ok()
            .map(|used| self.region_start(region) + used)
    }

    fn init_object(start: Address, type_word: usize, num_fields: usize) -> ObjectReference {
        let object = ObjectReference::from_raw_address(start + BYTES_IN_WORD).unwrap();
        unsafe {
            object.to_raw_address().store::<usize>(num_fields);
            (object.to_raw_address() + BYTES_IN_WORD).store::<usize>(type_word);
        }
        object_forwarding::initialize_forwarding_pointer::<MockVM>(object);
        object
    }

    /// Allocate an object with null fields.
    pub fn alloc_object(&self, region: usize, type_id: u16, num_fields: usize) -> ObjectReference {
        let bytes = (1 + HEADER_WORDS + num_fields) * BYTES_IN_WORD;
        let start = self
            .alloc_in_region(region, bytes)
            .unwrap_or_else(|| panic!("mock region {} is full", region));
        Self::init_object(start, type_id as usize, num_fields)
    }

    /// Allocate an array whose elements are bounded by `element_type`.
    pub fn alloc_array(&self, region: usize, element_type: MockType, length: usize) -> ObjectReference {
        let array = self.alloc_object(region, ARRAY_TYPE, length);
        let type_word = ARRAY_TYPE as usize | ((element_type.0 as usize) << ELEMENT_TYPE_SHIFT);
        unsafe { (array.to_raw_address() + BYTES_IN_WORD).store::<usize>(type_word) };
        array
    }
}

impl Drop for MockHeap {
    fn drop(&mut self) {
        unsafe { dealloc(self.start.to_mut_ptr::<u8>(), self.layout) }
    }
}

/// An evacuation allocator that bump-allocates copies in one region of a mock heap.
pub struct MockCopyAllocator {
    heap: &'static MockHeap,
    region: usize,
    /// Fail every allocation, as if the heap was exhausted.
    pub exhausted: bool,
    pub allocated: usize,
    pub discarded: Vec<(Address, usize)>,
}

impl MockCopyAllocator {
    pub fn new(heap: &'static MockHeap, region: usize) -> Self {
        Self {
            heap,
            region,
            exhausted: false,
            allocated: 0,
            discarded: vec![],
        }
    }
}

impl EvacuationAllocator for MockCopyAllocator {
    fn alloc_copy(&mut self, original: ObjectReference, bytes: usize, align: usize) -> Option<Address> {
        debug_assert!(align <= BYTES_IN_WORD, "cannot align {} to {}", original, align);
        if self.exhausted {
            return None;
        }
        let result = self.heap.alloc_in_region(self.region, bytes);
        if result.is_some() {
            self.allocated += 1;
        }
        result
    }

    fn discard_copy(&mut self, start: Address, bytes: usize) {
        self.discarded.push((start, bytes));
    }
}

/// A leaked mock heap with a barrier set for it.
pub struct MockEnv {
    pub heap: &'static MockHeap,
    pub barrier_set: &'static BarrierSet<MockVM>,
}

impl MockEnv {
    pub fn new(regions: usize) -> Self {
        Self::with_options(regions, |_| {})
    }

    /// Create an environment with options changed by `set_options`.  The options start from the
    /// built-in defaults and do not read environment variables.
    pub fn with_options<F: FnOnce(&mut Options)>(regions: usize, set_options: F) -> Self {
        let heap: &'static MockHeap = Box::leak(Box::new(MockHeap::new(regions)));
        let mut options = Options::builtin_defaults();
        options.log_bytes_in_region = MOCK_LOG_BYTES_IN_REGION;
        set_options(&mut options);
        let builder = BarrierSetBuilder::with_options(options);
        let barrier_set: &'static BarrierSet<MockVM> = Box::leak(memory_manager::barrier_set_init(
            &builder,
            heap.start(),
            heap.bytes(),
        ));
        Self { heap, barrier_set }
    }

    /// Create a mutator that evacuates into `to_region`.
    pub fn mutator(&self, to_region: usize) -> Box<Mutator<MockVM>> {
        memory_manager::bind_mutator(
            self.barrier_set,
            Box::new(MockCopyAllocator::new(self.heap, to_region)),
        )
    }

    /// Start an evacuating phase with `regions` as the collection set.
    pub fn start_evacuation(&self, phase: crate::GcPhase, regions: &[usize]) {
        for region in regions {
            self.barrier_set.regions().add_to_collection_set(*region);
        }
        self.barrier_set.set_has_forwarded_objects(true);
        self.barrier_set.set_phase(phase);
    }
}

/// The allocator of a mock mutator.
pub fn copy_allocator(mutator: &Mutator<MockVM>) -> &MockCopyAllocator {
    mutator
        .evacuation_allocator::<MockCopyAllocator>()
        .expect("not a mock mutator")
}

pub fn copy_allocator_mut(mutator: &mut Mutator<MockVM>) -> &mut MockCopyAllocator {
    mutator
        .evacuation_allocator_mut::<MockCopyAllocator>()
        .expect("not a mock mutator")
}
