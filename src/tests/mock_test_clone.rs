use super::mock_test_prelude::*;
use crate::util::constants::BYTES_IN_WORD;
use crate::util::options::Options;
use crate::util::ByteOffset;
use crate::{BarrierSet, BarrierSetBuilder};

const FROM: usize = 0;
const TO: usize = 1;
const OTHER: usize = 2;

fn clone_bytes(object: ObjectReference) -> usize {
    // The header and the fields, which follow the object reference.
    field_offset(num_fields(object))
}

#[test]
fn clone_copies_fields_and_dirties_destination() {
    let env = MockEnv::new(4);
    let mut mutator = env.mutator(TO);
    let a = Some(env.heap.alloc_object(OTHER, 1, 0));
    let src = env.heap.alloc_object(OTHER, 4, 3);
    let dst = env.heap.alloc_object(3, 4, 3);
    write_field(src, 0, a);
    write_field(src, 2, a);

    memory_manager::object_clone(&mut mutator, src, dst, clone_bytes(src));
    assert_eq!(read_field(dst, 0), a);
    assert_eq!(read_field(dst, 1), None);
    assert_eq!(read_field(dst, 2), a);
    assert_eq!(type_id(dst), 4);
    // The forwarding pointer of the destination is not touched.
    assert!(!object_forwarding::is_forwarded::<MockVM>(dst));

    let regions = env.barrier_set.regions();
    assert_eq!(regions.dirty_regions().collect::<Vec<_>>(), vec![3]);
    regions.clear_dirty();
    assert_eq!(regions.dirty_regions().count(), 0);
}

#[test]
fn clone_reads_from_copy_of_source() {
    let env = MockEnv::new(4);
    let mut mutator = env.mutator(TO);
    let a = Some(env.heap.alloc_object(OTHER, 1, 0));
    let src = env.heap.alloc_object(FROM, 4, 1);
    let dst = env.heap.alloc_object(OTHER, 4, 1);
    env.start_evacuation(GcPhase::Evacuation, &[FROM]);
    let src_copy = mutator.barrier.write_barrier(src);
    // Only the copy is updated after evacuation.
    write_field(src_copy, 0, a);

    memory_manager::object_clone(&mut mutator, src, dst, clone_bytes(src));
    assert_eq!(read_field(dst, 0), a);
}

#[test]
fn clone_into_collection_set_writes_the_copy() {
    let env = MockEnv::new(4);
    let mut mutator = env.mutator(TO);
    let a = Some(env.heap.alloc_object(OTHER, 1, 0));
    let src = env.heap.alloc_object(OTHER, 4, 1);
    let dst = env.heap.alloc_object(FROM, 4, 1);
    write_field(src, 0, a);
    env.start_evacuation(GcPhase::Evacuation, &[FROM]);

    memory_manager::object_clone(&mut mutator, src, dst, clone_bytes(src));
    let dst_copy = memory_manager::resolve_forwarded_not_null::<MockVM>(dst);
    assert_ne!(dst_copy, dst);
    assert_eq!(read_field(dst_copy, 0), a);
    assert_eq!(read_field(dst, 0), None);
    let regions = env.barrier_set.regions();
    assert_eq!(regions.dirty_regions().collect::<Vec<_>>(), vec![TO]);
}

/// A runtime whose forwarding pointer is the first word of an object, at the object reference.
/// It shares the mock heap layout: its reference is the start of a mock object.
#[derive(Default)]
struct HeaderForwardingVM;

struct HeaderForwardingObjectModel;

impl VMBinding for HeaderForwardingVM {
    type VMObjectModel = HeaderForwardingObjectModel;
    type VMSlot = SimpleSlot;
}

fn as_mock(object: ObjectReference) -> ObjectReference {
    ObjectReference::from_raw_address(object.to_raw_address() + BYTES_IN_WORD).unwrap()
}

fn from_mock(object: ObjectReference) -> ObjectReference {
    ObjectReference::from_raw_address(object.to_raw_address() - BYTES_IN_WORD).unwrap()
}

impl ObjectModel<HeaderForwardingVM> for HeaderForwardingObjectModel {
    const FORWARDING_POINTER_OFFSET: ByteOffset = 0;

    type TypeBound = MockType;

    fn get_current_size(object: ObjectReference) -> usize {
        <MockObjectModel as ObjectModel<MockVM>>::get_current_size(as_mock(object))
    }

    fn get_size_when_copied(object: ObjectReference) -> usize {
        Self::get_current_size(object)
    }

    fn get_align_when_copied(_object: ObjectReference) -> usize {
        BYTES_IN_WORD
    }

    fn copy_to(from: ObjectReference, _to: Address) -> ObjectReference {
        unreachable!("{} is not in the collection set", from)
    }

    fn ref_to_object_start(object: ObjectReference) -> Address {
        object.to_raw_address()
    }

    fn array_element_bound(_array: ObjectReference) -> MockType {
        MockType::ANY
    }

    fn is_instance_of(_object: ObjectReference, _bound: MockType) -> bool {
        true
    }
}

#[test]
fn clone_skips_forwarding_pointer_in_copied_range() {
    let heap: &'static MockHeap = Box::leak(Box::new(MockHeap::new(4)));
    let mut options = Options::builtin_defaults();
    options.log_bytes_in_region = MOCK_LOG_BYTES_IN_REGION;
    let barrier_set: &'static BarrierSet<HeaderForwardingVM> = Box::leak(
        memory_manager::barrier_set_init(
            &BarrierSetBuilder::with_options(options),
            heap.start(),
            heap.bytes(),
        ),
    );
    let mut mutator =
        memory_manager::bind_mutator(barrier_set, Box::new(MockCopyAllocator::new(heap, TO)));

    let a = Some(heap.alloc_object(OTHER, 1, 0));
    let src = heap.alloc_object(OTHER, 4, 2);
    let dst = heap.alloc_object(3, 4, 2);
    write_field(src, 1, a);
    let (src, dst) = (from_mock(src), from_mock(dst));
    object_forwarding::initialize_forwarding_pointer::<HeaderForwardingVM>(src);
    object_forwarding::initialize_forwarding_pointer::<HeaderForwardingVM>(dst);

    // The copied range starts with the forwarding pointer.
    let bytes = HeaderForwardingObjectModel::get_current_size(src);
    memory_manager::object_clone(&mut mutator, src, dst, bytes);

    assert_eq!(
        memory_manager::resolve_forwarded_not_null::<HeaderForwardingVM>(dst),
        dst
    );
    assert_eq!(read_field(as_mock(dst), 0), None);
    assert_eq!(read_field(as_mock(dst), 1), a);
    assert_eq!(type_id(as_mock(dst)), 4);
    assert_eq!(barrier_set.regions().dirty_regions().collect::<Vec<_>>(), vec![3]);
}
