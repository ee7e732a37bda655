use super::mock_test_prelude::*;

const FROM: usize = 0;
const TO: usize = 1;
const OTHER: usize = 2;

fn drained(env: &MockEnv) -> Vec<ObjectReference> {
    env.barrier_set.satb_queues().drain()
}

#[test]
fn overwritten_values_are_recorded_during_marking() {
    let env = MockEnv::with_options(4, |options| options.satb_buffer_size = 4);
    let mut mutator = env.mutator(TO);
    let holder = env.heap.alloc_object(OTHER, 1, 1);
    let values: Vec<_> = (0..10).map(|_| env.heap.alloc_object(OTHER, 2, 0)).collect();
    let slot = field_slot(holder, 0);

    env.barrier_set.set_phase(GcPhase::ConcurrentMark);
    let mut expected = vec![];
    for value in &values {
        if let Some(old) = slot.load() {
            expected.push(old);
        }
        memory_manager::object_reference_write(&mut mutator, slot, Some(*value));
    }
    // Overwriting with null records the last value too.
    expected.push(values[9]);
    memory_manager::object_reference_write(&mut mutator, slot, None);
    assert_eq!(slot.load(), None);

    // Full buffers were handed over without an explicit flush.
    assert!(env.barrier_set.satb_queues().completed_buffers() >= 2);
    memory_manager::flush_mutator(&mut mutator);
    assert_eq!(drained(&env), expected);
    assert!(mutator.barrier.satb_buffer().is_empty());
}

#[test]
fn nothing_is_recorded_outside_marking() {
    let env = MockEnv::new(4);
    let mut mutator = env.mutator(TO);
    let holder = env.heap.alloc_object(OTHER, 1, 1);
    let a = env.heap.alloc_object(OTHER, 2, 0);
    let b = env.heap.alloc_object(OTHER, 2, 0);
    let slot = field_slot(holder, 0);

    for phase in [GcPhase::Idle, GcPhase::UpdateRefs, GcPhase::Evacuation] {
        env.barrier_set.set_phase(phase);
        memory_manager::object_reference_write(&mut mutator, slot, Some(a));
        memory_manager::object_reference_write(&mut mutator, slot, Some(b));
    }
    memory_manager::flush_mutator(&mut mutator);
    assert!(drained(&env).is_empty());
}

#[test]
fn satb_option_disables_recording() {
    let env = MockEnv::with_options(4, |options| options.satb_barrier = false);
    let mut mutator = env.mutator(TO);
    let holder = env.heap.alloc_object(OTHER, 1, 1);
    let a = env.heap.alloc_object(OTHER, 2, 0);
    write_field(holder, 0, Some(a));

    env.barrier_set.set_phase(GcPhase::ConcurrentMark);
    memory_manager::object_reference_write(&mut mutator, field_slot(holder, 0), None);
    memory_manager::flush_mutator(&mut mutator);
    assert!(drained(&env).is_empty());
}

#[test]
fn destroyed_mutator_hands_over_its_buffer() {
    let env = MockEnv::new(4);
    let mut mutator = env.mutator(TO);
    let holder = env.heap.alloc_object(OTHER, 1, 1);
    let a = env.heap.alloc_object(OTHER, 2, 0);
    write_field(holder, 0, Some(a));

    env.barrier_set.set_phase(GcPhase::ConcurrentMark);
    memory_manager::object_reference_write(&mut mutator, field_slot(holder, 0), None);
    assert!(drained(&env).is_empty());
    memory_manager::destroy_mutator(mutator);
    assert_eq!(drained(&env), vec![a]);
}

#[test]
fn stores_resolve_forwarded_values() {
    let env = MockEnv::new(4);
    let mut mutator = env.mutator(TO);
    let holder = env.heap.alloc_object(OTHER, 1, 1);
    let value = env.heap.alloc_object(FROM, 2, 0);
    env.start_evacuation(GcPhase::Evacuation, &[FROM]);
    let copy = mutator.barrier.write_barrier(value);

    // Evacuation does not change stored values.
    memory_manager::object_reference_write(&mut mutator, field_slot(holder, 0), Some(value));
    assert_eq!(read_field(holder, 0), Some(value));

    env.barrier_set.set_phase(GcPhase::UpdateRefs);
    memory_manager::object_reference_write(&mut mutator, field_slot(holder, 0), Some(value));
    assert_eq!(read_field(holder, 0), Some(copy));
}

#[test]
fn traversal_stores_evacuate_and_record_values() {
    let env = MockEnv::new(4);
    let mut mutator = env.mutator(TO);
    let holder = env.heap.alloc_object(OTHER, 1, 1);
    let value = env.heap.alloc_object(FROM, 2, 0);
    let outside = env.heap.alloc_object(OTHER, 2, 0);
    env.start_evacuation(GcPhase::ConcurrentTraversal, &[FROM]);

    memory_manager::object_reference_write(&mut mutator, field_slot(holder, 0), Some(value));
    let copy = read_field(holder, 0).unwrap();
    assert_ne!(copy, value);
    assert_eq!(memory_manager::resolve_forwarded_not_null::<MockVM>(value), copy);
    assert_eq!(env.barrier_set.regions().region_of(copy), TO);

    memory_manager::object_reference_write(&mut mutator, field_slot(holder, 0), Some(outside));
    assert_eq!(read_field(holder, 0), Some(outside));

    memory_manager::flush_mutator(&mut mutator);
    assert_eq!(drained(&env), vec![copy, outside]);
}

#[test]
fn connections_are_recorded_when_enabled() {
    let env = MockEnv::with_options(4, |options| {
        options.connection_matrix = true;
        options.barrier_stats = true;
    });
    let mut mutator = env.mutator(TO);
    let holder = env.heap.alloc_object(OTHER, 1, 2);
    let target = env.heap.alloc_object(3, 2, 0);

    memory_manager::object_reference_write(&mut mutator, field_slot(holder, 0), Some(target));
    memory_manager::object_reference_write(&mut mutator, field_slot(holder, 1), Some(target));
    memory_manager::object_reference_write(&mut mutator, field_slot(holder, 1), None);

    let matrix = env.barrier_set.connection_matrix().unwrap();
    assert!(matrix.is_connected(OTHER, 3));
    assert_eq!(matrix.sources_of(3).collect::<Vec<_>>(), vec![OTHER]);
    assert_eq!(matrix.sources_of(OTHER).count(), 0);
    assert_eq!(env.barrier_set.stats().connections_recorded.get(), 1);
}

#[test]
fn no_matrix_when_disabled() {
    let env = MockEnv::new(4);
    let mut mutator = env.mutator(TO);
    let holder = env.heap.alloc_object(OTHER, 1, 1);
    let target = env.heap.alloc_object(3, 2, 0);
    memory_manager::object_reference_write(&mut mutator, field_slot(holder, 0), Some(target));
    assert!(env.barrier_set.connection_matrix().is_none());
    // Recording directly is a no-op.
    memory_manager::record_connection(&mutator, field_slot(holder, 0).as_address(), target);
}

#[test]
fn swap_returns_and_records_previous_value() {
    let env = MockEnv::with_options(4, |options| options.connection_matrix = true);
    let mut mutator = env.mutator(TO);
    let holder = env.heap.alloc_object(OTHER, 1, 1);
    let a = env.heap.alloc_object(OTHER, 2, 0);
    let b = env.heap.alloc_object(3, 2, 0);
    let slot = field_slot(holder, 0);

    env.barrier_set.set_phase(GcPhase::ConcurrentMark);
    assert_eq!(memory_manager::object_reference_swap(&mut mutator, slot, Some(a)), None);
    assert_eq!(memory_manager::object_reference_swap(&mut mutator, slot, Some(b)), Some(a));
    assert_eq!(memory_manager::object_reference_swap(&mut mutator, slot, None), Some(b));
    assert_eq!(slot.load(), None);

    memory_manager::flush_mutator(&mut mutator);
    assert_eq!(drained(&env), vec![a, b]);
    let matrix = env.barrier_set.connection_matrix().unwrap();
    assert!(matrix.is_connected(OTHER, OTHER));
    assert!(matrix.is_connected(OTHER, 3));
}

#[test]
fn explicit_enqueue() {
    let env = MockEnv::new(4);
    let mut mutator = env.mutator(TO);
    let a = env.heap.alloc_object(OTHER, 2, 0);
    memory_manager::satb_enqueue(&mut mutator, a);
    memory_manager::satb_enqueue(&mut mutator, a);
    assert_eq!(mutator.barrier.satb_buffer().entries(), &[a, a]);
    memory_manager::flush_mutator(&mut mutator);
    assert_eq!(drained(&env), vec![a, a]);
}
