use criterion::Criterion;

use evac_barrier::memory_manager;
use evac_barrier::util::test_util::mock_vm::*;
use evac_barrier::GcPhase;

pub fn bench(c: &mut Criterion) {
    let env = MockEnv::new(4);
    let mut mutator = env.mutator(1);
    let holder = env.heap.alloc_object(2, 1, 1);
    let value = env.heap.alloc_object(2, 1, 0);
    let slot = field_slot(holder, 0);

    c.bench_function("store_idle", |b| {
        b.iter(|| memory_manager::object_reference_write(&mut mutator, slot, Some(value)))
    });

    env.barrier_set.set_phase(GcPhase::ConcurrentMark);
    c.bench_function("store_marking", |b| {
        b.iter(|| memory_manager::object_reference_write(&mut mutator, slot, Some(value)))
    });
    env.barrier_set.satb_queues().drain();
    env.barrier_set.set_phase(GcPhase::Idle);

    c.bench_function("compare_exchange", |b| {
        b.iter(|| {
            memory_manager::object_reference_compare_exchange(
                &mut mutator,
                slot,
                Some(value),
                Some(value),
            )
        })
    });
}
