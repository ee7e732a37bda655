use criterion::Criterion;

use evac_barrier::memory_manager;
use evac_barrier::plan::ArraySlice;
use evac_barrier::util::test_util::mock_vm::*;
use evac_barrier::GcPhase;

const LENGTH: usize = 256;

pub fn bench(c: &mut Criterion) {
    let env = MockEnv::new(4);
    let mut mutator = env.mutator(1);
    let value = env.heap.alloc_object(3, 1, 0);
    let src = env.heap.alloc_array(2, MockType::ANY, LENGTH);
    let dst = env.heap.alloc_array(2, MockType(1), LENGTH);
    for i in 0..LENGTH {
        write_field(src, i, (i % 3 != 0).then_some(value));
    }
    let src = ArraySlice::new(src, field_offset(0));
    let dst = ArraySlice::new(dst, field_offset(0));

    c.bench_function("arraycopy_fast", |b| {
        b.iter(|| memory_manager::array_copy(&mut mutator, src, dst, LENGTH, false))
    });
    c.bench_function("arraycopy_checkcast", |b| {
        b.iter(|| memory_manager::array_copy(&mut mutator, src, dst, LENGTH, true))
    });

    env.barrier_set.set_phase(GcPhase::ConcurrentMark);
    c.bench_function("arraycopy_marking", |b| {
        b.iter(|| {
            let result = memory_manager::array_copy(&mut mutator, src, dst, LENGTH, false);
            env.barrier_set.satb_queues().drain();
            result
        })
    });
    env.barrier_set.set_phase(GcPhase::Idle);
}
