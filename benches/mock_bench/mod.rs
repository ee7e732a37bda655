use criterion::Criterion;

pub mod arraycopy;
pub mod store;

pub fn bench(c: &mut Criterion) {
    store::bench(c);
    arraycopy::bench(c);
}
