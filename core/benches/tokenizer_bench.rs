use criterion::{criterion_group, criterion_main, Criterion};
use rankfuse_core::tokenizer::normalize;

fn bench_normalize(c: &mut Criterion) {
    let text = include_str!("../../data/movies.json");
    c.bench_function("normalize_sample_corpus", |b| b.iter(|| normalize(text)));
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
