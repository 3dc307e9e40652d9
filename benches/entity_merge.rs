use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use knowledge_extractor::{entity, Entity, EntityType, Span};

fn overlapping_entities(n: usize) -> Vec<Entity> {
    (0..n)
        .map(|i| {
            let start = i * 3;
            Entity::new(format!("entity-{i}"), EntityType::Model, 0.5 + (i % 5) as f64 * 0.1)
                .with_span(Span::new(start, start + 5))
        })
        .collect()
}

fn bench_merge_overlapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_overlapping");
    for size in [16usize, 256, 4096] {
        let entities = overlapping_entities(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &entities, |b, entities| {
            b.iter(|| entity::merge_overlapping(black_box(entities)));
        });
    }
    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let entities = overlapping_entities(4096);
    c.bench_function("filter_4096", |b| {
        b.iter(|| entity::filter(black_box(&entities), Some(0.6), None));
    });
}

criterion_group!(benches, bench_merge_overlapping, bench_filter);
criterion_main!(benches);
