use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use scriptfilter_core::{BuiltinIcon, CacheKey, ResponseBuilder, ResponseCache, ResultItem};
use tempfile::tempdir;

fn builder_with(items: usize) -> ResponseBuilder {
    let mut builder = ResponseBuilder::new();
    for i in 0..items {
        let item = ResultItem::new(format!("Result {i}"))
            .unwrap()
            .with_subtitle(format!("https://example.com/results/{i}"))
            .with_uid(format!("result-{i}"))
            .with_icon(BuiltinIcon::Info);
        builder.add_result(item);
    }
    builder
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("document_to_json");

    for items in [1, 20, 200] {
        let builder = builder_with(items);
        group.throughput(Throughput::Elements(items as u64));
        group.bench_with_input(BenchmarkId::from_parameter(items), &builder, |b, builder| {
            b.iter(|| black_box(builder).to_json().unwrap());
        });
    }

    group.finish();
}

fn bench_cache_probe(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_probe_cold");

    for entries in [1, 50, 500] {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        let mut cache = ResponseCache::new(path.clone());
        for i in 0..entries {
            cache
                .store(CacheKey::new(format!("query {i}"), 0), builder_with(5).document())
                .unwrap();
        }

        let key = CacheKey::new("query 0", 0);
        group.bench_with_input(BenchmarkId::from_parameter(entries), &path, |b, path| {
            // A fresh cache per iteration: every invocation is a new process
            b.iter(|| ResponseCache::new(path.clone()).load(black_box(&key)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_serialize, bench_cache_probe);
criterion_main!(benches);
