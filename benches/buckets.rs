//! Benchmarks for the bucket algorithms and registry.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use reqgate::{
    FixedWindowCounter, LimiterRegistry, Rate, SlidingWindowCounter, Strategy, TokenBucket,
};
use std::time::Duration;

fn bench_buckets(c: &mut Criterion) {
    let mut group = c.benchmark_group("buckets");

    group.bench_function("token_bucket", |b| {
        let bucket = TokenBucket::new(1_000_000.0, 1_000_000.0);
        b.iter(|| black_box(bucket.consume(1.0)))
    });

    group.bench_function("sliding_window", |b| {
        let counter = SlidingWindowCounter::new(1_000_000, Duration::from_secs(1));
        b.iter(|| black_box(counter.hit(1)))
    });

    group.bench_function("fixed_window", |b| {
        let counter = FixedWindowCounter::new(1_000_000, Duration::from_secs(1));
        b.iter(|| black_box(counter.hit(1)))
    });

    group.finish();
}

fn bench_registry_check(c: &mut Criterion) {
    let rate = Rate::per_second(1_000_000);

    let mut group = c.benchmark_group("registry_check");

    for num_keys in [1u64, 100, 10_000].iter() {
        for strategy in [Strategy::TokenBucket, Strategy::FixedWindow] {
            group.bench_with_input(
                BenchmarkId::new(strategy.name(), num_keys),
                num_keys,
                |b, &num_keys| {
                    let registry = LimiterRegistry::new(strategy);
                    let mut i = 0u64;
                    b.iter(|| {
                        i += 1;
                        let key = format!("client:{}", i % num_keys);
                        black_box(registry.check(&key, "bench", &rate, 1))
                    })
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_buckets, bench_registry_check);
criterion_main!(benches);
