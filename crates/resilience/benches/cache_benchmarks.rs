//! Benchmarks for the TTL cache
//!
//! Run with: cargo bench --package rampart-resilience

use criterion::{criterion_group, criterion_main, Criterion};
use rampart_resilience::{CacheKey, TtlCache};
use std::hint::black_box;
use std::time::Duration;

fn bench_cache_key(c: &mut Criterion) {
    c.bench_function("cache_key_build", |b| {
        b.iter(|| {
            let key = CacheKey::new("web_search")
                .param("query", black_box("running shoes"))
                .param("count", black_box(10));
            black_box(key.build());
        });
    });
}

fn bench_cache_set(c: &mut Criterion) {
    let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(60));

    c.bench_function("cache_set", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            cache.set_default(format!("key-{}", i % 1024), "value".to_string());
        });
    });
}

fn bench_cache_get_hit(c: &mut Criterion) {
    let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(60));
    for i in 0..1024 {
        cache.set_default(format!("key-{}", i), "value".to_string());
    }

    c.bench_function("cache_get_hit", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            black_box(cache.get(&format!("key-{}", i % 1024)));
        });
    });
}

criterion_group!(benches, bench_cache_key, bench_cache_set, bench_cache_get_hit);
criterion_main!(benches);
