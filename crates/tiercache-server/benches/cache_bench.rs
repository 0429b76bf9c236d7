use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tiercache_core::{CacheKey, CacheUpdate, CacheValue};
use tiercache_server::LocalCache;
use tokio::runtime::Runtime;

/// Payload JSON de prueba con N campos
fn create_payload(num_fields: usize) -> CacheValue {
    let mut object = serde_json::Map::new();
    for i in 0..num_fields {
        object.insert(format!("field_{}", i), serde_json::json!(format!("value-{}", i)));
    }
    CacheValue::from(serde_json::Value::Object(object).to_string())
}

fn key(i: u64) -> CacheKey {
    CacheKey::project("org", &format!("repo-{}", i)).unwrap()
}

/// Benchmark: Local cache get (hit)
fn bench_local_get_hit(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = LocalCache::new();
    let key = key(0);

    rt.block_on(async {
        cache.set(key.clone(), create_payload(100)).await;
    });

    c.bench_function("local_get_hit", |b| {
        b.to_async(&rt).iter(|| async {
            let result = cache.get(&key).await;
            std::hint::black_box(result)
        });
    });
}

/// Benchmark: Local cache get (miss)
fn bench_local_get_miss(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = LocalCache::new();
    let key = CacheKey::project("nonexistent", "repo").unwrap();

    c.bench_function("local_get_miss", |b| {
        b.to_async(&rt).iter(|| async {
            let result = cache.get(&key).await;
            std::hint::black_box(result)
        });
    });
}

/// Benchmark: Local cache set con diferentes tamanos de payload
fn bench_local_set_varying_sizes(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("local_set_sizes");

    for size in [10, 100, 1000].iter() {
        let cache = LocalCache::new();
        let payload = create_payload(*size);
        let counter = Arc::new(AtomicU64::new(0));

        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _size| {
            b.to_async(&rt).iter(|| {
                let cache = cache.clone();
                let payload = payload.clone();
                let counter = Arc::clone(&counter);
                async move {
                    let count = counter.fetch_add(1, Ordering::Relaxed);
                    cache.set(key(count), payload).await;
                }
            });
        });
    }

    group.finish();
}

/// Benchmark: decode de mensajes de update
fn bench_update_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_decode");

    for size in [10, 100, 1000].iter() {
        let message = CacheUpdate::set(key(0), &create_payload(*size))
            .unwrap()
            .to_json()
            .unwrap();

        group.throughput(Throughput::Bytes(message.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &message, |b, message| {
            b.iter(|| std::hint::black_box(CacheUpdate::from_json(message).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark: Concurrencia - multiples gets simultaneos
fn bench_local_concurrent_gets(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = LocalCache::new();

    rt.block_on(async {
        for i in 0..1000 {
            cache.set(key(i), create_payload(50)).await;
        }
    });

    c.bench_function("local_concurrent_gets_100", |b| {
        b.to_async(&rt).iter(|| {
            let cache = cache.clone();
            async move {
                let handles: Vec<_> = (0..100)
                    .map(|i| {
                        let cache = cache.clone();
                        tokio::spawn(async move { cache.get(&key(i % 1000)).await })
                    })
                    .collect();

                for handle in handles {
                    let _ = handle.await;
                }
            }
        });
    });
}

criterion_group!(
    benches,
    bench_local_get_hit,
    bench_local_get_miss,
    bench_local_set_varying_sizes,
    bench_update_decode,
    bench_local_concurrent_gets,
);

criterion_main!(benches);
