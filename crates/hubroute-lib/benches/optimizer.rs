use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use hubroute_lib::{
    CacheConfig, CachePriority, OptimizationRequest, Point, RouteOptimizer, SmartCache,
    VehicleClass,
};
use once_cell::sync::Lazy;

static OPTIMIZER: Lazy<RouteOptimizer> = Lazy::new(RouteOptimizer::with_defaults);
static DIRECT_REQUEST: Lazy<OptimizationRequest> = Lazy::new(|| {
    OptimizationRequest::new(
        Point::origin(10.8231, 106.6297, "Ho Chi Minh City"),
        Point::destination(21.0285, 105.8542, "Hanoi"),
        VehicleClass::Truck,
    )
});
static HUB_REQUEST: Lazy<OptimizationRequest> = Lazy::new(|| {
    DIRECT_REQUEST.clone().with_hubs([
        Point::hub(18.6796, 105.6813, "Vinh"),
        Point::hub(16.0544, 108.2022, "Da Nang"),
        Point::hub(16.4637, 107.5909, "Hue"),
        Point::hub(12.2388, 109.1967, "Nha Trang"),
    ])
});

fn bench_optimizer(c: &mut Criterion) {
    c.bench_function("optimize_direct", |b| {
        b.iter(|| {
            let result = OPTIMIZER.optimize(black_box(&DIRECT_REQUEST)).expect("route");
            black_box(result);
        })
    });

    c.bench_function("optimize_with_hubs", |b| {
        b.iter(|| {
            let result = OPTIMIZER.optimize(black_box(&HUB_REQUEST)).expect("route");
            black_box(result);
        })
    });
}

fn bench_cache(c: &mut Criterion) {
    let cache: SmartCache<u64, u64> = SmartCache::new(CacheConfig {
        max_entries: 1_000,
        ..CacheConfig::default()
    });
    let ttl = Duration::from_secs(300);
    for i in 0..1_000 {
        cache.set(i, i, ttl, CachePriority::Medium);
    }

    c.bench_function("cache_get_hit", |b| {
        b.iter(|| black_box(cache.get(black_box(&500))))
    });

    let mut next = 1_000u64;
    c.bench_function("cache_set_evicting", |b| {
        b.iter(|| {
            cache.set(next, next, ttl, CachePriority::Low);
            next += 1;
        })
    });
}

criterion_group!(benches, bench_optimizer, bench_cache);
criterion_main!(benches);
