//! Sort and pool performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use parasort::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn random_data(n: usize) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    (0..n).map(|_| rng.gen()).collect()
}

fn bench_hybrid_sort(c: &mut Criterion) {
    let data = random_data(100_000);

    c.bench_function("hybrid_sort_100k_random", |b| {
        b.iter(|| {
            let mut v = data.clone();
            sort(&mut v).unwrap();
            black_box(v);
        })
    });

    c.bench_function("std_sort_by_100k_random", |b| {
        b.iter(|| {
            let mut v = data.clone();
            v.sort_by(|a, b| a.cmp(b));
            black_box(v);
        })
    });
}

fn bench_hybrid_sort_presorted(c: &mut Criterion) {
    let mut data = random_data(100_000);
    data.sort_unstable();

    c.bench_function("hybrid_sort_100k_presorted", |b| {
        b.iter(|| {
            let mut v = data.clone();
            sort(&mut v).unwrap();
            black_box(v);
        })
    });
}

fn bench_pool_submit_drain(c: &mut Criterion) {
    c.bench_function("pool_submit_drain_1000", |b| {
        let pool = ThreadPool::new(4).unwrap();
        b.iter(|| {
            let counter = Arc::new(AtomicUsize::new(0));
            for _ in 0..1000 {
                let counter = Arc::clone(&counter);
                let _ = pool.submit(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                });
            }
            pool.wait();
            black_box(counter.load(Ordering::Relaxed));
        })
    });
}

criterion_group!(
    benches,
    bench_hybrid_sort,
    bench_hybrid_sort_presorted,
    bench_pool_submit_drain
);
criterion_main!(benches);
