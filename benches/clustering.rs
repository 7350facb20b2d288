use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use splitmeans::cluster::{Clusterer, GMeans, Kmeans, XMeans};

fn blobs(n_per: usize, d: usize, k: usize) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut data = Vec::with_capacity(n_per * k);
    for c in 0..k {
        let offset = c as f32 * 10.0;
        for _ in 0..n_per {
            data.push(
                (0..d)
                    .map(|_| offset + rng.random::<f32>() - 0.5)
                    .collect(),
            );
        }
    }
    data
}

fn bench_kmeans(c: &mut Criterion) {
    let mut group = c.benchmark_group("kmeans");
    let data = blobs(100, 16, 10);

    group.bench_function("fit_n1000_d16_k10", |b| {
        b.iter(|| {
            let model = Kmeans::new(10).with_max_iter(10).with_seed(42);
            model.fit(black_box(&data)).unwrap();
        })
    });

    group.finish();
}

fn bench_adaptive(c: &mut Criterion) {
    let mut group = c.benchmark_group("adaptive");
    let data = blobs(100, 16, 10);

    group.bench_function("gmeans_n1000_d16", |b| {
        b.iter(|| {
            let model = GMeans::new().with_max_clusters(32);
            model.fit(black_box(&data)).unwrap();
        })
    });

    group.bench_function("xmeans_n1000_d16", |b| {
        b.iter(|| {
            let model = XMeans::new().with_max_clusters(32);
            model.fit(black_box(&data)).unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_kmeans, bench_adaptive);
criterion_main!(benches);
