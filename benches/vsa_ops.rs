//! Benchmarks for VSA operations, both representation modes.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;

use hdc_classifier::simd;
use hdc_classifier::vsa::ops::VsaOps;
use hdc_classifier::vsa::{Dimension, Mode};

fn bench_bind(c: &mut Criterion) {
    let ops = VsaOps::new(simd::best_kernel());
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    for mode in [Mode::Binary, Mode::Bipolar] {
        let a = ops.random(Dimension::DEFAULT, mode, &mut rng);
        let b = ops.random(Dimension::DEFAULT, mode, &mut rng);
        c.bench_function(&format!("bind_10k_{mode:?}"), |bench| {
            bench.iter(|| black_box(ops.bind(&a, &b).unwrap()))
        });
    }
}

fn bench_bundle_multi(c: &mut Criterion) {
    let ops = VsaOps::new(simd::best_kernel());
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    for mode in [Mode::Binary, Mode::Bipolar] {
        let vecs: Vec<_> = (0..10).map(|_| ops.random(Dimension::DEFAULT, mode, &mut rng)).collect();
        let refs: Vec<&_> = vecs.iter().collect();
        c.bench_function(&format!("bundle_multi_10x10k_{mode:?}"), |bench| {
            bench.iter(|| black_box(ops.bundle_multi(&refs).unwrap()))
        });
    }
}

fn bench_similarity(c: &mut Criterion) {
    let ops = VsaOps::new(simd::best_kernel());
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    for mode in [Mode::Binary, Mode::Bipolar] {
        let a = ops.random(Dimension::DEFAULT, mode, &mut rng);
        let b = ops.random(Dimension::DEFAULT, mode, &mut rng);
        c.bench_function(&format!("similarity_10k_{mode:?}"), |bench| {
            bench.iter(|| black_box(ops.similarity(&a, &b).unwrap()))
        });
    }
}

fn bench_permute(c: &mut Criterion) {
    let ops = VsaOps::new(simd::best_kernel());
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let a = ops.random(Dimension::DEFAULT, Mode::Binary, &mut rng);
    c.bench_function("permute_binary_10k", |bench| {
        bench.iter(|| black_box(ops.permute(&a, 1)))
    });
}

criterion_group!(benches, bench_bind, bench_bundle_multi, bench_similarity, bench_permute);
criterion_main!(benches);
