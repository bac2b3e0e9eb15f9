//! Benchmarks for masking and encoder forward passes.
//!
//! Run with: cargo bench --bench masking_bench

use burn::prelude::*;
use burn::tensor::Distribution;
use burn_ndarray::NdArray;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tsformer_models::{random_masking, MaeConfig, ViTConfig};

type BenchBackend = NdArray;

const N_VARS: usize = 4;
const SEQ_LEN: usize = 23;

fn bench_random_masking(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_masking");
    let device = Default::default();

    for batch_size in [8, 32, 128].iter() {
        let x = Tensor::<BenchBackend, 3>::random([*batch_size, SEQ_LEN, 64], Distribution::Default, &device);

        group.bench_with_input(BenchmarkId::new("mask_0.75", batch_size), batch_size, |b, _| {
            b.iter(|| black_box(random_masking(black_box(x.clone()), 0.75)))
        });
    }

    group.finish();
}

fn bench_encoder_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoder_forward");
    let device = Default::default();
    let config = MaeConfig::new(N_VARS, SEQ_LEN, 2);
    let encoder = config.init_encoder::<BenchBackend>(&device);

    for batch_size in [8, 32].iter() {
        let x = Tensor::<BenchBackend, 3>::random([*batch_size, N_VARS, SEQ_LEN], Distribution::Default, &device);

        group.bench_with_input(BenchmarkId::new("full", batch_size), batch_size, |b, _| {
            b.iter(|| black_box(encoder.forward(black_box(x.clone()))))
        });
        group.bench_with_input(BenchmarkId::new("masked_0.75", batch_size), batch_size, |b, _| {
            b.iter(|| black_box(encoder.forward_masked(black_box(x.clone()), 0.75)))
        });
    }

    group.finish();
}

fn bench_vit_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("vit_forward");
    let device = Default::default();

    for patch_len in [1, 4].iter() {
        let model = ViTConfig::new(N_VARS, SEQ_LEN, 2)
            .with_patch_len(*patch_len)
            .init::<BenchBackend>(&device);
        let x = Tensor::<BenchBackend, 3>::random([32, N_VARS, SEQ_LEN], Distribution::Default, &device);

        group.bench_with_input(BenchmarkId::new("patch_len", patch_len), patch_len, |b, _| {
            b.iter(|| black_box(model.forward(black_box(x.clone()))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_random_masking, bench_encoder_forward, bench_vit_forward);
criterion_main!(benches);
