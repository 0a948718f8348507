// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Kernel Performance Benchmarks
//!
//! Measures batch throughput of the CPU kernel at several batch sizes, the
//! cost of splitting a horizon into chained windows, and the GPU kernel when
//! one is available.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use somasim_engine::{CpuKernel, Model, Solver, TimeWindow, ZeroStimulus};

const STEPS: usize = 1_000;

fn create_batch(count: u32) -> Vec<Model> {
    (0..count)
        .map(|i| Model::hodgkin_huxley(i, -10.0, 0.0, 0.0, 1.0, 0.0))
        .collect()
}

/// Benchmark one window on the CPU kernel
fn bench_cpu_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_kernel");
    group.sample_size(10);

    let test_sizes = vec![(30, "30"), (1_000, "1K"), (10_000, "10K")];
    let window = TimeWindow::new(0.01, STEPS, 10).unwrap();

    for (count, label) in test_sizes {
        let models = create_batch(count);
        group.throughput(Throughput::Elements(count as u64 * STEPS as u64));

        group.bench_with_input(BenchmarkId::new("single_window", label), &models, |b, models| {
            let mut solver = Solver::new(CpuKernel::default());
            b.iter(|| solver.solve(black_box(models), black_box(&window)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark chained windows against one window covering the same horizon
fn bench_chaining_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_chaining");
    group.sample_size(10);

    let models = create_batch(1_000);
    let total = TimeWindow::new(0.01, STEPS * 4, 10).unwrap();

    for parts in [1usize, 4, 20] {
        let windows = total.split(parts).unwrap();
        group.bench_with_input(BenchmarkId::new("windows", parts), &windows, |b, windows| {
            let mut solver = Solver::new(CpuKernel::default());
            b.iter(|| {
                solver
                    .solve_chained(black_box(&models), black_box(windows), &mut ZeroStimulus)
                    .unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark the GPU kernel (if available)
#[cfg(feature = "gpu")]
fn bench_gpu_kernel(c: &mut Criterion) {
    use somasim_engine::{is_gpu_available, HHConstants, WgpuKernel};

    if !is_gpu_available() {
        println!("GPU not available, skipping GPU benchmarks");
        return;
    }

    let mut group = c.benchmark_group("gpu_kernel");
    group.sample_size(10);
    let window = TimeWindow::new(0.01, STEPS, 10).unwrap();

    for (count, label) in [(1_000u32, "1K"), (10_000, "10K"), (100_000, "100K")] {
        let kernel = match WgpuKernel::new(HHConstants::default()) {
            Ok(k) => k,
            Err(e) => {
                println!("Failed to create GPU kernel for {}: {}", label, e);
                continue;
            }
        };
        let mut solver = Solver::new(kernel);
        let models = create_batch(count);
        group.throughput(Throughput::Elements(count as u64 * STEPS as u64));

        group.bench_with_input(BenchmarkId::new("single_window", label), &models, |b, models| {
            b.iter(|| solver.solve(black_box(models), black_box(&window)));
        });
    }

    group.finish();
}

#[cfg(feature = "gpu")]
criterion_group!(
    benches,
    bench_cpu_kernel,
    bench_chaining_overhead,
    bench_gpu_kernel
);

#[cfg(not(feature = "gpu"))]
criterion_group!(benches, bench_cpu_kernel, bench_chaining_overhead);

criterion_main!(benches);
