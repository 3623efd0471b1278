// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Benchmarks for the SEAL store and the underlying Path ORAM.

extern crate criterion;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, SeedableRng};

use seal::test_utils::{arrest_schema, sample_record};
use seal::{Parameters, PathOram, Seal, DEFAULT_BLOCKS_PER_BUCKET, DEFAULT_STASH_CEILING};

const CAPACITIES_TO_BENCHMARK: [usize; 2] = [64, 256];
const PAYLOAD_CAP: usize = 1024;

fn prefilled_store(capacity: usize) -> Seal<StdRng> {
    let parameters = Parameters {
        capacity,
        ..Parameters::default()
    };
    let mut store =
        Seal::with_rng(arrest_schema(), parameters, StdRng::seed_from_u64(0)).unwrap();
    for i in 0..capacity as u64 {
        store.insert(&sample_record(i)).unwrap();
    }
    store
}

fn benchmark_initialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("initialization");
    for capacity in CAPACITIES_TO_BENCHMARK {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |bencher, &capacity| {
                let parameters = Parameters {
                    capacity,
                    ..Parameters::default()
                };
                bencher.iter(|| {
                    Seal::with_rng(
                        arrest_schema(),
                        parameters.clone(),
                        StdRng::seed_from_u64(0),
                    )
                    .unwrap()
                });
            },
        );
    }
    group.finish();
}

fn benchmark_retrieve(c: &mut Criterion) {
    let mut group = c.benchmark_group("retrieve");
    for capacity in CAPACITIES_TO_BENCHMARK {
        let mut store = prefilled_store(capacity);
        let mut id = 0u64;
        group.bench_function(BenchmarkId::from_parameter(capacity), |bencher| {
            bencher.iter(|| {
                id = id % capacity as u64 + 1;
                black_box(store.retrieve(id).unwrap());
            });
        });
    }
    group.finish();
}

fn benchmark_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    group.sample_size(20);
    for capacity in CAPACITIES_TO_BENCHMARK {
        let mut store = prefilled_store(capacity);
        group.bench_function(BenchmarkId::from_parameter(capacity), |bencher| {
            bencher.iter(|| black_box(store.query("RACE", "BLACK").unwrap()));
        });
    }
    group.finish();
}

fn benchmark_oram_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_oram_read");
    for capacity in CAPACITIES_TO_BENCHMARK {
        let mut rng = StdRng::seed_from_u64(0);
        let key = [7u8; 32];
        let mut oram = PathOram::new(
            capacity,
            DEFAULT_BLOCKS_PER_BUCKET,
            PAYLOAD_CAP,
            DEFAULT_STASH_CEILING,
            &key,
            &mut rng,
        )
        .unwrap();
        for id in 1..=capacity as u64 {
            oram.write(id, vec![0u8; 256], &mut rng).unwrap();
        }

        let mut id = 0u64;
        group.bench_function(BenchmarkId::from_parameter(capacity), |bencher| {
            bencher.iter(|| {
                id = id % capacity as u64 + 1;
                black_box(oram.read(id, &mut rng).unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_initialization,
    benchmark_retrieve,
    benchmark_query,
    benchmark_oram_read,
);
criterion_main!(benches);
