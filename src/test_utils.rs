// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Common test utilities shared by unit tests and benchmarks.

#![allow(clippy::missing_panics_doc)]

use rand::{rngs::StdRng, Rng, SeedableRng};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::collections::HashMap;

use crate::{path_oram::DEFAULT_STASH_CEILING, BucketSize, PathOram, Record, Schema};

/// Initializes a terminal logger once; later calls are no-ops.
pub fn init_logger() {
    let _ = TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}

/// The reference dataset schema used across tests, demos, and benchmarks.
pub fn arrest_schema() -> Schema {
    Schema::new([
        "CB_NO",
        "CASE_NUMBER",
        "ARREST_DATE",
        "RACE",
        "CHARGE_1_STATUTE",
        "CHARGE_1_DESCRIPTION",
        "CHARGE_1_TYPE",
        "CHARGE_1_CLASS",
    ])
    .unwrap()
}

/// A deterministic sample record for the arrest schema.
pub fn sample_record(i: u64) -> Record {
    const RACES: [&str; 4] = ["BLACK", "WHITE", "ASIAN", "HISPANIC"];
    Record::new()
        .with("CB_NO", format!("{}", 19770000 + i))
        .with("CASE_NUMBER", format!("HZ{i:06}"))
        .with("ARREST_DATE", "2025-03-16")
        .with("RACE", RACES[(i % 4) as usize])
        .with("CHARGE_1_STATUTE", "720 ILCS 5.0/12-3.2-A-2")
        .with("CHARGE_1_DESCRIPTION", "DOMESTIC BATTERY")
}

/// Runs a random read/write workload against a fresh tree and a mirror map,
/// checking every result. Used by the generated correctness tests.
pub fn exercise_path_oram(capacity: usize, bucket_size: BucketSize, operations: u32) {
    init_logger();
    let mut rng = StdRng::seed_from_u64(capacity as u64 ^ (bucket_size as u64).rotate_left(32));

    let mut key = [0u8; 32];
    rng.fill(&mut key);
    let mut oram = PathOram::new(capacity, bucket_size, 64, DEFAULT_STASH_CEILING, &key, &mut rng)
        .unwrap();
    let mut mirror: HashMap<u64, Vec<u8>> = HashMap::new();

    for _ in 0..operations {
        let id = rng.gen_range(1..=capacity as u64);
        if rng.gen() {
            assert_eq!(oram.read(id, &mut rng).unwrap(), mirror.get(&id).cloned());
        } else {
            let payload: Vec<u8> = (0..rng.gen_range(0..64)).map(|_| rng.gen()).collect();
            oram.write(id, payload.clone(), &mut rng).unwrap();
            mirror.insert(id, payload);
        }
    }

    for id in 1..=capacity as u64 {
        assert_eq!(oram.read(id, &mut rng).unwrap(), mirror.get(&id).cloned(), "{id}");
    }
}

/// Generates a correctness test per `(N, Z)` pair, named after the pair.
#[macro_export]
macro_rules! create_path_oram_correctness_tests {
    ($(($n:expr, $z:expr)),* $(,)?) => {
        $(
            paste::paste! {
                #[test]
                fn [<test_random_workload_n $n _z $z>]() {
                    $crate::test_utils::exercise_path_oram($n, $z, 200);
                }
            }
        )*
    };
}
