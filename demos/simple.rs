// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A very simple demonstration of the SEAL store.

extern crate seal;

use seal::{Parameters, Record, Schema, Seal, SealError};

fn main() -> Result<(), SealError> {
    let schema = Schema::new(["RACE", "CASE_NUMBER"])?;
    let mut store = Seal::new(schema, Parameters::default())?;

    store.insert(&Record::new().with("RACE", "BLACK").with("CASE_NUMBER", "A1"))?;
    store.insert(&Record::new().with("RACE", "BLACK").with("CASE_NUMBER", "A2"))?;
    store.insert(&Record::new().with("RACE", "WHITE").with("CASE_NUMBER", "A3"))?;

    for item in store.query("RACE", "BLACK")? {
        match item.record() {
            Some(record) => println!("{:?}", record),
            None => println!("DUMMY"),
        }
    }
    Ok(())
}
