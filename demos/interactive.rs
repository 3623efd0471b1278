// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A simple interactive demonstration of the SEAL store.

use rustyline::history::FileHistory;
use rustyline::Editor;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use seal::{Parameters, Record, Schema, Seal};

const FIELDS: [&str; 3] = ["CB_NO", "RACE", "CHARGE_1_DESCRIPTION"];

fn parse_number(
    prompt: &str,
    rl: &mut Editor<(), FileHistory>,
) -> Result<u64, Box<dyn std::error::Error>> {
    Ok(loop {
        println!("{}", prompt);
        let readline: String = rl.readline("> ")?;
        match readline.parse::<u64>() {
            Ok(number) => break number,
            Err(_) => {
                println!("Expected a number. Try again.");
                continue;
            }
        }
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );

    let mut rl = Editor::<(), _>::new()?;

    let capacity = parse_number("Per-shard capacity N?", &mut rl)?;
    let parameters = Parameters {
        capacity: capacity as usize,
        ..Parameters::default()
    };
    let mut store = Seal::new(Schema::new(FIELDS)?, parameters)?;

    loop {
        let action = loop {
            println!("Enter an option (I, R or Q):");
            println!("I) Insert a record");
            println!("R) Retrieve a record by id");
            println!("Q) Query by field value");
            let action: String = rl.readline("> ")?;
            if (action != "I") & (action != "R") & (action != "Q") {
                println!("Try again.");
                continue;
            }
            break action;
        };

        if action == "I" {
            let mut record = Record::new();
            for field in FIELDS {
                println!("{} (empty to skip)?", field);
                let value: String = rl.readline("> ")?;
                if !value.is_empty() {
                    record.set(field, value);
                }
            }
            match store.insert(&record) {
                Ok(id) => println!("Inserted record {}.", id),
                Err(error) => println!("Insert failed: {}", error),
            }
        }

        if action == "R" {
            let id = parse_number("Which record id?", &mut rl)?;
            match store.retrieve(id)? {
                Some(record) => println!("Record {}: {:?}", id, record),
                None => println!("No record with id {}.", id),
            }
        }

        if action == "Q" {
            println!("Which field?");
            let field: String = rl.readline("> ")?;
            println!("Which value?");
            let value: String = rl.readline("> ")?;
            match store.query(&field, &value) {
                Ok(items) => {
                    for item in &items {
                        match item.record() {
                            Some(record) => println!("{:?}", record),
                            None => println!("DUMMY"),
                        }
                    }
                    println!("({} results)", items.len());
                }
                Err(error) => println!("Query failed: {}", error),
            }
        }
    }
}
