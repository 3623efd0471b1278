// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A searchable-encrypted store with tunable leakage, built on Path ORAM.
//!
//! Records are flat field/value maps over a fixed [`Schema`]. The server holds
//! only ciphertext: record payloads live in a forest of Path ORAM trees, and a
//! deterministic-token index maps searchable field values to record
//! identifiers. Leakage is bounded by two parameters: `alpha` bits of logical
//! address leakage (the address space is partitioned into `2^alpha` shards
//! under a keyed PRP) and a padding base `x` (query result lengths are always
//! a power of `x`).

#![warn(clippy::cargo, clippy::doc_markdown, missing_docs, rustdoc::all)]

use thiserror::Error;

pub(crate) mod crypto;
pub(crate) mod index;
pub mod padding;
pub mod path_oram;
pub mod record;
pub mod seal;
pub(crate) mod server;
pub mod sharded;
pub mod test_utils;

pub use path_oram::{PathOram, DEFAULT_BLOCKS_PER_BUCKET, DEFAULT_STASH_CEILING};
pub use record::{Record, Schema};
pub use seal::{Parameters, QueryItem, Seal};
pub use sharded::ShardedOram;

/// The numeric type of record identifiers. Identifiers are assigned
/// monotonically from 1 at insert time and are never reused.
pub type RecordId = u64;

/// The numeric type of logical block identifiers inside an ORAM. A record is
/// stored under its global [`RecordId`]; shards are sparse.
pub type BlockId = u64;

/// The numeric type used to name one of the `2^alpha` shards.
pub type ShardId = usize;

/// The numeric type of leaf indices, in `[0, 2^height)`.
pub type Leaf = u64;

/// The numeric type of tree heights and path depths.
pub type TreeHeight = u32;

/// The numeric type of the bucket capacity parameter `Z`.
pub type BucketSize = usize;

/// The error type for every fallible operation in this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SealError {
    /// An insert was attempted against a shard that already holds its
    /// per-shard capacity bound of records.
    #[error("shard {shard} is full (per-shard capacity bound {bound})")]
    CapacityExceeded {
        /// The shard the insert routed to.
        shard: ShardId,
        /// The configured per-shard bound `N`.
        bound: usize,
    },

    /// An insert or query referenced a field outside the schema.
    #[error("field `{0}` is not part of the schema")]
    UnknownField(String),

    /// A ciphertext failed to decrypt or authenticate. This signals tampering
    /// or a key mismatch and is fatal for the access that observed it.
    #[error("ciphertext failed to decrypt or authenticate")]
    Crypto,

    /// The stash grew past the configured ceiling, indicating that the tree
    /// parameters `Z`/`N` are misconfigured for the workload.
    #[error("stash holds {size} blocks, exceeding the configured ceiling of {ceiling}")]
    StashOverflow {
        /// The stash occupancy observed after write-back.
        size: usize,
        /// The configured ceiling.
        ceiling: usize,
    },

    /// An encrypted record payload does not fit the fixed-size ciphertext
    /// slot that the server wire contract prescribes.
    #[error("encrypted payload of {len} bytes exceeds the slot capacity of {cap}")]
    PayloadTooLarge {
        /// The payload length that was offered.
        len: usize,
        /// The configured slot payload capacity.
        cap: usize,
    },

    /// A constructor was handed parameters it cannot honor.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// The index store failed; transient backend failures pass through
    /// unchanged.
    #[error("index store error: {0}")]
    Index(#[from] rusqlite::Error),
}
