// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The sharded ORAM layer: `2^alpha` independent Path ORAM trees under one
//! keyed PRP.
//!
//! The server sees which shard an access targets and nothing more, so a
//! logical address leaks exactly `alpha` bits. Shards are sparse: a record
//! keeps its global identifier inside its shard, and the PRP pins the
//! assignment for the life of the process.

use rand::{CryptoRng, RngCore};

use crate::{
    crypto::ShardPrp, BlockId, BucketSize, PathOram, SealError, ShardId,
};

/// Largest supported leakage exponent; `2^16` trees is already far past any
/// sensible deployment.
const MAXIMUM_LEAKAGE_BITS: u32 = 16;

/// An array of `2^alpha` Path ORAM shards addressed through a PRP.
#[derive(Debug)]
pub struct ShardedOram {
    shards: Vec<PathOram>,
    prp: ShardPrp,
    leakage_bits: u32,
}

impl ShardedOram {
    /// Builds `2^leakage_bits` shards, each a [`PathOram`] with the given
    /// per-shard parameters. All shards share the slot key; the PRP key is
    /// independent.
    #[allow(clippy::too_many_arguments)]
    pub fn new<R: RngCore + CryptoRng>(
        leakage_bits: u32,
        capacity: usize,
        bucket_size: BucketSize,
        payload_cap: usize,
        stash_ceiling: usize,
        slot_key: &[u8; 32],
        prp_key: &[u8; 32],
        rng: &mut R,
    ) -> Result<Self, SealError> {
        if leakage_bits > MAXIMUM_LEAKAGE_BITS {
            return Err(SealError::InvalidConfiguration(
                "alpha exceeds the supported leakage range",
            ));
        }

        let num_shards = 1usize << leakage_bits;
        log::debug!(
            "ShardedOram::new -- alpha = {} ({} shards of N = {})",
            leakage_bits,
            num_shards,
            capacity
        );

        let mut shards = Vec::with_capacity(num_shards);
        for _ in 0..num_shards {
            shards.push(PathOram::new(
                capacity,
                bucket_size,
                payload_cap,
                stash_ceiling,
                slot_key,
                rng,
            )?);
        }

        Ok(Self {
            shards,
            prp: ShardPrp::new(prp_key),
            leakage_bits,
        })
    }

    /// The number of shards, `2^alpha`.
    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// The configured leakage exponent `alpha`.
    pub fn leakage_bits(&self) -> u32 {
        self.leakage_bits
    }

    /// The shard that block `id` routes to. Stable across calls.
    pub fn shard_of(&self, id: BlockId) -> ShardId {
        self.prp.shard_of(id, self.num_shards())
    }

    /// The per-shard block-capacity bound `N`.
    pub fn shard_capacity(&self) -> usize {
        self.shards[0].capacity()
    }

    /// The number of distinct blocks ever written to `shard`.
    pub fn occupancy(&self, shard: ShardId) -> usize {
        self.shards[shard].occupancy()
    }

    /// The stash occupancy of `shard`, for telemetry.
    pub fn stash_size(&self, shard: ShardId) -> usize {
        self.shards[shard].stash_size()
    }

    /// Obliviously reads block `id` from `shard`.
    pub fn read<R: RngCore + CryptoRng>(
        &mut self,
        shard: ShardId,
        id: BlockId,
        rng: &mut R,
    ) -> Result<Option<Vec<u8>>, SealError> {
        log::debug!("sharded access -- read shard {}", shard);
        self.shards[shard].read(id, rng)
    }

    /// Obliviously writes `payload` under block `id` in `shard`.
    pub fn write<R: RngCore + CryptoRng>(
        &mut self,
        shard: ShardId,
        id: BlockId,
        payload: Vec<u8>,
        rng: &mut R,
    ) -> Result<Option<Vec<u8>>, SealError> {
        log::debug!("sharded access -- write shard {}", shard);
        self.shards[shard].write(id, payload, rng)
    }
}
