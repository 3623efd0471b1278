// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Encrypted buckets: what one tree node looks like to the server.
//!
//! A bucket always holds exactly `Z` ciphertext slots of one fixed size.
//! Short buckets are padded with dummy blocks before sealing, and every slot
//! is sealed under a fresh nonce, so re-encryptions of the same contents are
//! indistinguishable from new contents.

use rand::{CryptoRng, RngCore};

use super::block::{Block, BLOCK_HEADER_LEN};
use crate::{crypto::BlockCipher, BucketSize, SealError};

/// The `Z` encrypted slots of one bucket.
#[derive(Clone, Debug)]
pub(crate) struct EncryptedBucket {
    slots: Vec<Vec<u8>>,
}

impl EncryptedBucket {
    /// The fixed ciphertext size of every slot of a tree with the given
    /// payload capacity.
    pub fn slot_len(payload_cap: usize) -> usize {
        BlockCipher::sealed_len(BLOCK_HEADER_LEN + payload_cap)
    }

    /// Seals `blocks` into a full bucket, padding to `bucket_size` slots
    /// with dummies. Callers never hand over more than `bucket_size` blocks.
    pub fn seal<R: RngCore + CryptoRng>(
        mut blocks: Vec<Block>,
        bucket_size: BucketSize,
        payload_cap: usize,
        cipher: &BlockCipher,
        rng: &mut R,
    ) -> Result<Self, SealError> {
        debug_assert!(blocks.len() <= bucket_size);
        while blocks.len() < bucket_size {
            blocks.push(Block::dummy());
        }

        let mut slots = Vec::with_capacity(bucket_size);
        for block in &blocks {
            slots.push(cipher.seal(&block.encode(payload_cap)?, rng)?);
        }
        Ok(Self { slots })
    }

    /// A bucket of nothing but dummies, as produced at tree initialization.
    pub fn all_dummies<R: RngCore + CryptoRng>(
        bucket_size: BucketSize,
        payload_cap: usize,
        cipher: &BlockCipher,
        rng: &mut R,
    ) -> Result<Self, SealError> {
        Self::seal(Vec::new(), bucket_size, payload_cap, cipher, rng)
    }

    /// Decrypts every slot and returns the real blocks, discarding dummies.
    pub fn open(
        &self,
        payload_cap: usize,
        cipher: &BlockCipher,
    ) -> Result<Vec<Block>, SealError> {
        let mut blocks = Vec::new();
        for slot in &self.slots {
            let block = Block::decode(&cipher.open(slot)?, payload_cap)?;
            if !block.is_dummy() {
                blocks.push(block);
            }
        }
        Ok(blocks)
    }

    /// The number of ciphertext slots.
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn slots(&self) -> &[Vec<u8>] {
        &self.slots
    }
}
