// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! An implementation of Path ORAM over encrypted fixed-size buckets.
//!
//! Every access traverses one root-to-leaf path: the path's buckets are read
//! and decrypted into the client-side stash, the target block is read or
//! replaced and remapped to a fresh uniform leaf, and the path is written
//! back leaf-to-root with every bucket re-encrypted under fresh nonces and
//! padded to exactly `Z` slots. The server sees `L+1` bucket reads, `L+1`
//! bucket writes, and ciphertext that never repeats.

pub(crate) mod block;
pub(crate) mod bucket;
pub mod position_map;
mod stash;
mod tree_index;

pub use position_map::{InMemoryPositionMap, PositionMap};

use rand::{CryptoRng, RngCore};

use crate::{
    crypto::BlockCipher,
    server::{BucketStore, CountingStore},
    BlockId, BucketSize, SealError, TreeHeight,
};
use block::{Block, DUMMY_BLOCK_ID};
use bucket::EncryptedBucket;
use stash::Stash;

/// The parameter `Z` from the Path ORAM literature that sets the number of
/// blocks per bucket; typical values are 3 or 4. Here we adopt the more
/// conservative setting of 4.
pub const DEFAULT_BLOCKS_PER_BUCKET: BucketSize = 4;

/// The default stash ceiling. The stash stays logarithmic in the tree size
/// with overwhelming probability for `Z >= 4`; this default leaves ample
/// headroom over the published bounds.
pub const DEFAULT_STASH_CEILING: usize = 128;

/// The default per-slot payload capacity in bytes.
pub const DEFAULT_PAYLOAD_CAP: usize = 1024;

/// One oblivious block store over a complete binary tree of encrypted
/// buckets, with a client-side stash and position map.
#[derive(Debug)]
pub struct PathOram<M: PositionMap = InMemoryPositionMap> {
    tree: CountingStore,
    stash: Stash,
    position_map: M,
    cipher: BlockCipher,
    height: TreeHeight,
    capacity: usize,
    bucket_size: BucketSize,
    payload_cap: usize,
    stash_ceiling: usize,
    occupancy: usize,
}

impl PathOram {
    /// Builds a tree serving up to `capacity` blocks of at most
    /// `payload_cap` payload bytes, with the default in-memory position map.
    ///
    /// The tree is populated entirely with encrypted dummies; blocks appear
    /// on first write. `key` is the slot-encryption key.
    pub fn new<R: RngCore + CryptoRng>(
        capacity: usize,
        bucket_size: BucketSize,
        payload_cap: usize,
        stash_ceiling: usize,
        key: &[u8; 32],
        rng: &mut R,
    ) -> Result<Self, SealError> {
        Self::with_position_map(
            capacity,
            bucket_size,
            payload_cap,
            stash_ceiling,
            key,
            InMemoryPositionMap::default(),
            rng,
        )
    }
}

impl<M: PositionMap> PathOram<M> {
    /// Like [`PathOram::new`], with a caller-supplied position map (the hook
    /// for a recursive map at larger address-space scales).
    pub fn with_position_map<R: RngCore + CryptoRng>(
        capacity: usize,
        bucket_size: BucketSize,
        payload_cap: usize,
        stash_ceiling: usize,
        key: &[u8; 32],
        position_map: M,
        rng: &mut R,
    ) -> Result<Self, SealError> {
        if capacity == 0 {
            return Err(SealError::InvalidConfiguration("N must be at least 1"));
        }
        if bucket_size == 0 {
            return Err(SealError::InvalidConfiguration("Z must be at least 1"));
        }
        if capacity > (1usize << tree_index::MAXIMUM_TREE_HEIGHT) {
            return Err(SealError::InvalidConfiguration("N exceeds the maximum tree size"));
        }

        let cipher = BlockCipher::new(key);
        let height = tree_index::tree_height(capacity);
        log::debug!(
            "PathOram::new -- N = {}, Z = {}, L = {}, slot = {}B",
            capacity,
            bucket_size,
            height,
            EncryptedBucket::slot_len(payload_cap),
        );

        let mut buckets = Vec::with_capacity(tree_index::num_nodes(height));
        for _ in 0..tree_index::num_nodes(height) {
            buckets.push(EncryptedBucket::all_dummies(
                bucket_size,
                payload_cap,
                &cipher,
                rng,
            )?);
        }

        Ok(Self {
            tree: CountingStore::new(buckets),
            stash: Stash::new(),
            position_map,
            cipher,
            height,
            capacity,
            bucket_size,
            payload_cap,
            stash_ceiling,
            occupancy: 0,
        })
    }

    /// Performs one oblivious access.
    ///
    /// With `new_payload` the block is inserted or overwritten and its
    /// previous payload returned; without, the current payload is returned.
    /// Either way the target is remapped to a fresh uniform leaf and the
    /// whole path is re-encrypted. A miss is not an error: reads of absent
    /// blocks return `None` after performing the full path access.
    pub fn access<R: RngCore + CryptoRng>(
        &mut self,
        id: BlockId,
        new_payload: Option<Vec<u8>>,
        rng: &mut R,
    ) -> Result<Option<Vec<u8>>, SealError> {
        debug_assert_ne!(id, DUMMY_BLOCK_ID);
        debug_assert_eq!(self.tree.capacity(), tree_index::num_nodes(self.height));
        // Reject oversized payloads before anything enters the stash; a
        // block that cannot be sealed into a slot must never become evictable
        // state.
        if let Some(payload) = &new_payload {
            if payload.len() > self.payload_cap {
                return Err(SealError::PayloadTooLarge {
                    len: payload.len(),
                    cap: self.payload_cap,
                });
            }
        }
        log::debug!(
            "oram access -- {} block {}",
            if new_payload.is_some() { "write" } else { "read" },
            id
        );

        let new_leaf = tree_index::random_leaf(self.height, rng);
        let old_leaf = match self.position_map.assign(id, new_leaf) {
            Some(leaf) => leaf,
            // First touch: the path read below targets a fresh uniform leaf.
            None => tree_index::random_leaf(self.height, rng),
        };

        for node in tree_index::path_from_root(old_leaf, self.height) {
            let bucket = self.tree.read_bucket(node);
            for block in bucket.open(self.payload_cap, &self.cipher)? {
                self.stash.insert(block);
            }
        }

        let result = match new_payload {
            Some(payload) => {
                let prior = self.stash.insert(Block {
                    id,
                    leaf: new_leaf,
                    payload,
                });
                if prior.is_none() {
                    self.occupancy += 1;
                }
                prior.map(|block| block.payload)
            }
            None => self.stash.retarget(id, new_leaf),
        };

        for depth in (0..=self.height).rev() {
            let node = tree_index::node_at_depth(old_leaf, depth, self.height);
            let evicted = self
                .stash
                .drain_for_node(node, depth, self.height, self.bucket_size);
            let bucket = EncryptedBucket::seal(
                evicted,
                self.bucket_size,
                self.payload_cap,
                &self.cipher,
                rng,
            )?;
            self.tree.write_bucket(node, bucket);
        }

        if self.stash.occupancy() > self.stash_ceiling {
            return Err(SealError::StashOverflow {
                size: self.stash.occupancy(),
                ceiling: self.stash_ceiling,
            });
        }

        Ok(result)
    }

    /// Obliviously reads the payload of `id`, or `None` if absent.
    pub fn read<R: RngCore + CryptoRng>(
        &mut self,
        id: BlockId,
        rng: &mut R,
    ) -> Result<Option<Vec<u8>>, SealError> {
        self.access(id, None, rng)
    }

    /// Obliviously writes `payload` under `id`, returning the previous
    /// payload if the block existed.
    pub fn write<R: RngCore + CryptoRng>(
        &mut self,
        id: BlockId,
        payload: Vec<u8>,
        rng: &mut R,
    ) -> Result<Option<Vec<u8>>, SealError> {
        self.access(id, Some(payload), rng)
    }

    /// The block-capacity bound `N` this tree was built for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The tree height `L`.
    pub fn height(&self) -> TreeHeight {
        self.height
    }

    /// The number of distinct blocks ever written.
    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    /// The current stash occupancy, for telemetry.
    pub fn stash_size(&self) -> usize {
        self.stash.occupancy()
    }

    /// The total number of bucket reads the server has observed.
    pub fn bucket_read_count(&self) -> u64 {
        self.tree.get_read_count()
    }

    /// The total number of bucket writes the server has observed.
    pub fn bucket_write_count(&self) -> u64 {
        self.tree.get_write_count()
    }
}
