// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The client-side stash: blocks read off a path that have not yet been
//! written back into the tree.
//!
//! Keyed by block id for O(1) target lookup during an access; eviction scans
//! the whole stash once per path bucket, which is O(|stash| * L) per access.

use std::collections::HashMap;

use super::{block::Block, tree_index};
use crate::{BlockId, BucketSize, Leaf, TreeHeight};

#[derive(Debug, Default)]
pub(crate) struct Stash {
    blocks: HashMap<BlockId, Block>,
}

impl Stash {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of blocks currently held.
    pub fn occupancy(&self) -> usize {
        self.blocks.len()
    }

    /// Adds a real block, replacing any previous block with the same id.
    /// Returns the replaced block.
    pub fn insert(&mut self, block: Block) -> Option<Block> {
        debug_assert!(!block.is_dummy());
        self.blocks.insert(block.id, block)
    }

    /// Points the block with id `id` (if present) at `new_leaf` and returns a
    /// copy of its payload. Every access remaps its target, reads included.
    pub fn retarget(&mut self, id: BlockId, new_leaf: Leaf) -> Option<Vec<u8>> {
        self.blocks.get_mut(&id).map(|block| {
            block.leaf = new_leaf;
            block.payload.clone()
        })
    }

    /// Removes and returns up to `bucket_size` blocks whose leaf path passes
    /// through `node` at depth `depth`.
    pub fn drain_for_node(
        &mut self,
        node: usize,
        depth: TreeHeight,
        height: TreeHeight,
        bucket_size: BucketSize,
    ) -> Vec<Block> {
        let selected: Vec<BlockId> = self
            .blocks
            .values()
            .filter(|block| tree_index::node_at_depth(block.leaf, depth, height) == node)
            .map(|block| block.id)
            .take(bucket_size)
            .collect();

        selected
            .into_iter()
            .filter_map(|id| self.blocks.remove(&id))
            .collect()
    }

    #[cfg(test)]
    pub fn ids(&self) -> Vec<BlockId> {
        self.blocks.keys().copied().collect()
    }

    #[cfg(test)]
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: BlockId, leaf: Leaf) -> Block {
        Block {
            id,
            leaf,
            payload: vec![id as u8],
        }
    }

    #[test]
    fn insert_replaces_by_id() {
        let mut stash = Stash::new();
        assert!(stash.insert(block(1, 0)).is_none());
        let replaced = stash.insert(block(1, 3)).unwrap();
        assert_eq!(replaced.leaf, 0);
        assert_eq!(stash.occupancy(), 1);
    }

    #[test]
    fn retarget_updates_leaf_and_returns_payload() {
        let mut stash = Stash::new();
        stash.insert(block(5, 1));

        assert_eq!(stash.retarget(5, 7), Some(vec![5]));
        assert_eq!(stash.get(5).unwrap().leaf, 7);
        assert_eq!(stash.retarget(6, 7), None);
    }

    #[test]
    fn drain_respects_path_membership_and_capacity() {
        let height = 2;
        let mut stash = Stash::new();
        // Leaves 0 and 1 share the depth-1 ancestor (node 1); leaf 3 does not.
        stash.insert(block(1, 0));
        stash.insert(block(2, 1));
        stash.insert(block(3, 3));

        let drained = stash.drain_for_node(1, 1, height, 4);
        let mut ids: Vec<BlockId> = drained.iter().map(|b| b.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(stash.ids(), vec![3]);
    }

    #[test]
    fn drain_takes_at_most_bucket_size() {
        let height = 1;
        let mut stash = Stash::new();
        for id in 1..=6 {
            stash.insert(block(id, 0));
        }

        // Everything maps to the root at depth 0.
        let drained = stash.drain_for_node(0, 0, height, 4);
        assert_eq!(drained.len(), 4);
        assert_eq!(stash.occupancy(), 2);
    }
}
