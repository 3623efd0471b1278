// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Index arithmetic for the complete binary tree of buckets.
//!
//! Nodes are numbered heap-style from the root: node 0 is the root, node `i`
//! has children `2i+1` and `2i+2` and parent `(i-1)/2`. A tree of height `L`
//! has `2^(L+1) - 1` nodes; its leaves occupy `[2^L - 1, 2^(L+1) - 1)`, so
//! leaf index `l` in `[0, 2^L)` lives at node `l + 2^L - 1`.

use rand::{CryptoRng, Rng, RngCore};
use static_assertions::const_assert_eq;
use std::mem::size_of;

use crate::{Leaf, TreeHeight};

// Node indices fit a u64-derived leaf plus offset well inside usize range.
const_assert_eq!(size_of::<Leaf>(), 8);

/// Trees taller than this would overflow node arithmetic.
pub(crate) const MAXIMUM_TREE_HEIGHT: TreeHeight = 62;

/// The height `L = ceil(log2(N))` of the tree serving `capacity` blocks.
/// A capacity of 1 degenerates to a single root bucket.
pub(crate) fn tree_height(capacity: usize) -> TreeHeight {
    debug_assert!(capacity >= 1);
    capacity.next_power_of_two().ilog2()
}

/// The number of buckets in a complete tree of height `height`.
pub(crate) fn num_nodes(height: TreeHeight) -> usize {
    (1usize << (height + 1)) - 1
}

/// The node index of leaf `leaf` in a tree of height `height`.
pub(crate) fn leaf_node(leaf: Leaf, height: TreeHeight) -> usize {
    debug_assert!(leaf < num_leaves(height));
    leaf as usize + (1usize << height) - 1
}

/// The number of leaves of a tree of height `height`.
pub(crate) fn num_leaves(height: TreeHeight) -> Leaf {
    1u64 << height
}

/// The ancestor at depth `depth` of the node holding leaf `leaf`.
///
/// Shifting the one-based heap index of the leaf's node right by
/// `height - depth` walks up that many parent links.
pub(crate) fn node_at_depth(leaf: Leaf, depth: TreeHeight, height: TreeHeight) -> usize {
    debug_assert!(depth <= height);
    let one_based = leaf_node(leaf, height) + 1;
    (one_based >> (height - depth)) - 1
}

/// The root-to-leaf path of `leaf`: `height + 1` node indices, root first.
pub(crate) fn path_from_root(leaf: Leaf, height: TreeHeight) -> Vec<usize> {
    (0..=height)
        .map(|depth| node_at_depth(leaf, depth, height))
        .collect()
}

/// A uniform random leaf of a tree of height `height`.
pub(crate) fn random_leaf<R: RngCore + CryptoRng>(height: TreeHeight, rng: &mut R) -> Leaf {
    rng.gen_range(0..num_leaves(height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn height_is_ceil_log2() {
        assert_eq!(tree_height(1), 0);
        assert_eq!(tree_height(2), 1);
        assert_eq!(tree_height(3), 2);
        assert_eq!(tree_height(4), 2);
        assert_eq!(tree_height(10), 4);
        assert_eq!(tree_height(16), 4);
        assert_eq!(tree_height(17), 5);
    }

    #[test]
    fn leaves_occupy_the_last_level() {
        let height = 3;
        assert_eq!(num_nodes(height), 15);
        assert_eq!(leaf_node(0, height), 7);
        assert_eq!(leaf_node(7, height), 14);
    }

    #[test]
    fn paths_follow_parent_links() {
        let height = 4;
        for leaf in 0..num_leaves(height) {
            let path = path_from_root(leaf, height);
            assert_eq!(path.len(), height as usize + 1);
            assert_eq!(path[0], 0);
            assert_eq!(path[height as usize], leaf_node(leaf, height));
            for depth in 1..path.len() {
                assert_eq!((path[depth] - 1) / 2, path[depth - 1]);
            }
        }
    }

    #[test]
    fn node_at_depth_matches_path() {
        let height = 5;
        for leaf in 0..num_leaves(height) {
            let path = path_from_root(leaf, height);
            for depth in 0..=height {
                assert_eq!(node_at_depth(leaf, depth, height), path[depth as usize]);
            }
        }
    }

    #[test]
    fn single_bucket_tree() {
        let height = tree_height(1);
        assert_eq!(num_nodes(height), 1);
        assert_eq!(path_from_root(0, height), vec![0]);

        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..16 {
            assert_eq!(random_leaf(height, &mut rng), 0);
        }
    }

    #[test]
    fn random_leaves_cover_the_domain() {
        let mut rng = StdRng::seed_from_u64(1);
        let height = 3;
        let mut seen = vec![false; num_leaves(height) as usize];
        for _ in 0..512 {
            seen[random_leaf(height, &mut rng) as usize] = true;
        }
        assert!(seen.iter().all(|&leaf| leaf));
    }
}
