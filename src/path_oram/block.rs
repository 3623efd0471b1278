// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The Path ORAM block: a logical id, a leaf assignment, and an opaque
//! payload, with the fixed-size slot encoding the server stores.

use static_assertions::const_assert_eq;
use subtle::ConstantTimeEq;

use crate::{BlockId, Leaf, SealError};

/// The reserved identifier of dummy blocks. Real block identifiers are
/// record identifiers, which start at 1 and stay far below the sentinel.
pub(crate) const DUMMY_BLOCK_ID: BlockId = BlockId::MAX;

/// Bytes of slot-plaintext metadata in front of the payload:
/// `id (8) || leaf (8) || payload_len (4)`.
pub(crate) const BLOCK_HEADER_LEN: usize = 20;

const_assert_eq!(BLOCK_HEADER_LEN, size_of_header());

const fn size_of_header() -> usize {
    std::mem::size_of::<BlockId>() + std::mem::size_of::<Leaf>() + std::mem::size_of::<u32>()
}

/// One logical block. The payload is opaque ciphertext as far as the tree is
/// concerned; dummies carry an empty payload and the reserved id.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Block {
    pub id: BlockId,
    pub leaf: Leaf,
    pub payload: Vec<u8>,
}

impl Block {
    pub fn dummy() -> Self {
        Self {
            id: DUMMY_BLOCK_ID,
            leaf: 0,
            payload: Vec::new(),
        }
    }

    pub fn is_dummy(&self) -> bool {
        bool::from(self.id.ct_eq(&DUMMY_BLOCK_ID))
    }

    /// Serializes this block to the fixed slot plaintext of
    /// `BLOCK_HEADER_LEN + payload_cap` bytes, zero-padded past the payload.
    pub fn encode(&self, payload_cap: usize) -> Result<Vec<u8>, SealError> {
        if self.payload.len() > payload_cap {
            return Err(SealError::PayloadTooLarge {
                len: self.payload.len(),
                cap: payload_cap,
            });
        }

        let mut plaintext = Vec::with_capacity(BLOCK_HEADER_LEN + payload_cap);
        plaintext.extend_from_slice(&self.id.to_le_bytes());
        plaintext.extend_from_slice(&self.leaf.to_le_bytes());
        plaintext.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        plaintext.extend_from_slice(&self.payload);
        plaintext.resize(BLOCK_HEADER_LEN + payload_cap, 0);
        Ok(plaintext)
    }

    /// Reverses [`Block::encode`]. A slot plaintext of the wrong shape means
    /// the tree was built with different parameters, surfaced as a crypto
    /// failure since the bytes did authenticate.
    pub fn decode(plaintext: &[u8], payload_cap: usize) -> Result<Self, SealError> {
        if plaintext.len() != BLOCK_HEADER_LEN + payload_cap {
            return Err(SealError::Crypto);
        }

        let id = BlockId::from_le_bytes(plaintext[..8].try_into().map_err(|_| SealError::Crypto)?);
        let leaf = Leaf::from_le_bytes(plaintext[8..16].try_into().map_err(|_| SealError::Crypto)?);
        let payload_len =
            u32::from_le_bytes(plaintext[16..20].try_into().map_err(|_| SealError::Crypto)?)
                as usize;
        if payload_len > payload_cap {
            return Err(SealError::Crypto);
        }

        Ok(Self {
            id,
            leaf,
            payload: plaintext[BLOCK_HEADER_LEN..BLOCK_HEADER_LEN + payload_len].to_vec(),
        })
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_dummy() {
            write!(f, "Block::Dummy")
        } else {
            f.debug_struct("Block")
                .field("id", &self.id)
                .field("leaf", &self.leaf)
                .field("payload_len", &self.payload.len())
                .finish()
        }
    }
}
