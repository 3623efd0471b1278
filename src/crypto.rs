// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Symmetric primitives: randomized AEAD sealing, deterministic tokens, and
//! the keyed PRP that routes record identifiers to shards.
//!
//! All three are built on AES-256-GCM-SIV and SHA-256. The SIV construction
//! is used twice, in two modes: with a fresh random nonce per call it is an
//! ordinary randomized AEAD, and with a pinned all-zero nonce it degrades,
//! on purpose, to a deterministic equality-preserving encryption suitable as
//! a searchable index key.

use aes_gcm_siv::{
    aead::{Aead, KeyInit},
    Aes256GcmSiv, Key, Nonce,
};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::{BlockId, SealError, ShardId};

/// Length in bytes of every symmetric key in the system.
pub(crate) const KEY_LEN: usize = 32;
/// Length in bytes of an AES-GCM-SIV nonce.
pub(crate) const NONCE_LEN: usize = 12;
/// Length in bytes of an AES-GCM-SIV authentication tag.
pub(crate) const TAG_LEN: usize = 16;

/// The process-local key set. Each concern gets its own key: the payload and
/// slot ciphers never share a key with each other or with the token cipher,
/// and the PRP key never touches a cipher at all.
pub(crate) struct KeyMaterial {
    /// Randomized encryption of encoded records (the ORAM payload).
    pub payload: [u8; KEY_LEN],
    /// Randomized encryption of tree slots (blocks in transit to the server).
    pub slot: [u8; KEY_LEN],
    /// Deterministic tokens for searchable fields.
    pub token: [u8; KEY_LEN],
    /// The shard-routing PRP.
    pub prp: [u8; KEY_LEN],
}

impl KeyMaterial {
    /// Draws a fresh key set. Keys live exactly as long as the process; ORAM
    /// state is not persisted across restarts.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut keys = KeyMaterial {
            payload: [0u8; KEY_LEN],
            slot: [0u8; KEY_LEN],
            token: [0u8; KEY_LEN],
            prp: [0u8; KEY_LEN],
        };
        rng.fill_bytes(&mut keys.payload);
        rng.fill_bytes(&mut keys.slot);
        rng.fill_bytes(&mut keys.token);
        rng.fill_bytes(&mut keys.prp);
        keys
    }
}

/// A randomized AEAD. Every call to [`BlockCipher::seal`] draws a fresh
/// nonce, so two encryptions of the same plaintext diverge; the nonce is
/// carried in front of the ciphertext.
#[derive(Clone)]
pub(crate) struct BlockCipher {
    cipher: Aes256GcmSiv,
}

// Key material never reaches debug output.
impl std::fmt::Debug for BlockCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlockCipher")
    }
}

impl BlockCipher {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256GcmSiv::new(Key::<Aes256GcmSiv>::from_slice(key)),
        }
    }

    /// The sealed length of a `plaintext_len`-byte message: `nonce || ct || tag`.
    pub const fn sealed_len(plaintext_len: usize) -> usize {
        NONCE_LEN + plaintext_len + TAG_LEN
    }

    pub fn seal<R: RngCore + CryptoRng>(
        &self,
        plaintext: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>, SealError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| SealError::Crypto)?;

        let mut sealed = Vec::with_capacity(Self::sealed_len(plaintext.len()));
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, SealError> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(SealError::Crypto);
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| SealError::Crypto)
    }
}

/// A deterministic, equality-preserving encryption of `(field, value)` pairs
/// under a long-lived token key.
///
/// AES-GCM-SIV with a pinned nonce yields the same ciphertext for the same
/// message, and nothing else: `token(m) == token(m')` exactly when `m == m'`.
/// The field name is length-prefixed so that `("AB", "C")` and `("A", "BC")`
/// hash to different messages.
pub(crate) struct TokenCipher {
    cipher: Aes256GcmSiv,
}

impl TokenCipher {
    const PINNED_NONCE: [u8; NONCE_LEN] = [0u8; NONCE_LEN];

    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256GcmSiv::new(Key::<Aes256GcmSiv>::from_slice(key)),
        }
    }

    pub fn token(&self, field: &str, value: &str) -> Result<Vec<u8>, SealError> {
        let mut message = Vec::with_capacity(4 + field.len() + value.len());
        message.extend_from_slice(&(field.len() as u32).to_le_bytes());
        message.extend_from_slice(field.as_bytes());
        message.extend_from_slice(value.as_bytes());

        self.cipher
            .encrypt(Nonce::from_slice(&Self::PINNED_NONCE), message.as_slice())
            .map_err(|_| SealError::Crypto)
    }
}

/// The keyed PRP that assigns a record identifier to one of `2^alpha` shards.
///
/// A truncated keyed SHA-256 stands in for a true permutation; the shard
/// assignment is stable for the life of the key, which is the life of the
/// process.
pub(crate) struct ShardPrp {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for ShardPrp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ShardPrp")
    }
}

impl ShardPrp {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self { key: *key }
    }

    pub fn shard_of(&self, id: BlockId, num_shards: usize) -> ShardId {
        debug_assert!(num_shards.is_power_of_two());

        let digest = Sha256::new()
            .chain_update(self.key)
            .chain_update(id.to_le_bytes())
            .finalize();
        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(word) % num_shards as u64) as ShardId
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn test_keys() -> KeyMaterial {
        let mut rng = StdRng::seed_from_u64(0);
        KeyMaterial::generate(&mut rng)
    }

    #[test]
    fn seal_round_trips() {
        let mut rng = StdRng::seed_from_u64(1);
        let cipher = BlockCipher::new(&test_keys().payload);

        let sealed = cipher.seal(b"attack at dawn", &mut rng).unwrap();
        assert_eq!(sealed.len(), BlockCipher::sealed_len(14));
        assert_eq!(cipher.open(&sealed).unwrap(), b"attack at dawn");
    }

    #[test]
    fn seal_is_randomized() {
        let mut rng = StdRng::seed_from_u64(2);
        let cipher = BlockCipher::new(&test_keys().payload);

        let first = cipher.seal(b"same plaintext", &mut rng).unwrap();
        let second = cipher.seal(b"same plaintext", &mut rng).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn open_rejects_tampering() {
        let mut rng = StdRng::seed_from_u64(3);
        let cipher = BlockCipher::new(&test_keys().payload);

        let mut sealed = cipher.seal(b"payload", &mut rng).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(cipher.open(&sealed), Err(SealError::Crypto)));
    }

    #[test]
    fn open_rejects_wrong_key() {
        let mut rng = StdRng::seed_from_u64(4);
        let keys = test_keys();
        let sealed = BlockCipher::new(&keys.payload)
            .seal(b"payload", &mut rng)
            .unwrap();
        let other = BlockCipher::new(&keys.slot);
        assert!(matches!(other.open(&sealed), Err(SealError::Crypto)));
    }

    #[test]
    fn tokens_preserve_equality_and_nothing_else() {
        let tokens = TokenCipher::new(&test_keys().token);

        assert_eq!(
            tokens.token("RACE", "BLACK").unwrap(),
            tokens.token("RACE", "BLACK").unwrap()
        );
        assert_ne!(
            tokens.token("RACE", "BLACK").unwrap(),
            tokens.token("RACE", "WHITE").unwrap()
        );
        assert_ne!(
            tokens.token("RACE", "BLACK").unwrap(),
            tokens.token("CASE", "BLACK").unwrap()
        );
    }

    #[test]
    fn tokens_are_unambiguous_across_field_boundaries() {
        let tokens = TokenCipher::new(&test_keys().token);
        assert_ne!(
            tokens.token("AB", "C").unwrap(),
            tokens.token("A", "BC").unwrap()
        );
    }

    #[test]
    fn shard_assignment_is_stable() {
        let keys = test_keys();
        let prp = ShardPrp::new(&keys.prp);

        for id in 1..200u64 {
            let first = prp.shard_of(id, 4);
            assert!(first < 4);
            assert_eq!(first, prp.shard_of(id, 4));
        }
    }

    #[test]
    fn shard_assignment_depends_on_the_key() {
        let mut rng = StdRng::seed_from_u64(5);
        let first = ShardPrp::new(&KeyMaterial::generate(&mut rng).prp);
        let second = ShardPrp::new(&KeyMaterial::generate(&mut rng).prp);

        let disagreements = (1..=256u64)
            .filter(|&id| first.shard_of(id, 8) != second.shard_of(id, 8))
            .count();
        assert!(disagreements > 0);
    }
}
