// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The SEAL coordinator: record encoding, the insert/retrieve/query
//! pipelines, and parameter management.
//!
//! Insert: assign the next record identifier, route it through the PRP to a
//! shard, seal the encoded record under the payload key, write it to that
//! shard's tree, then index a deterministic token per searchable field.
//! Query: token the `(field, value)` pair, collect the matching index rows,
//! read each record out of its shard, and pad the decrypted results to a
//! power of the padding base.

use rand::{rngs::OsRng, CryptoRng, RngCore};
use std::path::PathBuf;

use crate::{
    crypto::{BlockCipher, KeyMaterial, TokenCipher},
    index::TokenIndex,
    padding,
    path_oram::{DEFAULT_BLOCKS_PER_BUCKET, DEFAULT_PAYLOAD_CAP, DEFAULT_STASH_CEILING},
    record::{Record, Schema},
    sharded::ShardedOram,
    BucketSize, RecordId, SealError, ShardId,
};

/// The default per-shard block-capacity bound `N`.
pub const DEFAULT_CAPACITY: usize = 10;

/// The default leakage exponent `alpha` (four shards).
pub const DEFAULT_LEAKAGE_BITS: u32 = 2;

/// The default padding base `x`.
pub const DEFAULT_PADDING_BASE: usize = 2;

/// Construction-time parameters of a [`Seal`] store.
#[derive(Clone, Debug)]
pub struct Parameters {
    /// Per-shard block-capacity bound `N`.
    pub capacity: usize,
    /// Bucket capacity `Z`.
    pub bucket_size: BucketSize,
    /// Leakage exponent `alpha`; the store runs `2^alpha` shards.
    pub leakage_bits: u32,
    /// Padding base `x >= 2` for query result lengths.
    pub padding_base: usize,
    /// Fixed per-slot payload capacity in bytes.
    pub payload_cap: usize,
    /// Stash occupancy ceiling per shard.
    pub stash_ceiling: usize,
    /// Where to persist the token index; in-memory when `None`.
    pub index_path: Option<PathBuf>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            bucket_size: DEFAULT_BLOCKS_PER_BUCKET,
            leakage_bits: DEFAULT_LEAKAGE_BITS,
            padding_base: DEFAULT_PADDING_BASE,
            payload_cap: DEFAULT_PAYLOAD_CAP,
            stash_ceiling: DEFAULT_STASH_CEILING,
            index_path: None,
        }
    }
}

/// One entry of a padded query result: a matching record, or a client-side
/// placeholder that exists only to round the result length up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryItem {
    /// A record whose queried field matched.
    Record(Record),
    /// A padding placeholder.
    Dummy,
}

impl QueryItem {
    /// Whether this entry is a padding placeholder.
    pub fn is_dummy(&self) -> bool {
        matches!(self, QueryItem::Dummy)
    }

    /// The record, unless this entry is a placeholder.
    pub fn record(&self) -> Option<&Record> {
        match self {
            QueryItem::Record(record) => Some(record),
            QueryItem::Dummy => None,
        }
    }
}

/// A searchable-encrypted record store with bounded leakage.
pub struct Seal<R: RngCore + CryptoRng = OsRng> {
    schema: Schema,
    parameters: Parameters,
    oram: ShardedOram,
    index: TokenIndex,
    payload_cipher: BlockCipher,
    tokens: TokenCipher,
    next_record_id: RecordId,
    rng: R,
}

impl Seal<OsRng> {
    /// Builds a store over `schema` with the given parameters, keyed from
    /// the operating-system RNG.
    pub fn new(schema: Schema, parameters: Parameters) -> Result<Self, SealError> {
        Self::with_rng(schema, parameters, OsRng)
    }
}

impl<R: RngCore + CryptoRng> Seal<R> {
    /// Like [`Seal::new`], drawing all keys and randomness from `rng`.
    pub fn with_rng(schema: Schema, parameters: Parameters, mut rng: R) -> Result<Self, SealError> {
        if parameters.padding_base < 2 {
            return Err(SealError::InvalidConfiguration("x must be at least 2"));
        }

        let keys = KeyMaterial::generate(&mut rng);
        let oram = ShardedOram::new(
            parameters.leakage_bits,
            parameters.capacity,
            parameters.bucket_size,
            parameters.payload_cap,
            parameters.stash_ceiling,
            &keys.slot,
            &keys.prp,
            &mut rng,
        )?;
        let index = TokenIndex::open(&schema, parameters.index_path.as_deref())?;

        log::info!(
            "seal -- N = {}, Z = {}, alpha = {}, x = {}",
            parameters.capacity,
            parameters.bucket_size,
            parameters.leakage_bits,
            parameters.padding_base
        );

        Ok(Self {
            schema,
            parameters,
            oram,
            index,
            payload_cipher: BlockCipher::new(&keys.payload),
            tokens: TokenCipher::new(&keys.token),
            next_record_id: 1,
            rng,
        })
    }

    /// Inserts `record`, returning its freshly assigned identifier.
    ///
    /// Fails with [`SealError::CapacityExceeded`] once the target shard's
    /// occupancy has passed the per-shard bound, and with
    /// [`SealError::UnknownField`] if the record strays from the schema.
    pub fn insert(&mut self, record: &Record) -> Result<RecordId, SealError> {
        record.check_fields(&self.schema)?;

        // The identifier is consumed even when the insert is rejected below:
        // shard routing is a deterministic function of the id, so a rejected
        // id would route to the same full shard on every retry. Skipped ids
        // keep the sequence monotonic and never reused.
        let record_id = self.next_record_id;
        self.next_record_id += 1;

        let shard = self.oram.shard_of(record_id);
        let bound = self.oram.shard_capacity();
        if self.oram.occupancy(shard) > bound {
            return Err(SealError::CapacityExceeded { shard, bound });
        }

        let payload = self
            .payload_cipher
            .seal(&record.encode(&self.schema)?, &mut self.rng)?;
        self.oram.write(shard, record_id, payload, &mut self.rng)?;

        // The index row appears only once the ORAM write has committed.
        let mut tokens = Vec::with_capacity(self.schema.fields().len());
        for field in self.schema.fields() {
            tokens.push(match record.get(field) {
                Some(value) => Some(self.tokens.token(field, value)?),
                None => None,
            });
        }
        self.index.append(record_id, shard, &tokens)?;

        log::info!("inserted record {} into shard {}", record_id, shard);
        Ok(record_id)
    }

    /// Fetches the record stored under `record_id`, or `None` if no such
    /// record was ever inserted. The shard is recomputed from the PRP; the
    /// index is not consulted.
    pub fn retrieve(&mut self, record_id: RecordId) -> Result<Option<Record>, SealError> {
        let shard = self.oram.shard_of(record_id);
        let payload = match self.oram.read(shard, record_id, &mut self.rng)? {
            Some(payload) => payload,
            None => return Ok(None),
        };
        let encoded = self.payload_cipher.open(&payload)?;
        Ok(Some(Record::decode(&encoded, &self.schema)?))
    }

    /// Returns every record whose `field` equals `value`, padded with
    /// [`QueryItem::Dummy`] entries to a power of the padding base.
    pub fn query(&mut self, field: &str, value: &str) -> Result<Vec<QueryItem>, SealError> {
        if !self.schema.contains(field) {
            return Err(SealError::UnknownField(field.to_string()));
        }

        let token = self.tokens.token(field, value)?;
        let rows = self.index.lookup(field, &token)?;

        let mut matches = Vec::with_capacity(rows.len());
        for (record_id, shard) in rows {
            match self.oram.read(shard, record_id, &mut self.rng)? {
                Some(payload) => {
                    let encoded = self.payload_cipher.open(&payload)?;
                    matches.push(QueryItem::Record(Record::decode(&encoded, &self.schema)?));
                }
                None => log::warn!("index row for record {} has no ORAM block", record_id),
            }
        }

        log::info!(
            "query {} -- {} matches padded to {}",
            field,
            matches.len(),
            padding::padded_len(matches.len(), self.parameters.padding_base)
        );
        Ok(padding::pad_with(
            matches,
            self.parameters.padding_base,
            || QueryItem::Dummy,
        ))
    }

    /// The schema this store was built over.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The construction-time parameters.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// The number of records stored across all shards.
    pub fn record_count(&self) -> u64 {
        (0..self.oram.num_shards())
            .map(|shard| self.oram.occupancy(shard) as u64)
            .sum()
    }

    /// The shard that `record_id` routes to.
    pub fn shard_of(&self, record_id: RecordId) -> ShardId {
        self.oram.shard_of(record_id)
    }

    /// The number of records resident in `shard`.
    pub fn shard_occupancy(&self, shard: ShardId) -> usize {
        self.oram.occupancy(shard)
    }

    /// The stash occupancy of `shard`, for telemetry.
    pub fn shard_stash_size(&self, shard: ShardId) -> usize {
        self.oram.stash_size(shard)
    }
}
