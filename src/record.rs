// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The record schema and the canonical byte encoding records are encrypted
//! under.
//!
//! A [`Schema`] is the fixed, ordered list of field names known to client and
//! index. A [`Record`] maps a subset of those fields to string values. The
//! canonical encoding writes every schema field in schema order as a
//! `u32`-length-prefixed byte string; absent fields carry a reserved length
//! sentinel, so an empty value and a missing value stay distinct across the
//! round trip. Length prefixes make the encoding delimiter-safe for
//! arbitrary value bytes.

use std::collections::BTreeMap;

use crate::SealError;

/// The length prefix reserved for fields absent from a record.
const ABSENT_LEN: u32 = u32::MAX;

/// The fixed field-name vocabulary of a store. Field names are uppercase
/// `[A-Z0-9_]` identifiers; every schema field is independently searchable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<String>,
}

impl Schema {
    /// Builds a schema from an ordered list of field names.
    ///
    /// Rejects empty schemas, duplicate fields, and names outside
    /// `[A-Z0-9_]+` with [`SealError::InvalidConfiguration`].
    pub fn new<I, S>(fields: I) -> Result<Self, SealError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(SealError::InvalidConfiguration(
                "a schema needs at least one field",
            ));
        }
        for (position, field) in fields.iter().enumerate() {
            let well_formed = !field.is_empty()
                && field
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
            if !well_formed {
                return Err(SealError::InvalidConfiguration(
                    "field names are uppercase [A-Z0-9_] identifiers",
                ));
            }
            if fields[..position].contains(field) {
                return Err(SealError::InvalidConfiguration(
                    "schema fields must be distinct",
                ));
            }
        }
        Ok(Self { fields })
    }

    /// The field names, in schema order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether `field` is part of this schema.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}

/// One structured record: a mapping from schema field names to string values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    values: BTreeMap<String, String>,
}

impl Record {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to `value`, returning `self` for chaining.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Sets `field` to `value`.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    /// The value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Iterates over the `(field, value)` pairs present in this record.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(f, v)| (f.as_str(), v.as_str()))
    }

    /// Checks that every field of this record belongs to `schema`.
    pub(crate) fn check_fields(&self, schema: &Schema) -> Result<(), SealError> {
        for (field, _) in self.iter() {
            if !schema.contains(field) {
                return Err(SealError::UnknownField(field.to_string()));
            }
        }
        Ok(())
    }

    /// Serializes this record to the canonical byte string.
    pub(crate) fn encode(&self, schema: &Schema) -> Result<Vec<u8>, SealError> {
        self.check_fields(schema)?;

        let mut encoded = Vec::new();
        for field in schema.fields() {
            match self.get(field) {
                Some(value) => {
                    debug_assert!((value.len() as u64) < u64::from(ABSENT_LEN));
                    encoded.extend_from_slice(&(value.len() as u32).to_le_bytes());
                    encoded.extend_from_slice(value.as_bytes());
                }
                None => encoded.extend_from_slice(&ABSENT_LEN.to_le_bytes()),
            }
        }
        Ok(encoded)
    }

    /// Reverses [`Record::encode`]. Presence is preserved, so a decode of an
    /// encode compares equal to the original record field by field, empty
    /// values included.
    ///
    /// The input is authenticated plaintext; a malformed buffer here means
    /// the ciphertext was produced under a different schema, which is
    /// reported as [`SealError::Crypto`].
    pub(crate) fn decode(encoded: &[u8], schema: &Schema) -> Result<Self, SealError> {
        let mut record = Record::new();
        let mut rest = encoded;
        for field in schema.fields() {
            if rest.len() < 4 {
                return Err(SealError::Crypto);
            }
            let (len_bytes, tail) = rest.split_at(4);
            let len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);
            if len == ABSENT_LEN {
                rest = tail;
                continue;
            }
            let len = len as usize;
            if tail.len() < len {
                return Err(SealError::Crypto);
            }
            let (value, tail) = tail.split_at(len);
            let value = std::str::from_utf8(value).map_err(|_| SealError::Crypto)?;
            record.set(field.clone(), value);
            rest = tail;
        }
        if !rest.is_empty() {
            return Err(SealError::Crypto);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrest_schema() -> Schema {
        Schema::new(["CB_NO", "CASE_NUMBER", "RACE", "CHARGE_1_DESCRIPTION"]).unwrap()
    }

    #[test]
    fn schema_rejects_lowercase_and_duplicates() {
        assert!(Schema::new(["race"]).is_err());
        assert!(Schema::new(["RACE", "RACE"]).is_err());
        assert!(Schema::new(Vec::<String>::new()).is_err());
        assert!(Schema::new([""]).is_err());
    }

    #[test]
    fn encode_is_schema_ordered_and_reversible() {
        let schema = arrest_schema();
        let record = Record::new()
            .with("RACE", "BLACK")
            .with("CB_NO", "19771005");

        let encoded = record.encode(&schema).unwrap();
        // CB_NO first (schema order); the absent fields carry the sentinel.
        assert_eq!(&encoded[..4], &8u32.to_le_bytes());
        assert_eq!(&encoded[4..12], b"19771005");

        assert_eq!(Record::decode(&encoded, &schema).unwrap(), record);
    }

    #[test]
    fn empty_values_stay_distinct_from_absent() {
        let schema = arrest_schema();
        let with_empty = Record::new().with("RACE", "");

        let decoded = Record::decode(&with_empty.encode(&schema).unwrap(), &schema).unwrap();
        assert_eq!(decoded, with_empty);
        assert_eq!(decoded.get("RACE"), Some(""));
        assert_ne!(decoded, Record::new());
    }

    #[test]
    fn encode_rejects_fields_outside_the_schema() {
        let schema = arrest_schema();
        let record = Record::new().with("HEIGHT", "180");
        assert!(matches!(
            record.encode(&schema),
            Err(SealError::UnknownField(field)) if field == "HEIGHT"
        ));
    }

    #[test]
    fn decode_rejects_truncation_and_trailing_bytes() {
        let schema = arrest_schema();
        let record = Record::new().with("RACE", "WHITE");
        let encoded = record.encode(&schema).unwrap();

        assert!(Record::decode(&encoded[..encoded.len() - 1], &schema).is_err());

        let mut oversized = encoded;
        oversized.push(0);
        assert!(Record::decode(&oversized, &schema).is_err());
    }

    #[test]
    fn empty_record_round_trips() {
        let schema = arrest_schema();
        let encoded = Record::new().encode(&schema).unwrap();
        assert_eq!(encoded.len(), 4 * schema.fields().len());
        assert_eq!(Record::decode(&encoded, &schema).unwrap(), Record::new());
    }
}
