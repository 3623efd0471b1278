// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The persisted deterministic-token index.
//!
//! One SQLite table, `records(id, <one BLOB column per schema field>,
//! shard_id)`, holds a deterministic token per searchable field value and
//! the shard each record routes to. No plaintext and no payloads ever reach
//! this table; the server colocating it learns equality of indexed values
//! and nothing more. The table is append-only and recreated fresh at
//! coordinator start, matching the in-memory lifetime of the ORAM state.

use rusqlite::{params_from_iter, types::Value, Connection};
use std::path::Path;

use crate::{RecordId, Schema, SealError, ShardId};

pub(crate) struct TokenIndex {
    conn: Connection,
    fields: Vec<String>,
}

impl TokenIndex {
    /// Opens the index backing store, file-backed when `path` is given and
    /// in-memory otherwise, and recreates the `records` table.
    pub fn open(schema: &Schema, path: Option<&Path>) -> Result<Self, SealError> {
        let conn = match path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };

        conn.execute("DROP TABLE IF EXISTS records", [])?;
        let columns: String = schema
            .fields()
            .iter()
            .map(|field| format!("\"{field}\" BLOB, "))
            .collect();
        conn.execute(
            &format!("CREATE TABLE records (id INTEGER PRIMARY KEY, {columns}shard_id INTEGER NOT NULL)"),
            [],
        )?;

        Ok(Self {
            conn,
            fields: schema.fields().to_vec(),
        })
    }

    /// Appends one row. `tokens` carries a token per schema field in schema
    /// order, `None` for fields absent from the record (stored as NULL,
    /// which no lookup matches).
    pub fn append(
        &self,
        record_id: RecordId,
        shard: ShardId,
        tokens: &[Option<Vec<u8>>],
    ) -> Result<(), SealError> {
        debug_assert_eq!(tokens.len(), self.fields.len());

        let column_list: Vec<String> = self
            .fields
            .iter()
            .map(|field| format!("\"{field}\""))
            .collect();
        let placeholders: Vec<String> = (2..2 + self.fields.len())
            .map(|position| format!("?{position}"))
            .collect();
        let sql = format!(
            "INSERT INTO records (id, {}, shard_id) VALUES (?1, {}, ?{})",
            column_list.join(", "),
            placeholders.join(", "),
            self.fields.len() + 2,
        );

        let record_id = i64::try_from(record_id)
            .map_err(|_| SealError::InvalidConfiguration("record identifier exceeds the index range"))?;
        let mut values = Vec::with_capacity(tokens.len() + 2);
        values.push(Value::Integer(record_id));
        for token in tokens {
            values.push(match token {
                Some(token) => Value::Blob(token.clone()),
                None => Value::Null,
            });
        }
        values.push(Value::Integer(shard as i64));

        self.conn
            .prepare_cached(&sql)?
            .execute(params_from_iter(values))?;
        Ok(())
    }

    /// All `(record_id, shard_id)` rows whose `field` column equals `token`.
    pub fn lookup(&self, field: &str, token: &[u8]) -> Result<Vec<(RecordId, ShardId)>, SealError> {
        if !self.fields.iter().any(|f| f == field) {
            return Err(SealError::UnknownField(field.to_string()));
        }

        log::trace!("index lookup -- {} = {}", field, hex::encode(token));

        let sql = format!("SELECT id, shard_id FROM records WHERE \"{field}\" = ?1");
        let mut statement = self.conn.prepare_cached(&sql)?;
        let rows = statement.query_map([token], |row| {
            Ok((
                row.get::<_, i64>(0)? as RecordId,
                row.get::<_, i64>(1)? as ShardId,
            ))
        })?;

        let mut matches = Vec::new();
        for row in rows {
            matches.push(row?);
        }
        Ok(matches)
    }

    /// The number of indexed records.
    pub fn len(&self) -> Result<usize, SealError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(["RACE", "CASE_NUMBER"]).unwrap()
    }

    #[test]
    fn lookup_matches_exact_tokens_only() {
        let index = TokenIndex::open(&schema(), None).unwrap();
        index
            .append(1, 2, &[Some(b"tok-black".to_vec()), Some(b"tok-a1".to_vec())])
            .unwrap();
        index
            .append(2, 0, &[Some(b"tok-black".to_vec()), Some(b"tok-a2".to_vec())])
            .unwrap();
        index
            .append(3, 1, &[Some(b"tok-white".to_vec()), None])
            .unwrap();

        let black = index.lookup("RACE", b"tok-black").unwrap();
        assert_eq!(black, vec![(1, 2), (2, 0)]);

        assert_eq!(index.lookup("RACE", b"tok-asian").unwrap(), vec![]);
        assert_eq!(index.lookup("CASE_NUMBER", b"tok-a2").unwrap(), vec![(2, 0)]);
        assert_eq!(index.len().unwrap(), 3);
    }

    #[test]
    fn absent_fields_never_match() {
        let index = TokenIndex::open(&schema(), None).unwrap();
        index.append(1, 0, &[Some(b"tok".to_vec()), None]).unwrap();

        assert_eq!(index.lookup("CASE_NUMBER", b"").unwrap(), vec![]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let index = TokenIndex::open(&schema(), None).unwrap();
        assert!(matches!(
            index.lookup("HEIGHT", b"tok"),
            Err(SealError::UnknownField(field)) if field == "HEIGHT"
        ));
    }

    #[test]
    fn reopening_a_file_starts_fresh() {
        let path = std::env::temp_dir().join(format!("seal-index-test-{}.sqlite", std::process::id()));

        {
            let index = TokenIndex::open(&schema(), Some(&path)).unwrap();
            index.append(1, 0, &[Some(b"tok".to_vec()), None]).unwrap();
            assert_eq!(index.len().unwrap(), 1);
        }
        {
            let index = TokenIndex::open(&schema(), Some(&path)).unwrap();
            assert_eq!(index.len().unwrap(), 0);
        }

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn duplicate_record_ids_are_rejected() {
        let index = TokenIndex::open(&schema(), None).unwrap();
        index.append(1, 0, &[None, None]).unwrap();
        assert!(matches!(
            index.append(1, 0, &[None, None]),
            Err(SealError::Index(_))
        ));
    }
}
