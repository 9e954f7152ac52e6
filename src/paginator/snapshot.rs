//! Snapshot pagination: a page whose membership and order are pinned to a prior result.
//!
//! A snapshot cursor filters the collection to the keys of the rows it was made from and
//! orders by their original position. Its metadata records, per key, the position the row
//! had (`offsets`), so a caller can ask for "the page holding record X" even after rows
//! were removed from the live collection.

use crate::cursor::CursorCodec;
use crate::errors::PageError;
use crate::paginator::{PerPage, Paginator, PaginatorBuilder, builder::PageParams};
use crate::query::eval::value_text;
use crate::query::{Queryable, Record};
use crate::sort::Sort;
use crate::utils::num::usize_to_u64;
use serde_json::{Map, Value, json};

pub const SNAPSHOT_KEY: &str = "snapshot";
pub const OFFSETS_KEY: &str = "offsets";
pub const COLLECTION_KEY: &str = "collection_key";

/// What [`SnapshotPaginator::apply_to`] did to the query.
pub struct SnapshotOutcome<Q: Queryable> {
    pub query: Q,
    /// Rows already fetched for the targeted record, if any.
    pub results: Option<Vec<Q::Row>>,
    /// Current-page cursor of the retargeted paginator.
    pub cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SnapshotPaginator {
    paginator: Paginator,
}

impl SnapshotPaginator {
    /// # Errors
    /// Returns [`PageError::SnapshotState`] when the paginator carries no metadata.
    pub fn new(paginator: Paginator) -> Result<Self, PageError> {
        if paginator.metadata.is_none() {
            return Err(PageError::SnapshotState("paginator has no snapshot metadata".to_string()));
        }
        Ok(Self { paginator })
    }

    #[must_use]
    pub const fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    #[must_use]
    pub fn into_paginator(self) -> Paginator {
        self.paginator
    }

    /// Builds a snapshot over `rows` and returns its current-page cursor (`None` when there
    /// are no rows).
    ///
    /// # Errors
    /// Fails if the cursor cannot be created.
    pub fn cursor_for_results<Q: Queryable>(
        collection: &Q,
        rows: &[Q::Row],
        collection_key: &str,
        codec: &CursorCodec,
    ) -> Result<Option<String>, PageError> {
        let keys: Vec<Value> =
            rows.iter().map(|r| r.field(collection_key).cloned().unwrap_or(Value::Null)).collect();
        let offsets = offsets_of(&keys);
        let n = usize_to_u64(rows.len());

        let mut filters = Map::new();
        filters.insert(collection_key.to_string(), Value::Array(keys.clone()));
        let mut query = Map::new();
        query.insert("filters".to_string(), Value::Object(filters));
        let metadata = json!({
            SNAPSHOT_KEY: true,
            OFFSETS_KEY: Value::Object(offsets),
            COLLECTION_KEY: collection_key,
        });

        let paginator = PaginatorBuilder::from_config(codec.config())?
            .set_params(PageParams {
                query: Some(query),
                sort: Some(Sort::Raw(collection.ranking_expression(collection_key, &keys))),
                total_items: Some(n),
                per_page: Some(PerPage::Count(n)),
                metadata: metadata.as_object().cloned(),
                ..PageParams::default()
            })
            .build();
        paginator.current_page_cursor(codec)
    }

    /// Narrows `query` (already filtered, ordered and paged for this snapshot) to the page
    /// holding `record_key`.
    ///
    /// While the recorded offsets still cover every live row the offsets are trusted and
    /// nothing is refetched. Otherwise the snapshot's live rows are fetched unbounded and the
    /// offsets recomputed first. `total_items` must already hold the live count.
    ///
    /// # Errors
    /// Fails on malformed snapshot metadata, storage errors, or cursor creation failures.
    pub fn apply_to<Q: Queryable>(
        &mut self,
        query: Q,
        record_key: Option<&Value>,
        codec: &CursorCodec,
    ) -> Result<SnapshotOutcome<Q>, PageError> {
        let recorded = self.offsets()?;

        if usize_to_u64(recorded.len()) == self.paginator.total_items {
            let Some(key) = record_key.map(value_text) else {
                crate::dev6!("{{\"bench\":\"snapshot\",\"op\":\"apply\",\"path\":\"passthrough\"}}");
                return Ok(SnapshotOutcome { query, results: None, cursor: None });
            };
            self.target(lookup(&recorded, &key));
            let collection_key = self.collection_key()?;
            let query = query.offset(self.paginator.offset).limit(self.paginator.limit());
            let results = query
                .fetch()?
                .into_iter()
                .filter(|r| r.field(&collection_key).map(value_text).as_deref() == Some(key.as_str()))
                .collect();
            let cursor = self.paginator.current_page_cursor(codec)?;
            crate::dev6!(
                "{{\"bench\":\"snapshot\",\"op\":\"apply\",\"path\":\"fast\",\"offset\":{}}}",
                self.paginator.offset
            );
            return Ok(SnapshotOutcome { query, results: Some(results), cursor });
        }

        let target = record_key.map(value_text).or_else(|| self.guess_key(&recorded));
        let Some(key) = target else {
            log::debug!("stale snapshot with no resolvable target at offset {}", self.paginator.offset);
            return Ok(SnapshotOutcome { query, results: None, cursor: None });
        };

        let collection_key = self.collection_key()?;
        let live = query.clone().unbounded().fetch()?;
        let live_keys: Vec<Value> =
            live.iter().map(|r| r.field(&collection_key).cloned().unwrap_or(Value::Null)).collect();
        let fresh = offsets_of(&live_keys);
        let offset = lookup(&fresh, &key).or_else(|| lookup(&recorded, &key));
        if let Some(meta) = self.paginator.metadata.as_mut() {
            meta.insert(OFFSETS_KEY.to_string(), Value::Object(fresh));
        }
        self.target(offset);

        let results: Vec<Q::Row> = live
            .into_iter()
            .filter(|r| r.field(&collection_key).map(value_text).as_deref() == Some(key.as_str()))
            .collect();
        let cursor = self.paginator.current_page_cursor(codec)?;
        crate::dev6!(
            "{{\"bench\":\"snapshot\",\"op\":\"apply\",\"path\":\"recompute\",\"live\":{},\"offset\":{},\"found\":{}}}",
            live_keys.len(),
            self.paginator.offset,
            !results.is_empty()
        );
        let query = query.offset(self.paginator.offset).limit(self.paginator.limit());
        Ok(SnapshotOutcome { query, results: Some(results), cursor })
    }

    fn target(&mut self, offset: Option<u64>) {
        self.paginator.offset = offset.unwrap_or(0);
        self.paginator.per_page = PerPage::Count(1);
    }

    fn guess_key(&self, offsets: &Map<String, Value>) -> Option<String> {
        let current = self.paginator.offset;
        offsets.iter().find(|(_, v)| position(v) == Some(current)).map(|(k, _)| k.clone())
    }

    fn offsets(&self) -> Result<Map<String, Value>, PageError> {
        match self.paginator.metadata.as_ref().and_then(|m| m.get(OFFSETS_KEY)) {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(m)) => Ok(m.clone()),
            Some(other) => Err(PageError::CursorParse(format!("snapshot offsets must be an object, got {other}"))),
        }
    }

    fn collection_key(&self) -> Result<String, PageError> {
        self.paginator
            .metadata
            .as_ref()
            .and_then(|m| m.get(COLLECTION_KEY))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PageError::SnapshotState("snapshot metadata has no collection_key".to_string()))
    }
}

/// `{key: "position"}` for the given ordered keys.
fn offsets_of(keys: &[Value]) -> Map<String, Value> {
    let mut out = Map::new();
    for (index, key) in keys.iter().enumerate() {
        out.insert(value_text(key), Value::String(index.to_string()));
    }
    out
}

fn lookup(offsets: &Map<String, Value>, key: &str) -> Option<u64> {
    offsets.get(key).and_then(position)
}

fn position(v: &Value) -> Option<u64> {
    match v {
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_u64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_metadata() {
        let err = SnapshotPaginator::new(Paginator::default()).unwrap_err();
        assert!(matches!(err, PageError::SnapshotState(_)));
    }

    #[test]
    fn offsets_are_string_positions_keyed_by_text() {
        let m = offsets_of(&[json!("a"), json!(7)]);
        assert_eq!(Value::Object(m), json!({"a": "0", "7": "1"}));
    }

    #[test]
    fn guesses_key_from_current_offset() {
        let mut p = Paginator { offset: 1, ..Paginator::default() };
        p.metadata = json!({"snapshot": true, "offsets": {"a": "0", "b": "1"}}).as_object().cloned();
        let s = SnapshotPaginator::new(p).unwrap();
        let offsets = s.offsets().unwrap();
        assert_eq!(s.guess_key(&offsets), Some("b".to_string()));
        assert_eq!(lookup(&offsets, "a"), Some(0));
        assert_eq!(lookup(&offsets, "z"), None);
    }
}
