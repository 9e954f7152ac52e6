//! Cursor codec: paginator state to opaque token and back.
//!
//! Raw ordering expressions are tagged on the wire so they can be told apart from column
//! names when the token comes back:
//!
//! - a raw sort becomes `{"sql_literal": {"raw_sql": "<text>"}}`;
//! - a raw key at position `i` of a sort mapping becomes the key `sql_literal_<i+1>` with
//!   value `{"raw_sql": "<text>", "hash_value": <direction>}`.
//!
//! Tokens longer than [`PaginationConfig::max_token_length`] are replaced by a token that
//! wraps only a generated store key; the payload itself goes to the [`CursorStore`].

use crate::cache::{CursorStore, MemoryCursorStore};
use crate::config::PaginationConfig;
use crate::errors::PageError;
use crate::paginator::{PerPage, Paginator};
use crate::sort::{Direction, RawExpr, Sort, SortKey, SortMap, SortValue};
use crate::token;
use serde_json::{Map, Value, json};
use std::sync::Arc;

const SQL_LITERAL: &str = "sql_literal";
const SQL_LITERAL_KEY_PREFIX: &str = "sql_literal_";
const RAW_SQL: &str = "raw_sql";
const HASH_VALUE: &str = "hash_value";

/// Encodes and decodes paginator cursors, overflowing large ones to a [`CursorStore`].
#[derive(Clone)]
pub struct CursorCodec {
    store: Arc<dyn CursorStore>,
    config: PaginationConfig,
}

impl CursorCodec {
    pub fn new(store: Arc<dyn CursorStore>, config: PaginationConfig) -> Self {
        Self { store, config }
    }

    /// Codec backed by a fresh in-process store sized from `config.cache_capacity`.
    #[must_use]
    pub fn in_memory(config: PaginationConfig) -> Self {
        let store = MemoryCursorStore::new(config.cache_capacity);
        Self::new(Arc::new(store), config)
    }

    #[must_use]
    pub const fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Serializes the paginator's state into a token of at most `max_token_length`
    /// characters (as long as the indirection token itself fits, which it always does for
    /// sane prefixes).
    ///
    /// # Errors
    /// Fails if the payload cannot be serialized or the overflow store rejects the write.
    pub fn create(&self, paginator: &Paginator) -> Result<String, PageError> {
        let payload = to_wire(paginator);
        let token = token::encode(&payload)?;
        if token.len() <= self.config.max_token_length {
            crate::dev6!(
                "{{\"bench\":\"cursor\",\"op\":\"create\",\"len\":{},\"overflow\":false}}",
                token.len()
            );
            return Ok(token);
        }

        let key = format!("{}:{}", self.config.cache_key_prefix, uuid::Uuid::new_v4());
        self.store.write(&key, &payload, self.config.cursor_ttl())?;
        let indirect = token::encode(&Value::String(key))?;
        log::debug!("cursor of {} chars moved to overflow store", token.len());
        crate::dev6!(
            "{{\"bench\":\"cursor\",\"op\":\"create\",\"len\":{},\"inline_len\":{},\"overflow\":true}}",
            indirect.len(),
            token.len()
        );
        Ok(indirect)
    }

    /// Reconstructs the paginator state carried by `token`.
    ///
    /// # Errors
    /// Every failure is reported as [`PageError::CursorParse`]: undecodable tokens, a store
    /// key with no entry behind it, malformed sort tagging or missing fields. Failures of the
    /// overflow store itself pass through unchanged.
    pub fn parse(&self, token: &str) -> Result<Paginator, PageError> {
        let decoded = token::decode_with_limit(Some(token), self.config.max_inflated_bytes)
            .map_err(|e| {
                log::warn!("rejecting cursor: {e}");
                PageError::CursorParse(e.to_string())
            })?;
        let payload = match decoded {
            Value::String(key) => {
                let found = self.store.read(&key)?;
                crate::dev6!(
                    "{{\"bench\":\"cursor\",\"op\":\"overflow_read\",\"hit\":{}}}",
                    found.is_some()
                );
                found.ok_or_else(|| {
                    PageError::CursorParse(format!("no data found in cache for key {key}"))
                })?
            }
            other => other,
        };
        from_wire(payload)
    }

    /// Deletes the overflow entry behind an indirection token. Returns whether the token
    /// was an indirection; inline tokens are left alone.
    ///
    /// # Errors
    /// Fails if the token cannot be decoded or the store rejects the delete.
    pub fn discard(&self, token: &str) -> Result<bool, PageError> {
        match token::decode_with_limit(Some(token), self.config.max_inflated_bytes)? {
            Value::String(key) => {
                self.store.delete(&key)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// The JSON payload written into a token (and into the overflow store).
#[must_use]
pub fn to_wire(p: &Paginator) -> Value {
    json!({
        "query": Value::Object(p.query.clone()),
        "sort": tag_sort(&p.sort),
        "total_items": p.total_items,
        "offset": p.offset,
        "per_page": p.per_page.to_json(),
        "metadata": p.metadata.clone().map_or(Value::Null, Value::Object),
    })
}

/// Inverse of [`to_wire`].
///
/// # Errors
/// Returns [`PageError::CursorParse`] when the payload is not an object, a field has the
/// wrong type, or the sort tagging is malformed.
pub fn from_wire(payload: Value) -> Result<Paginator, PageError> {
    let Value::Object(mut obj) = payload else {
        return Err(PageError::CursorParse(format!("expected an object, got {payload}")));
    };
    let sort = untag_sort(obj.get("sort").unwrap_or(&Value::Null))?;
    let query = match obj.remove("query") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(m)) => m,
        Some(other) => return Err(PageError::CursorParse(format!("query must be an object, got {other}"))),
    };
    let total_items = required_u64(&obj, "total_items")?;
    let offset = required_u64(&obj, "offset")?;
    let per_page = obj
        .get("per_page")
        .and_then(PerPage::from_json)
        .ok_or_else(|| PageError::CursorParse("per_page must be a count or \"all\"".to_string()))?;
    let metadata = match obj.remove("metadata") {
        None | Some(Value::Null) => None,
        Some(Value::Object(m)) => Some(m),
        Some(other) => {
            return Err(PageError::CursorParse(format!("metadata must be an object, got {other}")));
        }
    };
    Ok(Paginator { query, sort, total_items, per_page, offset, metadata })
}

fn required_u64(obj: &Map<String, Value>, field: &str) -> Result<u64, PageError> {
    obj.get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| PageError::CursorParse(format!("{field} must be a non-negative integer")))
}

fn tag_sort(sort: &Sort) -> Value {
    match sort {
        Sort::Raw(raw) => json!({ SQL_LITERAL: { RAW_SQL: raw.as_str() } }),
        Sort::Map(map) => tag_map(map),
    }
}

fn tag_map(map: &SortMap) -> Value {
    let mut out = Map::new();
    for (index, (key, value)) in map.iter().enumerate() {
        let value_json = match value {
            SortValue::Direction(d) => Value::String(d.as_str().to_string()),
            SortValue::Nested(m) => tag_map(m),
        };
        match key {
            SortKey::Column(name) => {
                out.insert(name.clone(), value_json);
            }
            SortKey::Raw(raw) => {
                out.insert(
                    format!("{SQL_LITERAL_KEY_PREFIX}{}", index + 1),
                    json!({ RAW_SQL: raw.as_str(), HASH_VALUE: value_json }),
                );
            }
        }
    }
    Value::Object(out)
}

fn untag_sort(value: &Value) -> Result<Sort, PageError> {
    match value {
        Value::Null => Ok(Sort::default()),
        Value::String(text) => SortMap::normalize(&text.as_str().into())
            .map(Sort::Map)
            .map_err(|e| PageError::CursorParse(e.to_string())),
        Value::Object(obj) => match obj.get(SQL_LITERAL) {
            Some(literal) => Ok(Sort::Raw(raw_sql(literal)?)),
            None => untag_map(obj).map(Sort::Map),
        },
        other => Err(PageError::CursorParse(format!("sort must be an object, got {other}"))),
    }
}

fn untag_map(obj: &Map<String, Value>) -> Result<SortMap, PageError> {
    let mut out = SortMap::new();
    for (key, value) in obj {
        if key.starts_with(SQL_LITERAL_KEY_PREFIX) {
            let raw = raw_sql(value)?;
            let direction = value
                .get(HASH_VALUE)
                .ok_or_else(|| PageError::CursorParse(format!("{key} is missing {HASH_VALUE}")))?;
            out.insert(SortKey::Raw(raw), untag_value(key, direction)?);
        } else {
            out.insert(SortKey::Column(key.clone()), untag_value(key, value)?);
        }
    }
    Ok(out)
}

fn untag_value(key: &str, value: &Value) -> Result<SortValue, PageError> {
    match value {
        Value::String(d) => Direction::parse(d)
            .map(SortValue::Direction)
            .map_err(|e| PageError::CursorParse(e.to_string())),
        Value::Object(nested) => untag_map(nested).map(SortValue::Nested),
        other => Err(PageError::CursorParse(format!("bad sort direction for {key}: {other}"))),
    }
}

fn raw_sql(tagged: &Value) -> Result<RawExpr, PageError> {
    tagged
        .get(RAW_SQL)
        .and_then(Value::as_str)
        .map(RawExpr::new)
        .ok_or_else(|| PageError::CursorParse(format!("malformed {SQL_LITERAL} in sort: {tagged}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> CursorCodec {
        CursorCodec::in_memory(PaginationConfig::default())
    }

    fn sample() -> Paginator {
        let mut sort = SortMap::new().with("title", Direction::Desc);
        sort.insert(SortKey::Raw(RawExpr::new("LOWER(author)")), SortValue::Direction(Direction::Asc));
        Paginator {
            query: json!({"filters": {"status": "live"}}).as_object().cloned().unwrap_or_default(),
            sort: Sort::Map(sort),
            total_items: 42,
            per_page: PerPage::Count(10),
            offset: 20,
            metadata: None,
        }
    }

    #[test]
    fn raw_key_in_mapping_is_tagged_by_position() {
        let wire = to_wire(&sample());
        assert_eq!(
            wire["sort"],
            json!({"title": "desc", "sql_literal_2": {"raw_sql": "LOWER(author)", "hash_value": "asc"}})
        );
    }

    #[test]
    fn raw_sort_round_trips() {
        let c = codec();
        let mut p = sample();
        p.sort = Sort::raw("drafted_on DESC");
        let back = c.parse(&c.create(&p).unwrap()).unwrap();
        assert_eq!(back.sort, Sort::raw("drafted_on DESC"));
        assert_eq!(back, p);
    }

    #[test]
    fn mapping_with_raw_key_round_trips() {
        let c = codec();
        let p = sample();
        assert_eq!(c.parse(&c.create(&p).unwrap()).unwrap(), p);
    }

    #[test]
    fn tagged_sort_without_literal_is_rejected() {
        let mut wire = to_wire(&sample());
        wire["sort"] = json!({"sql_literal": {"text": "x"}});
        assert!(matches!(from_wire(wire).unwrap_err(), PageError::CursorParse(_)));

        let mut wire = to_wire(&sample());
        wire["sort"] = json!({"author": {"sql_literal_1": "asc"}});
        assert!(matches!(from_wire(wire).unwrap_err(), PageError::CursorParse(_)));
    }

    #[test]
    fn undecodable_token_is_a_cursor_parse_error() {
        let err = codec().parse("%%%").unwrap_err();
        assert!(matches!(err, PageError::CursorParse(ref m) if m.contains("encoding")));
    }

    #[test]
    fn small_cursor_stays_inline() {
        let c = codec();
        let token = c.create(&sample()).unwrap();
        assert!(!c.discard(&token).unwrap());
        assert!(matches!(token::decode(Some(&token)).unwrap(), Value::Object(_)));
    }
}
