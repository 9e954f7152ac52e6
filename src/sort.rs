//! Sort specifications.
//!
//! A `Sort` is either an ordered mapping of sort keys to directions or a raw ordering
//! expression that is passed through to the storage layer untouched. Raw expressions may
//! also appear as keys inside a mapping. Callers never see raw expressions: `Sort::visible`
//! strips them.

use crate::errors::PageError;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// Parses `asc`/`desc` in any letter case.
    pub fn parse(s: &str) -> Result<Self, PageError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(PageError::InvalidSort(format!("unknown direction '{other}'"))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A literal ordering expression in the storage backend's dialect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawExpr(String);

impl RawExpr {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortKey {
    Column(String),
    Raw(RawExpr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortValue {
    Direction(Direction),
    /// Sub-sort on an association, e.g. `{"author": {"name": "desc"}}`.
    Nested(SortMap),
}

/// Insertion-ordered mapping of sort key to direction. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortMap {
    entries: Vec<(SortKey, SortValue)>,
}

impl SortMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces `key`, keeping the original position on replace.
    pub fn insert(&mut self, key: SortKey, value: SortValue) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    #[must_use]
    pub fn with(mut self, column: &str, direction: Direction) -> Self {
        self.insert(SortKey::Column(column.to_string()), SortValue::Direction(direction));
        self
    }

    #[must_use]
    pub fn contains_column(&self, column: &str) -> bool {
        self.entries.iter().any(|(k, _)| matches!(k, SortKey::Column(c) if c == column))
    }

    #[must_use]
    pub fn get_column(&self, column: &str) -> Option<&SortValue> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, SortKey::Column(c) if c == column))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(SortKey, SortValue)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn has_raw_keys(&self) -> bool {
        self.entries.iter().any(|(k, v)| {
            matches!(k, SortKey::Raw(_)) || matches!(v, SortValue::Nested(m) if m.has_raw_keys())
        })
    }

    /// Copy of this mapping without raw-expression keys, at every nesting level.
    #[must_use]
    pub fn visible(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .filter_map(|(k, v)| match (k, v) {
                (SortKey::Raw(_), _) => None,
                (SortKey::Column(_), SortValue::Nested(m)) => {
                    Some((k.clone(), SortValue::Nested(m.visible())))
                }
                _ => Some((k.clone(), v.clone())),
            })
            .collect();
        Self { entries }
    }

    /// JSON object form of the visible mapping, e.g. `{"title": "desc", "id": "asc"}`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for (k, v) in &self.entries {
            let SortKey::Column(name) = k else { continue };
            let value = match v {
                SortValue::Direction(d) => Value::String(d.as_str().to_string()),
                SortValue::Nested(m) => m.to_json(),
            };
            out.insert(name.clone(), value);
        }
        Value::Object(out)
    }

    /// Normalizes a sort argument into a mapping.
    ///
    /// Raw expressions normalize to the empty mapping; blank keys are dropped.
    pub fn normalize(arg: &SortArg) -> Result<Self, PageError> {
        match arg {
            SortArg::Raw(_) | SortArg::Sort(Sort::Raw(_)) => Ok(Self::new()),
            SortArg::Sort(Sort::Map(m)) => Ok(m.clone()),
            SortArg::Text(text) => Self::from_text(text),
            SortArg::Json(value) => Self::from_json(value),
        }
    }

    fn from_text(text: &str) -> Result<Self, PageError> {
        let mut out = Self::new();
        for term in text.split(',') {
            let mut parts = term.split_whitespace();
            let Some(name) = parts.next() else { continue };
            let direction = match parts.next() {
                Some(d) => Direction::parse(d)?,
                None => Direction::Asc,
            };
            if parts.next().is_some() {
                return Err(PageError::InvalidSort(format!("unexpected sort term '{}'", term.trim())));
            }
            out.insert(SortKey::Column(name.to_string()), SortValue::Direction(direction));
        }
        Ok(out)
    }

    fn from_json(value: &Value) -> Result<Self, PageError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::String(s) => Self::from_text(s),
            Value::Object(obj) => {
                let mut out = Self::new();
                for (k, v) in obj {
                    if k.trim().is_empty() {
                        continue;
                    }
                    let value = match v {
                        Value::String(d) => SortValue::Direction(Direction::parse(d)?),
                        Value::Object(_) => SortValue::Nested(Self::from_json(v)?),
                        other => {
                            return Err(PageError::InvalidSort(format!(
                                "direction for '{k}' must be a string or mapping, got {other}"
                            )));
                        }
                    };
                    out.insert(SortKey::Column(k.trim().to_string()), value);
                }
                Ok(out)
            }
            other => Err(PageError::InvalidSort(format!("unsupported sort argument {other}"))),
        }
    }
}

/// The ordering of a record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sort {
    Map(SortMap),
    Raw(RawExpr),
}

impl Default for Sort {
    fn default() -> Self {
        Self::Map(SortMap::new())
    }
}

impl Sort {
    /// Builds a sort from an argument, keeping raw expressions as they are.
    pub fn from_arg(arg: &SortArg) -> Result<Self, PageError> {
        match arg {
            SortArg::Raw(r) => Ok(Self::Raw(r.clone())),
            SortArg::Sort(s) => Ok(s.clone()),
            _ => Ok(Self::Map(SortMap::normalize(arg)?)),
        }
    }

    #[must_use]
    pub fn raw(text: impl Into<String>) -> Self {
        Self::Raw(RawExpr::new(text))
    }

    /// True for the empty mapping. A raw expression is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Map(m) if m.is_empty())
    }

    #[must_use]
    pub const fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }

    /// The form that may be shown to callers: raw expressions removed.
    #[must_use]
    pub fn visible(&self) -> SortMap {
        match self {
            Self::Raw(_) => SortMap::new(),
            Self::Map(m) => m.visible(),
        }
    }
}

impl From<SortMap> for Sort {
    fn from(m: SortMap) -> Self {
        Self::Map(m)
    }
}

/// A sort as supplied by a caller, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum SortArg {
    /// `"name"`, `"name desc"` or `"a asc, b desc"`.
    Text(String),
    /// A JSON string or mapping of name to direction (or nested mapping).
    Json(Value),
    Raw(RawExpr),
    Sort(Sort),
}

impl From<&str> for SortArg {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for SortArg {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Value> for SortArg {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl From<RawExpr> for SortArg {
    fn from(r: RawExpr) -> Self {
        Self::Raw(r)
    }
}

impl From<Sort> for SortArg {
    fn from(s: Sort) -> Self {
        Self::Sort(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_name_sorts_ascending() {
        let m = SortMap::normalize(&"drafted_on".into()).unwrap();
        assert_eq!(m, SortMap::new().with("drafted_on", Direction::Asc));
    }

    #[test]
    fn comma_list_is_lower_cased_and_ordered() {
        let m = SortMap::normalize(&"title DESC, id".into()).unwrap();
        let keys: Vec<_> = m.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![SortKey::Column("title".into()), SortKey::Column("id".into())]);
        assert_eq!(m.get_column("title"), Some(&SortValue::Direction(Direction::Desc)));
    }

    #[test]
    fn mapping_drops_blank_keys_and_keeps_nesting() {
        let arg = SortArg::Json(json!({"": "asc", "author": {"name": "DESC"}, "id": "asc"}));
        let m = SortMap::normalize(&arg).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.to_json(), json!({"author": {"name": "desc"}, "id": "asc"}));
    }

    #[test]
    fn raw_expression_normalizes_to_empty() {
        let m = SortMap::normalize(&SortArg::Raw(RawExpr::new("drafted_on DESC"))).unwrap();
        assert!(m.is_empty());
        let s = Sort::from_arg(&SortArg::Raw(RawExpr::new("drafted_on DESC"))).unwrap();
        assert!(s.is_raw());
        assert!(s.visible().is_empty());
    }

    #[test]
    fn visible_strips_raw_keys() {
        let mut m = SortMap::new().with("title", Direction::Asc);
        m.insert(SortKey::Raw(RawExpr::new("LOWER(name)")), SortValue::Direction(Direction::Desc));
        assert!(m.has_raw_keys());
        assert_eq!(Sort::Map(m).visible(), SortMap::new().with("title", Direction::Asc));
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let err = SortMap::normalize(&"title sideways".into()).unwrap_err();
        assert!(matches!(err, PageError::InvalidSort(_)));
    }
}
