use crate::errors::PageError;
use crate::sort::{RawExpr, Sort};
use serde_json::{Map, Value};

use super::eval::get_path;
use super::types::Predicate;

/// A row that exposes its fields by (dotted) name.
pub trait Record {
    fn field(&self, path: &str) -> Option<&Value>;
}

impl Record for Map<String, Value> {
    fn field(&self, path: &str) -> Option<&Value> {
        get_path(self, path)
    }
}

impl Record for Value {
    fn field(&self, path: &str) -> Option<&Value> {
        self.as_object().and_then(|m| get_path(m, path))
    }
}

/// A lazily-built query over a storage collection.
///
/// Builder methods consume and return the query; `count` and `fetch` execute it. `count`
/// ignores offset and limit.
pub trait Queryable: Clone {
    type Row: Record + Clone;

    #[must_use]
    fn filter(self, predicate: Predicate) -> Self;

    /// # Errors
    /// Returns [`PageError::Storage`] for an ordering this backend cannot execute.
    fn order(self, sort: &Sort) -> Result<Self, PageError>;

    #[must_use]
    fn offset(self, offset: u64) -> Self;

    /// `None` removes the row cap.
    #[must_use]
    fn limit(self, limit: Option<u64>) -> Self;

    /// Drops offset and limit, keeping predicates and ordering.
    #[must_use]
    fn unbounded(self) -> Self {
        self.offset(0).limit(None)
    }

    /// # Errors
    /// Propagates storage failures.
    fn count(&self) -> Result<u64, PageError>;

    /// # Errors
    /// Propagates storage failures.
    fn fetch(&self) -> Result<Vec<Self::Row>, PageError>;

    /// An ordering expression, in this backend's dialect, that ranks rows by the position
    /// of `column`'s value within `keys`. Rows whose value is not listed sort last.
    fn ranking_expression(&self, column: &str, keys: &[Value]) -> RawExpr;
}
