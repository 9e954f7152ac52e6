//! Limit-offset pagination over a record set.
//!
//! A [`Paginator`] records where one page sits inside a filtered, sorted record set. Its
//! projections (`next_page`, `last_page`, ...) are pure; the `*_cursor` variants hand the
//! projected state to a [`CursorCodec`] to produce an opaque token.

pub mod builder;
pub mod metadata;
pub mod snapshot;

use crate::cursor::CursorCodec;
use crate::errors::PageError;
use crate::sort::Sort;
use serde_json::{Map, Value};
use std::fmt;
use std::ops::RangeInclusive;

pub use builder::PaginatorBuilder;
pub use metadata::CollectionResultMetadata;
pub use snapshot::SnapshotPaginator;

/// Page size: a row count, or every row on a single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerPage {
    Count(u64),
    All,
}

impl PerPage {
    /// Wire form: a number, or the string `"all"`.
    #[must_use]
    pub fn to_json(self) -> Value {
        match self {
            Self::Count(n) => Value::from(n),
            Self::All => Value::String("all".to_string()),
        }
    }

    /// Accepts a non-negative integer, a numeric string or `"all"`.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(Self::Count),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        text.parse::<u64>().ok().map(Self::Count)
    }

    /// `Some(n)` for a row count, `None` when unbounded.
    #[must_use]
    pub const fn count(self) -> Option<u64> {
        match self {
            Self::Count(n) => Some(n),
            Self::All => None,
        }
    }

    /// An explicitly empty page: metadata only, no rows.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        matches!(self, Self::Count(0))
    }
}

impl fmt::Display for PerPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::All => f.write_str("all"),
        }
    }
}

impl From<u64> for PerPage {
    fn from(n: u64) -> Self {
        Self::Count(n)
    }
}

/// The `metadata.kind` tag merged into every projected cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    Recordset,
    CurrentPage,
    NextPage,
    PreviousPage,
    FirstPage,
    LastPage,
}

impl CursorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recordset => "recordset",
            Self::CurrentPage => "current_page",
            Self::NextPage => "next_page",
            Self::PreviousPage => "previous_page",
            Self::FirstPage => "first_page",
            Self::LastPage => "last_page",
        }
    }
}

/// One page's position within a record set.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginator {
    /// Filter name to filter arguments; opaque here and carried through cursors.
    pub query: Map<String, Value>,
    pub sort: Sort,
    /// Row count at the time the paginator was last bound to a query.
    pub total_items: u64,
    pub per_page: PerPage,
    /// Zero-based index of the first row of this page.
    pub offset: u64,
    pub metadata: Option<Map<String, Value>>,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            query: Map::new(),
            sort: Sort::default(),
            total_items: 0,
            per_page: PerPage::Count(0),
            offset: 0,
            metadata: None,
        }
    }
}

impl Paginator {
    /// One-based range of the items on this page.
    ///
    /// An explicitly empty page is `0..=0`. An empty record set yields an empty range
    /// (`1..=0`).
    #[must_use]
    pub fn item_range(&self) -> RangeInclusive<u64> {
        match self.per_page {
            PerPage::Count(0) => 0..=0,
            PerPage::All => self.offset.saturating_add(1)..=self.total_items,
            PerPage::Count(n) => {
                self.offset.saturating_add(1)..=self.offset.saturating_add(n).min(self.total_items)
            }
        }
    }

    /// Row cap for the query executor; `None` means no limit.
    #[must_use]
    pub const fn limit(&self) -> Option<u64> {
        self.per_page.count()
    }

    #[must_use]
    pub fn has_more_pages(&self) -> bool {
        match self.per_page {
            PerPage::All | PerPage::Count(0) => false,
            PerPage::Count(n) => self.offset.saturating_add(n) < self.total_items,
        }
    }

    /// True when the metadata marks this paginator as a result snapshot.
    #[must_use]
    pub fn is_snapshot(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(snapshot::SNAPSHOT_KEY))
            .is_some_and(|v| !matches!(v, Value::Null | Value::Bool(false)))
    }

    fn projected(&self, offset: u64, per_page: PerPage, kind: CursorKind) -> Self {
        let mut metadata = self.metadata.clone().unwrap_or_default();
        let mut tag = Map::new();
        tag.insert("kind".to_string(), Value::String(kind.as_str().to_string()));
        deep_merge(&mut metadata, &tag);
        Self {
            query: self.query.clone(),
            sort: self.sort.clone(),
            total_items: self.total_items,
            per_page,
            offset,
            metadata: Some(metadata),
        }
    }

    /// Same query and sort, all rows on one page.
    #[must_use]
    pub fn recordset(&self) -> Self {
        self.projected(0, PerPage::All, CursorKind::Recordset)
    }

    /// `None` for an explicitly empty page.
    #[must_use]
    pub fn current_page(&self) -> Option<Self> {
        if self.per_page.is_zero() {
            return None;
        }
        Some(self.projected(self.offset, self.per_page, CursorKind::CurrentPage))
    }

    #[must_use]
    pub fn next_page(&self) -> Option<Self> {
        if !self.has_more_pages() {
            return None;
        }
        let step = self.per_page.count()?;
        Some(self.projected(self.offset.saturating_add(step), self.per_page, CursorKind::NextPage))
    }

    #[must_use]
    pub fn previous_page(&self) -> Option<Self> {
        if self.offset == 0 {
            return None;
        }
        let step = self.per_page.count().unwrap_or(self.offset);
        Some(self.projected(self.offset.saturating_sub(step), self.per_page, CursorKind::PreviousPage))
    }

    #[must_use]
    pub fn first_page(&self) -> Option<Self> {
        if self.offset == 0 {
            return None;
        }
        Some(self.projected(0, self.per_page, CursorKind::FirstPage))
    }

    #[must_use]
    pub fn last_page(&self) -> Option<Self> {
        if !self.has_more_pages() {
            return None;
        }
        let step = self.per_page.count()?;
        let last_offset = (self.total_items - 1) / step * step;
        Some(self.projected(last_offset, self.per_page, CursorKind::LastPage))
    }

    /// # Errors
    /// Fails if the cursor cannot be encoded or its overflow entry cannot be stored.
    pub fn recordset_cursor(&self, codec: &CursorCodec) -> Result<String, PageError> {
        codec.create(&self.recordset())
    }

    /// # Errors
    /// Fails if the cursor cannot be encoded or its overflow entry cannot be stored.
    pub fn current_page_cursor(&self, codec: &CursorCodec) -> Result<Option<String>, PageError> {
        self.current_page().map(|p| codec.create(&p)).transpose()
    }

    /// # Errors
    /// Fails if the cursor cannot be encoded or its overflow entry cannot be stored.
    pub fn next_page_cursor(&self, codec: &CursorCodec) -> Result<Option<String>, PageError> {
        self.next_page().map(|p| codec.create(&p)).transpose()
    }

    /// # Errors
    /// Fails if the cursor cannot be encoded or its overflow entry cannot be stored.
    pub fn previous_page_cursor(&self, codec: &CursorCodec) -> Result<Option<String>, PageError> {
        self.previous_page().map(|p| codec.create(&p)).transpose()
    }

    /// # Errors
    /// Fails if the cursor cannot be encoded or its overflow entry cannot be stored.
    pub fn first_page_cursor(&self, codec: &CursorCodec) -> Result<Option<String>, PageError> {
        self.first_page().map(|p| codec.create(&p)).transpose()
    }

    /// # Errors
    /// Fails if the cursor cannot be encoded or its overflow entry cannot be stored.
    pub fn last_page_cursor(&self, codec: &CursorCodec) -> Result<Option<String>, PageError> {
        self.last_page().map(|p| codec.create(&p)).transpose()
    }
}

/// Recursively merges `overlay` into `base`. Nested objects merge; anything else replaces.
pub fn deep_merge(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (k, v) in overlay {
        match (base.get_mut(k), v) {
            (Some(Value::Object(dst)), Value::Object(src)) => deep_merge(dst, src),
            _ => {
                base.insert(k.clone(), v.clone());
            }
        }
    }
}
