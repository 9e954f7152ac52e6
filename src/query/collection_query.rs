use crate::cursor::CursorCodec;
use crate::errors::PageError;
use crate::paginator::builder::PageParams;
use crate::paginator::{CollectionResultMetadata, Paginator, PaginatorBuilder, PerPage, SnapshotPaginator};
use crate::sort::{Direction, Sort, SortArg, SortKey, SortValue};
use crate::utils::num::usize_to_u64;
use serde_json::{Map, Value};
use std::time::Instant;

use super::eval::value_text;
use super::filters::{FilterKind, FilterRegistry};
use super::queryable::Queryable;
use super::types::Predicate;

/// Arguments to [`CollectionQuery::call`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallParams {
    pub cursor: Option<String>,
    pub per_page: Option<PerPage>,
    pub sort: Option<SortArg>,
    /// Column to text; rows match if any column contains its text, ignoring case.
    pub search: Option<Map<String, Value>>,
    /// Filter name to filter arguments.
    pub filters: Map<String, Value>,
}

/// One page of rows and the paginator that describes it.
#[derive(Debug, Clone)]
pub struct CollectionPage<R> {
    pub rows: Vec<R>,
    pub paginator: Paginator,
    /// Set when a snapshot cursor was retargeted to a single record.
    pub snapshot_cursor: Option<String>,
}

/// Paged, filtered, sorted access to a queryable collection.
///
/// When called with a snapshot cursor and a filter on the collection key, the key value
/// selects the record to land on instead of filtering rows.
pub struct CollectionQuery<Q: Queryable> {
    collection: Q,
    collection_key: String,
    default_sort: Option<SortArg>,
    filters: FilterRegistry,
    codec: CursorCodec,
}

impl<Q: Queryable> CollectionQuery<Q> {
    pub fn new(collection: Q, collection_key: impl Into<String>, codec: CursorCodec) -> Self {
        let collection_key = collection_key.into();
        let filters = FilterRegistry::new().register(collection_key.clone(), FilterKind::attribute(collection_key.clone()));
        Self { collection, collection_key, default_sort: None, filters, codec }
    }

    #[must_use]
    pub fn with_default_sort(mut self, sort: impl Into<SortArg>) -> Self {
        self.default_sort = Some(sort.into());
        self
    }

    /// Replaces the filter registry. The collection key stays registered unless the
    /// registry already defines it.
    #[must_use]
    pub fn with_filters(mut self, registry: FilterRegistry) -> Self {
        self.filters = if registry.contains(&self.collection_key) {
            registry
        } else {
            registry.register(self.collection_key.clone(), FilterKind::attribute(self.collection_key.clone()))
        };
        self
    }

    #[must_use]
    pub fn collection_key(&self) -> &str {
        &self.collection_key
    }

    #[must_use]
    pub const fn codec(&self) -> &CursorCodec {
        &self.codec
    }

    /// Runs the query for one page.
    ///
    /// # Errors
    /// Fails on unparsable cursors, unknown or malformed filters, invalid sorts and storage
    /// errors.
    pub fn call(&self, params: CallParams) -> Result<CollectionPage<Q::Row>, PageError> {
        let start = Instant::now();
        let CallParams { cursor, per_page, sort, search, mut filters } = params;

        let record_key = match &cursor {
            Some(_) if filters.get(&self.collection_key).is_some_and(is_present) => {
                filters.remove(&self.collection_key)
            }
            _ => None,
        };

        let mut paginator = self.build_paginator(cursor.as_deref(), per_page, sort.as_ref(), search, filters)?;

        let mut query = self.collection.clone();
        if let Some(search) = paginator.query.get("search").filter(|v| is_present(v)) {
            query = query.filter(search_predicate(search)?);
        }
        if let Some(filters) = paginator.query.get("filters").filter(|v| is_present(v)) {
            let Value::Object(filters) = filters else {
                return Err(PageError::InvalidFilter(format!("Unsupported filter configuration: {filters}")));
            };
            for predicate in self.filters.predicates(filters)? {
                query = query.filter(predicate);
            }
        }

        paginator.total_items = query.count()?;
        let query = query.order(&paginator.sort)?.offset(paginator.offset).limit(paginator.limit());

        let (rows, paginator, snapshot_cursor) = if paginator.is_snapshot() {
            let mut snapshot = SnapshotPaginator::new(paginator)?;
            let outcome = snapshot.apply_to(query, record_key.as_ref(), &self.codec)?;
            let rows = match outcome.results {
                Some(rows) => rows,
                None => outcome.query.fetch()?,
            };
            (rows, snapshot.into_paginator(), outcome.cursor)
        } else {
            (query.fetch()?, paginator, None)
        };

        crate::dev6!(
            "{{\"bench\":\"query\",\"op\":\"collection\",\"duration_us\":{},\"offset\":{},\"limit\":\"{}\",\"total_items\":{},\"result_count\":{},\"snapshot\":{}}}",
            crate::utils::num::u128_to_u64_saturating(start.elapsed().as_micros()),
            paginator.offset,
            paginator.per_page,
            paginator.total_items,
            usize_to_u64(rows.len()),
            paginator.is_snapshot()
        );
        Ok(CollectionPage { rows, paginator, snapshot_cursor })
    }

    /// A cursor pinned to the rows of `page`: the one captured while retargeting a
    /// snapshot, or a fresh snapshot built from the page's rows.
    ///
    /// # Errors
    /// Fails if the cursor cannot be created.
    pub fn snapshot_cursor(&self, page: &CollectionPage<Q::Row>) -> Result<Option<String>, PageError> {
        if let Some(cursor) = &page.snapshot_cursor {
            return Ok(Some(cursor.clone()));
        }
        SnapshotPaginator::cursor_for_results(&self.collection, &page.rows, &self.collection_key, &self.codec)
    }

    /// Response metadata for `page`, including its snapshot cursor.
    ///
    /// # Errors
    /// Fails if any cursor cannot be created.
    pub fn metadata(&self, page: &CollectionPage<Q::Row>) -> Result<CollectionResultMetadata, PageError> {
        let snapshot = self.snapshot_cursor(page)?;
        CollectionResultMetadata::from_paginator(&page.paginator, &self.codec, snapshot)
    }

    fn build_paginator(
        &self,
        cursor: Option<&str>,
        per_page: Option<PerPage>,
        sort: Option<&SortArg>,
        search: Option<Map<String, Value>>,
        filters: Map<String, Value>,
    ) -> Result<Paginator, PageError> {
        let mut builder = PaginatorBuilder::from_config(self.codec.config())?;
        builder = match cursor {
            Some(token) => builder.set_cursor(&self.codec, token, None, None)?,
            None => builder.set_params(PageParams {
                sort: Some(self.stable_sort(self.default_sort.as_ref())?),
                ..PageParams::default()
            }),
        };
        if let Some(sort) = sort.filter(|s| sort_is_present(s)) {
            builder = builder.set_params(PageParams {
                sort: Some(self.stable_sort(Some(sort))?),
                ..PageParams::default()
            });
        }
        if !filters.is_empty() {
            builder = builder.set_params(PageParams { query: Some(wrap("filters", filters)), ..PageParams::default() });
        }
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            builder = builder.set_params(PageParams { query: Some(wrap("search", search)), ..PageParams::default() });
        }
        if let Some(per_page) = per_page {
            builder = builder.set_params(PageParams { per_page: Some(per_page), ..PageParams::default() });
        }
        Ok(builder.build())
    }

    /// Appends the collection key as an ascending tie-breaker. Raw expressions pass through.
    fn stable_sort(&self, sort: Option<&SortArg>) -> Result<Sort, PageError> {
        let sort = match sort {
            Some(arg) => Sort::from_arg(arg)?,
            None => Sort::default(),
        };
        match sort {
            Sort::Raw(_) => Ok(sort),
            Sort::Map(mut map) => {
                if !map.contains_column(&self.collection_key) {
                    map.insert(SortKey::Column(self.collection_key.clone()), SortValue::Direction(Direction::Asc));
                }
                Ok(Sort::Map(map))
            }
        }
    }
}

fn wrap(key: &str, inner: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert(key.to_string(), Value::Object(inner));
    out
}

fn is_present(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

fn sort_is_present(arg: &SortArg) -> bool {
    match arg {
        SortArg::Text(s) => !s.trim().is_empty(),
        SortArg::Json(v) => is_present(v),
        SortArg::Raw(_) => true,
        SortArg::Sort(s) => !s.is_empty(),
    }
}

fn search_predicate(search: &Value) -> Result<Predicate, PageError> {
    let Value::Object(columns) = search else {
        return Err(PageError::InvalidFilter(format!("search must map columns to text, got {search}")));
    };
    let terms = columns
        .iter()
        .filter(|(_, text)| is_present(text))
        .map(|(column, text)| Predicate::Contains {
            path: column.clone(),
            needle: value_text(text),
            case_insensitive: true,
        })
        .collect::<Vec<_>>();
    Ok(if terms.is_empty() { Predicate::True } else { Predicate::Or(terms) })
}
