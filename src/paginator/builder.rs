use crate::config::PaginationConfig;
use crate::cursor::CursorCodec;
use crate::errors::PageError;
use crate::paginator::{PerPage, Paginator, deep_merge};
use crate::sort::{Direction, Sort, SortArg, SortMap};
use serde_json::{Map, Value};

/// Arguments to [`PaginatorBuilder::set_params`]. Unset fields leave the paginator as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageParams {
    /// Deep-merged into the accumulated query.
    pub query: Option<Map<String, Value>>,
    pub sort: Option<Sort>,
    pub total_items: Option<u64>,
    pub per_page: Option<PerPage>,
    pub offset: Option<u64>,
    /// Only taken when the paginator carries no metadata yet.
    pub metadata: Option<Map<String, Value>>,
}

/// Reconciles request parameters and/or a resumed cursor into one [`Paginator`].
///
/// Each step consumes the builder and returns the next state. Once a step alters the query
/// or sort (including a sort override on an adopted cursor), the record set stays changed
/// for the rest of the build: every later step without an explicit offset resets it to zero.
#[derive(Debug, Clone)]
pub struct PaginatorBuilder {
    default_per_page: PerPage,
    default_sort: Sort,
    paginator: Paginator,
    started: bool,
    record_set_changed: bool,
}

impl Default for PaginatorBuilder {
    fn default() -> Self {
        Self::new(PerPage::Count(20), Sort::Map(SortMap::new().with("id", Direction::Asc)))
    }
}

impl PaginatorBuilder {
    #[must_use]
    pub fn new(default_per_page: PerPage, default_sort: Sort) -> Self {
        Self {
            default_per_page,
            default_sort,
            paginator: Paginator::default(),
            started: false,
            record_set_changed: false,
        }
    }

    /// Builder whose defaults come from `config`.
    ///
    /// # Errors
    /// Returns [`PageError::InvalidSort`] if `config.default_sort` does not parse.
    pub fn from_config(config: &PaginationConfig) -> Result<Self, PageError> {
        let sort = Sort::from_arg(&SortArg::Text(config.default_sort.clone()))?;
        Ok(Self::new(PerPage::Count(config.default_per_page), sort))
    }

    /// Resumes from a cursor token. See [`PaginatorBuilder::resume`].
    ///
    /// # Errors
    /// Propagates cursor parse failures.
    pub fn set_cursor(
        self,
        codec: &CursorCodec,
        token: &str,
        per_page: Option<PerPage>,
        sort: Option<Sort>,
    ) -> Result<Self, PageError> {
        let state = codec.parse(token)?;
        Ok(self.resume(state, per_page, sort))
    }

    /// Adopts a decoded cursor's state. A `sort` override that differs from the cursor's
    /// sort starts a new record set at offset zero.
    #[must_use]
    pub fn resume(mut self, state: Paginator, per_page: Option<PerPage>, sort: Option<Sort>) -> Self {
        let sort = sort.filter(|s| !s.is_empty());
        let sort_changed = sort.as_ref().is_some_and(|s| *s != state.sort);
        self.paginator = Paginator {
            offset: if sort_changed { 0 } else { state.offset },
            per_page: per_page.unwrap_or(state.per_page),
            sort: sort.unwrap_or(state.sort),
            query: state.query,
            total_items: state.total_items,
            metadata: state.metadata,
        };
        self.started = true;
        self.record_set_changed |= sort_changed;
        self
    }

    #[must_use]
    pub fn set_params(mut self, params: PageParams) -> Self {
        if !self.started {
            self.paginator.query = Map::new();
            self.paginator.sort = self.default_sort.clone();
            self.paginator.total_items = 0;
            self.paginator.offset = 0;
            self.paginator.per_page = self.default_per_page;
            self.started = true;
        }
        let p = &mut self.paginator;

        if let Some(query) = params.query.filter(|q| !q.is_empty()) {
            let before = p.query.clone();
            deep_merge(&mut p.query, &query);
            self.record_set_changed |= p.query != before;
        }
        if let Some(sort) = params.sort.filter(|s| !s.is_empty()) {
            self.record_set_changed |= sort != p.sort;
            p.sort = sort;
        }
        if let Some(total) = params.total_items {
            p.total_items = total;
        }

        if let Some(offset) = params.offset {
            p.offset = offset;
        } else if self.record_set_changed {
            p.offset = 0;
        }

        if let Some(per_page) = params.per_page {
            p.per_page = per_page;
            if per_page == PerPage::All {
                p.offset = 0;
            }
        }

        if p.metadata.is_none() {
            p.metadata = params.metadata;
        }
        self
    }

    /// Finishes the build, applying defaults if no step ran.
    #[must_use]
    pub fn build(self) -> Paginator {
        if self.started { self.paginator } else { self.set_params(PageParams::default()).paginator }
    }
}
