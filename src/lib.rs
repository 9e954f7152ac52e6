//! Cursor pagination with snapshot-consistent record targeting.
//!
//! Start with [`query::CollectionQuery`] for end-to-end paging over a [`query::Queryable`]
//! collection, or drive [`paginator::PaginatorBuilder`] and [`cursor::CursorCodec`] directly.

pub mod cache;
pub mod cli;
pub mod config;
pub mod cursor;
pub mod errors;
pub mod paginator;
pub mod query;
pub mod sort;
pub mod token;
pub mod utils;

pub use cache::{CursorStore, MemoryCursorStore};
pub use config::PaginationConfig;
pub use cursor::CursorCodec;
pub use errors::{PageError, TokenFault};
pub use paginator::{CollectionResultMetadata, Paginator, PaginatorBuilder, PerPage, SnapshotPaginator};
pub use query::{CallParams, CollectionPage, CollectionQuery, MemoryCollection, Queryable, Record};
pub use sort::{Direction, RawExpr, Sort, SortArg, SortMap};
