//! Query layer: predicates, the storage-facing [`Queryable`] seam, named filters, an
//! in-memory collection and the [`CollectionQuery`] orchestrator.

pub mod collection_query;
pub mod eval;
pub mod filters;
pub mod memory;
pub mod queryable;
pub mod types;

pub use collection_query::{CallParams, CollectionPage, CollectionQuery};
pub use filters::{CustomFilter, FilterKind, FilterRegistry};
pub use memory::MemoryCollection;
pub use queryable::{Queryable, Record};
pub use types::{CmpOp, Predicate};
