//! OData query building, translation and execution
//!
//! A `Query` is an immutable, backend-agnostic description of filters,
//! ordering, projection and paging. The translator renders it for one
//! dialect; `DeferredQuery` binds it to a client and runs it on demand.

pub mod dialect;
pub mod executor;
mod expand;
pub mod filters;
pub mod orderby;
pub mod projection;
pub mod query;
pub mod result;
pub mod translator;

pub use dialect::Dialect;
pub use executor::DeferredQuery;
pub use filters::{ComparisonOp, FilterValue, Predicate};
pub use orderby::{Direction, OrderBy};
pub use projection::{Projection, Selection};
pub use query::{PageSpec, Query};
pub use result::QueryResponse;
pub use translator::{QueryString, Translator, translate};
