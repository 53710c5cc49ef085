//! CSOM client-query protocol
//!
//! Builds the action/object-path graph for one request, writes it as the XML
//! envelope the `ProcessQuery` endpoint expects and correlates the JSON array
//! that comes back onto the actions that produced it.

pub mod batch;
pub mod ids;
pub mod inspect;
pub mod nodes;
pub mod parameter;
pub mod response;
pub mod serializer;

pub use batch::{
    ActionRef, CsomBatch, FieldValue, ObjectRef, TermValue, UpdateMode, FIELD_LOOKUP_VALUE_TYPE,
    FIELD_USER_VALUE_TYPE, REQUEST_CONTEXT_TYPE, TAXONOMY_FIELD_VALUE_COLLECTION_TYPE,
    TAXONOMY_FIELD_VALUE_TYPE,
};
pub use ids::IdProvider;
pub use inspect::{RequestSummary, inspect_request};
pub use nodes::{Action, ActionObjectPath, Identity, NodeKind, NodeSummary, SelectSpec};
pub use parameter::Parameter;
pub use response::{CsomResponse, correlate, correlate_all};
pub use serializer::serialize;
