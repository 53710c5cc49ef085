//! SharePoint REST, Microsoft Graph and CSOM client
//!
//! One object model over three wire protocols: OData queries are translated
//! per dialect and executed lazily, CSOM batches are assembled as an
//! action/object-path graph, serialized to XML and correlated back by id.

pub mod client;
pub mod csom;
pub mod error;
pub mod metadata;
pub mod query;
pub mod transport;

pub use client::{ClientConfig, ClientConfigBuilder, SharePointClient};
pub use csom::{CsomBatch, CsomResponse, FieldValue, ObjectRef, Parameter, TermValue, UpdateMode};
pub use error::{
    EncodingError, Error, MappingError, Result, ServerFault, TransportError, TranslationError,
};
pub use metadata::{
    CollectionInfo, DescriptorProvider, DescriptorRegistry, FieldDescriptor, FieldKind,
    ModelDescriptor, Record,
};
pub use query::{
    DeferredQuery, Dialect, Direction, FilterValue, OrderBy, Predicate, Projection, Query,
    QueryString,
};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
