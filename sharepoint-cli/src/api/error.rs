//! Error taxonomy for the SharePoint / Graph client
//!
//! Every failure is terminal for the operation that produced it. Nothing in
//! this layer retries; callers that want retries wrap the transport.

use thiserror::Error;

use super::query::Dialect;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error returned by every client operation
#[derive(Debug, Error)]
pub enum Error {
    /// The query could not be rendered for the target dialect. Raised before any I/O.
    #[error("translation failed: {0}")]
    Translation(#[from] TranslationError),

    /// The CSOM action graph could not be written as XML.
    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// Network failure or non-success HTTP status.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Response body was not the JSON shape the protocol promises.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// A response fragment did not fit the model it was mapped onto.
    #[error("mapping failed for {context}: {source}")]
    Mapping {
        context: String,
        #[source]
        source: MappingError,
    },

    /// The CSOM endpoint reported a fault in the response metadata element.
    #[error("{0}")]
    ServerFault(#[from] ServerFault),

    /// A CSOM action expected to produce a result did not.
    #[error("no result for action {id} in response")]
    MissingResult { id: u32 },
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    pub(crate) fn mapping(context: impl Into<String>, source: MappingError) -> Self {
        Error::Mapping {
            context: context.into(),
            source,
        }
    }

    /// HTTP status of a transport failure, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport(e) => e.status,
            _ => None,
        }
    }
}

/// Query translation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("unknown model type '{model}'")]
    UnknownModel { model: String },

    #[error("model '{model}' is not available through {dialect}")]
    ModelNotInDialect { model: String, dialect: Dialect },

    #[error("unknown field '{field}' on model '{model}'")]
    UnknownField { field: String, model: String },

    #[error("field '{field}' on model '{model}' has no {dialect} wire name")]
    FieldNotInDialect {
        field: String,
        model: String,
        dialect: Dialect,
    },

    #[error("field '{field}' on model '{model}' cannot be expanded")]
    NotExpandable { field: String, model: String },

    #[error("{clause} is not supported for model '{model}' through {dialect}")]
    UnsupportedClause {
        clause: &'static str,
        model: String,
        dialect: Dialect,
    },

    #[error("literal for field '{field}' cannot be rendered: {reason}")]
    UnrenderableLiteral { field: String, reason: String },
}

/// CSOM request encoding failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("control character U+{code_point:04X} cannot be encoded (in {context})")]
    ControlCharacter { code_point: u32, context: String },

    #[error("node {node} references object path {object_path_id} which is not part of the batch")]
    DanglingReference { node: u32, object_path_id: u32 },

    #[error("object path id {id} is declared more than once")]
    DuplicateId { id: u32 },

    #[error("xml writer failed: {0}")]
    Writer(String),
}

/// Transport-level failure, preserving whatever the server sent back
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
pub struct TransportError {
    pub message: String,
    pub status: Option<u16>,
    pub body: Option<String>,
}

impl TransportError {
    /// Failure before any response was received (DNS, TLS, timeout, ...)
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Server answered with a non-success status
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            message: "request failed".to_string(),
            status: Some(status),
            body: Some(body.into()),
        }
    }
}

/// Typed mapping failure for a single response fragment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}': expected {expected}, {detail}")]
pub struct MappingError {
    pub field: String,
    pub expected: String,
    pub detail: String,
}

impl MappingError {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            detail: detail.into(),
        }
    }
}

/// Fault reported by the CSOM endpoint in the `ErrorInfo` metadata block
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("server fault: {message}{}", .type_name.as_deref().map(|t| format!(" ({t})")).unwrap_or_default())]
pub struct ServerFault {
    pub message: String,
    pub code: Option<i64>,
    pub type_name: Option<String>,
    pub value: Option<String>,
    pub correlation_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display_includes_status() {
        let err = Error::from(TransportError::status(404, "not found"));
        assert_eq!(err.to_string(), "request failed (HTTP 404)");
        assert_eq!(err.status(), Some(404));

        let err = Error::from(TransportError::network("connection reset"));
        assert_eq!(err.to_string(), "connection reset");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_translation_error_names_field_and_model() {
        let err = TranslationError::UnknownField {
            field: "Nope".into(),
            model: "ListItem".into(),
        };
        assert_eq!(err.to_string(), "unknown field 'Nope' on model 'ListItem'");
    }

    #[test]
    fn test_server_fault_display() {
        let fault = ServerFault {
            message: "Item does not exist.".into(),
            code: Some(-2147024809),
            type_name: Some("System.ArgumentException".into()),
            value: None,
            correlation_id: None,
        };
        assert_eq!(
            fault.to_string(),
            "server fault: Item does not exist. (System.ArgumentException)"
        );
    }
}
