use thiserror::Error;

/// Broad failure classes, used by callers that only care about how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Session misuse or unusable configuration. Fatal, never retried.
    Configuration,
    /// Input that cannot be processed: non-RDF content, missing resources,
    /// malformed keys or documents.
    InputValidation,
    Canonicalization,
    SignatureTimeout,
    InvalidSignatureTarget,
    InvalidPolicy,
    Publish,
    Query,
    Internal,
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("commit the previous session before opening a new one")]
    SessionAlreadyOpen,
    #[error("cannot commit empty session")]
    EmptySession,
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("resource {url} has unsupported content type {content_type}")]
    UnsupportedContentType { url: String, content_type: String },
    #[error("unable to retrieve {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("unable to parse {content_type} document: {reason}")]
    Parse {
        content_type: String,
        reason: String,
    },
    #[error("graph {0} has no quads in the store")]
    MissingTargetGraph(String),
    #[error("malformed key: {0}")]
    InvalidKey(String),
    #[error("invalid IRI {iri}: {reason}")]
    InvalidIri { iri: String, reason: String },

    #[error("dataset canonicalization did not converge: {0}")]
    Canonicalization(String),
    #[error("signature generation for graph {0} timed out")]
    SignatureTimeout(String),
    #[error("invalid signature target: cannot sign the default graph")]
    InvalidSignatureTarget,
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
    #[error("publishing to {url} failed: {reason}")]
    Publish { url: String, reason: String },
    #[error("query evaluation failed: {0}")]
    Query(String),
    #[error("{0}")]
    Internal(String),
}

impl ContextError {
    pub fn kind(&self) -> ErrorKind {
        use ContextError::*;

        match self {
            SessionAlreadyOpen | EmptySession | Config(_) => ErrorKind::Configuration,
            UnsupportedContentType { .. }
            | Fetch { .. }
            | Parse { .. }
            | MissingTargetGraph(_)
            | InvalidKey(_)
            | InvalidIri { .. } => ErrorKind::InputValidation,
            Canonicalization(_) => ErrorKind::Canonicalization,
            SignatureTimeout(_) => ErrorKind::SignatureTimeout,
            InvalidSignatureTarget => ErrorKind::InvalidSignatureTarget,
            InvalidPolicy(_) => ErrorKind::InvalidPolicy,
            Publish { .. } => ErrorKind::Publish,
            Query(_) => ErrorKind::Query,
            Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn fetch(url: &str, reason: impl ToString) -> ContextError {
        ContextError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn publish(url: &str, reason: impl ToString) -> ContextError {
        ContextError::Publish {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = ContextError> = std::result::Result<T, E>;
