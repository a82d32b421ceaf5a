//! Error types for the mirror pipeline
//!
//! # Error Categories
//!
//! - [`RemoteQueryError`] - malformed query or endpoint failure; fatal for a run
//! - [`UnexpectedBindingShape`] - a result binding of the wrong term kind;
//!   recovered by skipping the binding and reporting a warning
//! - [`StoreError`](crate::store::StoreError) - local SQLite failure; fatal
//!   once the Writer has exhausted its retries
//! - [`MirrorError`] - everything that can abort a run
//!
//! Each fatal error maps to an [`ErrorCode`] with a stable number and a
//! process exit code.

use std::fmt;

use crate::config::ConfigError;
use crate::store::StoreError;
use crate::term::TermKind;

// ============================================================================
// Error Codes
// ============================================================================

/// Unique error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Remote errors (4xxx)
    /// Request could not be sent or the connection dropped
    RemoteTransport = 4000,
    /// Endpoint answered with a non-success status
    RemoteStatus = 4005,
    /// Endpoint answered with a body that could not be decoded
    RemoteDecode = 4010,

    // Store errors (3xxx)
    /// Generic local store error
    StoreError = 3000,
    /// Batch commit failed after all retries
    TransactionFailed = 3004,

    // Config errors (7xxx)
    /// Invalid or unreadable configuration
    ConfigError = 7000,

    // Run errors (9xxx)
    /// Writer stopped before the producer finished
    ChannelClosed = 9001,
    /// Writer task could not be joined
    WriterFailed = 9002,
    /// Run cancelled by the operator
    Cancelled = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a short description of the error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::RemoteTransport => "Remote request failed",
            ErrorCode::RemoteStatus => "Remote endpoint returned an error status",
            ErrorCode::RemoteDecode => "Remote response could not be decoded",
            ErrorCode::StoreError => "Local store error",
            ErrorCode::TransactionFailed => "Local store write failed",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::ChannelClosed => "Ingestion channel closed early",
            ErrorCode::WriterFailed => "Writer task failed",
            ErrorCode::Cancelled => "Run cancelled",
        }
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCode::RemoteTransport | ErrorCode::RemoteStatus | ErrorCode::RemoteDecode => 3,
            ErrorCode::StoreError | ErrorCode::TransactionFailed => 4,
            ErrorCode::ConfigError => 2,
            ErrorCode::ChannelClosed | ErrorCode::WriterFailed => 5,
            ErrorCode::Cancelled => 130,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{} {}", self.code(), self.description())
    }
}

// ============================================================================
// Remote errors
// ============================================================================

/// Failure talking to the remote SPARQL endpoint
#[derive(Debug, thiserror::Error)]
pub enum RemoteQueryError {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status { endpoint: String, status: u16, body: String },

    #[error("could not decode {format} response: {message}")]
    Decode { format: &'static str, message: String },
}

impl RemoteQueryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RemoteQueryError::Transport { .. } => ErrorCode::RemoteTransport,
            RemoteQueryError::Status { .. } => ErrorCode::RemoteStatus,
            RemoteQueryError::Decode { .. } => ErrorCode::RemoteDecode,
        }
    }
}

/// A result binding whose term kind does not match what the query promised
///
/// Occurs for a handful of malformed remote records (e.g. an "unknown value"
/// parent taxon serialized as a blank node). Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("binding ?{variable} in {query}: expected IRI, found {found}{}", value_suffix(.value))]
pub struct UnexpectedBindingShape {
    /// Name of the query template that produced the binding
    pub query: String,
    /// Variable that was expected to hold an identifier
    pub variable: String,
    /// Kind actually found, `Unbound` when the variable had no value
    pub found: FoundKind,
    /// Rendered value, when there was one
    pub value: Option<String>,
}

fn value_suffix(value: &Option<String>) -> String {
    value.as_ref().map(|v| format!(" ({})", v)).unwrap_or_default()
}

/// What was found in place of an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoundKind {
    Term(TermKind),
    Unbound,
}

impl fmt::Display for FoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoundKind::Term(kind) => write!(f, "{}", kind),
            FoundKind::Unbound => f.write_str("nothing"),
        }
    }
}

// ============================================================================
// Run errors
// ============================================================================

/// Anything that aborts a mirror run
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error(transparent)]
    RemoteQuery(#[from] RemoteQueryError),

    #[error("local store write failed after {attempts} attempt(s): {source}")]
    LocalStoreWrite {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("local store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("ingestion channel closed before the producer finished")]
    ChannelClosed,

    #[error("writer task failed: {0}")]
    WriterFailed(String),

    #[error("mirror run cancelled during {0}")]
    Cancelled(String),
}

impl MirrorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MirrorError::RemoteQuery(e) => e.code(),
            MirrorError::LocalStoreWrite { .. } => ErrorCode::TransactionFailed,
            MirrorError::Store(_) => ErrorCode::StoreError,
            MirrorError::Config(_) => ErrorCode::ConfigError,
            MirrorError::ChannelClosed => ErrorCode::ChannelClosed,
            MirrorError::WriterFailed(_) => ErrorCode::WriterFailed,
            MirrorError::Cancelled(_) => ErrorCode::Cancelled,
        }
    }
}

/// Result type alias for mirror operations
pub type MirrorResult<T> = Result<T, MirrorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::RemoteStatus.code(), 4005);
        assert_eq!(ErrorCode::TransactionFailed.code(), 3004);
        assert_eq!(ErrorCode::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_every_fatal_error_exits_non_zero() {
        let errors = [
            MirrorError::ChannelClosed,
            MirrorError::WriterFailed("panic".into()),
            MirrorError::Cancelled("FetchingTaxa".into()),
            MirrorError::RemoteQuery(RemoteQueryError::Status {
                endpoint: "https://query.example.org/sparql".into(),
                status: 429,
                body: "Too Many Requests".into(),
            }),
        ];
        for e in errors {
            assert_ne!(e.code().exit_code(), 0, "{}", e);
        }
    }

    #[test]
    fn test_binding_shape_message() {
        let w = UnexpectedBindingShape {
            query: "parent-taxa".into(),
            variable: "parent".into(),
            found: FoundKind::Term(TermKind::BlankNode),
            value: Some("_:t42".into()),
        };
        assert_eq!(
            w.to_string(),
            "binding ?parent in parent-taxa: expected IRI, found blank node (_:t42)"
        );

        let unbound = UnexpectedBindingShape { found: FoundKind::Unbound, value: None, ..w };
        assert_eq!(unbound.to_string(), "binding ?parent in parent-taxa: expected IRI, found nothing");
    }
}
