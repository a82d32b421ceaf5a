//! kgmirror - local mirror of a knowledge-graph slice
//!
//! Copies the compound / taxon / reference slice of a remote SPARQL
//! knowledge graph into a local SQLite triple store so analytical queries can
//! run offline.
//!
//! # Architecture
//!
//! - [`remote::GraphClient`] - CONSTRUCT / SELECT against the remote endpoint
//! - [`store::LocalStore`] - transactional local triple store
//! - [`mirror::ChunkedFetcher`] - chunked, sequential remote fetching
//! - [`mirror::channel`] - bounded ingestion channel
//! - [`mirror::Writer`] - the single task that writes to the store
//! - [`mirror::Mirror`] - the phase state machine that drives a run
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kgmirror::{MirrorConfig, SparqlClient, Mirror};
//!
//! let config = MirrorConfig::load()?;
//! let client = Arc::new(SparqlClient::from_config(&config.endpoint)?);
//! let report = Mirror::new(client, config).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod mirror;
pub mod parser;
pub mod remote;
pub mod store;
pub mod term;
pub mod vocab;

// Re-export term types
pub use term::{Bindings, BlankNode, Datatype, Iri, Literal, Term, TermKind, Triple, Variable};

// Re-export parser types
pub use parser::{parse_ntriples, ParseError};

// Re-export store types
pub use store::{IsolationLevel, LocalStore, StoreError, StoreStats};

// Re-export remote access
pub use remote::{Binding, GraphClient, SparqlClient};

// Re-export pipeline types
pub use mirror::{
    mirror, CancelFlag, ChunkedFetcher, Mirror, MirrorReport, Phase, Reporter, TracingReporter, Writer,
    WriterStats,
};

// Re-export configuration types
pub use config::{ConfigError, EndpointConfig, LogLevel, MirrorConfig, PipelineConfig, StoreConfig};

// Re-export error types
pub use error::{ErrorCode, FoundKind, MirrorError, MirrorResult, RemoteQueryError, UnexpectedBindingShape};

/// Crate version and build target
pub fn version_string() -> String {
    format!("{} ({})", env!("KGMIRROR_VERSION"), env!("KGMIRROR_TARGET"))
}
