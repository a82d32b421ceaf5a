//! Remote graph access
//!
//! The pipeline only ever asks two things of the remote service: evaluate a
//! CONSTRUCT and hand back triples, or evaluate a SELECT and hand back rows.
//! [`GraphClient`] is that seam. [`SparqlClient`] implements it over HTTP;
//! tests implement it with an in-memory fixture.

use async_trait::async_trait;
use fnv::FnvHashMap;

use crate::error::{FoundKind, RemoteQueryError, UnexpectedBindingShape};
use crate::term::{Iri, Term, Triple};

mod http;
mod results;
mod sparql;

pub use http::{create_client, HttpClientConfig};
pub use results::parse_select_results;
pub use sparql::SparqlClient;

/// Prefix of the comment line that names a query
pub const NAME_MARKER: &str = "#kgmirror:";

/// Name from a query's leading `#kgmirror:<name>` line, if it has one
pub fn template_name(query: &str) -> Option<&str> {
    query.lines().next()?.trim().strip_prefix(NAME_MARKER)
}

/// A read-only SPARQL endpoint
///
/// Calls are issued one at a time by the caller; implementations do not need
/// to handle concurrent requests from the same run.
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Evaluate a CONSTRUCT query
    async fn construct(&self, query: &str) -> Result<Vec<Triple>, RemoteQueryError>;

    /// Evaluate a SELECT query
    async fn select(&self, query: &str) -> Result<Vec<Binding>, RemoteQueryError>;
}

/// One result row of a SELECT query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binding {
    values: FnvHashMap<String, Term>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, variable: impl Into<String>, term: Term) {
        self.values.insert(variable.into(), term);
    }

    pub fn with(mut self, variable: impl Into<String>, term: Term) -> Self {
        self.insert(variable, term);
        self
    }

    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.values.get(variable)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Coerce an identifier column to an [`Iri`]
    ///
    /// `query` names the template the row came from and only feeds the error.
    pub fn iri(&self, variable: &str, query: &str) -> Result<Iri, UnexpectedBindingShape> {
        match self.values.get(variable) {
            Some(Term::Iri(iri)) => Ok(iri.clone()),
            Some(other) => Err(UnexpectedBindingShape {
                query: query.to_string(),
                variable: variable.to_string(),
                found: FoundKind::Term(other.kind()),
                value: Some(other.to_string()),
            }),
            None => Err(UnexpectedBindingShape {
                query: query.to_string(),
                variable: variable.to_string(),
                found: FoundKind::Unbound,
                value: None,
            }),
        }
    }
}

impl FromIterator<(String, Term)> for Binding {
    fn from_iter<I: IntoIterator<Item = (String, Term)>>(iter: I) -> Self {
        Binding {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::TermKind;

    #[test]
    fn test_template_name_from_first_line() {
        assert_eq!(template_name("#kgmirror:parent-taxa\nSELECT ?parent"), Some("parent-taxa"));
        assert_eq!(template_name("SELECT ?s\n#kgmirror:parent-taxa"), None);
        assert_eq!(template_name(""), None);
    }

    #[test]
    fn test_iri_coercion() {
        let row = Binding::new().with("compound", Term::iri("http://www.wikidata.org/entity/Q312266"));
        let iri = row.iri("compound", "discover-compounds").unwrap();
        assert_eq!(iri.as_str(), "http://www.wikidata.org/entity/Q312266");
    }

    #[test]
    fn test_blank_node_is_rejected() {
        let row = Binding::new().with("parent", Term::blank("t123"));
        let err = row.iri("parent", "parent-taxa").unwrap_err();
        assert_eq!(err.found, FoundKind::Term(TermKind::BlankNode));
        assert_eq!(err.value.as_deref(), Some("_:t123"));
        assert_eq!(err.query, "parent-taxa");
    }

    #[test]
    fn test_unbound_is_rejected() {
        let row = Binding::new();
        let err = row.iri("parent", "parent-taxa").unwrap_err();
        assert_eq!(err.found, FoundKind::Unbound);
    }
}
