//! RDF term representations
//!
//! This module defines the data types flowing through the mirror pipeline:
//! - IRIs (named nodes, the identifiers of remote entities)
//! - Literals (with optional datatype or language tag)
//! - Blank nodes (anonymous nodes)
//! - Variables (only in local graph patterns, never stored)

use std::fmt;
use std::sync::Arc;
use fnv::FnvHashMap;

mod iri;
mod literal;
mod blank;
mod variable;

pub use iri::Iri;
pub use literal::{escape, Literal, Datatype, XSD_STRING};
pub use blank::{canonicalize_blank_nodes, BlankNode};
pub use variable::Variable;

/// A term in RDF
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// An IRI reference (named node)
    Iri(Iri),
    /// A literal value
    Literal(Arc<Literal>),
    /// A blank node (anonymous)
    BlankNode(BlankNode),
    /// A variable (for local graph patterns)
    Variable(Variable),
}

/// The kind of a term, used when a binding does not have the expected shape
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TermKind {
    Iri,
    Literal,
    BlankNode,
    Variable,
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TermKind::Iri => "IRI",
            TermKind::Literal => "literal",
            TermKind::BlankNode => "blank node",
            TermKind::Variable => "variable",
        };
        f.write_str(name)
    }
}

impl Term {
    /// Create an IRI term
    pub fn iri(s: impl Into<Arc<str>>) -> Self {
        Term::Iri(Iri::new(s))
    }

    /// Create a plain literal
    pub fn literal(s: impl Into<String>) -> Self {
        Term::Literal(Arc::new(Literal::plain(s.into())))
    }

    /// Create a typed literal
    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Arc::new(Literal::typed(value.into(), datatype.into())))
    }

    /// Create a language-tagged literal
    pub fn lang_literal(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Term::Literal(Arc::new(Literal::with_language(value.into(), lang.into())))
    }

    /// Create a literal from its wire parts
    ///
    /// An explicit `xsd:string` datatype is folded into a plain literal so the
    /// same remote value is stored once whichever serialization delivered it.
    pub fn literal_from_parts(value: impl Into<String>, lang: Option<&str>, datatype: Option<&str>) -> Self {
        match (lang, datatype) {
            (Some(lang), _) => Term::lang_literal(value, lang),
            (None, Some(dt)) if dt != XSD_STRING => Term::typed_literal(value, dt),
            _ => Term::literal(value),
        }
    }

    /// Create a blank node with a label
    pub fn blank(label: impl Into<Arc<str>>) -> Self {
        Term::BlankNode(BlankNode::labeled(label))
    }

    /// Create a pattern variable
    pub fn var(name: impl Into<Arc<str>>) -> Self {
        Term::Variable(Variable::new(name))
    }

    pub fn kind(&self) -> TermKind {
        match self {
            Term::Iri(_) => TermKind::Iri,
            Term::Literal(_) => TermKind::Literal,
            Term::BlankNode(_) => TermKind::BlankNode,
            Term::Variable(_) => TermKind::Variable,
        }
    }

    /// Check if this term is a variable
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    /// Get the IRI if this is an IRI term
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Get the literal if this is a literal term
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            _ => None,
        }
    }
}

impl From<Iri> for Term {
    fn from(iri: Iri) -> Self {
        Term::Iri(iri)
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(i) => write!(f, "{}", i),
            Term::Literal(l) => write!(f, "{}", l),
            Term::BlankNode(b) => write!(f, "{}", b),
            Term::Variable(v) => write!(f, "{}", v),
        }
    }
}

/// A triple (statement) in RDF
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Triple { subject, predicate, object }
    }

    /// Check if this triple is ground (no variables)
    pub fn is_ground(&self) -> bool {
        !(self.subject.is_variable() || self.predicate.is_variable() || self.object.is_variable())
    }
}

impl fmt::Debug for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?} {:?} .", self.subject, self.predicate, self.object)
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// Bindings from variables to terms
pub type Bindings = FnvHashMap<Variable, Term>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_creation() {
        assert_eq!(Term::iri("http://example.org/foo").kind(), TermKind::Iri);
        assert_eq!(Term::literal("hello").kind(), TermKind::Literal);
        assert_eq!(Term::blank("b1").kind(), TermKind::BlankNode);
        assert!(Term::var("x").is_variable());
    }

    #[test]
    fn test_literal_from_parts_folds_xsd_string() {
        assert_eq!(Term::literal_from_parts("a", None, Some(XSD_STRING)), Term::literal("a"));
        assert_eq!(Term::literal_from_parts("a", Some("en"), None), Term::lang_literal("a", "en"));
        assert_eq!(
            Term::literal_from_parts("1", None, Some("http://www.w3.org/2001/XMLSchema#integer")),
            Term::typed_literal("1", "http://www.w3.org/2001/XMLSchema#integer")
        );
    }

    #[test]
    fn test_blank_nodes_compare_by_label() {
        assert_eq!(Term::blank("genid1"), Term::blank("genid1"));
        assert_ne!(Term::blank("genid1"), Term::blank("genid2"));
    }

    #[test]
    fn test_triple_display_is_ntriples() {
        let t = Triple::new(
            Term::iri("http://example.org/s"),
            Term::iri("http://example.org/p"),
            Term::lang_literal("o", "en"),
        );
        assert!(t.is_ground());
        assert_eq!(t.to_string(), "<http://example.org/s> <http://example.org/p> \"o\"@en .");
    }

    #[test]
    fn test_pattern_is_not_ground() {
        let t = Triple::new(Term::var("s"), Term::iri("http://example.org/p"), Term::var("o"));
        assert!(!t.is_ground());
    }
}
