//! Blank node representation and response-local relabeling

use std::fmt;
use std::hash::Hasher;
use std::sync::Arc;

use fnv::{FnvHashMap, FnvHasher};

use super::{Term, Triple};

/// A blank node, identified by its label
///
/// Labels are only meaningful inside one remote response. Before a response
/// reaches the store its blank nodes are renamed with
/// [`canonicalize_blank_nodes`], so the stored label depends on the
/// statements around the node and not on the endpoint's serializer.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlankNode {
    label: Arc<str>,
}

impl BlankNode {
    /// Create a blank node with a label
    pub fn labeled(label: impl Into<Arc<str>>) -> Self {
        BlankNode { label: label.into() }
    }

    /// Get the label
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.label)
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.label)
    }
}

/// Prefix of every label produced by [`canonicalize_blank_nodes`]
const CANONICAL_PREFIX: &str = "k";

/// Rename the blank nodes of one response after the statements holding them
///
/// A node used as an object is named from the `(subject, predicate)` pairs
/// pointing at it; a node that only appears as a subject is named from its
/// `(predicate, object)` pairs. Other blank nodes are masked while hashing,
/// so the result does not depend on any incoming label. Two nodes held by
/// the same pairs get the same name.
pub fn canonicalize_blank_nodes(triples: Vec<Triple>) -> Vec<Triple> {
    if !triples
        .iter()
        .any(|t| matches!(t.subject, Term::BlankNode(_)) || matches!(t.object, Term::BlankNode(_)))
    {
        return triples;
    }

    let mut incoming: FnvHashMap<BlankNode, Vec<String>> = FnvHashMap::default();
    let mut outgoing: FnvHashMap<BlankNode, Vec<String>> = FnvHashMap::default();
    for t in &triples {
        if let Term::BlankNode(b) = &t.object {
            incoming
                .entry(b.clone())
                .or_default()
                .push(format!("< {} {}", masked(&t.subject), t.predicate));
        }
        if let Term::BlankNode(b) = &t.subject {
            outgoing
                .entry(b.clone())
                .or_default()
                .push(format!("> {} {}", t.predicate, masked(&t.object)));
        }
    }
    for (node, signature) in outgoing {
        incoming.entry(node).or_insert(signature);
    }

    let labels: FnvHashMap<BlankNode, BlankNode> = incoming
        .into_iter()
        .map(|(node, mut signature)| {
            signature.sort_unstable();
            signature.dedup();
            let mut hasher = FnvHasher::default();
            for line in &signature {
                hasher.write(line.as_bytes());
                hasher.write_u8(b'\n');
            }
            let label = format!("{}{:016x}", CANONICAL_PREFIX, hasher.finish());
            (node, BlankNode::labeled(label))
        })
        .collect();

    let rename = |term: Term| match term {
        Term::BlankNode(b) => Term::BlankNode(labels.get(&b).cloned().unwrap_or(b)),
        other => other,
    };
    triples
        .into_iter()
        .map(|t| Triple::new(rename(t.subject), t.predicate, rename(t.object)))
        .collect()
}

fn masked(term: &Term) -> String {
    match term {
        Term::BlankNode(_) => "_".to_string(),
        other => other.to_string(),
    }
}
