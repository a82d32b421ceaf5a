//! Working sets re-derived from the local store, and the parent-taxon
//! closure

use indexmap::IndexSet;

use super::fetcher::ChunkedFetcher;
use super::queries;
use crate::error::MirrorResult;
use crate::store::{LocalStore, StoreResult};
use crate::term::{Iri, Term, Triple, Variable};
use crate::vocab::{ns, prop};

/// Identifier sets recovered from committed occurrence statements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSets {
    pub compounds: IndexSet<Iri>,
    pub taxa: IndexSet<Iri>,
    pub references: IndexSet<Iri>,
    /// Distinct (compound, taxon, reference) occurrences found
    pub occurrences: usize,
}

/// Read back the compound / taxon / reference occurrences that landed in
/// the store
///
/// Only rows whose three positions are IRIs count.
pub fn derive_working_sets(store: &LocalStore) -> StoreResult<WorkingSets> {
    let found_in = prop::FOUND_IN_TAXON;
    let (compound, taxon, reference) = (Variable::new("compound"), Variable::new("taxon"), Variable::new("reference"));

    let pattern = [
        Triple::new(Term::Variable(compound.clone()), Term::iri(ns::iri(ns::P, found_in)), Term::var("statement")),
        Triple::new(Term::var("statement"), Term::iri(ns::iri(ns::PS, found_in)), Term::Variable(taxon.clone())),
        Triple::new(Term::var("statement"), Term::iri(ns::iri(ns::PROV, "wasDerivedFrom")), Term::var("ref")),
        Triple::new(Term::var("ref"), Term::iri(ns::iri(ns::PR, prop::STATED_IN)), Term::Variable(reference.clone())),
    ];

    let mut sets = WorkingSets::default();
    let mut seen = IndexSet::new();
    for row in store.query(&pattern)? {
        let iri = |v: &Variable| row.get(v).and_then(Term::as_iri).cloned();
        if let (Some(c), Some(t), Some(r)) = (iri(&compound), iri(&taxon), iri(&reference)) {
            sets.compounds.insert(c.clone());
            sets.taxa.insert(t.clone());
            sets.references.insert(r.clone());
            seen.insert((c, t, r));
        }
    }
    sets.occurrences = seen.len();
    Ok(sets)
}

/// Extend `taxa` with every ancestor along the parent-taxon relation
///
/// Each chunk of at most `chunk_size` taxa is resolved with one
/// property-path query. The result always contains the seeds.
pub async fn resolve_parent_closure(
    fetcher: &ChunkedFetcher,
    taxa: &IndexSet<Iri>,
    chunk_size: usize,
) -> MirrorResult<IndexSet<Iri>> {
    let seeds: Vec<Iri> = taxa.iter().cloned().collect();
    let parents = fetcher
        .select_chunked("taxonomy closure", &seeds, &queries::parent_taxa(), chunk_size, "parent")
        .await?;

    let mut extended = taxa.clone();
    extended.extend(parents);
    Ok(extended)
}
