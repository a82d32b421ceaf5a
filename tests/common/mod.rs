//! Shared fixtures for integration tests
//!
//! [`FixtureEndpoint`] plays the remote SPARQL endpoint: it recognizes the
//! crate's query templates by name, evaluates them against an in-memory
//! graph and records every query it receives.

#![allow(dead_code)]

use std::collections::{BTreeSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use regex::Regex;

use kgmirror::remote::template_name;
use kgmirror::vocab::{ns, EntityKind, TAXONOMIC_RANK_CLASS};
use kgmirror::{
    Binding, GraphClient, MirrorConfig, Phase, RemoteQueryError, Reporter, Term, Triple, UnexpectedBindingShape,
};

pub fn wd(id: &str) -> Term {
    Term::iri(ns::iri(ns::WD, id))
}

pub fn wdt(p: &str) -> Term {
    Term::iri(ns::iri(ns::WDT, p))
}

fn p(prop: &str) -> Term {
    Term::iri(ns::iri(ns::P, prop))
}

fn ps(prop: &str) -> Term {
    Term::iri(ns::iri(ns::PS, prop))
}

fn pr(prop: &str) -> Term {
    Term::iri(ns::iri(ns::PR, prop))
}

fn derived_from() -> Term {
    Term::iri(ns::iri(ns::PROV, "wasDerivedFrom"))
}

fn rdfs_label() -> Term {
    Term::iri(ns::iri(ns::RDFS, "label"))
}

// ============================================================================
// Remote graph builder
// ============================================================================

/// Remote graph contents, built entity by entity
#[derive(Debug, Clone, Default)]
pub struct FixtureGraph {
    pub triples: Vec<Triple>,
}

impl FixtureGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, s: Term, p: Term, o: Term) -> &mut Self {
        self.triples.push(Triple::new(s, p, o));
        self
    }

    /// A compound found in `taxon` according to `reference`, with every
    /// allow-listed compound property
    pub fn compound(&mut self, id: &str, taxon: &str, reference: &str) -> &mut Self {
        self.occurrence(id, taxon, reference);
        let c = wd(id);
        self.add(c.clone(), wdt("P31"), wd("Q11173"))
            .add(c.clone(), wdt("P233"), Term::literal(format!("C{}O", id)))
            .add(c.clone(), wdt("P234"), Term::literal(format!("InChI=1S/{}", id)))
            .add(c.clone(), wdt("P235"), Term::literal(format!("KEY-{}", id)))
            .add(c.clone(), wdt("P274"), Term::literal("C6H12O6"))
            .add(c.clone(), wdt("P2017"), Term::literal(format!("C[{}]O", id)))
            .add(c.clone(), wdt("P703"), wd(taxon))
            // not allow-listed
            .add(c, wdt("P18"), Term::literal("structure.svg"))
    }

    /// An additional compound / taxon / reference statement
    pub fn occurrence(&mut self, compound: &str, taxon: &str, reference: &str) -> &mut Self {
        let st = Term::iri(format!("http://www.wikidata.org/entity/statement/{}-{}-{}", compound, taxon, reference));
        let r = Term::iri(format!("http://www.wikidata.org/reference/{}-{}", compound, reference));
        self.add(wd(compound), p("P703"), st.clone())
            .add(st.clone(), ps("P703"), wd(taxon))
            .add(st, derived_from(), r.clone())
            .add(r, pr("P248"), wd(reference))
    }

    /// A taxon with an optional IRI parent
    pub fn taxon(&mut self, id: &str, parent: Option<&str>) -> &mut Self {
        let t = wd(id);
        self.taxon_common(id);
        if let Some(parent) = parent {
            self.add(t, wdt("P171"), wd(parent));
        }
        self
    }

    /// A taxon whose parent is an "unknown value" blank node
    pub fn taxon_with_blank_parent(&mut self, id: &str) -> &mut Self {
        self.taxon_common(id);
        self.add(wd(id), wdt("P171"), Term::blank(format!("unknown-{}", id)))
    }

    fn taxon_common(&mut self, id: &str) {
        let t = wd(id);
        self.add(t.clone(), wdt("P31"), wd("Q16521"))
            .add(t.clone(), wdt("P105"), wd("Q7432"))
            .add(t.clone(), wdt("P225"), Term::literal(format!("Taxon {}", id)))
            .add(t.clone(), wdt("P685"), Term::literal(format!("ncbi-{}", id)))
            .add(t.clone(), wdt("P846"), Term::literal(format!("gbif-{}", id)))
            .add(t.clone(), wdt("P9157"), Term::literal(format!("ott-{}", id)))
            .add(t, wdt("P373"), Term::literal("commons category"));
    }

    /// A bibliographic reference with every allow-listed property
    pub fn reference(&mut self, id: &str) -> &mut Self {
        let r = wd(id);
        self.add(r.clone(), wdt("P31"), wd("Q13442814"))
            .add(r.clone(), wdt("P1476"), Term::lang_literal(format!("On {}", id), "en"))
            .add(r.clone(), wdt("P356"), Term::literal(format!("10.1000/{}", id)))
            .add(
                r.clone(),
                wdt("P577"),
                Term::typed_literal("2001-01-01T00:00:00Z", "http://www.w3.org/2001/XMLSchema#dateTime"),
            )
            .add(r, wdt("P698"), Term::literal(format!("pm-{}", id)))
    }

    /// A taxonomic rank item
    pub fn rank(&mut self, id: &str, label: &str) -> &mut Self {
        self.add(wd(id), wdt("P31"), wd(TAXONOMIC_RANK_CLASS))
            .add(wd(id), rdfs_label(), Term::lang_literal(label, "en"))
            .add(wd(id), rdfs_label(), Term::lang_literal(format!("{} (fr)", label), "fr"))
    }

    pub fn build(&self) -> Arc<FixtureEndpoint> {
        Arc::new(FixtureEndpoint::new(self.triples.clone()))
    }
}

/// Five compounds C1..C5 in taxa T1..T5, each cited by its own reference.
///
/// Parent links: T1 -> G1 -> F1, T2 -> G1, T4 -> G2 -> F1, T5 -> G2, and T3
/// has an unknown (blank node) parent.
pub fn lotus_graph() -> FixtureGraph {
    let mut g = FixtureGraph::new();
    for i in 1..=5 {
        g.compound(&format!("C{}", i), &format!("T{}", i), &format!("R{}", i))
            .reference(&format!("R{}", i));
    }
    g.taxon("T1", Some("G1"))
        .taxon("T2", Some("G1"))
        .taxon_with_blank_parent("T3")
        .taxon("T4", Some("G2"))
        .taxon("T5", Some("G2"))
        .taxon("G1", Some("F1"))
        .taxon("G2", Some("F1"))
        .taxon("F1", None)
        .rank("Q7432", "species")
        .rank("Q34740", "genus");
    g
}

// ============================================================================
// Fixture endpoint
// ============================================================================

pub struct FixtureEndpoint {
    graph: Vec<Triple>,
    queries: Mutex<Vec<String>>,
    id_values: Regex,
    predicate_values: Regex,
    iri: Regex,
}

impl FixtureEndpoint {
    pub fn new(graph: Vec<Triple>) -> Self {
        FixtureEndpoint {
            graph,
            queries: Mutex::new(Vec::new()),
            id_values: Regex::new(r"VALUES \?id \{([^}]*)\}").unwrap(),
            predicate_values: Regex::new(r"VALUES \?p \{([^}]*)\}").unwrap(),
            iri: Regex::new(r"<([^>]+)>").unwrap(),
        }
    }

    /// Every query received so far
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    /// Queries received for one template
    pub fn queries_named(&self, name: &str) -> Vec<String> {
        self.queries()
            .into_iter()
            .filter(|q| template_name(q) == Some(name))
            .collect()
    }

    /// Identifiers substituted into a rendered query
    pub fn ids_in(&self, query: &str) -> Vec<Term> {
        self.values(&self.id_values, query)
    }

    fn values(&self, clause: &Regex, query: &str) -> Vec<Term> {
        clause
            .captures(query)
            .map(|c| {
                self.iri
                    .captures_iter(&c[1])
                    .map(|i| Term::iri(i[1].to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn objects(&self, s: &Term, p: &Term) -> Vec<Term> {
        self.graph
            .iter()
            .filter(|t| &t.subject == s && &t.predicate == p)
            .map(|t| t.object.clone())
            .collect()
    }

    /// (compound, statement node, taxon, reference node, reference) joins
    fn occurrences(&self) -> Vec<[Term; 5]> {
        let mut out = Vec::new();
        for t in self.graph.iter().filter(|t| t.predicate == p("P703")) {
            for taxon in self.objects(&t.object, &ps("P703")) {
                for r in self.objects(&t.object, &derived_from()) {
                    for reference in self.objects(&r, &pr("P248")) {
                        out.push([t.subject.clone(), t.object.clone(), taxon.clone(), r.clone(), reference]);
                    }
                }
            }
        }
        out
    }

    fn bad_request(message: &str) -> RemoteQueryError {
        RemoteQueryError::Status {
            endpoint: "fixture".into(),
            status: 400,
            body: message.into(),
        }
    }
}

#[async_trait]
impl GraphClient for FixtureEndpoint {
    async fn construct(&self, query: &str) -> Result<Vec<Triple>, RemoteQueryError> {
        self.queries.lock().unwrap().push(query.to_string());

        let triples: BTreeSet<Triple> = match template_name(query) {
            Some("compound-taxon-reference") => self
                .occurrences()
                .into_iter()
                .flat_map(|[c, st, taxon, r, reference]| {
                    vec![
                        Triple::new(c, p("P703"), st.clone()),
                        Triple::new(st.clone(), ps("P703"), taxon),
                        Triple::new(st, derived_from(), r.clone()),
                        Triple::new(r, pr("P248"), reference),
                    ]
                })
                .collect(),
            Some("taxonomic-ranks") => {
                let ranks: Vec<Term> = self
                    .graph
                    .iter()
                    .filter(|t| t.predicate == wdt("P31") && t.object == wd(TAXONOMIC_RANK_CLASS))
                    .map(|t| t.subject.clone())
                    .collect();
                self.graph
                    .iter()
                    .filter(|t| ranks.contains(&t.subject))
                    .filter(|t| {
                        t.predicate == wdt("P31")
                            || (t.predicate == rdfs_label()
                                && t.object.as_literal().and_then(|l| l.language()) == Some("en"))
                    })
                    .cloned()
                    .collect()
            }
            Some("taxon-properties") | Some("compound-properties") | Some("reference-properties") => {
                let ids = self.ids_in(query);
                let predicates = self.values(&self.predicate_values, query);
                self.graph
                    .iter()
                    .filter(|t| ids.contains(&t.subject) && predicates.contains(&t.predicate))
                    .cloned()
                    .collect()
            }
            _ => return Err(Self::bad_request("unknown CONSTRUCT template")),
        };

        Ok(triples.into_iter().collect())
    }

    async fn select(&self, query: &str) -> Result<Vec<Binding>, RemoteQueryError> {
        self.queries.lock().unwrap().push(query.to_string());

        let terms: BTreeSet<Term> = match template_name(query) {
            Some("discover-compounds") => self.occurrences().into_iter().map(|[c, ..]| c).collect(),
            Some("parent-taxa") => {
                // wdt:P171* from every id, zero-length path included
                let mut reached = BTreeSet::new();
                let mut queue: VecDeque<Term> = self.ids_in(query).into();
                while let Some(node) = queue.pop_front() {
                    if !reached.insert(node.clone()) {
                        continue;
                    }
                    queue.extend(self.objects(&node, &wdt("P171")));
                }
                reached
            }
            _ => return Err(Self::bad_request("unknown SELECT template")),
        };

        let variable = match template_name(query) {
            Some("discover-compounds") => "compound",
            _ => "parent",
        };
        Ok(terms.into_iter().map(|t| Binding::new().with(variable, t)).collect())
    }
}

// ============================================================================
// Reporter and config helpers
// ============================================================================

/// Reporter that records what it is told
#[derive(Default)]
pub struct RecordingReporter {
    pub phases: Mutex<Vec<Phase>>,
    pub warnings: Mutex<Vec<UnexpectedBindingShape>>,
    pub commits: Mutex<usize>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn warnings(&self) -> Vec<UnexpectedBindingShape> {
        self.warnings.lock().unwrap().clone()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.phases.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn phase(&self, phase: Phase) {
        self.phases.lock().unwrap().push(phase);
    }

    fn progress(&self, _label: &str, _done: usize, _total: usize) {}

    fn warning(&self, warning: &UnexpectedBindingShape) {
        self.warnings.lock().unwrap().push(warning.clone());
    }

    fn committed(&self, _batch_len: usize, _inserted: usize, _total: usize) {
        *self.commits.lock().unwrap() += 1;
    }
}

/// Config pointing at a fresh store inside `dir`
pub fn test_config(dir: &tempfile::TempDir) -> MirrorConfig {
    let mut config = MirrorConfig::default();
    config.store.path = store_path(dir);
    config.endpoint.url = "http://fixture.invalid/sparql".into();
    config.mirror.channel_capacity = 2;
    config.mirror.retry_backoff_ms = 1;
    config
}

pub fn store_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("mirror.sqlite")
}

/// Allow-listed predicates of a kind, as terms
pub fn allowed(kind: EntityKind) -> Vec<Term> {
    kind.allowed_predicates().into_iter().map(Term::iri).collect()
}
