//! Namespace constants and predicate allow-lists for the mirrored slice
//!
//! These tables decide which remote predicates are copied for each entity
//! kind. They are pure data; the query templates in [`crate::mirror::queries`]
//! are rendered from them.

/// Standard namespace IRI constants
pub mod ns {
    /// RDF Schema namespace
    pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    /// Schema.org namespace
    pub const SCHEMA: &str = "http://schema.org/";
    /// W3C provenance namespace
    pub const PROV: &str = "http://www.w3.org/ns/prov#";

    /// Wikidata entities (`wd:`)
    pub const WD: &str = "http://www.wikidata.org/entity/";
    /// Truthy direct claims (`wdt:`)
    pub const WDT: &str = "http://www.wikidata.org/prop/direct/";
    /// Statement nodes (`p:`)
    pub const P: &str = "http://www.wikidata.org/prop/";
    /// Statement values (`ps:`)
    pub const PS: &str = "http://www.wikidata.org/prop/statement/";
    /// Reference values (`pr:`)
    pub const PR: &str = "http://www.wikidata.org/prop/reference/";

    /// Helper to construct a full IRI from namespace and local name
    #[inline]
    pub fn iri(namespace: &str, local: &str) -> String {
        format!("{}{}", namespace, local)
    }

    /// SPARQL `PREFIX` block for every namespace above
    pub fn sparql_prefixes() -> String {
        [
            ("rdfs", RDFS),
            ("schema", SCHEMA),
            ("prov", PROV),
            ("wd", WD),
            ("wdt", WDT),
            ("p", P),
            ("ps", PS),
            ("pr", PR),
        ]
        .iter()
        .map(|(prefix, ns)| format!("PREFIX {}: <{}>\n", prefix, ns))
        .collect()
    }
}

/// Wikidata property identifiers used by the pipeline
pub mod prop {
    pub const INSTANCE_OF: &str = "P31";
    pub const TAXON_RANK: &str = "P105";
    pub const PARENT_TAXON: &str = "P171";
    pub const TAXON_NAME: &str = "P225";
    pub const NCBI_TAXONOMY_ID: &str = "P685";
    pub const GBIF_TAXON_ID: &str = "P846";
    pub const OPEN_TREE_OF_LIFE_ID: &str = "P9157";

    pub const CANONICAL_SMILES: &str = "P233";
    pub const INCHI: &str = "P234";
    pub const INCHIKEY: &str = "P235";
    pub const CHEMICAL_FORMULA: &str = "P274";
    pub const ISOMERIC_SMILES: &str = "P2017";
    pub const FOUND_IN_TAXON: &str = "P703";

    pub const TITLE: &str = "P1476";
    pub const DOI: &str = "P356";
    pub const PUBLICATION_DATE: &str = "P577";
    pub const PUBMED_ID: &str = "P698";
    pub const STATED_IN: &str = "P248";
}

/// Wikidata item for "taxonomic rank"
pub const TAXONOMIC_RANK_CLASS: &str = "Q427626";

/// The three kinds of entity the mirror copies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Compound,
    Taxon,
    Reference,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Compound => "compound",
            EntityKind::Taxon => "taxon",
            EntityKind::Reference => "reference",
        }
    }

    /// Direct-claim (`wdt:`) properties copied for this kind
    pub fn allowed_properties(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Taxon => &[
                prop::INSTANCE_OF,
                prop::TAXON_RANK,
                prop::PARENT_TAXON,
                prop::TAXON_NAME,
                prop::NCBI_TAXONOMY_ID,
                prop::GBIF_TAXON_ID,
                prop::OPEN_TREE_OF_LIFE_ID,
            ],
            EntityKind::Compound => &[
                prop::INSTANCE_OF,
                prop::CANONICAL_SMILES,
                prop::INCHI,
                prop::INCHIKEY,
                prop::CHEMICAL_FORMULA,
                prop::ISOMERIC_SMILES,
                prop::FOUND_IN_TAXON,
            ],
            EntityKind::Reference => &[
                prop::INSTANCE_OF,
                prop::TITLE,
                prop::DOI,
                prop::PUBLICATION_DATE,
                prop::PUBMED_ID,
            ],
        }
    }

    /// Full predicate IRIs for [`allowed_properties`](Self::allowed_properties)
    pub fn allowed_predicates(&self) -> Vec<String> {
        self.allowed_properties()
            .iter()
            .map(|p| ns::iri(ns::WDT, p))
            .collect()
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
