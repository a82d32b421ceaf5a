//! Parametrized query templates
//!
//! Every template text starts with a `#kgmirror:<name>` comment line. SPARQL
//! ignores it; clients and fixtures use it to tell templates apart in logs.
//! Chunked templates carry the [`IDS_PLACEHOLDER`] token inside a
//! `VALUES ?id { ... }` clause.

use crate::remote::NAME_MARKER;
use crate::term::Iri;
use crate::vocab::{ns, prop, EntityKind, TAXONOMIC_RANK_CLASS};

/// Token replaced by the identifier list of a chunk
pub const IDS_PLACEHOLDER: &str = "{{IDS}}";

/// A named query with an optional identifier placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    name: &'static str,
    text: String,
}

impl QueryTemplate {
    fn new(name: &'static str, body: &str) -> Self {
        QueryTemplate {
            name,
            text: format!("{}{}\n{}{}", NAME_MARKER, name, ns::sparql_prefixes(), body),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Raw text, placeholder included
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_parametrized(&self) -> bool {
        self.text.contains(IDS_PLACEHOLDER)
    }

    /// Substitute a chunk of identifiers into the placeholder
    pub fn render(&self, ids: &[Iri]) -> String {
        self.text.replace(IDS_PLACEHOLDER, &render_ids(ids))
    }
}

/// Render identifiers as a whitespace separated term list
pub fn render_ids(ids: &[Iri]) -> String {
    let mut out = String::with_capacity(ids.len() * 48);
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push('<');
        out.push_str(id.as_str());
        out.push('>');
    }
    out
}

const OCCURRENCE_PATTERN: &str = "
    ?compound p:P703 ?statement .
    ?statement ps:P703 ?taxon ;
               prov:wasDerivedFrom ?ref .
    ?ref pr:P248 ?reference .";

/// Every compound / taxon / reference occurrence in the remote graph
pub fn compound_taxon_reference() -> QueryTemplate {
    QueryTemplate::new(
        "compound-taxon-reference",
        &format!("CONSTRUCT {{{0}\n}}\nWHERE {{{0}\n}}\n", OCCURRENCE_PATTERN),
    )
}

/// Compounds that take part in at least one occurrence
pub fn discover_compounds() -> QueryTemplate {
    QueryTemplate::new(
        "discover-compounds",
        &format!("SELECT DISTINCT ?compound\nWHERE {{{}\n}}\n", OCCURRENCE_PATTERN),
    )
}

/// Taxonomic rank items with their English labels
pub fn taxonomic_ranks() -> QueryTemplate {
    let body = format!(
        "CONSTRUCT {{
    ?rank wdt:{p31} wd:{class} .
    ?rank rdfs:label ?label .
}}
WHERE {{
    ?rank wdt:{p31} wd:{class} .
    OPTIONAL {{ ?rank rdfs:label ?label . FILTER(LANG(?label) = \"en\") }}
}}
",
        p31 = prop::INSTANCE_OF,
        class = TAXONOMIC_RANK_CLASS,
    );
    QueryTemplate::new("taxonomic-ranks", &body)
}

/// Every ancestor of the given taxa, the taxa themselves included
pub fn parent_taxa() -> QueryTemplate {
    let body = format!(
        "SELECT DISTINCT ?parent
WHERE {{
    VALUES ?id {{ {ids} }}
    ?id wdt:{p171}* ?parent .
}}
",
        ids = IDS_PLACEHOLDER,
        p171 = prop::PARENT_TAXON,
    );
    QueryTemplate::new("parent-taxa", &body)
}

/// Allow-listed direct claims of one entity kind
pub fn entity_properties(kind: EntityKind) -> QueryTemplate {
    let predicates = kind
        .allowed_predicates()
        .iter()
        .map(|p| format!("<{}>", p))
        .collect::<Vec<_>>()
        .join(" ");
    let body = format!(
        "CONSTRUCT {{ ?id ?p ?o }}
WHERE {{
    VALUES ?id {{ {ids} }}
    VALUES ?p {{ {predicates} }}
    ?id ?p ?o .
}}
",
        ids = IDS_PLACEHOLDER,
        predicates = predicates,
    );
    let name = match kind {
        EntityKind::Compound => "compound-properties",
        EntityKind::Taxon => "taxon-properties",
        EntityKind::Reference => "reference-properties",
    };
    QueryTemplate::new(name, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::template_name;

    #[test]
    fn test_render_ids() {
        let ids = vec![
            Iri::new("http://www.wikidata.org/entity/Q1"),
            Iri::new("http://www.wikidata.org/entity/Q2"),
        ];
        assert_eq!(
            render_ids(&ids),
            "<http://www.wikidata.org/entity/Q1> <http://www.wikidata.org/entity/Q2>"
        );
        assert_eq!(render_ids(&[]), "");
    }

    #[test]
    fn test_render_replaces_placeholder() {
        let q = parent_taxa().render(&[Iri::new("http://www.wikidata.org/entity/Q158746")]);
        assert!(q.contains("VALUES ?id { <http://www.wikidata.org/entity/Q158746> }"));
        assert!(q.contains("wdt:P171*"));
        assert!(!q.contains(IDS_PLACEHOLDER));
    }

    #[test]
    fn test_template_names() {
        for (template, name) in [
            (compound_taxon_reference(), "compound-taxon-reference"),
            (discover_compounds(), "discover-compounds"),
            (taxonomic_ranks(), "taxonomic-ranks"),
            (parent_taxa(), "parent-taxa"),
            (entity_properties(EntityKind::Taxon), "taxon-properties"),
        ] {
            assert_eq!(template.name(), name);
            assert_eq!(template_name(&template.render(&[])), Some(name));
        }
        assert_eq!(template_name("SELECT * WHERE { ?s ?p ?o }"), None);
    }

    #[test]
    fn test_only_chunked_templates_are_parametrized() {
        assert!(!compound_taxon_reference().is_parametrized());
        assert!(!discover_compounds().is_parametrized());
        assert!(!taxonomic_ranks().is_parametrized());
        assert!(parent_taxa().is_parametrized());
        assert!(entity_properties(EntityKind::Reference).is_parametrized());
    }

    #[test]
    fn test_properties_template_lists_allowed_predicates() {
        let text = entity_properties(EntityKind::Compound).render(&[]);
        for p in EntityKind::Compound.allowed_predicates() {
            assert!(text.contains(&format!("<{}>", p)), "missing {}", p);
        }
    }
}
