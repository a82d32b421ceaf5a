//! SPARQL 1.1 Query Results JSON decoding

use serde::Deserialize;

use super::Binding;
use crate::error::RemoteQueryError;
use crate::term::Term;

#[derive(Debug, Deserialize)]
struct ResultsDocument {
    results: ResultsBody,
}

#[derive(Debug, Deserialize)]
struct ResultsBody {
    bindings: Vec<std::collections::BTreeMap<String, JsonTerm>>,
}

#[derive(Debug, Deserialize)]
struct JsonTerm {
    #[serde(rename = "type")]
    kind: String,
    value: serde_json::Value,
    #[serde(rename = "xml:lang")]
    lang: Option<String>,
    datatype: Option<String>,
}

impl JsonTerm {
    fn into_term(self) -> Option<Term> {
        // RDF-star triple terms carry an object here
        let serde_json::Value::String(value) = self.value else {
            return None;
        };
        match self.kind.as_str() {
            "uri" => Some(Term::iri(value)),
            "literal" | "typed-literal" => Some(Term::literal_from_parts(
                value,
                self.lang.as_deref(),
                self.datatype.as_deref(),
            )),
            "bnode" => Some(Term::blank(value)),
            // Triple terms and vendor extensions are not mirrored
            _ => None,
        }
    }
}

/// Decode an `application/sparql-results+json` body into rows
pub fn parse_select_results(body: &str) -> Result<Vec<Binding>, RemoteQueryError> {
    let doc: ResultsDocument = serde_json::from_str(body).map_err(|e| RemoteQueryError::Decode {
        format: "sparql-results+json",
        message: e.to_string(),
    })?;

    Ok(doc
        .results
        .bindings
        .into_iter()
        .map(|row| {
            row.into_iter()
                .filter_map(|(var, value)| value.into_term().map(|t| (var, t)))
                .collect()
        })
        .collect())
}
