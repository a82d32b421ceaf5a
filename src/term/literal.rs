//! Literal value representation

use std::fmt;

/// Datatype IRI of plain string literals
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Datatype for a literal
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Datatype {
    /// Plain literal (no datatype)
    Plain,
    /// Language-tagged literal
    Language(String),
    /// Typed literal with datatype IRI
    Typed(String),
}

/// An RDF literal value
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    value: String,
    datatype: Datatype,
}

impl Literal {
    /// Create a plain literal
    pub fn plain(value: String) -> Self {
        Literal {
            value,
            datatype: Datatype::Plain,
        }
    }

    /// Create a typed literal
    pub fn typed(value: String, datatype: String) -> Self {
        Literal {
            value,
            datatype: Datatype::Typed(datatype),
        }
    }

    /// Create a language-tagged literal
    pub fn with_language(value: String, lang: String) -> Self {
        Literal {
            value,
            datatype: Datatype::Language(lang.to_lowercase()),
        }
    }

    /// Get the lexical value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Get the datatype
    pub fn datatype(&self) -> &Datatype {
        &self.datatype
    }

    /// Get the language tag if present
    pub fn language(&self) -> Option<&str> {
        match &self.datatype {
            Datatype::Language(lang) => Some(lang),
            _ => None,
        }
    }
}

/// Escape a lexical form for N-Triples / SPARQL output
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = escape(&self.value);
        match &self.datatype {
            Datatype::Plain => write!(f, "\"{}\"", value),
            Datatype::Language(lang) => write!(f, "\"{}\"@{}", value, lang),
            Datatype::Typed(dt) => write!(f, "\"{}\"^^<{}>", value, dt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_literal() {
        let lit = Literal::plain("hello".into());
        assert_eq!(lit.value(), "hello");
        assert_eq!(format!("{}", lit), "\"hello\"");
    }

    #[test]
    fn test_typed_literal() {
        let lit = Literal::typed("42".into(), "http://www.w3.org/2001/XMLSchema#integer".into());
        assert!(matches!(lit.datatype(), Datatype::Typed(dt) if dt == "http://www.w3.org/2001/XMLSchema#integer"));
        assert_eq!(format!("{}", lit), "\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>");
    }

    #[test]
    fn test_lang_literal_is_lowercased() {
        let lit = Literal::with_language("Quercus robur".into(), "EN".into());
        assert_eq!(lit.language(), Some("en"));
        assert_eq!(format!("{}", lit), "\"Quercus robur\"@en");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("say \"hi\"\n"), "say \\\"hi\\\"\\n");
        assert_eq!(escape("a\\b\tc"), "a\\\\b\\tc");
    }
}
