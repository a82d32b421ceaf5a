//! N-Triples parser
//!
//! CONSTRUCT results are requested as `application/n-triples`, one statement
//! per line. This module turns such a response body into [`Triple`]s.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, space0},
    combinator::{map, map_res, opt},
    error::{Error as NomError, ErrorKind},
    sequence::{delimited, preceded},
};

use crate::term::{Term, Triple};

/// Parser error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("invalid escape sequence: {sequence}")]
    InvalidEscape { sequence: String },
}

/// Parse an N-Triples document
///
/// Blank lines and `#` comment lines are skipped. The first malformed line
/// fails the whole document.
pub fn parse_ntriples(input: &str) -> Result<Vec<Triple>, ParseError> {
    let mut triples = Vec::new();

    for (idx, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (rest, triple) = statement(line).map_err(|e| ParseError::Syntax {
            line: idx + 1,
            message: describe(e),
        })?;

        let rest = rest.trim_start();
        if !rest.is_empty() && !rest.starts_with('#') {
            return Err(ParseError::Syntax {
                line: idx + 1,
                message: format!("unexpected trailing content '{}'", rest),
            });
        }

        triples.push(triple);
    }

    Ok(triples)
}

fn describe(err: nom::Err<NomError<&str>>) -> String {
    match err {
        nom::Err::Incomplete(_) => "incomplete statement".to_string(),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let near: String = e.input.chars().take(24).collect();
            format!("{:?} near '{}'", e.code, near)
        }
    }
}

/// `subject predicate object .`
fn statement(input: &str) -> IResult<&str, Triple> {
    let (input, subject) = alt((iri_term, blank_term))(input)?;
    let (input, _) = space0(input)?;
    let (input, predicate) = iri_term(input)?;
    let (input, _) = space0(input)?;
    let (input, object) = alt((iri_term, blank_term, literal_term))(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = char('.')(input)?;
    Ok((input, Triple::new(subject, predicate, object)))
}

fn iri(input: &str) -> IResult<&str, String> {
    map_res(
        delimited(char('<'), take_while(|c| c != '>'), char('>')),
        unescape,
    )(input)
}

fn iri_term(input: &str) -> IResult<&str, Term> {
    map(iri, Term::iri)(input)
}

fn blank_term(input: &str) -> IResult<&str, Term> {
    let (input, _) = tag("_:")(input)?;
    let (_, raw) = take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))(input)?;
    // A label may contain dots but never ends with one; the final dot closes the statement.
    let label = raw.trim_end_matches('.');
    if label.is_empty() {
        return Err(nom::Err::Error(NomError::new(input, ErrorKind::TakeWhile1)));
    }
    Ok((&input[label.len()..], Term::blank(label)))
}

enum Suffix {
    Language(String),
    Datatype(String),
}

fn literal_term(input: &str) -> IResult<&str, Term> {
    let (input, value) = quoted(input)?;
    let (input, suffix) = opt(alt((
        map(
            preceded(char('@'), take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-')),
            |lang: &str| Suffix::Language(lang.to_string()),
        ),
        map(preceded(tag("^^"), iri), Suffix::Datatype),
    )))(input)?;

    let term = match suffix {
        Some(Suffix::Language(lang)) => Term::literal_from_parts(value, Some(&lang), None),
        Some(Suffix::Datatype(dt)) => Term::literal_from_parts(value, None, Some(&dt)),
        None => Term::literal(value),
    };
    Ok((input, term))
}

/// A double-quoted string with backslash escapes
fn quoted(input: &str) -> IResult<&str, String> {
    let (body, _) = char('"')(input)?;
    let mut escaped = false;

    for (i, c) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => {
                let value = unescape(&body[..i])
                    .map_err(|_| nom::Err::Failure(NomError::new(body, ErrorKind::Escaped)))?;
                return Ok((&body[i + 1..], value));
            }
            _ => {}
        }
    }

    Err(nom::Err::Error(NomError::new(input, ErrorKind::Char)))
}

/// Resolve N-Triples string escapes (`\t \b \n \r \f \" \' \\ \uXXXX \UXXXXXXXX`)
pub fn unescape(s: &str) -> Result<String, ParseError> {
    if !s.contains('\\') {
        return Ok(s.to_string());
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let esc = chars.next().ok_or_else(|| ParseError::InvalidEscape {
            sequence: "\\".to_string(),
        })?;
        match esc {
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            'f' => out.push('\u{c}'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            '\\' => out.push('\\'),
            'u' | 'U' => {
                let len = if esc == 'u' { 4 } else { 8 };
                let hex: String = chars.by_ref().take(len).collect();
                let decoded = (hex.len() == len)
                    .then(|| u32::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .and_then(char::from_u32)
                    .ok_or_else(|| ParseError::InvalidEscape {
                        sequence: format!("\\{}{}", esc, hex),
                    })?;
                out.push(decoded);
            }
            other => {
                return Err(ParseError::InvalidEscape {
                    sequence: format!("\\{}", other),
                })
            }
        }
    }

    Ok(out)
}
