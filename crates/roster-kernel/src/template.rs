//! Code templates.
//!
//! A template is a small placeholder language rendered into a final code:
//!
//! ```text
//! {dept}{year}{sequence:3}   →   CS24007
//! C{year}{sequence:3}        →   C24005
//! {subject}-{sequence}       →   MATH-12
//! ```
//!
//! Tokens:
//! - `{sequence}` — the sequence number, unpadded
//! - `{sequence:N}` — zero-padded to `N` digits; a sequence too large for
//!   the field widens it rather than truncating, so uniqueness is never
//!   sacrificed for cosmetic width
//! - `{year}` — two-digit admission year from the scope period
//! - `{year:4}` — four-digit admission year
//! - any other `{token}` — substituted from caller-provided scope metadata
//!   before the generic tokens are resolved
//!
//! Unknown tokens are left verbatim. Supplying every token a template
//! references is a static authoring concern, not a runtime error
//! condition.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use roster_types::{AdmissionYear, SequenceNumber};
use serde::{Deserialize, Serialize};

/// A code template, stored raw and resolved at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTemplate(String);

impl CodeTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the pad width of the first `{sequence...}` token.
    ///
    /// `Some(n)` for `{sequence:n}`, `None` for an unpadded `{sequence}`
    /// or a template without a sequence token. Sequence scanning uses this
    /// to know how many trailing characters of an existing code form the
    /// sequence field.
    pub fn pad_width(&self) -> Option<usize> {
        for token in tokens(&self.0) {
            if let Token::Placeholder { name, arg } = token {
                if name == "sequence" {
                    return arg.and_then(|a| a.parse().ok());
                }
            }
        }
        None
    }

    /// Renders the template into a raw code string.
    ///
    /// Scope metadata tokens are substituted first, then the generic
    /// `{sequence}` / `{year}` tokens. The output still passes through
    /// [`roster_types::Code::new`] for normalization; rendering never
    /// fails.
    pub fn render(
        &self,
        sequence: SequenceNumber,
        year: Option<AdmissionYear>,
        metadata: &BTreeMap<String, String>,
    ) -> String {
        let mut substituted = self.0.clone();
        for (key, value) in metadata {
            substituted = substituted.replace(&format!("{{{key}}}"), value);
        }

        let mut out = String::with_capacity(substituted.len());
        for token in tokens(&substituted) {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Placeholder { name, arg } => {
                    if !render_placeholder(&mut out, name, arg, sequence, year) {
                        // Unknown token: emit it verbatim.
                        out.push('{');
                        out.push_str(name);
                        if let Some(arg) = arg {
                            out.push(':');
                            out.push_str(arg);
                        }
                        out.push('}');
                    }
                }
            }
        }
        out
    }
}

/// Renders one generic placeholder into `out`; false if the token is
/// unknown or unresolvable.
fn render_placeholder(
    out: &mut String,
    name: &str,
    arg: Option<&str>,
    sequence: SequenceNumber,
    year: Option<AdmissionYear>,
) -> bool {
    match (name, arg) {
        ("sequence", None) => {
            let _ = write!(out, "{}", sequence.as_u32());
            true
        }
        ("sequence", Some(arg)) => match arg.parse::<usize>() {
            Ok(width) => {
                // `{:0w$}` widens the field when the value outgrows it.
                let _ = write!(out, "{:0width$}", sequence.as_u32());
                true
            }
            Err(_) => false,
        },
        ("year", None | Some("2")) => match year {
            Some(y) => {
                let _ = write!(out, "{:02}", y.two_digit());
                true
            }
            None => false,
        },
        ("year", Some("4")) => match year {
            Some(y) => {
                let _ = write!(out, "{:04}", y.as_u16());
                true
            }
            None => false,
        },
        _ => false,
    }
}

/// One lexed piece of a template.
enum Token<'a> {
    Literal(&'a str),
    Placeholder {
        name: &'a str,
        arg: Option<&'a str>,
    },
}

/// Lexes a template into literals and `{name}` / `{name:arg}` placeholders.
///
/// An unmatched `{` is treated as literal text — templates are authored by
/// operators and a typo should render visibly, not panic.
fn tokens(raw: &str) -> impl Iterator<Item = Token<'_>> {
    let mut rest = raw;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.find('{') {
            Some(0) => match rest.find('}') {
                Some(close) => {
                    let inner = &rest[1..close];
                    rest = &rest[close + 1..];
                    let (name, arg) = match inner.split_once(':') {
                        Some((name, arg)) => (name, Some(arg)),
                        None => (inner, None),
                    };
                    Some(Token::Placeholder { name, arg })
                }
                None => {
                    let literal = rest;
                    rest = "";
                    Some(Token::Literal(literal))
                }
            },
            Some(open) => {
                let literal = &rest[..open];
                rest = &rest[open..];
                Some(Token::Literal(literal))
            }
            None => {
                let literal = rest;
                rest = "";
                Some(Token::Literal(literal))
            }
        }
    })
}
