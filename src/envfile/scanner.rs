//! Reference scanner.
//!
//! Finds `${provider:body}` tokens inside a value string. Stateless and
//! restartable per call; the parser hands it one value at a time.
//!
//! The `:-` default-fallback suffix (`${env:HOST:-localhost}`) is
//! recognized lexically but deliberately inert: it is passed through
//! verbatim as part of the body and never evaluated. This is reserved
//! syntax, not an omission.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use super::find_unescaped;
use crate::errors::{Error, Result};

/// Allowed provider names, per the reference wire format.
static PROVIDER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z0-9_-]+$").expect("provider name regex"));

/// A `${provider:body}` token located inside one value string.
///
/// `span` is the byte range of the whole token (including `${` and `}`).
/// Ranges within one value never overlap; substitution applies them in
/// descending order so earlier offsets stay valid.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub provider: String,
    pub body: String,
    pub span: Range<usize>,
}

fn syntax_error(token: &str, reason: &str) -> Error {
    Error::InvalidReferenceSyntax {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}

/// Scan a value left to right for reference tokens.
///
/// Consumes each `${` up to the matching unescaped `}`. Plain braces may
/// nest one level inside the body; a nested `${` is a scan failure, never
/// silently flattened.
///
/// # Errors
///
/// [`Error::InvalidReferenceSyntax`] for an unterminated token, a nested
/// reference, braces nested deeper than one level, a missing `:`
/// separator, or a provider name outside `[A-Za-z0-9_-]+`.
pub fn scan(value: &str) -> Result<Vec<Reference>> {
    let bytes = value.as_bytes();
    let mut references = Vec::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if !(bytes[i] == b'$' && bytes[i + 1] == b'{') {
            i += 1;
            continue;
        }

        let start = i;
        let mut depth = 0usize;
        let mut close = None;
        let mut j = i + 2;
        while j < bytes.len() {
            match bytes[j] {
                b'\\' => {
                    // escaped byte, skip it
                    j += 2;
                    continue;
                }
                b'$' if j + 1 < bytes.len() && bytes[j + 1] == b'{' => {
                    return Err(syntax_error(
                        &value[start..j + 2],
                        "nested reference before closing '}'",
                    ));
                }
                b'{' => {
                    depth += 1;
                    if depth > 1 {
                        return Err(syntax_error(
                            &value[start..=j],
                            "braces nested deeper than one level",
                        ));
                    }
                }
                b'}' => {
                    if depth == 0 {
                        close = Some(j);
                        break;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            j += 1;
        }

        let close = close.ok_or_else(|| syntax_error(&value[start..], "unterminated reference"))?;
        let token = &value[start..=close];
        let interior = &value[start + 2..close];

        let colon = find_unescaped(interior, b':')
            .ok_or_else(|| syntax_error(token, "missing ':' between provider and reference"))?;
        let provider = &interior[..colon];
        let body = &interior[colon + 1..];

        if !PROVIDER_NAME.is_match(provider) {
            return Err(syntax_error(
                token,
                "provider name must match [A-Za-z0-9_-]+",
            ));
        }

        references.push(Reference {
            provider: provider.to_string(),
            body: body.to_string(),
            span: start..close + 1,
        });
        i = close + 1;
    }

    Ok(references)
}
