//! Environment file parsing and serialization.
//!
//! Turns file content into an ordered sequence of semantic lines and back.
//! Every line keeps its raw source text, so a file with nothing to resolve
//! re-serializes byte-for-byte, and substitution touches only the byte
//! ranges of the reference tokens themselves — quotes, spacing, comments,
//! and key order all survive untouched.

pub mod scanner;

pub use scanner::{scan, Reference};

use std::ops::Range;

use crate::errors::{Error, Result};

/// One semantic line of an environment file.
///
/// Created by [`EnvFile::parse`] and immutable afterward, except that the
/// orchestrator rewrites `Entry` values in place during substitution (via
/// [`EnvFile::substitute_value`]). Order in the sequence is significant and
/// preserved in output.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// Empty after trimming trailing whitespace
    Blank { raw: String },
    /// First non-whitespace character is `#`
    Comment { raw: String },
    /// `KEY=value`
    Entry {
        key: String,
        /// Trimmed, unquoted value — the text the scanner sees
        value: String,
        /// Byte range of `value` inside `raw`
        value_span: Range<usize>,
        raw: String,
    },
}

/// A parsed environment file.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvFile {
    pub lines: Vec<Line>,
    trailing_newline: bool,
}

/// Position of the first unescaped occurrence of `needle` in `haystack`.
fn find_unescaped(haystack: &str, needle: u8) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == needle {
            return Some(i);
        }
        i += 1;
    }
    None
}

impl EnvFile {
    /// Parse file content into an ordered sequence of lines.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedLine`] with the 1-based line number for any line
    /// that is neither blank, a comment, nor a `KEY=value` entry. The
    /// parser does not guess intent.
    pub fn parse(content: &str) -> Result<Self> {
        let trailing_newline = content.ends_with('\n');
        let mut raw_lines: Vec<&str> = content.split('\n').collect();
        if trailing_newline {
            raw_lines.pop();
        }
        if content.is_empty() {
            raw_lines.clear();
        }

        let mut lines = Vec::with_capacity(raw_lines.len());
        for (index, raw) in raw_lines.iter().enumerate() {
            lines.push(Self::parse_line(raw, index + 1)?);
        }

        Ok(Self {
            lines,
            trailing_newline,
        })
    }

    fn parse_line(raw: &str, line_number: usize) -> Result<Line> {
        if raw.trim_end().is_empty() {
            return Ok(Line::Blank {
                raw: raw.to_string(),
            });
        }
        if raw.trim_start().starts_with('#') {
            return Ok(Line::Comment {
                raw: raw.to_string(),
            });
        }

        let eq = find_unescaped(raw, b'=').ok_or_else(|| Error::MalformedLine {
            line: line_number,
            content: raw.trim().to_string(),
        })?;

        let key = raw[..eq].trim().to_string();

        // Byte span of the trimmed value inside the raw line
        let after = &raw[eq + 1..];
        let leading = after.len() - after.trim_start().len();
        let trimmed = after.trim();
        let mut start = eq + 1 + leading;
        let mut end = start + trimmed.len();

        // Strip one matching pair of quotes; the interior is left unescaped
        let bytes = trimmed.as_bytes();
        if trimmed.len() >= 2 {
            let (first, last) = (bytes[0], bytes[trimmed.len() - 1]);
            if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
                start += 1;
                end -= 1;
            }
        }

        Ok(Line::Entry {
            key,
            value: raw[start..end].to_string(),
            value_span: start..end,
            raw: raw.to_string(),
        })
    }

    /// Serialize back to text, preserving the original line structure.
    pub fn render(&self) -> String {
        let mut out = self
            .lines
            .iter()
            .map(|line| match line {
                Line::Blank { raw } | Line::Comment { raw } => raw.as_str(),
                Line::Entry { raw, .. } => raw.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    /// Number of `Entry` lines.
    pub fn entry_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| matches!(line, Line::Entry { .. }))
            .count()
    }

    /// Splice replacement strings into an entry's value.
    ///
    /// Ranges are in value coordinates and must be disjoint; they are
    /// applied in descending byte order so earlier ranges stay valid after
    /// later, higher-offset substitutions. Both the parsed value and the
    /// raw line are rewritten, keeping quotes and spacing outside the
    /// spliced ranges intact.
    pub fn substitute_value(
        &mut self,
        line_index: usize,
        mut substitutions: Vec<(Range<usize>, String)>,
    ) {
        let Some(Line::Entry {
            value,
            value_span,
            raw,
            ..
        }) = self.lines.get_mut(line_index)
        else {
            return;
        };

        substitutions.sort_by(|a, b| b.0.start.cmp(&a.0.start));

        let mut new_value = value.clone();
        for (range, replacement) in &substitutions {
            new_value.replace_range(range.clone(), replacement);
        }

        let mut new_raw = raw.clone();
        new_raw.replace_range(value_span.clone(), &new_value);

        *value_span = value_span.start..value_span.start + new_value.len();
        *value = new_value;
        *raw = new_raw;
    }
}
