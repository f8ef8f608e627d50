//! `.properties` files: `key=value`, `key: value` and `key value` lines.

use thiserror::Error;

use super::LayerLoader;
use crate::{ConfigurationLayer, LoaderError, Resource};

/// Loads Java-style `.properties` files.
///
/// Supports `#` and `!` comments, backslash line continuations, the usual
/// `\t`, `\n`, `\r`, `\f` escapes and `\uXXXX` code points.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesLayerLoader;

/// Errors raised while parsing a properties file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertiesError {
    /// A `\u` escape was not followed by four hexadecimal digits.
    #[error("malformed \\uxxxx escape on line {line}")]
    MalformedUnicodeEscape {
        /// One-based line number where the logical line starts.
        line: usize,
    },
}

impl LayerLoader for PropertiesLayerLoader {
    fn file_extensions(&self) -> &[&'static str] {
        &["properties"]
    }

    fn load(
        &self,
        name: &str,
        resource: &Resource,
        profile: Option<&str>,
    ) -> Result<Option<ConfigurationLayer>, LoaderError> {
        if profile.is_some() {
            return Ok(None);
        }
        let entries = parse(resource.contents())?;
        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            ConfigurationLayer::new(name, entries).with_origin(resource.location()),
        ))
    }
}

/// Parses properties text into ordered entries.
pub(crate) fn parse(text: &str) -> Result<Vec<(String, String)>, PropertiesError> {
    let mut entries = Vec::new();
    for (line_number, logical) in logical_lines(text) {
        let (raw_key, raw_value) = split_entry(&logical);
        let key = unescape(raw_key, line_number)?;
        let value = unescape(raw_value, line_number)?;
        entries.push((key, value));
    }
    Ok(entries)
}

/// Joins continuation lines, dropping blanks and comments.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut current: Option<(usize, String)> = None;
    for (index, raw) in text.lines().enumerate() {
        let trimmed = raw.trim_start();
        let (start, mut buffer) = match current.take() {
            Some(pending) => pending,
            None => {
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                (index + 1, String::new())
            }
        };
        if ends_with_continuation(trimmed) {
            buffer.push_str(trimmed.get(..trimmed.len() - 1).unwrap_or_default());
            current = Some((start, buffer));
        } else {
            buffer.push_str(trimmed);
            lines.push((start, buffer));
        }
    }
    if let Some(pending) = current {
        lines.push(pending);
    }
    lines
}

fn ends_with_continuation(line: &str) -> bool {
    !line
        .chars()
        .rev()
        .take_while(|c| *c == '\\')
        .count()
        .is_multiple_of(2)
}

/// Splits a logical line at the first unescaped separator.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (index, character) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match character {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\u{c}' => {
                key_end = index;
                break;
            }
            _ => {}
        }
    }
    let key = line.get(..key_end).unwrap_or(line);
    let rest = line.get(key_end..).unwrap_or_default();
    let rest = rest.trim_start_matches([' ', '\t', '\u{c}']);
    let rest = rest
        .strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))
        .unwrap_or(rest);
    (key, rest.trim_start_matches([' ', '\t', '\u{c}']))
}

fn unescape(raw: &str, line: usize) -> Result<String, PropertiesError> {
    let mut output = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(character) = chars.next() {
        if character != '\\' {
            output.push(character);
            continue;
        }
        match chars.next() {
            Some('t') => output.push('\t'),
            Some('n') => output.push('\n'),
            Some('r') => output.push('\r'),
            Some('f') => output.push('\u{c}'),
            Some('u') => {
                let digits: String = chars.by_ref().take(4).collect();
                let decoded = (digits.len() == 4)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32)
                    .ok_or(PropertiesError::MalformedUnicodeEscape { line })?;
                output.push(decoded);
            }
            Some(other) => output.push(other),
            None => {}
        }
    }
    Ok(output)
}
