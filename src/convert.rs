//! Converts rule files from the domain configuration language into generic
//! structured documents.
//!
//! The language is block structured: `key = value` assignments, nested
//! `key = { ... }` blocks, bare whitespace-separated lists, `#` comments and
//! `yes`/`no` booleans. Conversion is a fixed pipeline of text-level
//! normalization stages applied in order, after which the result is valid
//! JSON and is handed to [`serde_json`]. The stage order matters: block
//! classification (object vs list) must happen after quoting and sibling
//! separator insertion, and before list element separators are inserted.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::error::{Result, RulegraphError};

// Placeholder protecting spaces inside already-quoted strings from the
// token splitting stages.
const SPACE_MARK: char = '¬';

lazy_static! {
    // # to end of line
    static ref COMMENTS: Regex = Regex::new(r"#[^\n]*").unwrap();
    // anything outside the characters the language is made of
    static ref BAD_CHARACTERS: Regex = Regex::new(r#"[^\w\s=.{}"'()%&$-]|Â"#).unwrap();
    // string literals that arrive already quoted
    static ref EXISTING_QUOTES: Regex = Regex::new(r#""([^"]+)""#).unwrap();
    // bare identifiers used as keys or values, delimited by an assignment
    // operator, whitespace or a closing brace
    static ref ATTRIBUTES: Regex = Regex::new(r#"([^\d\s.{}][^"{}\s=]+)\s*["=\n} ]"#).unwrap();
    // boolean literals, quoted by the previous stage
    static ref BOOLEANS: Regex = Regex::new(r#"\s("yes"|"no")\s*\n"#).unwrap();
    // sibling assignments are only newline-delimited in the source
    static ref NEWLINES: Regex = Regex::new(r"[^\s][^{\n]*\n").unwrap();
    // a block without assignments is a bare list
    static ref LISTS: Regex = Regex::new(r"\{[^{}=]+\}").unwrap();
    // list elements are only whitespace-delimited
    static ref LIST_ELEMENTS: Regex = Regex::new(r#""\s+""#).unwrap();
    // stray separators next to block delimiters
    static ref TRAILING_SEPARATORS: Regex = Regex::new(r",\s*[\]}]").unwrap();
    static ref LEADING_SEPARATORS: Regex = Regex::new(r"[{\[]\s*,").unwrap();
    // numeric tokens with a stray leading zero
    static ref LEADING_ZEROS: Regex = Regex::new(r"\s0(\d+)").unwrap();
}

/// Converts the contents of one rule file into a generic document.
///
/// The whole input is framed by one implicit outer block, so an empty file
/// converts to an empty object. Returns [`RulegraphError::Format`] naming
/// the offending fragment when the normalized text does not parse.
pub fn convert(raw_text: &str) -> Result<Value> {
    let normalized = normalize(raw_text);
    serde_json::from_str(&normalized).map_err(|e| format_error(&e, &normalized))
}

/// The normalization pipeline. Each stage is idempotent with respect to
/// inputs it does not match.
fn normalize(raw_text: &str) -> String {
    let mut text = format!("{{\n{}\n}}", raw_text);

    text = text.replace('>', "=").replace('<', "=");
    text = COMMENTS.replace_all(&text, "").into_owned();
    text = BAD_CHARACTERS.replace_all(&text, "").into_owned();
    text = EXISTING_QUOTES
        .replace_all(&text, |caps: &Captures| {
            caps[1].replace(' ', &SPACE_MARK.to_string())
        })
        .into_owned();
    text = ATTRIBUTES
        .replace_all(&text, |caps: &Captures| {
            let quoted = format!("\"{}\"", caps[1].trim());
            caps[0].replacen(&caps[1], &quoted, 1)
        })
        .into_owned();
    text = BOOLEANS
        .replace_all(&text, |caps: &Captures| {
            let literal = if &caps[1] == "\"yes\"" { "true" } else { "false" };
            caps[0].replacen(&caps[1], literal, 1)
        })
        .into_owned();
    text = NEWLINES
        .replace_all(&text, |caps: &Captures| caps[0].replace('\n', ","))
        .into_owned();
    text = LISTS
        .replace_all(&text, |caps: &Captures| {
            caps[0].replace('{', "[ ").replace('}', " ]")
        })
        .into_owned();
    text = LIST_ELEMENTS
        .replace_all(&text, |caps: &Captures| caps[0].replace("\" ", "\","))
        .into_owned();
    text = TRAILING_SEPARATORS
        .replace_all(&text, |caps: &Captures| caps[0].replace(',', ""))
        .into_owned();
    text = LEADING_SEPARATORS
        .replace_all(&text, |caps: &Captures| caps[0].replace(',', ""))
        .into_owned();
    text = LEADING_ZEROS
        .replace_all(&text, |caps: &Captures| caps[1].to_string())
        .into_owned();

    // quoting artifacts from the attribute stage
    text = text.replace("\"\"", "\"");
    text = text.replace(SPACE_MARK, " ");
    text = text.replace('=', ":");

    text
}

fn format_error(parse_error: &serde_json::Error, normalized: &str) -> RulegraphError {
    RulegraphError::Format {
        message: parse_error.to_string(),
        fragment: fragment_at(normalized, parse_error.line(), parse_error.column()),
    }
}

// Cuts a readable window out of the normalized text around the position the
// document parser rejected.
fn fragment_at(normalized: &str, line: usize, column: usize) -> String {
    let offending = match normalized.lines().nth(line.saturating_sub(1)) {
        Some(l) => l,
        None => normalized,
    };
    let chars: Vec<char> = offending.chars().collect();
    let at = column.min(chars.len());
    let from = at.saturating_sub(40);
    let to = (at + 40).min(chars.len());
    chars[from..to].iter().collect()
}
