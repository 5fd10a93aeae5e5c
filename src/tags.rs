//! Inline `{...}` tag lexing.
//!
//! Free text in directives and field docs may carry bracketed tags:
//!
//! ```text
//! The user's age {int, required} {range: 0-150}
//! ```
//!
//! [`parse_tags`] separates the prose from the tags. It never fails; an
//! unterminated `{` is kept as literal text.

use crate::error::{Error, Result};
use crate::program::Range;

/// Split `text` into its prose and its tags.
///
/// Tags are returned in source order. Duplicates are kept; consumers that
/// assign scalar values let the last one win.
pub fn parse_tags(text: &str) -> (String, Vec<String>) {
    let mut clean = String::with_capacity(text.len());
    let mut tags = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        clean.push_str(&rest[..open]);
        tags.extend(
            after[..close]
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        );
        rest = &after[close + 1..];
    }
    clean.push_str(rest);

    (tidy(&clean), tags)
}

/// Collapse runs of spaces and repair the " ." left behind by a removed tag.
fn tidy(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;
    for c in text.chars() {
        if c == ' ' {
            if !prev_space {
                out.push(c);
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    let out = out.trim();
    match out.strip_suffix(" .") {
        Some(head) => format!("{}.", head),
        None => out.to_string(),
    }
}

/// Split a tag into its keyword and optional value: `"enum: a b"` → `("enum", Some("a b"))`.
pub fn split_tag(tag: &str) -> (&str, Option<&str>) {
    match tag.split_once(':') {
        Some((key, value)) => (key.trim(), Some(value.trim())),
        None => (tag.trim(), None),
    }
}

/// Schema format named by a format tag, with `url`, `email` and `hostname` aliased.
pub fn format_keyword(tag: &str) -> Option<&'static str> {
    let format = match tag {
        "url" | "uri" => "uri",
        "email" | "idn-email" => "idn-email",
        "hostname" | "idn-hostname" => "idn-hostname",
        "date-time" => "date-time",
        "date" => "date",
        "time" => "time",
        "ipv4" => "ipv4",
        "ipv6" => "ipv6",
        "uri-reference" => "uri-reference",
        "iri" => "iri",
        "iri-reference" => "iri-reference",
        "uri-template" => "uri-template",
        "json-pointer" => "json-pointer",
        "relative-json-pointer" => "relative-json-pointer",
        "regex" => "regex",
        "uuid" => "uuid",
        _ => return None,
    };
    Some(format)
}

/// Parse the value of a `range:` tag. Either bound may be left out: `-10`, `5-`.
pub fn parse_range(value: &str) -> Result<Range> {
    let value = value.trim();
    let malformed = || Error::Syntax(format!("invalid range {:?}, expected min-max", value));

    // A leading '-' belongs to a negative minimum unless nothing precedes the separator.
    let split = value
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '-')
        .map(|(i, _)| i)
        .or_else(|| value.starts_with('-').then_some(0))
        .ok_or_else(malformed)?;

    let bound = |s: &str| -> Result<Option<i64>> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }
        s.parse().map(Some).map_err(|_| malformed())
    };
    let range = Range {
        min: bound(&value[..split])?,
        max: bound(&value[split + 1..])?,
    };
    if range.min.is_none() && range.max.is_none() {
        return Err(malformed());
    }
    Ok(range)
}
