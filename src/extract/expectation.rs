//! Recognizers for documented output.
//!
//! Guides state the expected result of a snippet in a handful of ways: an
//! inline `-- Output: X` comment, a `**Output:** `X`` line after the block,
//! an arrow line (`→ X`), or a label followed by an output fence.

use regex::Regex;
use std::sync::OnceLock;

const LABELS: &str = r"output|result|expected(?:\s+output)?|returns";

fn inline_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)--\s*(?:(?:{LABELS})\s*:|=>|→)\s*(?P<value>.*?)\s*$"
        ))
        .expect("inline expectation pattern is valid")
    })
}

fn label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)^\s*(?:[-*+]\s+)?[*_]{{0,2}}\s*(?:{LABELS})\s*[*_]{{0,2}}\s*:\s*[*_]{{0,2}}\s*(?P<value>.*?)\s*$"
        ))
        .expect("label expectation pattern is valid")
    })
}

fn arrow_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*+]\s+)?(?:→|=>)\s*(?P<value>.+?)\s*$")
            .expect("arrow expectation pattern is valid")
    })
}

/// An expectation found on a prose line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Documented value, if the line carries one.
    pub value: Option<String>,
    /// Explanation text following the value on the same line.
    pub notes: String,
}

/// Collects inline `-- Output: X` expectations from SQL body lines.
pub fn inline_expectations(body: &[String]) -> Vec<String> {
    body.iter()
        .filter_map(|line| inline_regex().captures(line))
        .filter_map(|caps| caps.name("value"))
        .map(|value| split_value(value.as_str()).0)
        .filter(|value| !value.is_empty())
        .collect()
}

/// Parses a prose line as an expectation label.
pub fn parse_label(line: &str) -> Option<Label> {
    let caps = label_regex()
        .captures(line)
        .or_else(|| arrow_regex().captures(line))?;
    let raw = caps.name("value").map(|m| m.as_str()).unwrap_or("");

    if raw.is_empty() {
        return Some(Label {
            value: None,
            notes: String::new(),
        });
    }

    let (value, notes) = split_value(raw);
    Some(Label {
        value: (!value.is_empty()).then_some(value),
        notes,
    })
}

/// Splits a raw label value into the documented value and trailing notes.
///
/// A value wrapped in backticks ends at the matching backtick run; anything
/// after it is explanation. An unwrapped value takes the whole line.
pub fn split_value(raw: &str) -> (String, String) {
    let raw = raw.trim();
    let ticks = raw.chars().take_while(|&c| c == '`').count();
    if ticks == 0 {
        return (raw.to_string(), String::new());
    }

    let fence = "`".repeat(ticks);
    let inner = &raw[ticks..];
    match inner.find(&fence) {
        Some(end) => {
            let value = inner[..end].trim().to_string();
            let rest = inner[end + ticks..]
                .trim()
                .trim_start_matches(['-', '—', '–', ':', ','])
                .trim()
                .to_string();
            (value, rest)
        }
        None => (raw.trim_matches('`').trim().to_string(), String::new()),
    }
}
