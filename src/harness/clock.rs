//! Injected clock for time-sensitive snippets.
//!
//! `NOW()`, `CURRENT_DATE` and the other current-time functions are replaced
//! with typed literals of a fixed instant before a snippet is sent to the
//! server. String literals, quoted identifiers, dollar-quoted bodies and
//! comments are left alone.

use crate::error::{DocCheckError, Result};
use chrono::{DateTime, FixedOffset};
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn time_function_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:(?P<func>now|transaction_timestamp|statement_timestamp|clock_timestamp)\s*\(\s*\)|(?P<kw>current_timestamp|localtimestamp|current_time|localtime)\b(?:\s*\(\s*\d+\s*\))?|(?P<date>current_date)\b)",
        )
        .expect("time function pattern is valid")
    })
}

/// A fixed instant substituted for the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectedClock {
    instant: DateTime<FixedOffset>,
}

impl InjectedClock {
    /// Creates a clock frozen at the given instant.
    pub fn new(instant: DateTime<FixedOffset>) -> Self {
        Self { instant }
    }

    /// Parses an RFC 3339 timestamp, e.g. `2024-09-08T12:00:00+00:00`.
    pub fn parse(value: &str) -> Result<Self> {
        DateTime::parse_from_rfc3339(value.trim())
            .map(Self::new)
            .map_err(|e| DocCheckError::config(format!("Invalid clock value '{value}': {e}")))
    }

    fn timestamptz(&self) -> String {
        format!(
            "'{}'::timestamptz",
            self.instant.format("%Y-%m-%d %H:%M:%S%.f%:z")
        )
    }

    fn timestamp(&self) -> String {
        format!("'{}'::timestamp", self.instant.format("%Y-%m-%d %H:%M:%S%.f"))
    }

    fn date(&self) -> String {
        format!("'{}'::date", self.instant.format("%Y-%m-%d"))
    }

    fn timetz(&self) -> String {
        format!("'{}'::timetz", self.instant.format("%H:%M:%S%.f%:z"))
    }

    fn time(&self) -> String {
        format!("'{}'::time", self.instant.format("%H:%M:%S%.f"))
    }

    /// Returns the literal replacing one matched time function.
    fn replacement(&self, caps: &Captures<'_>) -> String {
        if caps.name("func").is_some() {
            return self.timestamptz();
        }
        if caps.name("date").is_some() {
            return self.date();
        }

        let keyword = caps
            .name("kw")
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();
        match keyword.as_str() {
            "current_timestamp" => self.timestamptz(),
            "localtimestamp" => self.timestamp(),
            "current_time" => self.timetz(),
            _ => self.time(),
        }
    }

    /// Returns true if the snippet reads the current time.
    pub fn is_time_sensitive(&self, sql: &str) -> bool {
        self.rewrite(sql) != sql
    }

    /// Rewrites every current-time function in the snippet.
    pub fn rewrite(&self, sql: &str) -> String {
        split_code(sql)
            .into_iter()
            .map(|segment| match segment {
                Segment::Code(code) => time_function_regex()
                    .replace_all(code, |caps: &Captures<'_>| {
                        let whole = &caps[0];
                        // Schema-qualified names such as pg_catalog.now() stay as written.
                        let start = caps.get(0).map_or(0, |m| m.start());
                        if code[..start].trim_end().ends_with('.') {
                            whole.to_string()
                        } else {
                            self.replacement(caps)
                        }
                    })
                    .into_owned(),
                Segment::Literal(text) => text.to_string(),
            })
            .collect()
    }
}

/// A run of SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    /// Plain SQL that may be rewritten.
    Code(&'a str),
    /// A literal, quoted identifier or comment, kept verbatim.
    Literal(&'a str),
}

fn is_word(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

/// Returns the index just past a quoted run starting at `start`.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8, backslash_escapes: bool) -> usize {
    let mut j = start + 1;
    while j < bytes.len() {
        if backslash_escapes && bytes[j] == b'\\' {
            j += 2;
            continue;
        }
        if bytes[j] == quote {
            if bytes.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return j + 1;
        }
        j += 1;
    }
    bytes.len()
}

/// True if the quote at `i` opens an `E'...'` string.
fn is_escape_string(bytes: &[u8], i: usize) -> bool {
    i > 0
        && matches!(bytes[i - 1], b'E' | b'e')
        && (i < 2 || !is_word(bytes[i - 2]))
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| start + offset)
}

/// Block comments nest in PostgreSQL.
fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut j = start;
    while j + 1 < bytes.len() {
        match (bytes[j], bytes[j + 1]) {
            (b'/', b'*') => {
                depth += 1;
                j += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                j += 2;
                if depth == 0 {
                    return j;
                }
            }
            _ => j += 1,
        }
    }
    bytes.len()
}

/// Returns the length of a `$tag$` opener at `start`, if there is one.
fn dollar_tag_len(bytes: &[u8], start: usize) -> Option<usize> {
    if start > 0 && is_word(bytes[start - 1]) {
        return None;
    }

    let mut j = start + 1;
    match bytes.get(j) {
        Some(b'$') => return Some(2),
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return None,
    }
    while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
        j += 1;
    }
    (bytes.get(j) == Some(&b'$')).then_some(j + 1 - start)
}

fn skip_dollar_quoted(bytes: &[u8], start: usize, tag_len: usize) -> usize {
    let tag = &bytes[start..start + tag_len];
    let body = start + tag_len;
    bytes[body..]
        .windows(tag_len)
        .position(|window| window == tag)
        .map_or(bytes.len(), |offset| body + offset + tag_len)
}

/// Splits SQL into rewritable code and verbatim literal segments.
///
/// All delimiters are ASCII, so every split point is a char boundary.
fn split_code(sql: &str) -> Vec<Segment<'_>> {
    let bytes = sql.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let end = match bytes[i] {
            b'\'' => Some(skip_quoted(bytes, i, b'\'', is_escape_string(bytes, i))),
            b'"' => Some(skip_quoted(bytes, i, b'"', false)),
            b'-' if bytes.get(i + 1) == Some(&b'-') => Some(skip_line_comment(bytes, i)),
            b'/' if bytes.get(i + 1) == Some(&b'*') => Some(skip_block_comment(bytes, i)),
            b'$' => dollar_tag_len(bytes, i).map(|len| skip_dollar_quoted(bytes, i, len)),
            _ => None,
        };

        match end {
            Some(end) => {
                if start < i {
                    segments.push(Segment::Code(&sql[start..i]));
                }
                segments.push(Segment::Literal(&sql[i..end]));
                i = end;
                start = end;
            }
            None => i += 1,
        }
    }

    if start < bytes.len() {
        segments.push(Segment::Code(&sql[start..]));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn clock() -> InjectedClock {
        InjectedClock::parse("2024-09-08T12:00:00+00:00").unwrap()
    }

    #[test]
    fn test_now_is_replaced() {
        assert_eq!(
            clock().rewrite("SELECT TO_CHAR(NOW(), 'YYYY-MM-DD');"),
            "SELECT TO_CHAR('2024-09-08 12:00:00+00:00'::timestamptz, 'YYYY-MM-DD');"
        );
    }

    #[test]
    fn test_keywords_are_replaced() {
        let rewritten =
            clock().rewrite("SELECT current_date, CURRENT_TIMESTAMP(0), localtime, LOCALTIMESTAMP");
        assert_eq!(
            rewritten,
            "SELECT '2024-09-08'::date, '2024-09-08 12:00:00+00:00'::timestamptz, '12:00:00'::time, '2024-09-08 12:00:00'::timestamp"
        );
    }

    #[test]
    fn test_current_time_is_not_confused_with_current_timestamp() {
        assert_eq!(
            clock().rewrite("SELECT CURRENT_TIME"),
            "SELECT '12:00:00+00:00'::timetz"
        );
    }

    #[test]
    fn test_offset_is_preserved() {
        let clock = InjectedClock::parse("2024-01-31T23:30:00+05:30").unwrap();
        assert_eq!(
            clock.rewrite("SELECT now()"),
            "SELECT '2024-01-31 23:30:00+05:30'::timestamptz"
        );
    }

    #[test]
    fn test_literals_and_comments_are_untouched() {
        let sql = "SELECT 'now()', \"now\", $$ now() $$, $fn$ NOW() $fn$ -- now()\n/* now() */";
        assert_eq!(clock().rewrite(sql), sql);
        assert!(!clock().is_time_sensitive(sql));
    }

    #[test]
    fn test_doubled_quotes_stay_inside_literal() {
        let sql = "SELECT 'it''s now()', now()";
        assert_eq!(
            clock().rewrite(sql),
            "SELECT 'it''s now()', '2024-09-08 12:00:00+00:00'::timestamptz"
        );
    }

    #[test]
    fn test_escape_string_backslash_quote() {
        let sql = r"SELECT E'a\'now()', now()";
        assert!(clock().rewrite(sql).ends_with("'2024-09-08 12:00:00+00:00'::timestamptz"));
        assert!(clock().rewrite(sql).contains(r"E'a\'now()'"));
    }

    #[test]
    fn test_identifiers_containing_keywords_are_untouched() {
        let sql = "SELECT nowhere, my_current_date FROM current_dates";
        assert_eq!(clock().rewrite(sql), sql);
    }

    #[test]
    fn test_qualified_names_are_untouched() {
        let sql = "SELECT pg_catalog.now(), t.current_date FROM t";
        assert_eq!(clock().rewrite(sql), sql);
        assert!(!clock().is_time_sensitive(sql));

        assert_eq!(
            clock().rewrite("SELECT pg_catalog.now(), now()"),
            "SELECT pg_catalog.now(), '2024-09-08 12:00:00+00:00'::timestamptz"
        );
    }

    #[test]
    fn test_positional_parameter_is_code() {
        assert_eq!(
            split_code("SELECT $1, now()"),
            vec![Segment::Code("SELECT $1, now()")]
        );
    }

    #[test]
    fn test_rewrite_is_deterministic() {
        let sql = "SELECT AGE(NOW(), DATE '2000-01-01')";
        assert_eq!(clock().rewrite(sql), clock().rewrite(sql));
        assert!(clock().is_time_sensitive(sql));
    }

    #[test]
    fn test_invalid_clock_is_config_error() {
        let err = InjectedClock::parse("yesterday").unwrap_err();
        assert_eq!(err.category(), "Configuration Error");
    }
}
