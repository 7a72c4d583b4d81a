//! Comparison of documented and actual output.
//!
//! Both sides are normalized line by line before comparing. On mismatch a
//! small line diff is produced for the report.

use crate::config::CheckConfig;
use crate::db::CELL_SEPARATOR;
use serde::Serialize;

/// Placeholder shown in diffs for a line present on only one side.
const MISSING: &str = "<missing>";

/// Normalization options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareOptions {
    /// Compare case-insensitively.
    pub case_fold: bool,
    /// Treat runs of whitespace as a single space.
    pub collapse_whitespace: bool,
    /// Treat `'x'` as `x` and `true` as `TRUE`.
    pub lenient_quotes: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            case_fold: false,
            collapse_whitespace: false,
            lenient_quotes: true,
        }
    }
}

impl CompareOptions {
    /// Builds options from the check configuration.
    pub fn from_check_config(check: &CheckConfig) -> Self {
        Self {
            case_fold: check.case_fold,
            collapse_whitespace: check.collapse_whitespace,
            lenient_quotes: check.lenient_quotes,
        }
    }
}

/// Outcome of comparing expected and actual output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    /// True if the normalized outputs are equal.
    pub matched: bool,
    /// Line diff, present only on mismatch.
    pub diff: Option<String>,
}

/// Splits output into trimmed lines, dropping trailing blank lines.
fn lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.trim().lines().map(str::trim).collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}

/// Removes one pair of surrounding single quotes and undoubles inner quotes.
fn unquote(cell: &str) -> String {
    match cell
        .strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
    {
        Some(inner) => inner.replace("''", "'"),
        None => cell.to_string(),
    }
}

/// Normalizes a single cell.
fn normalize_cell(cell: &str, options: &CompareOptions) -> String {
    let mut cell = cell.trim().to_string();

    if options.lenient_quotes {
        cell = unquote(&cell);
        if cell.eq_ignore_ascii_case("true") {
            cell = "TRUE".to_string();
        } else if cell.eq_ignore_ascii_case("false") {
            cell = "FALSE".to_string();
        }
    }

    if options.collapse_whitespace {
        cell = cell.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    if options.case_fold {
        cell = cell.to_lowercase();
    }

    cell
}

/// Splits a line into cells on the exact ` | ` separator.
///
/// Separators inside single-quoted cells are part of the value. A line
/// without a separator is one cell.
fn split_cells(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let sep = CELL_SEPARATOR.as_bytes();
    let mut cells = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\'' {
            in_quote = !in_quote;
        } else if !in_quote && bytes[i..].starts_with(sep) {
            cells.push(&line[start..i]);
            i += sep.len();
            start = i;
            continue;
        }
        i += 1;
    }

    cells.push(&line[start..]);
    cells
}

/// Normalizes one output line.
pub fn normalize_line(line: &str, options: &CompareOptions) -> String {
    split_cells(line)
        .into_iter()
        .map(|cell| normalize_cell(cell, options))
        .collect::<Vec<_>>()
        .join(CELL_SEPARATOR)
}

/// Compares documented output against actual output.
pub fn compare(expected: &str, actual: &str, options: &CompareOptions) -> Comparison {
    let expected_lines = lines(expected);
    let actual_lines = lines(actual);

    let mut diff = Vec::new();
    for i in 0..expected_lines.len().max(actual_lines.len()) {
        let want = expected_lines.get(i).copied();
        let got = actual_lines.get(i).copied();

        let equal = match (want, got) {
            (Some(want), Some(got)) => {
                normalize_line(want, options) == normalize_line(got, options)
            }
            _ => false,
        };

        if !equal {
            diff.push(format!("- {}", want.unwrap_or(MISSING)));
            diff.push(format!("+ {}", got.unwrap_or(MISSING)));
        }
    }

    if diff.is_empty() {
        Comparison {
            matched: true,
            diff: None,
        }
    } else {
        Comparison {
            matched: false,
            diff: Some(diff.join("\n")),
        }
    }
}
