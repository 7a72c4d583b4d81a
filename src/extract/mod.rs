//! Example extraction from Markdown guides.
//!
//! Locates fenced SQL blocks, pairs each with its documented output and
//! explanation, and records malformed blocks as parse issues instead of
//! failing the whole document.

mod expectation;
mod fence;

pub use expectation::{inline_expectations, parse_label, split_value, Label};
pub use fence::{scan, Block, Fence};

use crate::error::{DocCheckError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directive that marks the next SQL block as skipped.
const SKIP_DIRECTIVE: &str = "doccheck: skip";

/// A documented SQL example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Example {
    /// Stable identifier: `<document>:<line>`.
    pub id: String,
    /// Document the example came from.
    pub document: String,
    /// 1-based line of the opening fence.
    pub line: usize,
    /// Nearest preceding heading, or empty.
    pub section: String,
    /// SQL exactly as written in the block.
    pub sql_snippet: String,
    /// Documented output.
    pub expected_output: String,
    /// Explanation text accompanying the example.
    pub notes: String,
    /// Marked with a skip directive.
    pub skip: bool,
}

impl Example {
    /// Returns the first non-comment line of the SQL, for one-line summaries.
    pub fn summary(&self) -> &str {
        self.sql_snippet
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with("--"))
            .unwrap_or("")
    }
}

/// A malformed block that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseIssue {
    /// Document the block came from.
    pub document: String,
    /// 1-based line of the block.
    pub line: usize,
    /// What was wrong with it.
    pub message: String,
}

impl ParseIssue {
    /// Converts the issue to a parse error.
    pub fn to_error(&self) -> DocCheckError {
        DocCheckError::parse(format!("{}:{}: {}", self.document, self.line, self.message))
    }
}

/// Everything extracted from one document.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Well-formed examples in document order.
    pub examples: Vec<Example>,
    /// Blocks that were skipped.
    pub issues: Vec<ParseIssue>,
}

/// A Markdown document loaded from disk.
#[derive(Debug, Clone)]
pub struct Document {
    /// Display name used in example ids.
    pub name: String,
    /// Full text.
    pub text: String,
}

impl Document {
    /// Creates a document from in-memory text.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Reads a document from the filesystem.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DocCheckError::document(format!("{}: {e}", path.display())))?;
        Ok(Self::new(path.display().to_string(), text))
    }

    /// Extracts examples from this document.
    pub fn extract(&self) -> Extraction {
        extract(&self.name, &self.text)
    }
}

/// Loads every path, failing on the first unreadable one.
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    paths.iter().map(|path| Document::load(path)).collect()
}

/// Prose that follows a SQL block.
#[derive(Debug, Default)]
struct Trailer {
    expected: Option<String>,
    notes: Vec<String>,
    consumed: usize,
}

fn is_skip_directive(text: &str) -> bool {
    text.starts_with("<!--") && text.contains(SKIP_DIRECTIVE)
}

/// Reads the paragraph after a SQL block, plus an announced output fence.
fn read_trailer(blocks: &[Block]) -> Trailer {
    let mut trailer = Trailer::default();
    let mut awaiting_fence = false;
    let mut seen_text = false;
    let mut i = 0;

    while i < blocks.len() {
        match &blocks[i] {
            Block::Blank { .. } if !seen_text && !awaiting_fence => {}
            Block::Blank { .. } if awaiting_fence => {}
            Block::Text { text, .. } if !is_skip_directive(text) && !awaiting_fence => {
                seen_text = true;
                match parse_label(text) {
                    Some(label) if trailer.expected.is_none() => {
                        if !label.notes.is_empty() {
                            trailer.notes.push(label.notes);
                        }
                        match label.value {
                            Some(value) => trailer.expected = Some(value),
                            None => awaiting_fence = true,
                        }
                    }
                    _ => trailer.notes.push(text.clone()),
                }
            }
            Block::Fence(fence) if awaiting_fence && fence.is_output() => {
                trailer.expected = Some(fence.content().trim().to_string());
                i += 1;
                break;
            }
            _ => break,
        }
        i += 1;
    }

    trailer.consumed = i;
    trailer
}

/// Returns true if the SQL has at least one line that is not a comment.
fn has_statement(sql: &str) -> bool {
    sql.lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with("--"))
}

/// Extracts examples from a document's text.
pub fn extract(document: &str, text: &str) -> Extraction {
    let blocks = scan(text);
    let mut extraction = Extraction::default();
    let mut section = String::new();
    let mut skip_next = false;
    let mut i = 0;

    let issue = |line: usize, message: String| ParseIssue {
        document: document.to_string(),
        line,
        message,
    };

    while i < blocks.len() {
        match &blocks[i] {
            Block::Heading { text, .. } => {
                section = text.clone();
                skip_next = false;
            }
            Block::Text { text, .. } if is_skip_directive(text) => skip_next = true,
            Block::Text { .. } => skip_next = false,
            Block::Fence(fence) if !fence.is_sql() => skip_next = false,
            Block::Unterminated { line, info } => {
                let issue = issue(
                    *line,
                    format!("unterminated fence (info '{info}'); rest of document ignored"),
                );
                warn!("{}", issue.to_error());
                extraction.issues.push(issue);
            }
            Block::Fence(fence) if fence.is_sql() => {
                let skip = std::mem::take(&mut skip_next);
                let trailer = read_trailer(&blocks[i + 1..]);
                i += trailer.consumed;

                let sql = fence.content().trim().to_string();
                let inline = inline_expectations(&fence.body);
                let expected = if inline.is_empty() {
                    trailer.expected
                } else {
                    Some(inline.join("\n"))
                };

                if !has_statement(&sql) {
                    let issue = issue(fence.line, "SQL block has no statement".to_string());
                    warn!("{}", issue.to_error());
                    extraction.issues.push(issue);
                } else if let Some(expected_output) = expected {
                    debug!("Extracted example at {}:{}", document, fence.line);
                    extraction.examples.push(Example {
                        id: format!("{document}:{}", fence.line),
                        document: document.to_string(),
                        line: fence.line,
                        section: section.clone(),
                        sql_snippet: sql,
                        expected_output,
                        notes: trailer.notes.join(" "),
                        skip,
                    });
                } else {
                    let issue = issue(fence.line, "no expected output found".to_string());
                    warn!("{}", issue.to_error());
                    extraction.issues.push(issue);
                }
            }
            _ => {}
        }
        i += 1;
    }

    extraction
}
