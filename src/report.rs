//! Report generation.
//!
//! Aggregates per-example verdicts and parse issues, and renders them as a
//! human-readable summary or JSON. The exit code reflects whether every
//! executed example passed.

use crate::compare::Comparison;
use crate::error::{DocCheckError, Result};
use crate::extract::{Example, ParseIssue};
use crate::harness::ExecutionResult;
use serde::Serialize;
use std::fmt::Write as _;

/// Exit code when every example passed.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code when at least one example failed.
pub const EXIT_FAILURES: i32 = 1;

/// Exit code for fatal errors (configuration, documents, connection).
pub const EXIT_FATAL: i32 = 2;

/// Final outcome for one example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Verdict {
    Passed,
    Failed,
    Skipped { reason: String },
}

/// One example and what happened to it.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub example: Example,
    #[serde(flatten)]
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
}

impl ReportEntry {
    /// Returns the failure as an error, if the example failed.
    pub fn failure(&self) -> Option<DocCheckError> {
        if self.verdict != Verdict::Failed {
            return None;
        }

        if let Some(error) = self.result.as_ref().and_then(|r| r.error.as_ref()) {
            return Some(DocCheckError::query(error.clone()));
        }

        let diff = self
            .comparison
            .as_ref()
            .and_then(|c| c.diff.clone())
            .unwrap_or_default();
        Some(DocCheckError::mismatch(diff))
    }
}

/// Summary counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub parse_issues: usize,
}

/// Results of a run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    entries: Vec<ReportEntry>,
    issues: Vec<ParseIssue>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: Summary,
    success: bool,
    examples: &'a [ReportEntry],
    parse_issues: &'a [ParseIssue],
}

impl Report {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an executed example.
    pub fn record(
        &mut self,
        example: Example,
        result: ExecutionResult,
        comparison: Option<Comparison>,
    ) {
        let passed = result.succeeded && comparison.as_ref().is_some_and(|c| c.matched);
        self.entries.push(ReportEntry {
            example,
            verdict: if passed {
                Verdict::Passed
            } else {
                Verdict::Failed
            },
            result: Some(result),
            comparison,
        });
    }

    /// Records an example that was not executed.
    pub fn skip(&mut self, example: Example, reason: impl Into<String>) {
        self.entries.push(ReportEntry {
            example,
            verdict: Verdict::Skipped {
                reason: reason.into(),
            },
            result: None,
            comparison: None,
        });
    }

    /// Adds parse issues found while extracting.
    pub fn add_issues(&mut self, issues: impl IntoIterator<Item = ParseIssue>) {
        self.issues.extend(issues);
    }

    /// Returns the entries in run order.
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Computes summary counts.
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.entries.len(),
            parse_issues: self.issues.len(),
            ..Default::default()
        };

        for entry in &self.entries {
            match entry.verdict {
                Verdict::Passed => summary.passed += 1,
                Verdict::Failed => summary.failed += 1,
                Verdict::Skipped { .. } => summary.skipped += 1,
            }
        }

        summary
    }

    /// Returns true if no example failed.
    pub fn success(&self) -> bool {
        self.summary().failed == 0
    }

    /// Returns the process exit code for this report.
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURES
        }
    }

    /// Renders the human-readable report.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        for entry in &self.entries {
            let example = &entry.example;
            let status = match entry.verdict {
                Verdict::Passed => "PASS",
                Verdict::Failed => "FAIL",
                Verdict::Skipped { .. } => "SKIP",
            };

            let _ = write!(out, "{status}  {}", example.id);
            if !example.section.is_empty() {
                let _ = write!(out, "  [{}]", example.section);
            }
            let _ = writeln!(out, "  {}", example.summary());

            if let Verdict::Skipped { reason } = &entry.verdict {
                let _ = writeln!(out, "      {reason}");
            }

            if let Some(failure) = entry.failure() {
                for line in failure.to_string().lines() {
                    let _ = writeln!(out, "      {line}");
                }
            }
        }

        if !self.issues.is_empty() {
            if !self.entries.is_empty() {
                out.push('\n');
            }
            let _ = writeln!(out, "Parse warnings:");
            for issue in &self.issues {
                let _ = writeln!(
                    out,
                    "  {}:{}: {}",
                    issue.document, issue.line, issue.message
                );
            }
        }

        let summary = self.summary();
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "{} examples: {} passed, {} failed, {} skipped, {} parse warnings",
            summary.total, summary.passed, summary.failed, summary.skipped, summary.parse_issues
        );

        out
    }

    /// Renders the report as pretty-printed JSON.
    pub fn render_json(&self) -> Result<String> {
        let report = JsonReport {
            summary: self.summary(),
            success: self.success(),
            examples: &self.entries,
            parse_issues: &self.issues,
        };
        serde_json::to_string_pretty(&report)
            .map_err(|e| DocCheckError::internal(format!("Failed to serialize report: {e}")))
    }
}
