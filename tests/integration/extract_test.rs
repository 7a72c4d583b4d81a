//! Extraction and mock-backed run tests.
//!
//! These never touch a real database.

use super::fixture;
use db_doccheck::app::{collect, Checker};
use db_doccheck::config::CheckConfig;
use db_doccheck::db::{MockDatabaseClient, QueryResult, Value};
use db_doccheck::extract::{load_documents, Extraction};
use db_doccheck::report::{Verdict, EXIT_FAILURES, EXIT_SUCCESS};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const GUIDE: &str = "formatting_guide.md";

fn guide_mock() -> MockDatabaseClient {
    MockDatabaseClient::new()
        .with_result(
            "SELECT 'abcdef' ~ 'abc'",
            QueryResult::single("?column?", "BOOL", Value::Bool(true)),
        )
        .with_result(
            r"SELECT REGEXP_REPLACE('Hello    World', '\s+', ' ', 'g')",
            QueryResult::single("regexp_replace", "TEXT", "Hello World".into()),
        )
        .with_result(
            "SELECT TO_DATE('08-09-2024', 'DD-MM-YYYY'); -- Output: 2024-09-08",
            QueryResult::single("to_date", "DATE", Value::Other("2024-09-08".into())),
        )
        .with_result(
            "SELECT TO_CHAR('2024-09-08 12:00:00+00:00'::timestamptz, 'YYYY-MM-DD')",
            QueryResult::single("to_char", "TEXT", "2024-09-08".into()),
        )
}

fn checker() -> Checker {
    Checker::new(CheckConfig::default(), false, false).unwrap()
}

#[test]
fn test_fixture_yields_one_example_per_block() {
    let extraction = collect(&[fixture(GUIDE)], None).unwrap();

    let lines: Vec<usize> = extraction.examples.iter().map(|e| e.line).collect();
    assert_eq!(lines, vec![7, 15, 23, 29, 37, 44]);

    assert_eq!(extraction.issues.len(), 1);
    assert_eq!(extraction.issues[0].line, 52);
}

#[test]
fn test_section_filter_is_case_insensitive() {
    let extraction = collect(&[fixture(GUIDE)], Some("dates")).unwrap();

    assert_eq!(extraction.examples.len(), 2);
    assert!(extraction.examples.iter().all(|e| e.section == "Dates"));
}

#[test]
fn test_missing_document_is_fatal() {
    let dir = TempDir::new().unwrap();
    let err = load_documents(&[dir.path().join("missing.md")]).unwrap_err();

    assert_eq!(err.category(), "Document Error");
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_fixture_runs_against_mock() {
    let extraction = collect(&[fixture(GUIDE)], None).unwrap();
    let client = guide_mock();

    let report = checker().run(&client, extraction).await.unwrap();
    let summary = report.summary();

    assert_eq!(summary.passed, 4, "{}", report.render_text());
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.parse_issues, 1);
    assert_eq!(report.exit_code(), EXIT_SUCCESS);

    // DROP and the skip directive never reach the client.
    let executed = client.executed();
    assert_eq!(executed.len(), 4);
    assert!(executed.iter().all(|sql| !sql.contains("DROP")));
    assert!(executed.iter().all(|sql| !sql.contains("pg_sleep")));
    assert!(executed.iter().all(|sql| !sql.contains("NOW()")));
}

#[tokio::test]
async fn test_wrong_output_fails_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wrong.md");
    fs::write(&path, "```sql\nSELECT 'abcdef' ~ 'abc';\n```\nOutput: `FALSE`\n").unwrap();

    let extraction = collect(&[path], None).unwrap();
    let report = checker().run(&guide_mock(), extraction).await.unwrap();

    assert_eq!(report.exit_code(), EXIT_FAILURES);
    let entry = &report.entries()[0];
    assert_eq!(entry.verdict, Verdict::Failed);
    assert_eq!(
        entry.comparison.as_ref().unwrap().diff.as_deref(),
        Some("- FALSE\n+ TRUE")
    );
}

#[tokio::test]
async fn test_zero_examples_is_vacuous_pass() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("prose.md");
    fs::write(&path, "# Notes\n\nNothing to run here.\n\n```text\nplain\n```\n").unwrap();

    let extraction = collect(&[path], None).unwrap();
    assert!(extraction.examples.is_empty());

    let client = MockDatabaseClient::new();
    let report = checker().run(&client, extraction).await.unwrap();

    assert!(report.entries().is_empty());
    assert_eq!(report.exit_code(), EXIT_SUCCESS);
    assert!(client.executed().is_empty());
}

#[tokio::test]
async fn test_dedupe_across_near_duplicate_guides() {
    let dir = TempDir::new().unwrap();
    let doc = "```sql\nSELECT 'abcdef' ~ 'abc';\n```\nOutput: `TRUE`\n";
    let first = dir.path().join("guide.md");
    let second = dir.path().join("guide-copy.md");
    fs::write(&first, doc).unwrap();
    fs::write(&second, doc).unwrap();

    let extraction = collect(&[first.clone(), second], None).unwrap();
    let client = guide_mock();
    let checker = Checker::new(CheckConfig::default(), false, true).unwrap();
    let report = checker.run(&client, extraction).await.unwrap();

    assert_eq!(client.executed().len(), 1);
    let expected_reason = format!("duplicate of {}:1", first.display());
    assert_eq!(
        report.entries()[1].verdict,
        Verdict::Skipped {
            reason: expected_reason
        }
    );
}

#[tokio::test]
async fn test_documents_are_independent_without_dedupe() {
    let dir = TempDir::new().unwrap();
    let doc = "```sql\nSELECT 'abcdef' ~ 'abc';\n```\nOutput: `TRUE`\n";
    let first = dir.path().join("a.md");
    let second = dir.path().join("b.md");
    fs::write(&first, doc).unwrap();
    fs::write(&second, doc).unwrap();

    let extraction: Extraction = collect(&[first, second], None).unwrap();
    let ids: Vec<String> = extraction.examples.iter().map(|e| e.id.clone()).collect();
    assert_ne!(ids[0], ids[1]);

    let client = guide_mock();
    let report = checker().run(&client, extraction).await.unwrap();
    assert_eq!(report.summary().passed, 2);
    assert_eq!(client.executed().len(), 2);
}
