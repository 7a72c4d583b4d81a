//! End-to-end checks of a guide against PostgreSQL.

use super::fixture;
use db_doccheck::app::{collect, Checker};
use db_doccheck::config::{CheckConfig, ConnectionConfig};
use db_doccheck::db::{self, DatabaseClient};
use db_doccheck::extract::{Document, Example};
use db_doccheck::harness::{Harness, InjectedClock};
use db_doccheck::report::EXIT_SUCCESS;
use std::time::Duration;

async fn get_test_client(checker: &Checker) -> Option<Box<dyn DatabaseClient>> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    db::connect(&config, &checker.session()).await.ok()
}

fn single_example(sql: &str, expected: &str) -> Example {
    let text = format!("```sql\n{sql}\n```\nOutput: `{expected}`\n");
    let mut extraction = Document::new("probe.md", text).extract();
    extraction.examples.remove(0)
}

fn harness(client: &dyn DatabaseClient) -> Harness<'_> {
    let clock = InjectedClock::parse(&CheckConfig::default().clock).unwrap();
    Harness::new(client, clock, Duration::from_secs(5))
}

#[tokio::test]
async fn test_formatting_guide_passes() {
    let checker = Checker::new(CheckConfig::default(), false, false).unwrap();
    let Some(client) = get_test_client(&checker).await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let extraction = collect(&[fixture("formatting_guide.md")], None).unwrap();
    let report = checker.run(client.as_ref(), extraction).await.unwrap();
    client.close().await.unwrap();

    assert_eq!(report.exit_code(), EXIT_SUCCESS, "{}", report.render_text());
    assert_eq!(report.summary().passed, 4);
    assert_eq!(report.summary().skipped, 2);
}

#[tokio::test]
async fn test_documented_outputs() {
    let checker = Checker::new(CheckConfig::default(), false, false).unwrap();
    let Some(client) = get_test_client(&checker).await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let harness = harness(client.as_ref());

    let cases = [
        ("SELECT 'abcdef' ~ 'abc';", "TRUE"),
        (
            r"SELECT REGEXP_REPLACE('Hello    World', '\s+', ' ', 'g');",
            "'Hello World'",
        ),
        ("SELECT TO_DATE('08-09-2024', 'DD-MM-YYYY');", "2024-09-08"),
    ];

    for (sql, expected) in cases {
        let result = harness.execute(&single_example(sql, expected)).await.unwrap();
        assert!(result.succeeded, "{sql}: {:?}", result.error);
        assert_eq!(result.actual_output, expected, "{sql}");
    }

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_injected_clock_is_deterministic() {
    let checker = Checker::new(CheckConfig::default(), false, false).unwrap();
    let Some(client) = get_test_client(&checker).await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let harness = harness(client.as_ref());

    let example = single_example(
        "SELECT TO_CHAR(NOW(), 'YYYY-MM-DD HH24:MI'), CURRENT_DATE;",
        "'2024-09-08 12:00' | 2024-09-08",
    );

    let first = harness.execute(&example).await.unwrap();
    let second = harness.execute(&example).await.unwrap();

    assert_eq!(first.actual_output, "'2024-09-08 12:00' | 2024-09-08");
    assert_eq!(first.actual_output, second.actual_output);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_slow_snippet_times_out() {
    let check = CheckConfig {
        timeout_secs: 1,
        ..Default::default()
    };
    let checker = Checker::new(check, false, false).unwrap();
    let Some(client) = get_test_client(&checker).await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let clock = InjectedClock::parse(&CheckConfig::default().clock).unwrap();
    let harness = Harness::new(client.as_ref(), clock, Duration::from_secs(1));
    let result = harness
        .execute(&single_example("SELECT pg_sleep(5);", "void"))
        .await
        .unwrap();

    assert!(!result.succeeded);
    client.close().await.unwrap();
}
