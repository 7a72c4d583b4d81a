//! Snippet execution tests against PostgreSQL.
//!
//! Checks rendering, rollback, error mapping and session settings.

use db_doccheck::config::ConnectionConfig;
use db_doccheck::db::{DatabaseClient, PostgresClient, SessionSettings, Value};
use std::time::Duration;

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

/// Helper to create a test client.
async fn get_test_client() -> Option<PostgresClient> {
    let url = get_test_database_url()?;
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    PostgresClient::connect(&config, &SessionSettings::default())
        .await
        .ok()
}

#[tokio::test]
async fn test_execute_simple_select() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query("SELECT 1 AS num, 'hello' AS greeting")
        .await
        .unwrap();

    assert_eq!(result.columns.len(), 2);
    assert_eq!(result.columns[0].name, "num");
    assert_eq!(result.columns[1].name, "greeting");
    assert_eq!(result.rows, vec![vec![Value::Int(1), Value::Text("hello".into())]]);
    assert_eq!(result.render(), "1 | 'hello'");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_values_render_like_the_guides() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query("SELECT TRUE, FALSE, NULL::text, 'it''s'::varchar, DATE '2024-09-08'")
        .await
        .unwrap();
    assert_eq!(result.render(), "TRUE | FALSE | NULL | 'it''s' | 2024-09-08");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_multiple_rows_render_one_per_line() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query("SELECT REGEXP_SPLIT_TO_TABLE('a,b,c', ',')")
        .await
        .unwrap();
    assert_eq!(result.render(), "'a'\n'b'\n'c'");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_side_effects_are_rolled_back() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    client
        .execute_query("CREATE TABLE doccheck_rollback_probe (id int)")
        .await
        .unwrap();

    let result = client
        .execute_query("SELECT to_regclass('doccheck_rollback_probe') IS NULL")
        .await
        .unwrap();
    assert_eq!(result.render(), "TRUE");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_query_error_is_not_fatal() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let err = client
        .execute_query("SELECT to_dat('08-09-2024')")
        .await
        .unwrap_err();
    assert_eq!(err.category(), "Query Error");
    assert!(!err.is_fatal());

    // The connection is still usable afterwards.
    let result = client.execute_query("SELECT 1").await.unwrap();
    assert_eq!(result.render(), "1");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_session_settings_are_applied() {
    let Some(url) = get_test_database_url() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let config = ConnectionConfig::from_connection_string(&url).unwrap();
    let session = SessionSettings {
        timezone: "Asia/Kolkata".to_string(),
        statement_timeout: Duration::from_secs(7),
        lc_time: None,
    };
    let client = PostgresClient::connect(&config, &session).await.unwrap();

    let result = client
        .execute_query("SELECT current_setting('TimeZone'), current_setting('statement_timeout')")
        .await
        .unwrap();
    assert_eq!(result.render(), "'Asia/Kolkata' | '7s'");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() {
    let config = ConnectionConfig {
        host: Some("127.0.0.1".to_string()),
        port: 1,
        database: Some("nope".to_string()),
        user: Some("nobody".to_string()),
        ..Default::default()
    };

    let err = PostgresClient::connect(&config, &SessionSettings::default())
        .await
        .err()
        .unwrap();
    assert_eq!(err.category(), "Connection Error");
}
