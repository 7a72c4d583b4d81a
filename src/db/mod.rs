//! Database abstraction layer for doccheck.
//!
//! Provides a trait-based interface for running documented snippets, so the
//! harness can be exercised against an in-memory mock as well as PostgreSQL.

mod mock;
mod postgres;
mod types;

pub use mock::{MockDatabaseClient, MockResponse};
pub use postgres::PostgresClient;
pub use types::{ColumnInfo, QueryResult, Row, Value, CELL_SEPARATOR};

use crate::config::{CheckConfig, ConnectionConfig};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Session settings applied to every new connection.
///
/// Pinning these keeps rendered dates, intervals and month names stable
/// regardless of the server's defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Session time zone.
    pub timezone: String,
    /// Server-side statement timeout.
    pub statement_timeout: Duration,
    /// Optional `lc_time` for localized names.
    pub lc_time: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_check_config(&CheckConfig::default())
    }
}

impl SessionSettings {
    /// Builds session settings from the check configuration.
    pub fn from_check_config(check: &CheckConfig) -> Self {
        Self {
            timezone: check.timezone.clone(),
            statement_timeout: Duration::from_secs(check.timeout_secs),
            lc_time: check.lc_time.clone(),
        }
    }

    /// Returns the SET statements that apply these settings.
    pub fn statements(&self) -> Vec<String> {
        let mut statements = vec![
            format!("SET TIME ZONE {}", quote_literal(&self.timezone)),
            "SET DateStyle = 'ISO, MDY'".to_string(),
            "SET IntervalStyle = 'postgres'".to_string(),
            format!(
                "SET statement_timeout = {}",
                self.statement_timeout.as_millis()
            ),
        ];

        if let Some(lc_time) = &self.lc_time {
            statements.push(format!("SET lc_time = {}", quote_literal(lc_time)));
        }

        statements
    }
}

/// Quotes a string as a SQL literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Creates a PostgreSQL client for the given configuration.
///
/// This is the central factory function for database connections.
pub async fn connect(
    config: &ConnectionConfig,
    session: &SessionSettings,
) -> Result<Box<dyn DatabaseClient>> {
    let client = PostgresClient::connect(config, session).await?;
    Ok(Box::new(client))
}

/// Trait defining the interface for database clients.
///
/// All database operations are async and return Results with DocCheckError.
/// Connection-level failures must surface as `DocCheckError::Connection` so
/// the harness can abort the run.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a SQL snippet (one or more statements) and returns every row
    /// produced. Side effects are rolled back.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}
