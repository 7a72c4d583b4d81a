//! Mock database client for testing.
//!
//! Returns canned responses keyed by SQL text and records every snippet it
//! receives, so harness behavior can be checked without a server.

use super::{DatabaseClient, QueryResult};
use crate::error::{DocCheckError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A canned response for a snippet.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return these rows.
    Rows(QueryResult),
    /// Fail with a query error.
    QueryError(String),
    /// Fail as if the server went away.
    ConnectionLost(String),
    /// Never answer within any reasonable timeout.
    Hang,
}

/// A mock database client that returns predefined results.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    responses: HashMap<String, MockResponse>,
    executed: Mutex<Vec<String>>,
    closed: AtomicBool,
}

/// Normalizes SQL so trailing semicolons and surrounding whitespace don't
/// affect lookups.
fn key(sql: &str) -> String {
    sql.trim().trim_end_matches(';').trim().to_string()
}

impl MockDatabaseClient {
    /// Creates a new mock database client with no responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a response for the given SQL.
    pub fn with_response(mut self, sql: &str, response: MockResponse) -> Self {
        self.responses.insert(key(sql), response);
        self
    }

    /// Registers a successful result for the given SQL.
    pub fn with_result(self, sql: &str, result: QueryResult) -> Self {
        self.with_response(sql, MockResponse::Rows(result))
    }

    /// Returns every snippet executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|executed| executed.clone())
            .unwrap_or_default()
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if self.is_closed() {
            return Err(DocCheckError::connection("Mock client is closed"));
        }

        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }

        match self.responses.get(&key(sql)) {
            Some(MockResponse::Rows(result)) => {
                Ok(result.clone().with_execution_time(Duration::from_millis(1)))
            }
            Some(MockResponse::QueryError(message)) => Err(DocCheckError::query(message.clone())),
            Some(MockResponse::ConnectionLost(message)) => {
                Err(DocCheckError::connection(message.clone()))
            }
            Some(MockResponse::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(DocCheckError::internal("Mock hang elapsed"))
            }
            None => Err(DocCheckError::query(format!(
                "No mock response for: {}",
                key(sql)
            ))),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
