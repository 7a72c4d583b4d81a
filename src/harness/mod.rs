//! Execution harness.
//!
//! Runs extracted examples one at a time against a database client with the
//! injected clock applied, a per-example timeout, and the safety policy.
//! Query failures and timeouts are recorded per example; only a lost
//! connection aborts the run.

mod clock;

pub use clock::InjectedClock;

use crate::compare::{compare, CompareOptions};
use crate::db::{DatabaseClient, QueryResult};
use crate::error::{DocCheckError, Result};
use crate::extract::Example;
use crate::report::Report;
use crate::safety::SqlClassifier;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of running one example's SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Id of the example that ran.
    pub example_id: String,
    /// Rendered output, empty on failure.
    pub actual_output: String,
    /// True if the SQL ran without error.
    pub succeeded: bool,
    /// Error message when the SQL failed or timed out.
    pub error: Option<String>,
    /// Rows returned across all statements.
    pub row_count: usize,
    /// Execution time in milliseconds.
    pub duration_ms: u64,
}

impl ExecutionResult {
    fn success(example_id: &str, result: &QueryResult) -> Self {
        Self {
            example_id: example_id.to_string(),
            actual_output: result.render(),
            succeeded: true,
            error: None,
            row_count: result.row_count,
            duration_ms: result.execution_time.as_millis() as u64,
        }
    }

    fn failure(example_id: &str, error: &DocCheckError, elapsed: Duration) -> Self {
        Self {
            example_id: example_id.to_string(),
            actual_output: String::new(),
            succeeded: false,
            error: Some(error.message().to_string()),
            row_count: 0,
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Options that shape a whole run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// How outputs are compared.
    pub compare: CompareOptions,
    /// Stop after the first failed example.
    pub fail_fast: bool,
    /// Skip examples whose SQL and expected output were already seen.
    pub dedupe: bool,
}

/// Runs examples against a database client.
pub struct Harness<'a> {
    client: &'a dyn DatabaseClient,
    clock: InjectedClock,
    timeout: Duration,
    allow_destructive: bool,
    classifier: SqlClassifier,
}

impl<'a> Harness<'a> {
    /// Creates a harness over the given client.
    pub fn new(client: &'a dyn DatabaseClient, clock: InjectedClock, timeout: Duration) -> Self {
        Self {
            client,
            clock,
            timeout,
            allow_destructive: false,
            classifier: SqlClassifier::new(),
        }
    }

    /// Allows or withholds destructive snippets.
    pub fn with_allow_destructive(mut self, allow: bool) -> Self {
        self.allow_destructive = allow;
        self
    }

    /// Returns the SQL that will actually be sent for an example.
    pub fn prepare(&self, example: &Example) -> String {
        self.clock.rewrite(&example.sql_snippet)
    }

    /// Returns why an example must not run, if it must not.
    pub fn skip_reason(&self, example: &Example) -> Option<String> {
        if example.skip {
            return Some("marked with a skip directive".to_string());
        }
        self.classifier
            .classify(&example.sql_snippet)
            .skip_reason(self.allow_destructive)
    }

    /// Executes one example.
    ///
    /// Query errors and timeouts become a failed `ExecutionResult`; a
    /// connection error is returned as `Err` because it ends the run.
    pub async fn execute(&self, example: &Example) -> Result<ExecutionResult> {
        if self.clock.is_time_sensitive(&example.sql_snippet) {
            debug!("Injected clock into {}", example.id);
        }
        let sql = self.prepare(example);

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.client.execute_query(&sql))
            .await
            .unwrap_or_else(|_| {
                Err(DocCheckError::query(format!(
                    "Timed out after {} ms",
                    self.timeout.as_millis()
                )))
            });

        match outcome {
            Ok(result) => Ok(ExecutionResult::success(&example.id, &result)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("{} failed: {}", example.id, e);
                Ok(ExecutionResult::failure(&example.id, &e, start.elapsed()))
            }
        }
    }

    /// Runs every example in order and collects a report.
    pub async fn run(&self, examples: &[Example], options: &RunOptions) -> Result<Report> {
        let mut report = Report::new();
        let mut seen: HashMap<(&str, &str), &str> = HashMap::new();

        for example in examples {
            if options.dedupe {
                let key = (example.sql_snippet.as_str(), example.expected_output.as_str());
                if let Some(first) = seen.get(&key) {
                    report.skip(example.clone(), format!("duplicate of {first}"));
                    continue;
                }
                seen.insert(key, example.id.as_str());
            }

            if let Some(reason) = self.skip_reason(example) {
                info!("Skipping {}: {}", example.id, reason);
                report.skip(example.clone(), reason);
                continue;
            }

            let result = self.execute(example).await?;
            let comparison = result.succeeded.then(|| {
                compare(
                    &example.expected_output,
                    &result.actual_output,
                    &options.compare,
                )
            });

            let passed = comparison.as_ref().is_some_and(|c| c.matched);
            report.record(example.clone(), result, comparison);

            if !passed && options.fail_fast {
                info!("Stopping after first failure ({})", example.id);
                break;
            }
        }

        Ok(report)
    }
}
