//! Run orchestration for doccheck.
//!
//! Loads configuration and documents, extracts examples, connects to the
//! database only when there is something to run, and renders the report.

use crate::cli::{Cli, OutputFormat};
use crate::compare::CompareOptions;
use crate::config::{CheckConfig, Config, ConnectionConfig};
use crate::db::{self, DatabaseClient, SessionSettings};
use crate::error::{DocCheckError, Result};
use crate::extract::{load_documents, Example, Extraction};
use crate::harness::{Harness, InjectedClock, RunOptions};
use crate::report::{Report, EXIT_SUCCESS};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything needed to run a set of examples, independent of the client.
#[derive(Debug, Clone)]
pub struct Checker {
    check: CheckConfig,
    clock: InjectedClock,
    options: RunOptions,
}

impl Checker {
    /// Builds a checker, validating the clock value.
    pub fn new(check: CheckConfig, fail_fast: bool, dedupe: bool) -> Result<Self> {
        let clock = InjectedClock::parse(&check.clock)?;
        if check.timeout_secs == 0 {
            return Err(DocCheckError::config("Timeout must be at least 1 second"));
        }

        let options = RunOptions {
            compare: CompareOptions::from_check_config(&check),
            fail_fast,
            dedupe,
        };

        Ok(Self {
            check,
            clock,
            options,
        })
    }

    /// Session settings for connections used by this checker.
    pub fn session(&self) -> SessionSettings {
        SessionSettings::from_check_config(&self.check)
    }

    /// Runs the extracted examples and attaches the parse issues.
    pub async fn run(&self, client: &dyn DatabaseClient, extraction: Extraction) -> Result<Report> {
        let harness = Harness::new(
            client,
            self.clock,
            Duration::from_secs(self.check.timeout_secs),
        )
        .with_allow_destructive(self.check.allow_destructive);

        let mut report = harness.run(&extraction.examples, &self.options).await?;
        report.add_issues(extraction.issues);
        Ok(report)
    }
}

/// Extracts every document and keeps examples from matching sections.
pub fn collect(paths: &[std::path::PathBuf], section: Option<&str>) -> Result<Extraction> {
    let mut collected = Extraction::default();

    for document in load_documents(paths)? {
        let extraction = document.extract();
        info!(
            "{}: {} examples, {} parse issues",
            document.name,
            extraction.examples.len(),
            extraction.issues.len()
        );
        collected.examples.extend(extraction.examples);
        collected.issues.extend(extraction.issues);
    }

    if let Some(section) = section {
        let needle = section.to_lowercase();
        collected
            .examples
            .retain(|example| example.section.to_lowercase().contains(&needle));
        debug!(
            "{} examples left after section filter '{section}'",
            collected.examples.len()
        );
    }

    Ok(collected)
}

/// Renders the `--list` output.
pub fn render_list(examples: &[Example]) -> String {
    let mut out = String::new();
    for example in examples {
        let _ = write!(out, "{}", example.id);
        if !example.section.is_empty() {
            let _ = write!(out, "  [{}]", example.section);
        }
        let _ = writeln!(out, "  {}", example.summary());
    }
    let _ = writeln!(out, "{} examples", examples.len());
    out
}

/// Resolves the final connection configuration from CLI args, config file, and environment.
pub fn resolve_connection(cli: &Cli, config: &Config) -> Result<Option<ConnectionConfig>> {
    resolve_connection_with(cli, config, std::env::var("DATABASE_URL").ok())
}

/// Resolves the connection with an explicit `DATABASE_URL` value.
///
/// Precedence: CLI connection string, CLI parts, named connection,
/// `DATABASE_URL`, then the `default` connection from the config file.
fn resolve_connection_with(
    cli: &Cli,
    config: &Config,
    database_url: Option<String>,
) -> Result<Option<ConnectionConfig>> {
    let mut connection = cli.to_connection_config()?;

    if connection.is_none() {
        if let Some(name) = cli.connection_name() {
            connection = config.get_connection(Some(name)).cloned();
            if connection.is_none() {
                return Err(DocCheckError::config(format!(
                    "Connection '{}' not found in config file",
                    name
                )));
            }
        }
    }

    if connection.is_none() {
        if let Some(url) = database_url.filter(|url| !url.is_empty()) {
            connection = Some(ConnectionConfig::from_connection_string(&url)?);
        }
    }

    if connection.is_none() {
        connection = config.get_connection(None).cloned();
    }

    if let Some(ref mut conn) = connection {
        conn.apply_env_defaults();
    }

    Ok(connection)
}

/// Runs the examples on a connected client, then closes it.
///
/// The client is closed whether or not the run succeeded.
pub async fn check_and_close(
    checker: &Checker,
    client: &dyn DatabaseClient,
    extraction: Extraction,
) -> Result<Report> {
    let outcome = checker.run(client, extraction).await;
    if let Err(e) = client.close().await {
        warn!("Failed to close connection: {e}");
    }
    outcome
}

fn print_report(report: &Report, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", report.render_json()?),
    }
    Ok(())
}

/// Runs doccheck and returns the process exit code.
///
/// Fatal problems (configuration, documents, connection) are returned as
/// errors; example failures only affect the exit code.
pub async fn run(cli: &Cli) -> Result<i32> {
    let format = cli.parse_output_format().map_err(DocCheckError::config)?;

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let mut check = config.check.clone();
    cli.apply_overrides(&mut check);
    let checker = Checker::new(check, cli.fail_fast, cli.dedupe)?;

    let extraction = collect(&cli.documents, cli.section.as_deref())?;

    if cli.list {
        print!("{}", render_list(&extraction.examples));
        return Ok(EXIT_SUCCESS);
    }

    if extraction.examples.is_empty() {
        info!("No examples found; nothing to run");
        let mut report = Report::new();
        report.add_issues(extraction.issues);
        print_report(&report, format)?;
        return Ok(report.exit_code());
    }

    let connection = resolve_connection(cli, &config)?.ok_or_else(|| {
        DocCheckError::config(
            "No database connection configured. Use --db, -c, or set DATABASE_URL",
        )
    })?;
    info!("Connection: {}", connection.display_string());

    let client = db::connect(&connection, &checker.session()).await?;
    let report = check_and_close(&checker, client.as_ref(), extraction).await?;

    let summary = report.summary();
    info!(
        "{} passed, {} failed, {} skipped",
        summary.passed, summary.failed, summary.skipped
    );

    print_report(&report, format)?;
    Ok(report.exit_code())
}
