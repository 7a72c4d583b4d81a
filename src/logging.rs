//! Logging configuration for doccheck.
//!
//! Logs go to stderr so the report on stdout stays machine-readable, or to a
//! file when `--log-file` is given.

use std::fs::{self, File};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Returns the filter from `RUST_LOG`, or `info` (`debug` when verbose).
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(verbose)))
}

fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Initializes logging to stderr.
pub fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

/// Initializes logging to the given file, truncating it.
///
/// Falls back to stderr if the file cannot be created.
pub fn init_file_logging(path: &Path, verbose: bool) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            init_stderr_logging(verbose);
            return;
        }
    }

    let log_file = match File::create(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {e}");
            init_stderr_logging(verbose);
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(log_file)
        .with_ansi(false)
        .init();
}
