//! Integration tests for doccheck.
//!
//! Database-backed tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable to run them.

pub mod extract_test;
pub mod guide_test;
pub mod query_test;

use std::path::PathBuf;

/// Path to a file under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
