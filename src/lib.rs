//! doccheck - keeps the SQL examples in Markdown guides honest.
//!
//! This library exposes the core modules for use in integration tests.

pub mod app;
pub mod cli;
pub mod compare;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod harness;
pub mod logging;
pub mod report;
pub mod safety;
