//! Snippet safety classification module.
//!
//! Parses SQL and classifies snippets as safe, mutating, or destructive so
//! that the harness never runs destructive documentation examples unless
//! told to. Every snippet runs inside a rolled-back transaction regardless.

mod parser;

pub use parser::{classify_sql, SqlClassifier};

use std::fmt;

/// Safety level classification for SQL snippets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SafetyLevel {
    /// Read-only queries (SELECT, EXPLAIN, SHOW, SET).
    Safe,
    /// SQL that could not be parsed; it still runs, rolled back.
    Unverified,
    /// Data modification (INSERT, UPDATE, MERGE) that is undone by rollback.
    Mutating,
    /// Schema changes, deletes and privilege changes (DROP, TRUNCATE,
    /// ALTER, CREATE, DELETE, GRANT, REVOKE).
    Destructive,
}

impl SafetyLevel {
    /// Returns true if a snippet at this level may run under the given policy.
    pub fn is_runnable(&self, allow_destructive: bool) -> bool {
        allow_destructive || *self != Self::Destructive
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "Safe"),
            Self::Unverified => write!(f, "Unverified"),
            Self::Mutating => write!(f, "Mutating"),
            Self::Destructive => write!(f, "Destructive"),
        }
    }
}

/// The type of SQL statement detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Drop,
    Truncate,
    Alter,
    Create,
    Grant,
    Revoke,
    Explain,
    Show,
    Set,
    Merge,
    /// Multiple statements detected; contains the most dangerous type.
    Multiple(Box<StatementType>),
    /// Statement type could not be determined.
    Unknown,
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Drop => write!(f, "DROP"),
            Self::Truncate => write!(f, "TRUNCATE"),
            Self::Alter => write!(f, "ALTER"),
            Self::Create => write!(f, "CREATE"),
            Self::Grant => write!(f, "GRANT"),
            Self::Revoke => write!(f, "REVOKE"),
            Self::Explain => write!(f, "EXPLAIN"),
            Self::Show => write!(f, "SHOW"),
            Self::Set => write!(f, "SET"),
            Self::Merge => write!(f, "MERGE"),
            Self::Multiple(inner) => write!(f, "Multiple ({})", inner),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result of classifying a SQL snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The determined safety level.
    pub level: SafetyLevel,
    /// The type of statement(s) detected.
    pub statement_type: StatementType,
}

impl Classification {
    /// Creates a new classification.
    pub fn new(level: SafetyLevel, statement_type: StatementType) -> Self {
        Self {
            level,
            statement_type,
        }
    }

    /// Returns the reason a snippet is withheld, or None if it may run.
    pub fn skip_reason(&self, allow_destructive: bool) -> Option<String> {
        if self.level.is_runnable(allow_destructive) {
            None
        } else {
            Some(format!(
                "destructive {} statement (use --allow-destructive to run it)",
                self.statement_type
            ))
        }
    }
}
