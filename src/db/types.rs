//! Query result types for doccheck.
//!
//! Defines the structures used to represent query results and how they are
//! rendered into the output convention used by the guides: booleans as
//! `TRUE`/`FALSE`, text as quoted literals, everything else as PostgreSQL
//! prints it.

use std::fmt;
use std::time::Duration;

/// Separator between cells of a rendered row.
pub const CELL_SEPARATOR: &str = " | ";

/// Represents the result of executing a SQL snippet.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Column metadata, in the order of the last row set.
    pub columns: Vec<ColumnInfo>,

    /// Rows of data from every row-returning statement, in order.
    pub rows: Vec<Row>,

    /// Time taken to execute the snippet.
    pub execution_time: Duration,

    /// Number of rows returned.
    pub row_count: usize,
}

impl QueryResult {
    /// Creates a new empty query result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query result with the given columns and rows.
    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            execution_time: Duration::ZERO,
            row_count,
        }
    }

    /// Creates a single-row, single-column result.
    pub fn single(name: &str, data_type: &str, value: Value) -> Self {
        Self::with_data(vec![ColumnInfo::new(name, data_type)], vec![vec![value]])
    }

    /// Sets the execution time.
    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the result: one line per row, cells joined by ` | `.
    pub fn render(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(Value::render)
                    .collect::<Vec<_>>()
                    .join(CELL_SEPARATOR)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Column data type as reported by the server (e.g. `TEXT`, `DATE`).
    pub data_type: String,
}

impl ColumnInfo {
    /// Creates a new column info with the given name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Integer value.
    Int(i64),

    /// Character data (`TEXT`, `VARCHAR`, `BPCHAR`, `NAME`).
    Text(String),

    /// Any other type, in PostgreSQL's text representation.
    Other(String),
}

impl Value {
    /// Builds a value from the server's text representation of a column.
    pub fn from_text(type_name: &str, raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Value::Null;
        };

        match type_name.to_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => match raw {
                "t" | "true" | "TRUE" => Value::Bool(true),
                "f" | "false" | "FALSE" => Value::Bool(false),
                other => Value::Other(other.to_string()),
            },
            "INT2" | "INT4" | "INT8" | "SMALLINT" | "INT" | "INTEGER" | "BIGINT" => raw
                .parse()
                .map(Value::Int)
                .unwrap_or_else(|_| Value::Other(raw.to_string())),
            "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" => {
                Value::Text(raw.to_string())
            }
            _ => Value::Other(raw.to_string()),
        }
    }

    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Renders the value the way the guides write results.
    pub fn render(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Other(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}
