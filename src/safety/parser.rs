//! SQL parsing and classification logic.
//!
//! Uses sqlparser-rs with PostgreSQL dialect to parse SQL and classify
//! statements by their safety level.

use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use super::{Classification, SafetyLevel, StatementType};

/// SQL classifier that parses and classifies snippets.
#[derive(Debug)]
pub struct SqlClassifier {
    dialect: PostgreSqlDialect,
}

impl Default for SqlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlClassifier {
    /// Creates a new SQL classifier.
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Classifies a SQL snippet.
    ///
    /// Snippets the parser does not understand are `Unverified`: guides use
    /// plenty of PostgreSQL-only syntax, and they still run rolled back.
    pub fn classify(&self, sql: &str) -> Classification {
        let statements = match Parser::parse_sql(&self.dialect, sql) {
            Ok(statements) => statements,
            Err(e) => {
                debug!("Could not parse snippet for classification: {e}");
                return Classification::new(SafetyLevel::Unverified, StatementType::Unknown);
            }
        };

        match statements.as_slice() {
            [] => Classification::new(SafetyLevel::Unverified, StatementType::Unknown),
            [statement] => {
                let (level, statement_type) = classify_statement(statement);
                Classification::new(level, statement_type)
            }
            many => {
                let (level, statement_type) = many
                    .iter()
                    .map(classify_statement)
                    .max_by_key(|(level, _)| *level)
                    .unwrap_or((SafetyLevel::Unverified, StatementType::Unknown));
                Classification::new(level, StatementType::Multiple(Box::new(statement_type)))
            }
        }
    }
}

/// Convenience function to classify SQL without creating a classifier instance.
pub fn classify_sql(sql: &str) -> Classification {
    SqlClassifier::new().classify(sql)
}

/// Classifies a single parsed statement.
fn classify_statement(statement: &Statement) -> (SafetyLevel, StatementType) {
    match statement {
        Statement::Query(query) => classify_query(query),
        Statement::Explain {
            analyze, statement, ..
        } => {
            if *analyze {
                // EXPLAIN ANALYZE executes the statement.
                let (inner_level, _) = classify_statement(statement);
                (inner_level, StatementType::Explain)
            } else {
                (SafetyLevel::Safe, StatementType::Explain)
            }
        }
        Statement::ShowVariable { .. } => (SafetyLevel::Safe, StatementType::Show),
        Statement::SetVariable { .. } => (SafetyLevel::Safe, StatementType::Set),

        Statement::Insert { .. } => (SafetyLevel::Mutating, StatementType::Insert),
        Statement::Update { .. } => (SafetyLevel::Mutating, StatementType::Update),
        Statement::Merge { .. } => (SafetyLevel::Mutating, StatementType::Merge),

        Statement::Delete { .. } => (SafetyLevel::Destructive, StatementType::Delete),
        Statement::Drop { .. } => (SafetyLevel::Destructive, StatementType::Drop),
        Statement::Truncate { .. } => (SafetyLevel::Destructive, StatementType::Truncate),
        Statement::AlterTable { .. }
        | Statement::AlterIndex { .. }
        | Statement::AlterView { .. }
        | Statement::AlterRole { .. } => (SafetyLevel::Destructive, StatementType::Alter),
        Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. }
        | Statement::CreateFunction { .. }
        | Statement::CreateRole { .. }
        | Statement::CreateSequence { .. }
        | Statement::CreateType { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::Grant { .. } => (SafetyLevel::Destructive, StatementType::Grant),
        Statement::Revoke { .. } => (SafetyLevel::Destructive, StatementType::Revoke),

        // Anything else still runs inside the rolled-back transaction.
        _ => (SafetyLevel::Mutating, StatementType::Unknown),
    }
}

/// Classifies a query, looking into CTEs and data-modifying bodies.
fn classify_query(query: &Query) -> (SafetyLevel, StatementType) {
    let body = match query.body.as_ref() {
        SetExpr::Insert(statement) | SetExpr::Update(statement) => classify_statement(statement),
        _ => (SafetyLevel::Safe, StatementType::Select),
    };

    query
        .with
        .iter()
        .flat_map(|with| with.cte_tables.iter())
        .map(|cte| classify_query(&cte.query))
        .chain(std::iter::once(body))
        .max_by_key(|(level, _)| *level)
        .unwrap_or((SafetyLevel::Safe, StatementType::Select))
}
