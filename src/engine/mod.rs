//! Database Engine Trait and Core Types
//!
//! This module defines the execution-facing abstractions: the outcome of
//! running one statement, ordered schema descriptors, and the engine trait
//! the MySQL implementation fulfils.
//!
//! # Stateless Design
//! All trait methods are stateless and take `&ConnectionProfile` as input.
//! Connections are opened, used, and closed within each method call.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::profile::ConnectionProfile;
use crate::value::CellValue;

pub mod mysql;

/// Result of executing one SQL statement.
///
/// Exactly one shape is produced per statement; failures travel through the
/// `Err` arm of [`Result`] instead of a third variant.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum ExecutionOutcome {
    /// A result set was produced (SELECT, or a CTE that reads)
    Rows {
        /// Column names in positional order from the result descriptor
        columns: Vec<String>,
        /// Row tuples, each in column order
        rows: Vec<Vec<CellValue>>,
        /// Convenience count, equal to `rows.len()`
        row_count: usize,
    },
    /// No result set; one affected-row count per executed statement
    Affected {
        /// Canonicalized leading keyword of the submitted text (e.g. "INSERT")
        statement_kind: String,
        /// Ordered per-statement counts (length 1 for a single statement)
        affected_rows: Vec<u64>,
    },
}

/// Connection information returned after successful connection validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Database server version string
    pub database_version: String,

    /// Server information (MySQL vs MariaDB)
    pub server_info: String,

    /// Name of the connected database
    pub connected_database: String,

    /// Connected user name
    pub user: String,
}

/// One column of a table, in declared order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableColumn {
    /// Column name
    pub field: String,

    /// Declared type (engine-specific, e.g. `varchar(255)`)
    pub data_type: String,

    /// Whether the column allows NULL values
    pub nullable: bool,

    /// Key kind (`PRI`, `UNI`, `MUL`, or empty)
    pub key: String,

    /// Default value (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Extra attributes (e.g. `auto_increment`)
    pub extra: String,
}

/// Index information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    /// Index name
    pub name: String,

    /// Column names included in the index
    pub columns: Vec<String>,

    /// Whether this is a unique index
    pub unique: bool,
}

/// Full description of one table: DDL text plus index metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDetails {
    /// `SHOW CREATE TABLE` output
    pub create_table_sql: String,

    /// Secondary and primary indexes
    pub indexes: Vec<IndexInfo>,
}

/// Quote an identifier for MySQL, doubling embedded backticks.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Database engine trait
///
/// Each method is stateless, acquires its own connection, and guarantees the
/// connection is released on every exit path.
pub trait DatabaseEngine {
    /// Validate connection and return server/connection metadata.
    fn validate_connection(
        profile: &ConnectionProfile,
    ) -> impl std::future::Future<Output = Result<ConnectionInfo>> + Send;

    /// Classify and execute one statement (or a semicolon-joined mutating
    /// batch) and return a uniform outcome. Mutating statements run inside a
    /// transaction that is rolled back on any driver error.
    fn execute(
        profile: &ConnectionProfile,
        sql: &str,
    ) -> impl std::future::Future<Output = Result<ExecutionOutcome>> + Send;

    /// List base tables of the profile's database, sorted by name.
    fn list_tables(
        profile: &ConnectionProfile,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Ordered column descriptors for one table. Empty means the table
    /// does not exist.
    fn table_structure(
        profile: &ConnectionProfile,
        table: &str,
    ) -> impl std::future::Future<Output = Result<Vec<TableColumn>>> + Send;

    /// `SHOW CREATE TABLE` text plus index metadata for one table.
    fn table_details(
        profile: &ConnectionProfile,
        table: &str,
    ) -> impl std::future::Future<Output = Result<TableDetails>> + Send;

    /// List databases on the instance, system schemas filtered out.
    fn list_databases(
        profile: &ConnectionProfile,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Create the profile's database if it does not exist yet.
    fn create_database(
        profile: &ConnectionProfile,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization_rows() {
        let outcome = ExecutionOutcome::Rows {
            columns: vec!["id".into(), "name".into()],
            rows: vec![vec![CellValue::Int(1), CellValue::Text("a".into())]],
            row_count: 1,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains(r#""result":"rows""#));
        assert!(json.contains(r#""row_count":1"#));
        assert!(json.contains(r#"["id","name"]"#));
    }

    #[test]
    fn test_outcome_serialization_affected() {
        let outcome = ExecutionOutcome::Affected {
            statement_kind: "INSERT".into(),
            affected_rows: vec![2, 1],
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains(r#""result":"affected""#));
        assert!(json.contains(r#""statement_kind":"INSERT""#));
        assert!(json.contains("[2,1]"));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "`users`");
        assert_eq!(quote_identifier("odd`name"), "`odd``name`");
    }
}
