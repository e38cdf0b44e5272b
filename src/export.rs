//! Export Serialization
//!
//! Turns result sets into one of two portable text encodings:
//!
//! - `csv`: a header line of quoted column names, then one line per row,
//!   cells encoded by the value codec.
//! - `insert_sql`: a comment header, then the rows grouped into chunks of at
//!   most [`INSERT_CHUNK_SIZE`]; a chunk of one row emits a single-row
//!   `INSERT`, larger chunks emit one multi-row `INSERT` each. Chunk
//!   boundaries never split a row, and every row follows the header's
//!   column order.
//!
//! The async entry points execute against a profile and serialize the
//! outcome; the serializers themselves are pure.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::engine::mysql::MySqlEngine;
use crate::engine::{quote_identifier, DatabaseEngine, ExecutionOutcome};
use crate::error::{Result, SqlPorterError};
use crate::profile::ConnectionProfile;
use crate::table_names::first_table_or_placeholder;
use crate::value::CellValue;

/// Maximum number of rows covered by one generated `INSERT` statement
pub const INSERT_CHUNK_SIZE: usize = 50;

/// Supported export encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Batched `INSERT INTO ...` statements
    InsertSql,
    /// Row-oriented CSV
    Csv,
}

impl ExportFormat {
    /// Format selector as it appears in requests
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InsertSql => "insert_sql",
            Self::Csv => "csv",
        }
    }

    /// Suggested filename extension for the serialized blob
    #[must_use]
    pub const fn file_extension(&self) -> &'static str {
        match self {
            Self::InsertSql => ".sql",
            Self::Csv => ".csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = SqlPorterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "insert_sql" => Ok(Self::InsertSql),
            "csv" => Ok(Self::Csv),
            other => Err(SqlPorterError::unsupported_format(format!(
                "'{other}' (supported: insert_sql, csv)"
            ))),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A serialized export with its suggested filename
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    /// The serialized text blob
    pub content: String,

    /// Encoding of `content`
    pub format: ExportFormat,

    /// Suggested download filename
    pub suggested_filename: String,

    /// Rows serialized (None for affected-count renderings)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,

    /// Tables covered (whole-database exports only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables_exported: Option<usize>,
}

impl ExportDocument {
    fn new(content: String, format: ExportFormat) -> Self {
        Self {
            content,
            format,
            suggested_filename: format!("export{}", format.file_extension()),
            row_count: None,
            tables_exported: None,
        }
    }
}

/// Serialize a result set as CSV text.
#[must_use]
pub fn serialize_csv(columns: &[String], rows: &[Vec<CellValue>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(csv_header(columns));
    for row in rows {
        let cells: Vec<String> = row.iter().map(CellValue::to_csv_cell).collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

fn csv_header(columns: &[String]) -> String {
    let cells: Vec<String> = columns
        .iter()
        .map(|col| format!("\"{}\"", col.replace('"', "\"\"")))
        .collect();
    cells.join(",")
}

/// Serialize a result set as a sequence of batched `INSERT` statements.
#[must_use]
pub fn serialize_insert_sql(columns: &[String], rows: &[Vec<CellValue>], table: &str) -> String {
    let mut lines = vec![
        "-- MySQL dump".to_string(),
        format!("-- Table: {table}"),
        String::new(),
    ];

    let quoted_table = quote_identifier(table);
    let column_list: Vec<String> = columns.iter().map(|col| quote_identifier(col)).collect();
    let column_list = column_list.join(", ");

    for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
        if chunk.len() == 1 {
            lines.push(format!(
                "INSERT INTO {quoted_table} ({column_list}) VALUES ({});",
                row_values(&chunk[0])
            ));
        } else {
            let tuples: Vec<String> =
                chunk.iter().map(|row| format!("({})", row_values(row))).collect();
            lines.push(format!(
                "INSERT INTO {quoted_table} ({column_list}) VALUES {};",
                tuples.join(", ")
            ));
        }
    }

    lines.join("\n")
}

fn row_values(row: &[CellValue]) -> String {
    let literals: Vec<String> = row.iter().map(CellValue::to_sql_literal).collect();
    literals.join(", ")
}

/// Render a row-less outcome (INSERT/UPDATE/DELETE/DDL) in the requested format.
fn serialize_affected(
    sql: &str,
    table: Option<&str>,
    statement_kind: &str,
    affected_rows: &[u64],
    format: ExportFormat,
) -> String {
    let total: u64 = affected_rows.iter().sum();
    match format {
        ExportFormat::Csv => format!("\"affected_rows\"\n{total}"),
        ExportFormat::InsertSql => {
            let mut lines = vec![
                "-- MySQL command results".to_string(),
                format!("-- SQL: {sql}"),
            ];
            if let Some(table) = table {
                lines.push(format!("-- Table: {table}"));
            }
            lines.push(format!("-- Statement: {statement_kind}"));
            lines.push(format!("-- Affected rows: {total}"));
            lines.join("\n")
        }
    }
}

/// Execute arbitrary SQL and serialize the outcome.
///
/// For row outcomes the dump's table name is the caller's hint, else the
/// first table the SQL references, else a placeholder the caller is expected
/// to edit.
pub async fn export_query(
    profile: &ConnectionProfile,
    sql: &str,
    format: ExportFormat,
    table_hint: Option<&str>,
) -> Result<ExportDocument> {
    let outcome = MySqlEngine::execute(profile, sql).await?;

    let document = match outcome {
        ExecutionOutcome::Rows { columns, rows, row_count } => {
            let content = match format {
                ExportFormat::Csv => serialize_csv(&columns, &rows),
                ExportFormat::InsertSql => {
                    let table = match table_hint {
                        Some(name) if !name.is_empty() => name.to_string(),
                        _ => first_table_or_placeholder(sql),
                    };
                    serialize_insert_sql(&columns, &rows, &table)
                }
            };
            let mut document = ExportDocument::new(content, format);
            document.row_count = Some(row_count);
            document
        }
        ExecutionOutcome::Affected { statement_kind, affected_rows } => {
            let table = match table_hint {
                Some(name) if !name.is_empty() => Some(name.to_string()),
                _ => crate::table_names::infer_table_names(sql).into_iter().next(),
            };
            let content =
                serialize_affected(sql, table.as_deref(), &statement_kind, &affected_rows, format);
            ExportDocument::new(content, format)
        }
    };

    Ok(document)
}

/// Export every row of one table, columns in declared order.
pub async fn export_table(
    profile: &ConnectionProfile,
    table: &str,
    format: ExportFormat,
) -> Result<ExportDocument> {
    // Existence check up front gives a schema error instead of a raw driver error
    let structure = MySqlEngine::table_structure(profile, table).await?;
    if structure.is_empty() {
        return Err(SqlPorterError::schema_mismatch(format!(
            "Table '{}.{}' does not exist",
            profile.database, table
        )));
    }

    let sql = format!("SELECT * FROM {}", quote_identifier(table));
    let outcome = MySqlEngine::execute(profile, &sql).await?;

    match outcome {
        ExecutionOutcome::Rows { columns, rows, row_count } => {
            let content = match format {
                ExportFormat::Csv => serialize_csv(&columns, &rows),
                ExportFormat::InsertSql => serialize_insert_sql(&columns, &rows, table),
            };
            let mut document = ExportDocument::new(content, format);
            document.row_count = Some(row_count);
            Ok(document)
        }
        ExecutionOutcome::Affected { .. } => Err(SqlPorterError::execution_failed(format!(
            "SELECT on '{table}' unexpectedly produced no result set"
        ))),
    }
}

/// Export every table of the profile's database, sections separated by
/// `-- Table:` comment lines.
pub async fn export_database(
    profile: &ConnectionProfile,
    format: ExportFormat,
) -> Result<ExportDocument> {
    let tables = MySqlEngine::list_tables(profile).await?;
    if tables.is_empty() {
        return Err(SqlPorterError::schema_mismatch(format!(
            "No tables found in database '{}'",
            profile.database
        )));
    }

    let mut sections = Vec::with_capacity(tables.len() + 1);
    if format == ExportFormat::InsertSql {
        sections.push("-- MySQL dump of all tables".to_string());
    }

    let mut total_rows = 0;
    for table in &tables {
        let document = export_table(profile, table, format).await?;
        total_rows += document.row_count.unwrap_or(0);
        sections.push(format!("-- Table: {table}"));
        sections.push(document.content);
        sections.push(String::new()); // blank line between tables
    }

    let mut document = ExportDocument::new(sections.join("\n"), format);
    document.row_count = Some(total_rows);
    document.tables_exported = Some(tables.len());
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    fn int_row(i: i64) -> Vec<CellValue> {
        vec![CellValue::Int(i), CellValue::Text(format!("name{i}"))]
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("insert_sql".parse::<ExportFormat>().unwrap(), ExportFormat::InsertSql);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);

        let err = "xml".parse::<ExportFormat>().unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn test_format_extensions() {
        assert_eq!(ExportFormat::InsertSql.file_extension(), ".sql");
        assert_eq!(ExportFormat::Csv.file_extension(), ".csv");
    }

    #[test]
    fn test_csv_header_and_rows() {
        let content = serialize_csv(
            &columns(&["id", "name"]),
            &[
                vec![CellValue::Int(1), CellValue::Text("Ada".into())],
                vec![CellValue::Null, CellValue::Text("say \"hi\"".into())],
            ],
        );
        assert_eq!(content, "\"id\",\"name\"\n1,\"Ada\"\n,\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_csv_empty_result_is_header_only() {
        let content = serialize_csv(&columns(&["id"]), &[]);
        assert_eq!(content, "\"id\"");
    }

    #[test]
    fn test_insert_sql_single_row_chunk() {
        let content = serialize_insert_sql(
            &columns(&["id", "name"]),
            &[vec![CellValue::Int(1), CellValue::Text("O'Brien".into())]],
            "users",
        );
        let expected = "-- MySQL dump\n\
                        -- Table: users\n\
                        \n\
                        INSERT INTO `users` (`id`, `name`) VALUES (1, 'O\\'Brien');";
        assert_eq!(content, expected);
    }

    #[test]
    fn test_insert_sql_multi_row_chunk() {
        let rows: Vec<Vec<CellValue>> = (1..=3).map(int_row).collect();
        let content = serialize_insert_sql(&columns(&["id", "name"]), &rows, "users");
        let insert_lines: Vec<&str> =
            content.lines().filter(|l| l.starts_with("INSERT")).collect();
        assert_eq!(insert_lines.len(), 1);
        assert!(insert_lines[0].contains("VALUES (1, 'name1'), (2, 'name2'), (3, 'name3');"));
    }

    #[test]
    fn test_insert_sql_chunking_at_fifty() {
        for (n, expected_statements) in [(1, 1), (50, 1), (51, 2), (100, 2), (101, 3), (149, 3)] {
            let rows: Vec<Vec<CellValue>> = (0..n).map(int_row).collect();
            let content = serialize_insert_sql(&columns(&["id", "name"]), &rows, "t");
            let inserts: Vec<&str> =
                content.lines().filter(|l| l.starts_with("INSERT")).collect();
            assert_eq!(inserts.len(), expected_statements, "{n} rows");

            // Every chunk except possibly the last covers exactly 50 rows
            for (i, line) in inserts.iter().enumerate() {
                let tuples = line.matches('(').count() - 1; // minus the column list
                if i + 1 < inserts.len() {
                    assert_eq!(tuples, INSERT_CHUNK_SIZE, "{n} rows, chunk {i}");
                } else {
                    assert_eq!(tuples, n as usize - i * INSERT_CHUNK_SIZE, "{n} rows, last chunk");
                }
            }
        }
    }

    #[test]
    fn test_insert_sql_column_order_matches_header() {
        let content = serialize_insert_sql(
            &columns(&["b", "a"]),
            &[vec![CellValue::Int(2), CellValue::Int(1)]],
            "t",
        );
        assert!(content.contains("(`b`, `a`) VALUES (2, 1)"));
    }

    #[test]
    fn test_affected_rendering() {
        let csv = serialize_affected("DELETE FROM t", Some("t"), "DELETE", &[3], ExportFormat::Csv);
        assert_eq!(csv, "\"affected_rows\"\n3");

        let sql = serialize_affected(
            "DELETE FROM t; DELETE FROM u",
            Some("t"),
            "DELETE",
            &[3, 4],
            ExportFormat::InsertSql,
        );
        assert!(sql.starts_with("-- MySQL command results"));
        assert!(sql.contains("-- Table: t"));
        assert!(sql.contains("-- Affected rows: 7"));
    }
}
