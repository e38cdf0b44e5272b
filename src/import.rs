//! Batch Import
//!
//! Two ingestion paths, both atomic per call:
//!
//! - SQL batches: a multi-statement blob is split on quote-aware boundaries
//!   and executed in order inside one transaction. Any failure rolls back
//!   every statement and reports the 0-based index of the offender.
//! - CSV: records become one `INSERT` each through the value codec, executed
//!   inside one transaction. The target table must already exist, and the
//!   destination columns come from an explicit field mapping or positionally
//!   from the table's declared column order.
//!
//! The first CSV line is the header, matching the export encoding.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::engine::mysql::{apply_statements, connect, disconnect, fetch_table_structure};
use crate::engine::quote_identifier;
use crate::error::{Result, SqlPorterError};
use crate::profile::ConnectionProfile;
use crate::statement::split_statements;
use crate::value::type_csv_field;

use mysql_async::TxOpts;

/// Result of a successful SQL batch import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementImportReport {
    /// Number of statements applied
    pub statements_applied: usize,

    /// One affected-row count per statement, in execution order
    pub affected_rows: Vec<u64>,
}

/// Result of a successful CSV import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvImportReport {
    /// Destination table
    pub table: String,

    /// Number of records inserted
    pub rows_imported: usize,
}

/// Where one destination column takes its CSV value from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// 0-based CSV field position
    Position(usize),
    /// CSV header name
    Header(String),
}

/// One CSV-field-to-column binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    /// CSV side of the binding
    pub source: FieldSource,
    /// Destination column name
    pub column: String,
}

impl FromStr for FieldBinding {
    type Err = SqlPorterError;

    /// Parse `source=column`, where source is a 0-based position or a header name.
    fn from_str(s: &str) -> Result<Self> {
        let (source, column) = s.split_once('=').ok_or_else(|| {
            SqlPorterError::invalid_input(format!(
                "field mapping '{s}' must look like 'position=column' or 'header=column'"
            ))
        })?;
        if column.is_empty() {
            return Err(SqlPorterError::invalid_input(format!(
                "field mapping '{s}' has an empty destination column"
            )));
        }
        let source = match source.parse::<usize>() {
            Ok(position) => FieldSource::Position(position),
            Err(_) => FieldSource::Header(source.to_string()),
        };
        Ok(Self { source, column: column.to_string() })
    }
}

/// Execute a multi-statement SQL blob as one atomic batch.
///
/// Statements run in submission order inside a single transaction committed
/// after the last one. On any failure the whole batch is rolled back and the
/// error carries the 0-based index of the failing statement.
pub async fn import_statements(
    profile: &ConnectionProfile,
    sql_text: &str,
) -> Result<StatementImportReport> {
    let statements = split_statements(sql_text);
    if statements.is_empty() {
        return Err(SqlPorterError::malformed_statement(
            "import text contains no executable statement",
        ));
    }

    let mut conn = connect(profile).await?;
    let outcome = run_statement_batch(&mut conn, &statements).await;

    match outcome {
        Ok(affected_rows) => {
            disconnect(conn).await?;
            Ok(StatementImportReport { statements_applied: statements.len(), affected_rows })
        }
        Err(err) => {
            let _ = conn.disconnect().await;
            Err(err)
        }
    }
}

async fn run_statement_batch(
    conn: &mut mysql_async::Conn,
    statements: &[String],
) -> Result<Vec<u64>> {
    let mut tx = conn
        .start_transaction(TxOpts::default())
        .await
        .map_err(|e| SqlPorterError::execution_failed(e.to_string()))?;

    match apply_statements(&mut tx, statements).await {
        Ok(affected) => {
            tx.commit()
                .await
                .map_err(|e| SqlPorterError::execution_failed(e.to_string()))?;
            Ok(affected)
        }
        Err(err) => {
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}

/// Import CSV content into an existing table as one atomic batch.
///
/// `csv_bytes` is UTF-8 CSV with a header line. With no mapping, records
/// bind positionally to the table's declared columns and the field count
/// must match exactly. Any record failure rolls back the whole import and
/// reports the 0-based record index.
pub async fn import_csv(
    profile: &ConnectionProfile,
    table: &str,
    csv_bytes: &[u8],
    mapping: Option<&[FieldBinding]>,
) -> Result<CsvImportReport> {
    let text = std::str::from_utf8(csv_bytes)
        .map_err(|e| SqlPorterError::invalid_input(format!("CSV content is not UTF-8: {e}")))?;

    let (headers, records) = read_records(text)?;

    let mut conn = connect(profile).await?;
    let outcome = run_csv_batch(&mut conn, profile, table, &headers, &records, mapping).await;

    match outcome {
        Ok(rows_imported) => {
            disconnect(conn).await?;
            Ok(CsvImportReport { table: table.to_string(), rows_imported })
        }
        Err(err) => {
            let _ = conn.disconnect().await;
            Err(err)
        }
    }
}

fn read_records(text: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| SqlPorterError::invalid_input(format!("CSV header is unreadable: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            SqlPorterError::invalid_input(format!("CSV record {index} is unreadable: {e}"))
        })?;
        records.push(record.iter().map(str::to_string).collect());
    }

    Ok((headers, records))
}

async fn run_csv_batch(
    conn: &mut mysql_async::Conn,
    profile: &ConnectionProfile,
    table: &str,
    headers: &[String],
    records: &[Vec<String>],
    mapping: Option<&[FieldBinding]>,
) -> Result<usize> {
    // The table must exist before any row is written
    let structure = fetch_table_structure(conn, &profile.database, table).await?;
    if structure.is_empty() {
        return Err(SqlPorterError::schema_mismatch(format!(
            "Table '{}.{}' does not exist",
            profile.database, table
        )));
    }

    let declared: Vec<String> = structure.into_iter().map(|col| col.field).collect();
    let plan = resolve_columns(headers, &declared, mapping)?;

    // All records are validated and rendered before the transaction opens
    let statements = build_inserts(table, &plan, records)?;

    let mut tx = conn
        .start_transaction(TxOpts::default())
        .await
        .map_err(|e| SqlPorterError::execution_failed(e.to_string()))?;

    match apply_statements(&mut tx, &statements).await {
        Ok(_) => {
            tx.commit()
                .await
                .map_err(|e| SqlPorterError::execution_failed(e.to_string()))?;
            Ok(statements.len())
        }
        Err(err) => {
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}

/// Destination plan: for each target column, which CSV field feeds it
#[derive(Debug)]
struct ColumnPlan {
    columns: Vec<String>,
    positions: Vec<usize>,
}

fn resolve_columns(
    headers: &[String],
    declared: &[String],
    mapping: Option<&[FieldBinding]>,
) -> Result<ColumnPlan> {
    match mapping {
        Some(bindings) => {
            if bindings.is_empty() {
                return Err(SqlPorterError::invalid_input("field mapping is empty"));
            }
            let mut columns = Vec::with_capacity(bindings.len());
            let mut positions = Vec::with_capacity(bindings.len());
            for binding in bindings {
                let position = match &binding.source {
                    FieldSource::Position(position) => {
                        if *position >= headers.len() {
                            return Err(SqlPorterError::schema_mismatch(format!(
                                "CSV has {} fields, mapping references position {}",
                                headers.len(),
                                position
                            )));
                        }
                        *position
                    }
                    FieldSource::Header(name) => headers
                        .iter()
                        .position(|h| h == name)
                        .ok_or_else(|| {
                            SqlPorterError::schema_mismatch(format!(
                                "CSV has no column named '{name}'"
                            ))
                        })?,
                };
                if !declared.iter().any(|col| col == &binding.column) {
                    return Err(SqlPorterError::schema_mismatch(format!(
                        "Table has no column named '{}'",
                        binding.column
                    )));
                }
                columns.push(binding.column.clone());
                positions.push(position);
            }
            Ok(ColumnPlan { columns, positions })
        }
        None => {
            // Positional: CSV fields bind to the table's declared column order
            if headers.len() != declared.len() {
                return Err(SqlPorterError::schema_mismatch(format!(
                    "CSV has {} fields but table has {} columns; supply a field mapping",
                    headers.len(),
                    declared.len()
                )));
            }
            Ok(ColumnPlan {
                columns: declared.to_vec(),
                positions: (0..declared.len()).collect(),
            })
        }
    }
}

fn build_inserts(table: &str, plan: &ColumnPlan, records: &[Vec<String>]) -> Result<Vec<String>> {
    let quoted_table = quote_identifier(table);
    let column_list: Vec<String> = plan.columns.iter().map(|col| quote_identifier(col)).collect();
    let column_list = column_list.join(", ");

    let mut statements = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let mut literals = Vec::with_capacity(plan.positions.len());
        for position in &plan.positions {
            let field = record.get(*position).ok_or_else(|| {
                SqlPorterError::schema_mismatch(format!(
                    "record {index} has {} fields, expected at least {}",
                    record.len(),
                    position + 1
                ))
            })?;
            literals.push(type_csv_field(field).to_sql_literal());
        }
        statements.push(format!(
            "INSERT INTO {quoted_table} ({column_list}) VALUES ({})",
            literals.join(", ")
        ));
    }
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn test_field_binding_parsing() {
        assert_eq!(
            "0=id".parse::<FieldBinding>().unwrap(),
            FieldBinding { source: FieldSource::Position(0), column: "id".into() }
        );
        assert_eq!(
            "user_name=name".parse::<FieldBinding>().unwrap(),
            FieldBinding { source: FieldSource::Header("user_name".into()), column: "name".into() }
        );
        assert!("no-equals".parse::<FieldBinding>().is_err());
        assert!("0=".parse::<FieldBinding>().is_err());
    }

    #[test]
    fn test_read_records() {
        let (header, records) = read_records("\"id\",\"name\"\n1,\"Ada\"\n2,\"Bob\"").unwrap();
        assert_eq!(header, vec!["id", "name"]);
        assert_eq!(records, vec![vec!["1", "Ada"], vec!["2", "Bob"]]);
    }

    #[test]
    fn test_read_records_rejects_ragged_rows() {
        let err = read_records("\"id\",\"name\"\n1,\"Ada\"\n2").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(err.message().contains("record 1"));
    }

    #[test]
    fn test_resolve_columns_positional() {
        let plan = resolve_columns(
            &headers(&["id", "name"]),
            &headers(&["id", "name"]),
            None,
        )
        .unwrap();
        assert_eq!(plan.columns, vec!["id", "name"]);
        assert_eq!(plan.positions, vec![0, 1]);
    }

    #[test]
    fn test_resolve_columns_positional_count_mismatch() {
        let err = resolve_columns(&headers(&["id"]), &headers(&["id", "name"]), None).unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_MISMATCH");
    }

    #[test]
    fn test_resolve_columns_mapping_reorders_and_selects() {
        let bindings =
            vec!["name=full_name".parse().unwrap(), "0=id".parse::<FieldBinding>().unwrap()];
        let plan = resolve_columns(
            &headers(&["id", "name", "ignored"]),
            &headers(&["id", "full_name", "created_at"]),
            Some(&bindings),
        )
        .unwrap();
        assert_eq!(plan.columns, vec!["full_name", "id"]);
        assert_eq!(plan.positions, vec![1, 0]);
    }

    #[test]
    fn test_resolve_columns_mapping_unknown_targets() {
        let bindings = vec!["0=nope".parse::<FieldBinding>().unwrap()];
        let err = resolve_columns(
            &headers(&["id"]),
            &headers(&["id", "name"]),
            Some(&bindings),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_MISMATCH");
        assert!(err.message().contains("'nope'"));

        let bindings = vec!["missing=id".parse::<FieldBinding>().unwrap()];
        let err = resolve_columns(
            &headers(&["id"]),
            &headers(&["id", "name"]),
            Some(&bindings),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_MISMATCH");

        let bindings = vec!["5=id".parse::<FieldBinding>().unwrap()];
        let err = resolve_columns(
            &headers(&["id"]),
            &headers(&["id", "name"]),
            Some(&bindings),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_MISMATCH");
    }

    #[test]
    fn test_build_inserts_uses_codec() {
        let plan = ColumnPlan { columns: vec!["id".into(), "name".into()], positions: vec![0, 1] };
        let statements = build_inserts(
            "users",
            &plan,
            &[
                vec!["1".to_string(), "O'Brien".to_string()],
                vec!["".to_string(), "x".to_string()],
            ],
        )
        .unwrap();
        assert_eq!(
            statements[0],
            "INSERT INTO `users` (`id`, `name`) VALUES (1, 'O\\'Brien')"
        );
        // Empty CSV field imports as NULL
        assert_eq!(statements[1], "INSERT INTO `users` (`id`, `name`) VALUES (NULL, 'x')");
    }

    #[test]
    fn test_empty_statement_batch_rejected() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let profile = ConnectionProfile {
            name: "t".into(),
            host: "no-such-host.invalid".into(),
            port: 3306,
            database: "d".into(),
            user: "u".into(),
            password: String::new(),
        };
        // Rejected before any connection attempt
        let err = runtime.block_on(import_statements(&profile, "  ;;  ; ")).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_STATEMENT");
    }
}
