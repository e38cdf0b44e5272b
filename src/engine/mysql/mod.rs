//! MySQL Database Engine Implementation
//!
//! This module implements the `DatabaseEngine` trait for MySQL databases
//! (including MariaDB).
//!
//! # Implementation Notes
//! - Uses `mysql_async` (async driver, requires tokio runtime)
//! - One fresh connection per call, disconnected on every exit path
//! - SELECT statements fetch the whole result set and its column descriptor
//! - WITH statements are probed after execution: a missing result set means
//!   the CTE mutated, so the transaction is committed and the driver's
//!   affected-row count is reported instead
//! - All other statements are split on quote-aware boundaries and executed
//!   in order inside a single transaction with one commit at the end;
//!   any driver error rolls the whole transaction back
//! - Schema introspection via information_schema

use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Row, TxOpts};

use crate::engine::{
    quote_identifier, ConnectionInfo, DatabaseEngine, ExecutionOutcome, IndexInfo, TableColumn,
    TableDetails,
};
use crate::error::{Result, SqlPorterError};
use crate::profile::ConnectionProfile;
use crate::statement::{classify, split_statements, StatementCategory};
use crate::value::CellValue;

/// MySQL database engine implementation
pub struct MySqlEngine;

impl DatabaseEngine for MySqlEngine {
    async fn validate_connection(profile: &ConnectionProfile) -> Result<ConnectionInfo> {
        let mut conn = connect(profile).await?;

        let probe = async {
            let version = query_single_value(&mut conn, "SELECT VERSION()").await?;
            let database = query_single_value(&mut conn, "SELECT DATABASE()").await?;
            let user = query_single_value(&mut conn, "SELECT CURRENT_USER()").await?;
            Ok::<_, SqlPorterError>((version, database, user))
        };

        let (version_string, connected_database, user) = match probe.await {
            Ok(values) => values,
            Err(err) => {
                let _ = conn.disconnect().await;
                return Err(err);
            }
        };
        let (database_version, server_info) = parse_mysql_version(&version_string);

        disconnect(conn).await?;

        Ok(ConnectionInfo { database_version, server_info, connected_database, user })
    }

    async fn execute(profile: &ConnectionProfile, sql: &str) -> Result<ExecutionOutcome> {
        let (category, keyword) = classify(sql);
        if keyword.is_empty() {
            return Err(SqlPorterError::malformed_statement("statement is empty"));
        }

        let mut conn = connect(profile).await?;
        let outcome = match category {
            StatementCategory::Select => run_select(&mut conn, sql).await,
            StatementCategory::Cte => run_cte(&mut conn, sql, &keyword).await,
            StatementCategory::Mutating => run_mutations(&mut conn, sql, &keyword).await,
        };

        // The connection is released whether execution succeeded or not
        match outcome {
            Ok(outcome) => {
                disconnect(conn).await?;
                Ok(outcome)
            }
            Err(err) => {
                let _ = conn.disconnect().await;
                Err(err)
            }
        }
    }

    async fn list_tables(profile: &ConnectionProfile) -> Result<Vec<String>> {
        let mut conn = connect(profile).await?;
        let result = fetch_table_names(&mut conn, &profile.database).await;
        disconnect(conn).await?;
        result
    }

    async fn table_structure(profile: &ConnectionProfile, table: &str) -> Result<Vec<TableColumn>> {
        let mut conn = connect(profile).await?;
        let result = fetch_table_structure(&mut conn, &profile.database, table).await;
        disconnect(conn).await?;
        result
    }

    async fn table_details(profile: &ConnectionProfile, table: &str) -> Result<TableDetails> {
        let mut conn = connect(profile).await?;

        let create_table_sql = fetch_create_table(&mut conn, table).await;
        let indexes = match &create_table_sql {
            Ok(_) => fetch_indexes(&mut conn, &profile.database, table).await,
            Err(_) => Ok(Vec::new()),
        };

        disconnect(conn).await?;
        Ok(TableDetails { create_table_sql: create_table_sql?, indexes: indexes? })
    }

    async fn list_databases(profile: &ConnectionProfile) -> Result<Vec<String>> {
        // Connect at the instance level, without selecting a database
        let mut conn = connect_instance(profile).await?;
        let result: std::result::Result<Vec<String>, _> = conn.query("SHOW DATABASES").await;
        let databases = match result {
            Ok(databases) => databases,
            Err(e) => {
                let _ = conn.disconnect().await;
                return Err(SqlPorterError::execution_failed(format!(
                    "Failed to list databases: {e}"
                )));
            }
        };
        disconnect(conn).await?;

        Ok(databases
            .into_iter()
            .filter(|name| !SYSTEM_SCHEMAS.contains(&name.as_str()))
            .collect())
    }

    async fn create_database(profile: &ConnectionProfile) -> Result<()> {
        let mut conn = connect_instance(profile).await?;

        let existing: std::result::Result<Option<Row>, _> = conn
            .exec_first(
                "SELECT schema_name FROM information_schema.schemata WHERE schema_name = ?",
                (profile.database.as_str(),),
            )
            .await;

        let outcome = match existing {
            Ok(Some(_)) => Ok(()),
            Ok(None) => {
                let ddl = format!(
                    "CREATE DATABASE IF NOT EXISTS {}",
                    quote_identifier(&profile.database)
                );
                conn.query_drop(ddl).await.map_err(|e| {
                    SqlPorterError::execution_failed(format!("Failed to create database: {e}"))
                })
            }
            Err(e) => Err(SqlPorterError::execution_failed(format!(
                "Failed to check database existence: {e}"
            ))),
        };

        match outcome {
            Ok(()) => disconnect(conn).await,
            Err(err) => {
                let _ = conn.disconnect().await;
                Err(err)
            }
        }
    }
}

/// System schemas excluded from instance-level database listings
const SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "performance_schema", "mysql", "sys"];

/// Build connection options from a profile
fn build_opts(profile: &ConnectionProfile, with_database: bool) -> Result<OptsBuilder> {
    if profile.host.is_empty() {
        return Err(SqlPorterError::invalid_input("profile host must not be empty"));
    }
    if profile.user.is_empty() {
        return Err(SqlPorterError::invalid_input("profile user must not be empty"));
    }

    let mut opts = OptsBuilder::default()
        .ip_or_hostname(&profile.host)
        .tcp_port(profile.port)
        .user(Some(&profile.user))
        .pass(Some(&profile.password));

    if with_database {
        opts = opts.db_name(Some(&profile.database));
    }

    Ok(opts)
}

/// Open a connection with the profile's database selected
pub(crate) async fn connect(profile: &ConnectionProfile) -> Result<Conn> {
    let opts = build_opts(profile, true)?;
    Conn::new(opts)
        .await
        .map_err(|e| SqlPorterError::connection_failed(format!("Failed to connect to MySQL: {e}")))
}

/// Open an instance-level connection (no database selected)
async fn connect_instance(profile: &ConnectionProfile) -> Result<Conn> {
    let opts = build_opts(profile, false)?;
    Conn::new(opts)
        .await
        .map_err(|e| SqlPorterError::connection_failed(format!("Failed to connect to MySQL: {e}")))
}

/// Close a connection, surfacing the error
pub(crate) async fn disconnect(conn: Conn) -> Result<()> {
    conn.disconnect()
        .await
        .map_err(|e| SqlPorterError::connection_failed(format!("Failed to disconnect: {e}")))
}

/// Fetch a single scalar string from a query like `SELECT VERSION()`.
/// A NULL cell (e.g. `SELECT DATABASE()` with no schema selected) reads as
/// the empty string.
async fn query_single_value(conn: &mut Conn, sql: &str) -> Result<String> {
    let row: Row = conn
        .query_first(sql)
        .await
        .map_err(|e| SqlPorterError::execution_failed(format!("{sql} failed: {e}")))?
        .ok_or_else(|| SqlPorterError::execution_failed(format!("{sql} returned nothing")))?;

    let cell: Option<String> = row
        .get(0)
        .ok_or_else(|| SqlPorterError::execution_failed(format!("{sql} returned no value")))?;
    Ok(cell.unwrap_or_default())
}

/// Parse MySQL version string to detect MySQL vs MariaDB
fn parse_mysql_version(version_string: &str) -> (String, String) {
    // Example MySQL: "8.0.35"
    // Example MariaDB: "10.11.2-MariaDB"
    if version_string.to_uppercase().contains("MARIADB") {
        let version = version_string.split('-').next().unwrap_or("unknown").to_string();
        (version.clone(), format!("MariaDB {version}"))
    } else {
        let version = version_string
            .split_whitespace()
            .next()
            .unwrap_or(version_string)
            .to_string();
        (version.clone(), format!("MySQL {version}"))
    }
}

/// Convert one driver row to an ordered cell tuple
fn row_cells(row: &Row) -> Vec<CellValue> {
    (0..row.len())
        .map(|idx| row.as_ref(idx).map(CellValue::from).unwrap_or(CellValue::Null))
        .collect()
}

/// SELECT path: fetch all rows and the positional column-name list
async fn run_select(conn: &mut Conn, sql: &str) -> Result<ExecutionOutcome> {
    let mut result = conn
        .query_iter(sql)
        .await
        .map_err(|e| SqlPorterError::execution_failed(e.to_string()))?;

    // Column metadata must be read before the result set is consumed
    let columns: Vec<String> = result
        .columns()
        .map(|cols| cols.iter().map(|col| col.name_str().to_string()).collect())
        .unwrap_or_default();

    let rows: Vec<Row> = result
        .collect()
        .await
        .map_err(|e| SqlPorterError::execution_failed(e.to_string()))?;

    let rows: Vec<Vec<CellValue>> = rows.iter().map(row_cells).collect();
    let row_count = rows.len();

    Ok(ExecutionOutcome::Rows { columns, rows, row_count })
}

/// CTE path: execute, then resolve read-vs-write from the presence of a
/// result set. A missing descriptor is the driver's "no result set" signal.
async fn run_cte(conn: &mut Conn, sql: &str, keyword: &str) -> Result<ExecutionOutcome> {
    let mut tx = conn
        .start_transaction(TxOpts::default())
        .await
        .map_err(|e| SqlPorterError::execution_failed(e.to_string()))?;

    match probe_cte(&mut tx, sql, keyword).await {
        Ok(outcome) => {
            tx.commit()
                .await
                .map_err(|e| SqlPorterError::execution_failed(e.to_string()))?;
            Ok(outcome)
        }
        Err(err) => {
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}

async fn probe_cte(
    tx: &mut mysql_async::Transaction<'_>,
    sql: &str,
    keyword: &str,
) -> Result<ExecutionOutcome> {
    let mut result = tx
        .query_iter(sql)
        .await
        .map_err(|e| SqlPorterError::execution_failed(e.to_string()))?;

    match result.columns() {
        Some(cols) => {
            let columns: Vec<String> = cols.iter().map(|col| col.name_str().to_string()).collect();
            let rows: Vec<Row> = result
                .collect()
                .await
                .map_err(|e| SqlPorterError::execution_failed(e.to_string()))?;
            let rows: Vec<Vec<CellValue>> = rows.iter().map(row_cells).collect();
            let row_count = rows.len();
            Ok(ExecutionOutcome::Rows { columns, rows, row_count })
        }
        None => {
            let affected = result.affected_rows();
            result
                .drop_result()
                .await
                .map_err(|e| SqlPorterError::execution_failed(e.to_string()))?;
            Ok(ExecutionOutcome::Affected {
                statement_kind: keyword.to_string(),
                affected_rows: vec![affected],
            })
        }
    }
}

/// Mutating path: quote-aware split, one transaction, ordered per-statement
/// affected counts, single commit after the last statement.
async fn run_mutations(conn: &mut Conn, sql: &str, keyword: &str) -> Result<ExecutionOutcome> {
    let statements = split_statements(sql);
    if statements.is_empty() {
        return Err(SqlPorterError::malformed_statement(
            "no executable statement found in input",
        ));
    }

    let mut tx = conn
        .start_transaction(TxOpts::default())
        .await
        .map_err(|e| SqlPorterError::execution_failed(e.to_string()))?;

    match apply_statements(&mut tx, &statements).await {
        Ok(affected_rows) => {
            tx.commit()
                .await
                .map_err(|e| SqlPorterError::execution_failed(e.to_string()))?;
            Ok(ExecutionOutcome::Affected { statement_kind: keyword.to_string(), affected_rows })
        }
        Err(err) => {
            let _ = tx.rollback().await;
            // Single-statement execution reports a plain execution failure;
            // the batch index only matters to the importer
            Err(match err {
                SqlPorterError::BatchFailed { detail, .. } => {
                    SqlPorterError::execution_failed(detail)
                }
                other => other,
            })
        }
    }
}

/// Execute statements in order, collecting one affected-row count each.
/// Used by both the mutating dispatch path and the batch importer; the
/// caller owns commit/rollback.
pub(crate) async fn apply_statements(
    tx: &mut mysql_async::Transaction<'_>,
    statements: &[String],
) -> Result<Vec<u64>> {
    let mut affected = Vec::with_capacity(statements.len());
    for (index, statement) in statements.iter().enumerate() {
        let result = tx
            .query_iter(statement.as_str())
            .await
            .map_err(|e| SqlPorterError::batch_failed(index, e.to_string()))?;
        let count = result.affected_rows();
        result
            .drop_result()
            .await
            .map_err(|e| SqlPorterError::batch_failed(index, e.to_string()))?;
        affected.push(count);
    }
    Ok(affected)
}

/// Base tables of one schema, sorted by name
async fn fetch_table_names(conn: &mut Conn, schema: &str) -> Result<Vec<String>> {
    let query = "SELECT table_name
                 FROM information_schema.tables
                 WHERE table_schema = ?
                 AND table_type = 'BASE TABLE'
                 ORDER BY table_name";

    conn.exec(query, (schema,))
        .await
        .map_err(|e| SqlPorterError::execution_failed(format!("Failed to list tables: {e}")))
}

/// Ordered column descriptors for one table
pub(crate) async fn fetch_table_structure(
    conn: &mut Conn,
    schema: &str,
    table: &str,
) -> Result<Vec<TableColumn>> {
    let query = "SELECT column_name, column_type, is_nullable, column_key, column_default, extra
                 FROM information_schema.columns
                 WHERE table_schema = ? AND table_name = ?
                 ORDER BY ordinal_position";

    let rows: Vec<Row> = conn.exec(query, (schema, table)).await.map_err(|e| {
        SqlPorterError::execution_failed(format!(
            "Failed to query columns for {schema}.{table}: {e}"
        ))
    })?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let field: String = row.get(0).ok_or_else(|| {
            SqlPorterError::execution_failed("Failed to extract column name".to_string())
        })?;
        let data_type: String = row.get(1).ok_or_else(|| {
            SqlPorterError::execution_failed("Failed to extract column type".to_string())
        })?;
        let is_nullable: String = row.get(2).ok_or_else(|| {
            SqlPorterError::execution_failed("Failed to extract nullable status".to_string())
        })?;
        let key: String = row.get(3).unwrap_or_default();
        let default: Option<String> = row.get(4);
        let extra: String = row.get(5).unwrap_or_default();

        columns.push(TableColumn {
            field,
            data_type,
            nullable: is_nullable == "YES",
            key,
            default,
            extra,
        });
    }

    Ok(columns)
}

/// `SHOW CREATE TABLE` text for one table
async fn fetch_create_table(conn: &mut Conn, table: &str) -> Result<String> {
    let query = format!("SHOW CREATE TABLE {}", quote_identifier(table));
    let row: Row = conn
        .query_first(query)
        .await
        .map_err(|e| SqlPorterError::execution_failed(format!("SHOW CREATE TABLE failed: {e}")))?
        .ok_or_else(|| {
            SqlPorterError::execution_failed(format!("No CREATE TABLE text for '{table}'"))
        })?;

    // Column 0 is the table name, column 1 the DDL text
    row.get(1).ok_or_else(|| {
        SqlPorterError::execution_failed("Failed to extract CREATE TABLE text".to_string())
    })
}

/// Index metadata for one table, grouped by index name
async fn fetch_indexes(conn: &mut Conn, schema: &str, table: &str) -> Result<Vec<IndexInfo>> {
    let query = "SELECT DISTINCT index_name, non_unique
                 FROM information_schema.statistics
                 WHERE table_schema = ? AND table_name = ?
                 ORDER BY index_name";

    let rows: Vec<Row> = conn.exec(query, (schema, table)).await.map_err(|e| {
        SqlPorterError::execution_failed(format!(
            "Failed to query indexes for {schema}.{table}: {e}"
        ))
    })?;

    let mut indexes = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.get(0).ok_or_else(|| {
            SqlPorterError::execution_failed("Failed to extract index name".to_string())
        })?;
        let non_unique: i64 = row.get(1).ok_or_else(|| {
            SqlPorterError::execution_failed("Failed to extract non_unique flag".to_string())
        })?;

        let columns = fetch_index_columns(conn, schema, table, &name).await?;
        indexes.push(IndexInfo { name, columns, unique: non_unique == 0 });
    }

    Ok(indexes)
}

/// Columns of a specific index, in sequence order
async fn fetch_index_columns(
    conn: &mut Conn,
    schema: &str,
    table: &str,
    index_name: &str,
) -> Result<Vec<String>> {
    let query = "SELECT column_name
                 FROM information_schema.statistics
                 WHERE table_schema = ? AND table_name = ? AND index_name = ?
                 ORDER BY seq_in_index";

    conn.exec(query, (schema, table, index_name)).await.map_err(|e| {
        SqlPorterError::execution_failed(format!(
            "Failed to query columns for index {schema}.{table}.{index_name}: {e}"
        ))
    })
}
