//! Table-Name Inference
//!
//! Export and import callers often have only a raw SQL string. This module
//! recovers the referenced table names from it by delegating to `sqlparser`
//! with the MySQL dialect, so the rest of the crate never has to pattern-match
//! SQL text itself.
//!
//! Names come back distinct, in first-appearance order, with the casing used
//! in the source SQL. Parse failures yield an empty list, never an error;
//! callers fall back to a placeholder table name.

use std::ops::ControlFlow;

use sqlparser::ast::{visit_relations, ObjectName};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

/// Placeholder used when no table name can be recovered from the SQL.
pub const PLACEHOLDER_TABLE: &str = "table_name";

/// Extract the distinct table names referenced by `sql`.
#[must_use]
pub fn infer_table_names(sql: &str) -> Vec<String> {
    let statements = match Parser::parse_sql(&MySqlDialect {}, sql) {
        Ok(statements) => statements,
        Err(_) => return Vec::new(),
    };

    let mut names: Vec<String> = Vec::new();
    for statement in &statements {
        let _: ControlFlow<()> = visit_relations(statement, |relation: &ObjectName| {
            // Schema-qualified names keep only the table part
            if let Some(ident) = relation.0.last() {
                if !names.iter().any(|seen| seen == &ident.value) {
                    names.push(ident.value.clone());
                }
            }
            ControlFlow::Continue(())
        });
    }
    names
}

/// First referenced table, or the placeholder when inference yields nothing.
#[must_use]
pub fn first_table_or_placeholder(sql: &str) -> String {
    infer_table_names(sql)
        .into_iter()
        .next()
        .unwrap_or_else(|| PLACEHOLDER_TABLE.to_string())
}
