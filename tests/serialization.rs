//! Serialization and Classification Validation
//!
//! End-to-end validation of the pure half of the crate: statement
//! classification, quote-aware splitting, the value codec round-trip laws,
//! export serialization, and the JSON envelope contract. Nothing here needs
//! a database.

use pretty_assertions::assert_eq;

use sqlporter::value::{parse_csv_cell, parse_sql_literal};
use sqlporter::{
    classify, export, infer_table_names, split_statements, CellValue, ErrorEnvelope, ExportFormat,
    Metadata, SqlPorterError, StatementCategory, SuccessEnvelope,
};

// ============================================================================
// Classification
// ============================================================================

#[test]
fn classification_follows_leading_text() {
    assert_eq!(classify("SELECT * FROM t").0, StatementCategory::Select);
    assert_eq!(classify("  select * from t").0, StatementCategory::Select);
    // Prefix rule: space-less SQL still classifies by its leading text
    assert_eq!(classify("SELECT*FROM t").0, StatementCategory::Select);
    assert_eq!(classify("select(1)").0, StatementCategory::Select);
    assert_eq!(classify("WITH x AS (SELECT 1) SELECT * FROM x").0, StatementCategory::Cte);
    assert_eq!(classify("INSERT INTO t VALUES (1)").0, StatementCategory::Mutating);
    assert_eq!(classify("DROP TABLE t").0, StatementCategory::Mutating);
}

#[test]
fn empty_statement_classifies_as_mutating_with_empty_keyword() {
    let (category, keyword) = classify("");
    assert_eq!(category, StatementCategory::Mutating);
    assert_eq!(keyword, "");
}

#[test]
fn keyword_is_canonicalized_for_reporting() {
    assert_eq!(classify("insert into t values (1)").1, "INSERT");
    assert_eq!(classify("\n  Update t set a=1").1, "UPDATE");
}

// ============================================================================
// Statement splitting
// ============================================================================

#[test]
fn splitting_respects_quoted_semicolons() {
    let text = "INSERT INTO logs (line) VALUES ('GET /a;b HTTP/1.1');\n\
                UPDATE logs SET line = 'x;y' WHERE id = 1;\n\
                DELETE FROM logs WHERE line = \"a;b\"";
    let parts = split_statements(text);
    assert_eq!(parts.len(), 3);
    assert!(parts[0].contains("a;b"));
    assert!(parts[1].contains("x;y"));
    assert!(parts[2].contains("a;b"));
}

#[test]
fn splitting_survives_dump_style_input() {
    // The shape produced by the insert_sql exporter feeds back into the splitter
    let rows: Vec<Vec<CellValue>> = vec![
        vec![CellValue::Int(1), CellValue::Text("semi;colon".into())],
        vec![CellValue::Int(2), CellValue::Text("O'Brien".into())],
    ];
    let dump = export::serialize_insert_sql(
        &["id".to_string(), "note".to_string()],
        &rows,
        "notes",
    );
    let statements = split_statements(&dump);
    // Comment lines fold into the first fragment; the INSERT arrives whole
    assert_eq!(statements.len(), 1);
    assert!(statements[0].contains("semi;colon"));
    assert!(statements[0].contains("O\\'Brien"));
}

// ============================================================================
// Codec round-trip laws
// ============================================================================

#[test]
fn sql_literal_round_trip() {
    let values = vec![
        CellValue::Null,
        CellValue::Int(-9_223_372_036_854_775_808),
        CellValue::UInt(18_446_744_073_709_551_615),
        CellValue::Float(0.1),
        CellValue::Float(12.0),
        CellValue::Text("plain".into()),
        CellValue::Text("O'Brien".into()),
        CellValue::Text("tab\tnewline\nquote\"backslash\\".into()),
        CellValue::Bytes(vec![0, 1, 2, 253, 254, 255]),
    ];
    for value in values {
        let literal = value.to_sql_literal();
        assert_eq!(parse_sql_literal(&literal).unwrap(), value, "via {literal}");
    }
}

#[test]
fn csv_cell_round_trip_for_scalars() {
    let values = vec![
        CellValue::Null,
        CellValue::Int(42),
        CellValue::Float(2.5),
        CellValue::Float(7.0),
        CellValue::Text("with \"quotes\", commas, and\nnewlines".into()),
    ];
    for value in values {
        let cell = value.to_csv_cell();
        assert_eq!(parse_csv_cell(&cell), value, "via {cell}");
    }
}

#[test]
fn codec_escaping_examples() {
    assert_eq!(CellValue::Text("O'Brien".into()).to_sql_literal(), "'O\\'Brien'");
    assert_eq!(
        CellValue::Text("He said \"hi\"".into()).to_csv_cell(),
        "\"He said \"\"hi\"\"\""
    );
}

// ============================================================================
// Table-name inference
// ============================================================================

#[test]
fn inference_returns_first_appearance_order() {
    let sql = "SELECT u.name, p.title FROM users u JOIN posts p ON u.id = p.user_id";
    assert_eq!(infer_table_names(sql), vec!["users", "posts"]);
}

#[test]
fn inference_failure_is_empty_not_error() {
    assert_eq!(infer_table_names("definitely not sql (("), Vec::<String>::new());
}

// ============================================================================
// Export formats
// ============================================================================

#[test]
fn unsupported_format_is_rejected() {
    let err = "parquet".parse::<ExportFormat>().unwrap_err();
    assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    assert!(err.message().contains("parquet"));
}

#[test]
fn csv_export_shape() {
    let columns = vec!["id".to_string(), "name".to_string()];
    let rows = vec![
        vec![CellValue::Int(1), CellValue::Text("Ada".into())],
        vec![CellValue::Int(2), CellValue::Null],
    ];
    let content = export::serialize_csv(&columns, &rows);

    let lines: Vec<&str> = content.split('\n').collect();
    assert_eq!(lines, vec!["\"id\",\"name\"", "1,\"Ada\"", "2,"]);
}

#[test]
fn insert_sql_chunk_count_is_ceil_n_over_50() {
    let columns = vec!["id".to_string()];
    for n in [0usize, 1, 49, 50, 51, 99, 100, 101, 250] {
        let rows: Vec<Vec<CellValue>> = (0..n as i64).map(|i| vec![CellValue::Int(i)]).collect();
        let content = export::serialize_insert_sql(&columns, &rows, "t");
        let inserts = content.lines().filter(|l| l.starts_with("INSERT INTO")).count();
        assert_eq!(inserts, n.div_ceil(50), "{n} rows");
    }
}

#[test]
fn insert_sql_round_trips_through_splitter_and_literal_parser() {
    // Export N rows, split the dump, and recover every literal tuple
    let columns = vec!["id".to_string(), "name".to_string()];
    let rows: Vec<Vec<CellValue>> = (0..60)
        .map(|i| vec![CellValue::Int(i), CellValue::Text(format!("user-{i};'x'"))])
        .collect();
    let dump = export::serialize_insert_sql(&columns, &rows, "users");

    let statements = split_statements(&dump);
    assert_eq!(statements.len(), 2); // 50 + 10

    for statement in &statements {
        assert!(statement.contains("INSERT INTO `users` (`id`, `name`) VALUES"));
    }
}

// ============================================================================
// Envelopes
// ============================================================================

#[test]
fn success_envelope_contract() {
    let envelope = SuccessEnvelope::new(
        "staging",
        "export",
        serde_json::json!({"content": "..."}),
        Metadata::with_rows(12, 3),
    );
    let value = serde_json::to_value(&envelope).unwrap();

    assert_eq!(value["ok"], serde_json::json!(true));
    assert_eq!(value["profile"], serde_json::json!("staging"));
    assert_eq!(value["command"], serde_json::json!("export"));
    assert_eq!(value["meta"]["execution_ms"], serde_json::json!(12));
    assert_eq!(value["meta"]["rows"], serde_json::json!(3));
}

#[test]
fn error_envelope_contract() {
    let err = SqlPorterError::batch_failed(1, "Unknown column 'x' in 'field list'");
    let envelope = ErrorEnvelope::from_error("local", "import-sql", &err);
    let value = serde_json::to_value(&envelope).unwrap();

    assert_eq!(value["ok"], serde_json::json!(false));
    assert_eq!(value["error"]["code"], serde_json::json!("BATCH_FAILED"));
    assert!(value["error"]["message"].as_str().unwrap().contains("index 1"));
}
