//! Cell Values and the Text Codec
//!
//! A [`CellValue`] is one driver cell with its kind decided once, when the row
//! is read. The codec maps cells to the two portable text encodings:
//!
//! - CSV cells: NULL is the empty cell, text is always double-quoted with
//!   embedded quotes doubled, numbers are written verbatim.
//! - SQL literals: NULL is the bare keyword, text is single-quoted with
//!   backslashes doubled first and quotes backslash-escaped second, numbers
//!   are written verbatim.
//!
//! Both mappings are total: unrecognized kinds degrade to the text rule
//! instead of failing. Binary cells are lossless in SQL form (hex literal)
//! but not in CSV form, where they fall back to Base64 text.

use base64::Engine as _;
use mysql_async::Value;
use serde::ser::{Serialize, Serializer};

use crate::error::{Result, SqlPorterError};

/// One cell of a result row, with a closed set of kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// SQL NULL
    Null,
    /// Signed integer
    Int(i64),
    /// Unsigned integer (MySQL BIGINT UNSIGNED can exceed i64)
    UInt(u64),
    /// Floating-point number
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Raw bytes (BLOB columns, non-UTF-8 payloads)
    Bytes(Vec<u8>),
}

impl CellValue {
    /// Encode this cell for a CSV record.
    ///
    /// Text is always quoted; quoting subsumes commas and newlines, so the
    /// only escape is doubling embedded double quotes.
    #[must_use]
    pub fn to_csv_cell(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Int(i) => i.to_string(),
            Self::UInt(u) => u.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Text(s) => quote_csv(s),
            Self::Bytes(b) => quote_csv(&printable_bytes(b)),
        }
    }

    /// Encode this cell as a MySQL literal for an `INSERT` dump.
    #[must_use]
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Int(i) => i.to_string(),
            Self::UInt(u) => u.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Text(s) => quote_sql(s),
            Self::Bytes(b) => {
                let mut hex = String::with_capacity(b.len() * 2 + 3);
                hex.push_str("X'");
                for byte in b {
                    hex.push_str(&format!("{byte:02X}"));
                }
                hex.push('\'');
                hex
            }
        }
    }

    /// JSON rendering for result envelopes. Bytes become Base64 text.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Int(i) => serde_json::Value::Number((*i).into()),
            Self::UInt(u) => serde_json::json!(*u),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null), // NaN/Infinity as null
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Bytes(b) => serde_json::Value::String(
                base64::engine::general_purpose::STANDARD.encode(b),
            ),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&Value> for CellValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::NULL => Self::Null,
            Value::Int(i) => Self::Int(*i),
            Value::UInt(u) => Self::UInt(*u),
            Value::Float(f) => Self::Float(f64::from(*f)),
            Value::Double(d) => Self::Float(*d),
            Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => Self::Text(s.to_string()),
                Err(_) => Self::Bytes(bytes.clone()),
            },
            Value::Date(year, month, day, hour, minute, second, micro) => {
                Self::Text(format!(
                    "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{micro:06}"
                ))
            }
            Value::Time(is_negative, days, hours, minutes, seconds, micros) => {
                let sign = if *is_negative { "-" } else { "" };
                let total_hours = days * 24 + u32::from(*hours);
                Self::Text(format!(
                    "{sign}{total_hours}:{minutes:02}:{seconds:02}.{micros:06}"
                ))
            }
        }
    }
}

/// Decode one CSV cell produced by [`CellValue::to_csv_cell`].
///
/// The empty cell is NULL, quoted cells are text, everything else is typed
/// numerically when it parses and kept as bare text otherwise.
#[must_use]
pub fn parse_csv_cell(cell: &str) -> CellValue {
    if cell.is_empty() {
        return CellValue::Null;
    }
    if cell.len() >= 2 && cell.starts_with('"') && cell.ends_with('"') {
        return CellValue::Text(cell[1..cell.len() - 1].replace("\"\"", "\""));
    }
    parse_bare_scalar(cell)
}

/// Decode one SQL literal produced by [`CellValue::to_sql_literal`].
pub fn parse_sql_literal(literal: &str) -> Result<CellValue> {
    let trimmed = literal.trim();
    if trimmed.eq_ignore_ascii_case("NULL") {
        return Ok(CellValue::Null);
    }
    if let Some(hex) = trimmed
        .strip_prefix("X'")
        .or_else(|| trimmed.strip_prefix("x'"))
        .and_then(|rest| rest.strip_suffix('\''))
    {
        return parse_hex_bytes(hex);
    }
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        return unescape_sql_string(&trimmed[1..trimmed.len() - 1]);
    }
    match parse_bare_scalar(trimmed) {
        CellValue::Text(_) => Err(SqlPorterError::invalid_input(format!(
            "not a recognizable SQL literal: {trimmed}"
        ))),
        scalar => Ok(scalar),
    }
}

/// Type a CSV field that a CSV reader has already unquoted.
///
/// The empty field is NULL (quoting information is gone at this point, so an
/// empty quoted string also imports as NULL); numeric-looking fields become
/// numbers, everything else stays text. The database coerces literals into
/// the column's declared type on insert.
#[must_use]
pub fn type_csv_field(field: &str) -> CellValue {
    if field.is_empty() {
        CellValue::Null
    } else {
        parse_bare_scalar(field)
    }
}

fn parse_bare_scalar(text: &str) -> CellValue {
    if let Ok(i) = text.parse::<i64>() {
        return CellValue::Int(i);
    }
    if let Ok(u) = text.parse::<u64>() {
        return CellValue::UInt(u);
    }
    if let Ok(f) = text.parse::<f64>() {
        return CellValue::Float(f);
    }
    CellValue::Text(text.to_string())
}

fn parse_hex_bytes(hex: &str) -> Result<CellValue> {
    if hex.len() % 2 != 0 {
        return Err(SqlPorterError::invalid_input("hex literal has odd length"));
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.as_bytes().chunks(2) {
        let pair = std::str::from_utf8(chunk)
            .map_err(|_| SqlPorterError::invalid_input("hex literal is not ASCII"))?;
        let byte = u8::from_str_radix(pair, 16)
            .map_err(|_| SqlPorterError::invalid_input(format!("bad hex digits: {pair}")))?;
        bytes.push(byte);
    }
    Ok(CellValue::Bytes(bytes))
}

fn unescape_sql_string(body: &str) -> Result<CellValue> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => {
                    return Err(SqlPorterError::invalid_input(
                        "dangling backslash in SQL string literal",
                    ))
                }
            }
        } else {
            out.push(ch);
        }
    }
    Ok(CellValue::Text(out))
}

/// Wrap a string for a CSV cell, doubling embedded double quotes.
fn quote_csv(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Wrap a string as a MySQL literal. Backslashes are doubled before quotes
/// are escaped; the reverse order would double-escape.
fn quote_sql(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Floats keep a decimal point (or exponent) so they stay distinguishable
/// from integers when the text is read back.
fn format_float(f: f64) -> String {
    format!("{f:?}")
}

fn printable_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => base64::engine::general_purpose::STANDARD.encode(bytes),
    }
}
