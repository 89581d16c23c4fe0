//! Seed data values.
//!
//! Seed rows are captured from the live schema and replayed as `INSERT`
//! statements by the installer. Values are kept as a small tagged union so
//! the manifest stays readable JSON (`null`, `true`, `42`, `"text"`).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::identifier::quote_literal;

/// One seed row: column name to value, in catalog column order.
pub type SeedRow = IndexMap<String, SeedValue>;

/// A scalar seed value.
///
/// Serialized untagged, so a manifest row reads as plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeedValue {
    /// SQL NULL.
    Null,
    /// Boolean column value.
    Bool(bool),
    /// Integer or floating point value.
    Number(serde_json::Number),
    /// Everything else, including DECIMAL, dates and binary data rendered as text.
    String(String),
}

impl SeedValue {
    /// Classify a text-protocol catalog value by its column type name.
    ///
    /// Integer and floating point types become [`SeedValue::Number`] when they
    /// parse; DECIMAL stays a string so no precision is lost.
    pub fn from_catalog_text(type_name: &str, text: Option<String>) -> Self {
        let Some(text) = text else {
            return SeedValue::Null;
        };

        let base = type_name
            .trim()
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();

        match base.as_str() {
            "BOOLEAN" | "BOOL" => SeedValue::Bool(text.trim() != "0"),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" => {
                let trimmed = text.trim();
                if let Ok(v) = trimmed.parse::<i64>() {
                    SeedValue::Number(v.into())
                } else if let Ok(v) = trimmed.parse::<u64>() {
                    SeedValue::Number(v.into())
                } else {
                    SeedValue::String(text)
                }
            }
            "FLOAT" | "DOUBLE" | "REAL" => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(SeedValue::Number)
                .unwrap_or(SeedValue::String(text)),
            _ => SeedValue::String(text),
        }
    }

    /// Check if this value is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, SeedValue::Null)
    }

    /// Render as a single-quoted SQL literal (`NULL` for null, `'1'`/`'0'` for booleans).
    pub fn to_sql_literal(&self) -> String {
        match self {
            SeedValue::Null => "NULL".to_string(),
            SeedValue::Bool(true) => "'1'".to_string(),
            SeedValue::Bool(false) => "'0'".to_string(),
            SeedValue::Number(n) => quote_literal(&n.to_string()),
            SeedValue::String(s) => quote_literal(s),
        }
    }
}

impl From<&str> for SeedValue {
    fn from(v: &str) -> Self {
        SeedValue::String(v.to_string())
    }
}

impl From<String> for SeedValue {
    fn from(v: String) -> Self {
        SeedValue::String(v)
    }
}

impl From<i64> for SeedValue {
    fn from(v: i64) -> Self {
        SeedValue::Number(v.into())
    }
}

impl From<bool> for SeedValue {
    fn from(v: bool) -> Self {
        SeedValue::Bool(v)
    }
}

impl<T: Into<SeedValue>> From<Option<T>> for SeedValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SeedValue::Null)
    }
}
