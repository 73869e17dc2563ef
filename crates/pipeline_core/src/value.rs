//! Cell values and declared field types.
//!
//! Source cells arrive as strings; a field that passes schema validation is
//! replaced by its coerced typed value.

use serde::Serialize;
use std::fmt;

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataValue {
    /// Null/missing value
    Null,
    /// String value
    String(String),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
}

impl DataValue {
    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// Attempts to get this value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            DataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to get this value as a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            DataValue::Float(f) => Some(*f),
            DataValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempts to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for DataValue {
    /// Renders the value the way it is written to CSV; null is empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => Ok(()),
            DataValue::String(s) => f.write_str(s),
            DataValue::Int(i) => write!(f, "{i}"),
            DataValue::Float(v) => write!(f, "{v}"),
            DataValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::String(s)
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::String(s.to_string())
    }
}

impl From<i64> for DataValue {
    fn from(i: i64) -> Self {
        DataValue::Int(i)
    }
}

impl From<f64> for DataValue {
    fn from(f: f64) -> Self {
        DataValue::Float(f)
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        DataValue::Bool(b)
    }
}

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// Pass-through string
    Str,
    /// Boolean
    Bool,
}

impl FieldType {
    /// Parses a configured type name. Accepts common aliases, case-insensitive.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "int" | "integer" | "int64" => Some(FieldType::Int),
            "float" | "double" | "float64" => Some(FieldType::Float),
            "str" | "string" => Some(FieldType::Str),
            "bool" | "boolean" => Some(FieldType::Bool),
            _ => None,
        }
    }

    /// Canonical name used in error details.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Str => "str",
            FieldType::Bool => "bool",
        }
    }

    /// Coerces a raw cell into this type. `None` means the cell does not parse.
    pub fn coerce(&self, raw: &str) -> Option<DataValue> {
        match self {
            FieldType::Str => Some(DataValue::String(raw.to_string())),
            FieldType::Int => raw.trim().parse::<i64>().ok().map(DataValue::Int),
            FieldType::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(DataValue::Float),
            FieldType::Bool => parse_bool(raw).map(DataValue::Bool),
        }
    }

    /// Coerces a configuration scalar (e.g. a `default`) into this type.
    pub fn coerce_json(&self, value: &serde_json::Value) -> Option<DataValue> {
        use serde_json::Value;

        match (self, value) {
            (_, Value::String(s)) => self.coerce(s),
            (FieldType::Int, Value::Number(n)) => n.as_i64().map(DataValue::Int),
            (FieldType::Float, Value::Number(n)) => n.as_f64().map(DataValue::Float),
            (FieldType::Str, Value::Number(n)) => Some(DataValue::String(n.to_string())),
            (FieldType::Bool, Value::Bool(b)) => Some(DataValue::Bool(*b)),
            (FieldType::Str, Value::Bool(b)) => Some(DataValue::String(b.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}
