use serde_json::Value;
use std::fmt;

/// A typed cell value as the engine writes it.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Maps request data onto a cell: numbers and booleans keep their type,
    /// `null` clears the cell, arrays and objects become compact JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.is_finite() => CellValue::Number(f),
                _ => CellValue::Text(n.to_string()),
            },
            Value::String(s) => CellValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => CellValue::Text(value.to_string()),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Width in characters used for column sizing.
    pub fn display_len(&self) -> usize {
        match self {
            CellValue::Empty => 0,
            CellValue::Text(s) => s.chars().count(),
            CellValue::Number(n) => format_number(*n).len(),
            CellValue::Bool(b) => if *b { 4 } else { 5 },
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

/// Shortest form that reads back as the same `f64`; integral values carry no
/// fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
