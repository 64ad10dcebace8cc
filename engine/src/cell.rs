//! FILENAME: engine/src/cell.rs
//! PURPOSE: Defines the scalar values stored in sheet cells and table rows.
//! CONTEXT: `CellValue` is what the data store hands us for every table cell
//! and what we hand back when writing output blocks. `Cell` pairs a value with
//! an optional number format for grids that are written back to a sheet.

use serde::{Deserialize, Serialize};

/// A scalar cell value: string, number, boolean or empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Returns the display value of the cell as a String.
    pub fn display_value(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }

    /// The trimmed display value. Join keys, filter comparisons, group keys
    /// and unique-value lists are all built from this form.
    pub fn key_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.trim().to_string(),
            other => other.display_value(),
        }
    }

    /// Numeric coercion used by aggregates. Blank or non-numeric values count as 0.
    pub fn to_number(&self) -> f64 {
        match self {
            CellValue::Empty => 0.0,
            CellValue::Number(n) if n.is_finite() => *n,
            CellValue::Number(_) => 0.0,
            CellValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            CellValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .unwrap_or(0.0),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_value())
    }
}

/// Format without unnecessary decimal places.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// A cell as stored in a sheet grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    /// Number format code (e.g. "0.00", "General"). None means the sheet default.
    pub number_format: Option<String>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Cell {
            value,
            number_format: None,
        }
    }

    pub fn with_format(value: CellValue, number_format: impl Into<String>) -> Self {
        Cell {
            value,
            number_format: Some(number_format.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_drops_integral_decimals() {
        assert_eq!(CellValue::Number(6.0).display_value(), "6");
        assert_eq!(CellValue::Number(2.5).display_value(), "2.5");
        assert_eq!(CellValue::Boolean(true).display_value(), "TRUE");
        assert_eq!(CellValue::Empty.display_value(), "");
    }

    #[test]
    fn key_text_trims_text_only() {
        assert_eq!(CellValue::text("  A-01 ").key_text(), "A-01");
        assert_eq!(CellValue::Number(0.0).key_text(), "0");
    }

    #[test]
    fn to_number_coerces_blank_and_garbage_to_zero() {
        assert_eq!(CellValue::text(" 12.5 ").to_number(), 12.5);
        assert_eq!(CellValue::text("").to_number(), 0.0);
        assert_eq!(CellValue::text("abc").to_number(), 0.0);
        assert_eq!(CellValue::Empty.to_number(), 0.0);
        assert_eq!(CellValue::Boolean(true).to_number(), 1.0);
    }

    #[test]
    fn cell_value_serializes() {
        let json = serde_json::to_string(&CellValue::Number(1.5)).unwrap();
        let back: CellValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CellValue::Number(1.5));
    }
}
