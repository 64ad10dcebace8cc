//! FILENAME: engine/src/coord.rs
//! PURPOSE: Converts between A1-style addresses and 0-based (row, col) indices.
//! CONTEXT: Template locations, named regions and table extents arrive as A1
//! addresses ("A1:C3", "Sheet1!$A$1:$C$2", "'My Sheet'!B4"). Internally every
//! grid and store call works on 0-based coordinates.
//! Column "A" = 0, "B" = 1, ..., "Z" = 25, "AA" = 26, etc.
//! Row 1 in A1 notation = row 0 internally.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A cell coordinate as (row, col) with 0-based indices.
pub type CellCoord = (u32, u32);

/// Optional sheet prefix, then one cell or a start:end pair. `$` markers are accepted and ignored.
static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:'((?:[^']|'')+)'|([^'!]+))!)?\$?([A-Za-z]{1,3})\$?(\d+)(?::\$?([A-Za-z]{1,3})\$?(\d+))?$",
    )
    .expect("range pattern is valid")
});

/// Converts a column string (e.g., "A", "AA", "ABC") to a 0-based column index.
/// Returns None for an empty string or non-alphabetic characters.
pub fn col_to_index(col_str: &str) -> Option<u32> {
    if col_str.is_empty() {
        return None;
    }
    let mut result: u32 = 0;
    for c in col_str.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        result = result.checked_mul(26)?.checked_add(digit)?;
    }
    Some(result - 1)
}

/// Converts a 0-based column index to a column string.
/// 0 -> "A", 25 -> "Z", 26 -> "AA".
pub fn index_to_col(mut col_index: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = col_index % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col_index < 26 {
            break;
        }
        col_index = col_index / 26 - 1;
    }
    result
}

/// Converts a 0-based (row, col) coordinate to an A1-style reference string.
pub fn coord_to_a1(coord: CellCoord) -> String {
    let (row, col) = coord;
    format!("{}{}", index_to_col(col), row + 1)
}

/// A rectangular block of cells, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    pub start: CellCoord,
    pub end: CellCoord,
}

impl CellRange {
    /// Builds a range from two corners in any order.
    pub fn new(a: CellCoord, b: CellCoord) -> Self {
        CellRange {
            start: (a.0.min(b.0), a.1.min(b.1)),
            end: (a.0.max(b.0), a.1.max(b.1)),
        }
    }

    /// A range of `rows` x `cols` cells anchored at `origin`. Both counts must be >= 1.
    pub fn from_origin(origin: CellCoord, rows: u32, cols: u32) -> Self {
        CellRange {
            start: origin,
            end: (
                origin.0 + rows.max(1) - 1,
                origin.1 + cols.max(1) - 1,
            ),
        }
    }

    pub fn row_count(&self) -> u32 {
        self.end.0 - self.start.0 + 1
    }

    pub fn col_count(&self) -> u32 {
        self.end.1 - self.start.1 + 1
    }

    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.start.0 <= other.end.0
            && other.start.0 <= self.end.0
            && self.start.1 <= other.end.1
            && other.start.1 <= self.end.1
    }

    /// "A1:C3", or "B4" for a single cell.
    pub fn to_a1(&self) -> String {
        if self.start == self.end {
            coord_to_a1(self.start)
        } else {
            format!("{}:{}", coord_to_a1(self.start), coord_to_a1(self.end))
        }
    }
}

impl std::fmt::Display for CellRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

/// A range address with its optional sheet qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeAddress {
    pub sheet: Option<String>,
    pub range: CellRange,
}

/// Parses "A1:C3", "$A$1:$C$2", "B4", "Sheet1!A1:B2" or "'My Sheet'!A1:B2".
/// A leading '=' (as stored in defined names) is ignored.
pub fn parse_range(address: &str) -> Option<RangeAddress> {
    let address = address.trim();
    let address = address.strip_prefix('=').unwrap_or(address);
    let caps = RANGE_RE.captures(address)?;

    let sheet = caps
        .get(1)
        .map(|m| m.as_str().replace("''", "'"))
        .or_else(|| caps.get(2).map(|m| m.as_str().to_string()));

    let start = parse_corner(caps.get(3)?.as_str(), caps.get(4)?.as_str())?;
    let end = match (caps.get(5), caps.get(6)) {
        (Some(col), Some(row)) => parse_corner(col.as_str(), row.as_str())?,
        _ => start,
    };

    Some(RangeAddress {
        sheet,
        range: CellRange::new(start, end),
    })
}

fn parse_corner(col: &str, row: &str) -> Option<CellCoord> {
    let col = col_to_index(col)?;
    let row: u32 = row.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col))
}
