//! FILENAME: engine/src/grid.rs
//! PURPOSE: Manages the collection of cells of one sheet.
//! CONTEXT: This file defines the `Grid` struct which acts as the container
//! for all cell data of a sheet in the in-memory workbook. It uses a sparse
//! storage strategy (HashMap) since output sheets are mostly empty between
//! the emitted tables.

use std::collections::HashMap;

use crate::cell::{Cell, CellValue};
use crate::coord::{CellCoord, CellRange};

/// The Grid struct holds the state of one sheet's data.
/// Row and Col are 0-based indices.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    /// Sparse storage: keys are (row, col), values are Cell instances.
    pub cells: HashMap<CellCoord, Cell>,

    /// Tracks the highest row index currently in use.
    pub max_row: u32,

    /// Tracks the highest column index currently in use.
    pub max_col: u32,
}

impl Grid {
    pub fn new() -> Self {
        Grid::default()
    }

    /// Sets a cell at the specified coordinates.
    /// Updates max_row/max_col boundaries automatically.
    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) {
        if row > self.max_row {
            self.max_row = row;
        }
        if col > self.max_col {
            self.max_col = col;
        }
        self.cells.insert((row, col), cell);
    }

    /// Sets only the value, keeping an existing number format.
    pub fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        match self.cells.get_mut(&(row, col)) {
            Some(cell) => cell.value = value,
            None => self.set_cell(row, col, Cell::new(value)),
        }
    }

    /// Sets only the number format, keeping an existing value.
    pub fn set_number_format(&mut self, row: u32, col: u32, format: &str) {
        match self.cells.get_mut(&(row, col)) {
            Some(cell) => cell.number_format = Some(format.to_string()),
            None => self.set_cell(row, col, Cell::with_format(CellValue::Empty, format)),
        }
    }

    /// Retrieves a reference to a cell at the specified coordinates.
    /// Returns None if the cell is empty (not stored).
    pub fn get_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// The value at a coordinate, Empty when nothing is stored.
    pub fn value_at(&self, row: u32, col: u32) -> CellValue {
        self.get_cell(row, col)
            .map(|c| c.value.clone())
            .unwrap_or(CellValue::Empty)
    }

    /// Writes a 2-D block of values with its top-left corner at `origin`.
    pub fn write_block(&mut self, origin: CellCoord, values: &[Vec<CellValue>]) {
        for (r, row) in values.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let (row_idx, col_idx) = (origin.0 + r as u32, origin.1 + c as u32);
                if value.is_empty() && self.get_cell(row_idx, col_idx).is_none() {
                    continue;
                }
                self.set_value(row_idx, col_idx, value.clone());
            }
        }
    }

    /// Reads a rectangular block. Missing cells read as Empty.
    pub fn read_block(&self, range: &CellRange) -> Vec<Vec<CellValue>> {
        (range.start.0..=range.end.0)
            .map(|row| {
                (range.start.1..=range.end.1)
                    .map(|col| self.value_at(row, col))
                    .collect()
            })
            .collect()
    }

    /// Removes every cell.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.max_row = 0;
        self.max_col = 0;
    }

    /// Removes every cell in `range`. Bounds are recalculated once, and only
    /// when the range reaches max_row or max_col.
    pub fn clear_range(&mut self, range: &CellRange) {
        for row in range.start.0..=range.end.0 {
            for col in range.start.1..=range.end.1 {
                self.cells.remove(&(row, col));
            }
        }
        if range.end.0 >= self.max_row || range.end.1 >= self.max_col {
            self.recalculate_bounds();
        }
    }

    /// Recalculates max_row and max_col by scanning all cells.
    pub fn recalculate_bounds(&mut self) {
        self.max_row = self.cells.keys().map(|&(r, _)| r).max().unwrap_or(0);
        self.max_col = self.cells.keys().map(|&(_, c)| c).max().unwrap_or(0);
    }

    /// The smallest range covering every non-empty cell, None for an empty grid.
    pub fn used_range(&self) -> Option<CellRange> {
        let mut occupied = self
            .cells
            .iter()
            .filter(|(_, cell)| !cell.value.is_empty())
            .map(|(&coord, _)| coord);
        let first = occupied.next()?;
        let (mut min, mut max) = (first, first);
        for (row, col) in occupied {
            min = (min.0.min(row), min.1.min(col));
            max = (max.0.max(row), max.1.max(col));
        }
        Some(CellRange::new(min, max))
    }

    /// Longest display text per column, used for autofit.
    pub fn column_text_widths(&self) -> HashMap<u32, usize> {
        let mut widths: HashMap<u32, usize> = HashMap::new();
        for (&(_, col), cell) in &self.cells {
            let len = cell.value.display_value().chars().count();
            let entry = widths.entry(col).or_insert(0);
            if len > *entry {
                *entry = len;
            }
        }
        widths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_block() {
        let mut grid = Grid::new();
        grid.write_block(
            (2, 1),
            &[
                vec![CellValue::text("ID"), CellValue::text("Name")],
                vec![CellValue::Number(1.0), CellValue::text("Alice")],
            ],
        );

        assert_eq!(grid.max_row, 3);
        assert_eq!(grid.max_col, 2);
        let block = grid.read_block(&CellRange::new((2, 1), (3, 3)));
        assert_eq!(block[1][1], CellValue::text("Alice"));
        assert_eq!(block[1][2], CellValue::Empty);
    }

    #[test]
    fn test_format_survives_value_write() {
        let mut grid = Grid::new();
        grid.set_number_format(0, 0, "0.00");
        grid.set_value(0, 0, CellValue::Number(3.0));
        let cell = grid.get_cell(0, 0).unwrap();
        assert_eq!(cell.number_format.as_deref(), Some("0.00"));
        assert_eq!(cell.value, CellValue::Number(3.0));
    }

    #[test]
    fn test_used_range_ignores_format_only_cells() {
        let mut grid = Grid::new();
        assert!(grid.used_range().is_none());
        grid.set_number_format(9, 9, "0%");
        grid.set_value(1, 1, CellValue::text("x"));
        grid.set_value(3, 2, CellValue::Number(1.0));
        assert_eq!(grid.used_range(), Some(CellRange::new((1, 1), (3, 2))));
    }

    #[test]
    fn test_clear_range_recalculates_bounds() {
        let mut grid = Grid::new();
        grid.set_value(0, 0, CellValue::text("a"));
        grid.set_value(5, 4, CellValue::text("b"));
        grid.clear_range(&CellRange::new((5, 4), (5, 4)));
        assert_eq!((grid.max_row, grid.max_col), (0, 0));
    }

    #[test]
    fn test_clear_range_keeps_cells_outside() {
        let mut grid = Grid::new();
        grid.write_block(
            (1, 1),
            &[
                vec![CellValue::text("ID"), CellValue::text("Name")],
                vec![CellValue::Number(1.0), CellValue::text("Alice")],
            ],
        );
        grid.set_value(0, 0, CellValue::text("Title"));
        grid.set_value(1, 5, CellValue::text("Note"));

        grid.clear_range(&CellRange::new((1, 1), (2, 2)));
        assert_eq!(grid.value_at(2, 2), CellValue::Empty);
        assert_eq!(grid.value_at(0, 0), CellValue::text("Title"));
        assert_eq!((grid.max_row, grid.max_col), (1, 5));
        assert_eq!(grid.cells.len(), 2);
    }
}
