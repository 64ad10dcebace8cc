//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the sheet data model.
//! CONTEXT: Re-exports the cell, coordinate, grid and table types used by the
//! template language, the merge pipeline and the data stores.

pub mod cell;
pub mod coord;
pub mod grid;
pub mod table;

// Re-export commonly used types at the crate root
pub use cell::{Cell, CellValue};
pub use coord::{
    col_to_index, coord_to_a1, index_to_col, parse_range, CellCoord, CellRange, RangeAddress,
};
pub use grid::Grid;
pub use table::{Row, Schema, Table};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn it_writes_a_table_block_into_a_grid() {
        let table = Table::new(
            "People",
            vec!["ID".to_string(), "Name".to_string()],
            vec![vec![CellValue::Number(1.0), CellValue::text("Alice")]],
        );

        let mut block = vec![table
            .headers
            .iter()
            .map(|h| CellValue::text(h.as_str()))
            .collect::<Vec<_>>()];
        block.extend(table.rows.iter().cloned());

        let mut grid = Grid::new();
        let origin = parse_range("B2").unwrap().range.start;
        grid.write_block(origin, &block);

        assert_eq!(grid.value_at(2, 2), CellValue::text("Alice"));
        assert_eq!(grid.used_range().unwrap().to_a1(), "B2:C3");
    }

    #[test]
    fn it_projects_merged_rows_in_output_order() {
        let schema = Arc::new(Schema::new(["ID", "Name", "Dept"]));
        let mut row = Row::new(schema);
        row.set("ID", CellValue::Number(7.0));
        row.set("Dept", CellValue::text("Ops"));

        let order = vec!["Dept".to_string(), "ID".to_string()];
        assert_eq!(
            row.project(&order),
            vec![CellValue::text("Ops"), CellValue::Number(7.0)]
        );
    }
}
