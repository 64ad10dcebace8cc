//! FILENAME: merge-engine/src/layout.rs
//! PURPOSE: Output Layout Planner - places each group's header block and table.
//! CONTEXT: One ordered pass over the groups. Each group takes the template's
//! row count for its header block, then a data block of one header row plus
//! one row per member, then the inter-table gap. Every operation's start row
//! is final before anything is written.
//!
//! Rows here are 1-based sheet rows; `data_origin()` and friends convert to
//! the 0-based coordinates the store works in.

use engine::{CellCoord, CellRange, CellValue};

use crate::group::Group;
use crate::logging::{log_debug, CAT_LAYOUT};
use crate::naming::TableNameAllocator;

/// First sheet row used by the layout.
pub const FIRST_ROW: u32 = 1;

/// A planned write for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOperation {
    /// 1-based row of the first header-block row.
    pub start_row: u32,
    pub table_name: String,
    /// Rows taken by the rendered template.
    pub header_row_span: u32,
    /// Rows taken by the table: its header row plus one per member.
    pub data_row_span: u32,
    /// Index of the group in partitioner order.
    pub group_index: usize,
    /// Member rows projected onto the output columns.
    pub rows: Vec<Vec<CellValue>>,
}

impl LayoutOperation {
    /// 1-based row of the table's header row.
    pub fn data_start_row(&self) -> u32 {
        self.start_row + self.header_row_span
    }

    /// 1-based row of the table's last row.
    pub fn end_row(&self) -> u32 {
        self.data_start_row() + self.data_row_span - 1
    }

    pub fn total_row_span(&self) -> u32 {
        self.header_row_span + self.data_row_span
    }

    /// 0-based origin of the header block.
    pub fn header_origin(&self) -> CellCoord {
        (self.start_row - 1, 0)
    }

    /// 0-based origin of the table.
    pub fn data_origin(&self) -> CellCoord {
        (self.data_start_row() - 1, 0)
    }

    /// 0-based range of the table, header row included.
    pub fn table_range(&self, column_count: u32) -> CellRange {
        CellRange::from_origin(self.data_origin(), self.data_row_span, column_count)
    }
}

/// Plans every group in order. Names come from `names`, which already knows
/// the workbook's existing tables.
pub fn plan_layout(
    groups: &[Group],
    output_columns: &[String],
    template_row_count: u32,
    gap: u32,
    names: &mut TableNameAllocator,
) -> Vec<LayoutOperation> {
    let mut cursor = FIRST_ROW;
    let mut operations = Vec::with_capacity(groups.len());

    for (group_index, group) in groups.iter().enumerate() {
        let rows: Vec<Vec<CellValue>> = group
            .rows
            .iter()
            .map(|r| r.project(output_columns))
            .collect();

        let op = LayoutOperation {
            start_row: cursor,
            table_name: names.allocate(),
            header_row_span: template_row_count,
            data_row_span: rows.len() as u32 + 1,
            group_index,
            rows,
        };
        log_debug!(
            CAT_LAYOUT,
            "{} at row {}: header {} row(s), data {} row(s)",
            op.table_name,
            op.start_row,
            op.header_row_span,
            op.data_row_span
        );

        cursor = op.end_row() + 1 + gap;
        operations.push(op);
    }

    operations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{partition, Group};
    use engine::{Row, Schema};
    use std::sync::Arc;

    fn groups_of_sizes(sizes: &[usize]) -> Vec<Group> {
        let schema = Arc::new(Schema::new(["G", "V"]));
        let mut rows = Vec::new();
        for (g, size) in sizes.iter().enumerate() {
            for v in 0..*size {
                let mut row = Row::new(schema.clone());
                row.set("G", CellValue::Number(g as f64));
                row.set("V", CellValue::Number(v as f64));
                rows.push(row);
            }
        }
        partition(rows, &["G".to_string()])
    }

    #[test]
    fn second_group_starts_after_header_data_and_gap() {
        let groups = groups_of_sizes(&[5, 2]);
        let mut names = TableNameAllocator::new("Table_", Vec::<String>::new());
        let ops = plan_layout(&groups, &["V".to_string()], 2, 3, &mut names);

        assert_eq!(ops[0].start_row, 1);
        assert_eq!(ops[0].data_start_row(), 3);
        assert_eq!(ops[0].end_row(), 8);
        assert_eq!(ops[1].start_row, 12);
        assert_eq!(ops[1].table_name, "Table_2");
    }

    #[test]
    fn operations_never_overlap() {
        let groups = groups_of_sizes(&[1, 4, 1, 7]);
        let mut names = TableNameAllocator::new("T", ["t2"]);
        let ops = plan_layout(&groups, &["G".to_string(), "V".to_string()], 3, 3, &mut names);

        for pair in ops.windows(2) {
            assert!(pair[1].start_row >= pair[0].start_row + pair[0].total_row_span() + 3);
        }
        let names: Vec<&str> = ops.iter().map(|o| o.table_name.as_str()).collect();
        assert_eq!(names, vec!["T1", "T3", "T4", "T5"]);
    }

    #[test]
    fn rows_are_projected_in_output_order() {
        let groups = groups_of_sizes(&[2]);
        let mut names = TableNameAllocator::new("T", Vec::<String>::new());
        let ops = plan_layout(&groups, &["V".to_string(), "Missing".to_string()], 1, 3, &mut names);

        assert_eq!(ops[0].rows[1], vec![CellValue::Number(1.0), CellValue::Empty]);
        assert_eq!(ops[0].table_range(2), CellRange::new((1, 0), (3, 1)));
    }
}
