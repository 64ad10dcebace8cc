//! FILENAME: template/src/evaluator.rs
//! PURPOSE: Resolves template tokens against one output group.
//! CONTEXT: The header block of every output table is the same template,
//! rendered once per group. Evaluation runs in two passes: the first collects
//! the columns referenced by {sum:..}/{avg:..} tokens and computes those
//! aggregates plus the group metadata; the second rewrites every cell,
//! substituting whatever resolves and leaving the rest as written.

use std::collections::{HashMap, HashSet};

use engine::{CellValue, Row};

use crate::ast::{AggregateFunction, Expression, Segment};
use crate::parser::parse_cell;

/// A rectangular block of template cells.
pub type TemplateValues = Vec<Vec<CellValue>>;

// ============================================================================
// METADATA KEYS AND PLACEHOLDERS
// ============================================================================

pub const KEY_TABLE_NAME: &str = "tableName";
pub const KEY_ROW_COUNT: &str = "rowCount";
pub const KEY_UNIQUE_JOIN_VALUES: &str = "uniqueJoinValues";

/// Marker for metadata that cannot be computed for this run.
pub const NOT_APPLICABLE: &str = "N/A";

pub fn missing_output_column(column: &str) -> String {
    format!("N/A (column \"{}\" not found in output)", column)
}

pub fn index_out_of_range(index: i64) -> String {
    format!("N/A (index {} out of range)", index)
}

pub fn missing_column(column: &str) -> String {
    format!("N/A (column \"{}\" not found)", column)
}

// ============================================================================
// GROUP CONTEXT
// ============================================================================

/// Everything the evaluator needs to know about one output group.
#[derive(Debug, Clone, Copy)]
pub struct GroupContext<'a> {
    /// The name assigned to the group's output table.
    pub table_name: &'a str,
    /// The group's merged rows, in source order.
    pub rows: &'a [Row],
    /// The output column order of the data table.
    pub output_headers: &'a [String],
    /// `rows` projected onto `output_headers`.
    pub projected: &'a [Vec<CellValue>],
    /// The primary join column, if one is configured.
    pub join_column: Option<&'a str>,
}

impl GroupContext<'_> {
    /// Distinct trimmed join values across the group, None when unavailable.
    pub fn unique_join_values(&self) -> Option<usize> {
        let column = self.join_column?;
        let first = self.rows.first()?;
        if !first.schema().contains(column) {
            return None;
        }
        let distinct: HashSet<String> = self.rows.iter().map(|r| r.key_text(column)).collect();
        Some(distinct.len())
    }
}

// ============================================================================
// COMPUTED VALUES
// ============================================================================

/// Columns referenced by aggregate tokens, de-duplicated, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateColumns {
    pub sum: Vec<String>,
    pub avg: Vec<String>,
}

impl AggregateColumns {
    fn add(&mut self, func: AggregateFunction, column: &str) {
        let list = match func {
            AggregateFunction::Sum => &mut self.sum,
            AggregateFunction::Average => &mut self.avg,
        };
        if !list.iter().any(|c| c == column) {
            list.push(column.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sum.is_empty() && self.avg.is_empty()
    }
}

/// Pass 1: scans every text cell for aggregate tokens.
pub fn collect_aggregate_columns(block: &[Vec<CellValue>]) -> AggregateColumns {
    let mut columns = AggregateColumns::default();
    for value in block.iter().flatten() {
        let CellValue::Text(text) = value else {
            continue;
        };
        for segment in parse_cell(text) {
            if let Some(Expression::Aggregate { func, column }) = segment.expression() {
                columns.add(*func, column);
            }
        }
    }
    columns
}

/// Per-group map from expression key (e.g. "sum:Amount", "tableName") to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedValues {
    values: HashMap<String, CellValue>,
}

impl ComputedValues {
    pub fn insert(&mut self, key: impl Into<String>, value: CellValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Computes the aggregates referenced by the template plus the group metadata.
pub fn compute_values(columns: &AggregateColumns, ctx: &GroupContext<'_>) -> ComputedValues {
    let mut computed = ComputedValues::default();

    for column in &columns.sum {
        let value = match column_numbers(ctx, column) {
            Some(numbers) => CellValue::Number(numbers.iter().sum()),
            None => CellValue::Text(missing_output_column(column)),
        };
        computed.insert(format!("{}:{}", AggregateFunction::Sum.prefix(), column), value);
    }

    for column in &columns.avg {
        let value = match column_numbers(ctx, column) {
            Some(numbers) if numbers.is_empty() => CellValue::Number(0.0),
            Some(numbers) => {
                CellValue::Number(numbers.iter().sum::<f64>() / numbers.len() as f64)
            }
            None => CellValue::Text(missing_output_column(column)),
        };
        computed.insert(format!("{}:{}", AggregateFunction::Average.prefix(), column), value);
    }

    computed.insert(KEY_TABLE_NAME, CellValue::text(ctx.table_name));
    computed.insert(KEY_ROW_COUNT, CellValue::Number(ctx.rows.len() as f64));
    computed.insert(
        KEY_UNIQUE_JOIN_VALUES,
        match ctx.unique_join_values() {
            Some(n) => CellValue::Number(n as f64),
            None => CellValue::text(NOT_APPLICABLE),
        },
    );

    computed
}

/// Numeric values of an output column across the projected rows.
/// None when the column is not part of the output.
fn column_numbers(ctx: &GroupContext<'_>, column: &str) -> Option<Vec<f64>> {
    let idx = ctx.output_headers.iter().position(|h| h == column)?;
    Some(
        ctx.projected
            .iter()
            .map(|row| row.get(idx).map(CellValue::to_number).unwrap_or(0.0))
            .collect(),
    )
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Resolves one parsed token. None leaves the token text unchanged.
pub trait TokenResolver {
    fn resolve(&self, expr: &Expression) -> Option<CellValue>;
}

/// The resolver used for output groups: indexed lookups read the group's
/// rows, everything else comes from the computed values.
pub struct GroupResolver<'a> {
    rows: &'a [Row],
    computed: ComputedValues,
}

impl<'a> GroupResolver<'a> {
    pub fn new(rows: &'a [Row], computed: ComputedValues) -> Self {
        GroupResolver { rows, computed }
    }

    pub fn computed(&self) -> &ComputedValues {
        &self.computed
    }
}

impl TokenResolver for GroupResolver<'_> {
    fn resolve(&self, expr: &Expression) -> Option<CellValue> {
        match expr {
            Expression::Indexed { column, index } => {
                let row = usize::try_from(*index)
                    .ok()
                    .and_then(|i| self.rows.get(i));
                let value = match row {
                    None => CellValue::Text(index_out_of_range(*index)),
                    Some(row) => match row.get(column) {
                        Some(value) => value.clone(),
                        None => CellValue::Text(missing_column(column)),
                    },
                };
                Some(value)
            }
            other => self.computed.get(&other.key()).cloned(),
        }
    }
}

/// Pass 2 for a single cell. Non-text cells pass through unmodified. A cell
/// that is exactly one resolvable token takes the resolved value as is, so
/// numeric aggregates stay numeric; mixed cells are rendered as text.
pub fn render_cell(value: &CellValue, resolver: &dyn TokenResolver) -> CellValue {
    let CellValue::Text(text) = value else {
        return value.clone();
    };

    let segments = parse_cell(text);
    if !segments.iter().any(|s| s.expression().is_some()) {
        return value.clone();
    }

    if let [Segment::Expr { expr, .. }] = segments.as_slice() {
        if let Some(resolved) = resolver.resolve(expr) {
            return resolved;
        }
    }

    let mut out = String::with_capacity(text.len());
    for segment in &segments {
        match segment {
            Segment::Literal(s) => out.push_str(s),
            Segment::Expr { expr, source } => match resolver.resolve(expr) {
                Some(resolved) => out.push_str(&resolved.display_value()),
                None => out.push_str(source),
            },
        }
    }
    CellValue::Text(out)
}

/// Pass 2 over a whole block. The output has the same shape as the input.
pub fn render_block(block: &[Vec<CellValue>], resolver: &dyn TokenResolver) -> TemplateValues {
    block
        .iter()
        .map(|row| row.iter().map(|cell| render_cell(cell, resolver)).collect())
        .collect()
}

/// Both passes for one group.
pub fn evaluate_template(block: &[Vec<CellValue>], ctx: &GroupContext<'_>) -> TemplateValues {
    let columns = collect_aggregate_columns(block);
    let computed = compute_values(&columns, ctx);
    let resolver = GroupResolver::new(ctx.rows, computed);
    render_block(block, &resolver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::Schema;
    use std::sync::Arc;

    fn rows(schema: &[&str], data: &[&[CellValue]]) -> Vec<Row> {
        let schema = Arc::new(Schema::new(schema.iter().copied()));
        data.iter()
            .map(|values| {
                let mut row = Row::new(schema.clone());
                for (name, value) in schema.names().iter().zip(values.iter()) {
                    row.set(name, value.clone());
                }
                row
            })
            .collect()
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sum_and_avg_over_projected_rows() {
        let group = rows(
            &["ID", "Amount"],
            &[
                &[CellValue::text("a"), CellValue::Number(1.0)],
                &[CellValue::text("b"), CellValue::text("2")],
                &[CellValue::text("c"), CellValue::Number(3.0)],
            ],
        );
        let output = headers(&["ID", "Amount"]);
        let projected: Vec<Vec<CellValue>> = group.iter().map(|r| r.project(&output)).collect();
        let ctx = GroupContext {
            table_name: "Table_1",
            rows: &group,
            output_headers: &output,
            projected: &projected,
            join_column: Some("ID"),
        };

        let block = vec![vec![
            CellValue::text("{sum:Amount}"),
            CellValue::text("{avg:Amount}"),
            CellValue::text("Total: {sum:Amount} in {tableName}"),
        ]];
        let rendered = evaluate_template(&block, &ctx);

        assert_eq!(rendered[0][0], CellValue::Number(6.0));
        assert_eq!(rendered[0][1], CellValue::Number(2.0));
        assert_eq!(rendered[0][2], CellValue::text("Total: 6 in Table_1"));
    }

    #[test]
    fn aggregate_of_column_missing_from_output_is_a_placeholder() {
        let group = rows(&["ID", "Amount"], &[&[CellValue::text("a"), CellValue::Number(5.0)]]);
        let output = headers(&["ID"]);
        let projected: Vec<Vec<CellValue>> = group.iter().map(|r| r.project(&output)).collect();
        let ctx = GroupContext {
            table_name: "T",
            rows: &group,
            output_headers: &output,
            projected: &projected,
            join_column: None,
        };

        let rendered = evaluate_template(&[vec![CellValue::text("{sum:Amount}")]], &ctx);
        assert_eq!(rendered[0][0], CellValue::Text(missing_output_column("Amount")));
    }

    #[test]
    fn indexed_lookup_and_range_errors() {
        let group = rows(
            &["Name"],
            &[&[CellValue::text("Alice")], &[CellValue::text("Bob")]],
        );
        let output = headers(&["Name"]);
        let projected: Vec<Vec<CellValue>> = group.iter().map(|r| r.project(&output)).collect();
        let ctx = GroupContext {
            table_name: "T",
            rows: &group,
            output_headers: &output,
            projected: &projected,
            join_column: None,
        };

        let block = vec![vec![
            CellValue::text("{Name:0}"),
            CellValue::text("{Name:1}"),
            CellValue::text("{Name:5}"),
            CellValue::text("{Name:-1}"),
            CellValue::text("{City:0}"),
        ]];
        let rendered = evaluate_template(&block, &ctx);

        assert_eq!(rendered[0][0], CellValue::text("Alice"));
        assert_eq!(rendered[0][1], CellValue::text("Bob"));
        assert_eq!(rendered[0][2], CellValue::Text(index_out_of_range(5)));
        assert_eq!(rendered[0][3], CellValue::Text(index_out_of_range(-1)));
        assert_eq!(rendered[0][4], CellValue::Text(missing_column("City")));
    }

    #[test]
    fn unknown_tokens_and_non_text_cells_are_untouched() {
        let group = rows(&["ID"], &[&[CellValue::text("x")], &[CellValue::text(" x ")]]);
        let output = headers(&["ID"]);
        let projected: Vec<Vec<CellValue>> = group.iter().map(|r| r.project(&output)).collect();
        let ctx = GroupContext {
            table_name: "T",
            rows: &group,
            output_headers: &output,
            projected: &projected,
            join_column: Some("ID"),
        };

        let block = vec![vec![
            CellValue::text("{unknown} / {rowCount}"),
            CellValue::Number(42.0),
            CellValue::text("{uniqueJoinValues}"),
            CellValue::text("{open"),
        ]];
        let rendered = evaluate_template(&block, &ctx);

        assert_eq!(rendered[0][0], CellValue::text("{unknown} / 2"));
        assert_eq!(rendered[0][1], CellValue::Number(42.0));
        assert_eq!(rendered[0][2], CellValue::Number(1.0));
        assert_eq!(rendered[0][3], CellValue::text("{open"));
    }

    #[test]
    fn unique_join_values_unavailable_without_join_column() {
        let group = rows(&["ID"], &[&[CellValue::text("x")]]);
        let ctx = GroupContext {
            table_name: "T",
            rows: &group,
            output_headers: &[],
            projected: &[],
            join_column: Some("Missing"),
        };
        let rendered = evaluate_template(&[vec![CellValue::text("{uniqueJoinValues}")]], &ctx);
        assert_eq!(rendered[0][0], CellValue::text(NOT_APPLICABLE));
    }

    #[test]
    fn avg_of_empty_group_is_zero() {
        let output = headers(&["Amount"]);
        let ctx = GroupContext {
            table_name: "T",
            rows: &[],
            output_headers: &output,
            projected: &[],
            join_column: None,
        };
        let rendered = evaluate_template(&[vec![CellValue::text("{avg:Amount}")]], &ctx);
        assert_eq!(rendered[0][0], CellValue::Number(0.0));
    }

    #[test]
    fn collects_distinct_aggregate_columns() {
        let block = vec![
            vec![CellValue::text("{sum:A} {sum:A}"), CellValue::text("{avg:B}")],
            vec![CellValue::Number(1.0), CellValue::text("{sum:C}")],
        ];
        let columns = collect_aggregate_columns(&block);
        assert_eq!(columns.sum, headers(&["A", "C"]));
        assert_eq!(columns.avg, headers(&["B"]));
    }
}
