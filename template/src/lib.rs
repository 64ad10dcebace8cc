//! FILENAME: template/src/lib.rs
//! PURPOSE: Library root for the header-template language.
//! CONTEXT: Template cells are plain strings with embedded `{...}` tokens. This
//! crate parses them and renders a template block once per output group.
//!
//! PIPELINE: Cell String --> Lexer --> Tokens --> Parser --> Segments --> Evaluator
//!
//! SUPPORTED TOKENS:
//! - Group metadata: {tableName}, {rowCount}, {uniqueJoinValues}
//! - Aggregates over output columns: {sum:Amount}, {avg:Amount}
//! - Row lookups: {Name:0}
//! - Unknown tokens are left in place, as written

pub mod ast;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod token;

#[cfg(test)]
mod tests;

pub use ast::{AggregateFunction, Expression, Segment};
pub use evaluator::{
    collect_aggregate_columns, compute_values, evaluate_template, render_block, render_cell,
    AggregateColumns, ComputedValues, GroupContext, GroupResolver, TemplateValues, TokenResolver,
};
pub use lexer::Lexer;
pub use parser::{parse_cell, parse_token, ParseError, ParseResult, Parser};
pub use token::Token;
