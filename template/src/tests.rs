//! FILENAME: template/src/tests.rs
//! PURPOSE: Consolidated unit tests for the template crate.

use engine::{CellValue, Row, Schema};
use std::sync::Arc;

use crate::ast::{AggregateFunction, Expression, Segment};
use crate::evaluator::{
    index_out_of_range, render_cell, ComputedValues, GroupResolver, TokenResolver,
};
use crate::lexer::Lexer;
use crate::parser::{parse_cell, parse_token};
use crate::token::Token;

// ========================================
// LEXER TESTS
// ========================================

#[test]
fn lexer_splits_text_and_token_body() {
    let mut lexer = Lexer::new("Total: {sum:Amount}!");
    assert_eq!(lexer.next_token(), Token::Text("Total: ".to_string()));
    assert_eq!(lexer.next_token(), Token::LBrace);
    assert_eq!(lexer.next_token(), Token::Word("sum".to_string()));
    assert_eq!(lexer.next_token(), Token::Colon);
    assert_eq!(lexer.next_token(), Token::Word("Amount".to_string()));
    assert_eq!(lexer.next_token(), Token::RBrace);
    assert_eq!(lexer.next_token(), Token::Text("!".to_string()));
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_keeps_colons_and_closing_braces_in_plain_text() {
    let mut lexer = Lexer::new("a:b} c");
    assert_eq!(lexer.next_token(), Token::Text("a:b} c".to_string()));
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_keeps_spaces_inside_identifiers() {
    let mut lexer = Lexer::new("{Unit Price:2}");
    assert_eq!(lexer.next_token(), Token::LBrace);
    assert_eq!(lexer.next_token(), Token::Word("Unit Price".to_string()));
    assert_eq!(lexer.next_token(), Token::Colon);
    assert_eq!(lexer.next_token(), Token::Word("2".to_string()));
    assert_eq!(lexer.next_token(), Token::RBrace);
}

// ========================================
// PARSER TESTS
// ========================================

#[test]
fn parser_classifies_token_kinds() {
    assert_eq!(
        parse_token("{tableName}").unwrap(),
        Expression::Name("tableName".to_string())
    );
    assert_eq!(
        parse_token("{sum:Amount}").unwrap(),
        Expression::Aggregate {
            func: AggregateFunction::Sum,
            column: "Amount".to_string()
        }
    );
    assert_eq!(
        parse_token("{avg:Amount}").unwrap(),
        Expression::Aggregate {
            func: AggregateFunction::Average,
            column: "Amount".to_string()
        }
    );
    assert_eq!(
        parse_token("{Name:3}").unwrap(),
        Expression::Indexed {
            column: "Name".to_string(),
            index: 3
        }
    );
    assert_eq!(
        parse_token("{Region:North}").unwrap(),
        Expression::Qualified {
            head: "Region".to_string(),
            tail: "North".to_string()
        }
    );
}

#[test]
fn parser_treats_integer_tail_as_index_even_for_aggregate_prefix() {
    assert_eq!(
        parse_token("{sum:0}").unwrap(),
        Expression::Indexed {
            column: "sum".to_string(),
            index: 0
        }
    );
}

#[test]
fn parser_treats_oversized_digit_tail_as_index() {
    assert_eq!(
        parse_token("{Name:99999999999999999999}").unwrap(),
        Expression::Indexed {
            column: "Name".to_string(),
            index: i64::MAX
        }
    );
    assert_eq!(
        parse_token("{Name:-99999999999999999999}").unwrap(),
        Expression::Indexed {
            column: "Name".to_string(),
            index: i64::MIN
        }
    );
    assert!(matches!(
        parse_token("{Name:12a}").unwrap(),
        Expression::Qualified { .. }
    ));
}

#[test]
fn parser_rejects_malformed_single_tokens() {
    assert!(parse_token("{}").is_err());
    assert!(parse_token("{a:b:c}").is_err());
    assert!(parse_token("{open").is_err());
    assert!(parse_token("{a} trailing").is_err());
    assert!(parse_token("plain").is_err());
}

#[test]
fn parser_keeps_malformed_tokens_as_literals() {
    let segments = parse_cell("x {} y {a:b:c} z {open");
    assert_eq!(
        segments,
        vec![Segment::Literal("x {} y {a:b:c} z {open".to_string())]
    );
}

#[test]
fn parser_records_token_source() {
    let segments = parse_cell("Rows: {rowCount} of {tableName}");
    assert_eq!(segments.len(), 4);
    assert_eq!(segments[0], Segment::Literal("Rows: ".to_string()));
    match &segments[1] {
        Segment::Expr { expr, source } => {
            assert_eq!(expr, &Expression::Name("rowCount".to_string()));
            assert_eq!(source, "{rowCount}");
        }
        other => panic!("Expected an expression segment, got {:?}", other),
    }
    assert_eq!(segments[2], Segment::Literal(" of ".to_string()));
}

#[test]
fn parser_restarts_on_nested_open_brace() {
    let segments = parse_cell("{a{rowCount}");
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0], Segment::Literal("{a".to_string()));
    assert_eq!(
        segments[1].expression(),
        Some(&Expression::Name("rowCount".to_string()))
    );
}

#[test]
fn expression_display_round_trips_source() {
    let expr = parse_token("{avg:Unit Price}").unwrap();
    assert_eq!(expr.to_string(), "{avg:Unit Price}");
    assert_eq!(expr.key(), "avg:Unit Price");
}

// ========================================
// RENDER TESTS
// ========================================

struct FixedResolver;

impl TokenResolver for FixedResolver {
    fn resolve(&self, expr: &Expression) -> Option<CellValue> {
        match expr.key().as_str() {
            "tableName" => Some(CellValue::text("Table_1")),
            "sum:Amount" => Some(CellValue::Number(1234.5)),
            _ => None,
        }
    }
}

#[test]
fn render_single_token_keeps_typed_value() {
    let rendered = render_cell(&CellValue::text("{sum:Amount}"), &FixedResolver);
    assert_eq!(rendered, CellValue::Number(1234.5));
}

#[test]
fn render_mixed_cell_is_text() {
    let rendered = render_cell(
        &CellValue::text("{tableName}: {sum:Amount} {missing}"),
        &FixedResolver,
    );
    assert_eq!(rendered, CellValue::text("Table_1: 1234.5 {missing}"));
}

#[test]
fn render_unresolved_single_token_is_unchanged() {
    let rendered = render_cell(&CellValue::text("{missing}"), &FixedResolver);
    assert_eq!(rendered, CellValue::text("{missing}"));
}

#[test]
fn render_passes_through_plain_and_non_text_cells() {
    assert_eq!(
        render_cell(&CellValue::text("Header"), &FixedResolver),
        CellValue::text("Header")
    );
    assert_eq!(
        render_cell(&CellValue::Boolean(true), &FixedResolver),
        CellValue::Boolean(true)
    );
    assert_eq!(render_cell(&CellValue::Empty, &FixedResolver), CellValue::Empty);
}

#[test]
fn render_oversized_index_is_out_of_range() {
    let schema = Arc::new(Schema::new(["Name"]));
    let group: Vec<Row> = ["Alice", "Bob"]
        .iter()
        .map(|name| {
            let mut row = Row::new(schema.clone());
            row.set("Name", CellValue::text(*name));
            row
        })
        .collect();
    let resolver = GroupResolver::new(&group, ComputedValues::default());

    let rendered = render_cell(&CellValue::text("{Name:99999999999999999999}"), &resolver);
    assert_eq!(rendered, CellValue::Text(index_out_of_range(i64::MAX)));
}
