//! FILENAME: template/src/ast.rs
//! PURPOSE: Defines the parsed form of template cells.
//! CONTEXT: After the Lexer tokenizes a cell string, the Parser converts the
//! tokens into a list of segments: literal text and `{...}` expressions. The
//! evaluator then resolves each expression against a group.
//!
//! SUPPORTED EXPRESSIONS:
//! - Names: {tableName}, {rowCount}, {uniqueJoinValues}
//! - Aggregates: {sum:Amount}, {avg:Amount}
//! - Indexed lookups: {Name:0} (0-based row of the group)
//! - Any other {head:tail} pair, looked up verbatim

/// Aggregate functions available in template tokens.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum AggregateFunction {
    Sum,
    Average,
}

impl AggregateFunction {
    /// The token prefix, as written in templates.
    pub fn prefix(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Average => "avg",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Average),
            _ => None,
        }
    }
}

/// A parsed `{...}` token body.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// A single identifier: metadata such as {tableName}.
    Name(String),

    /// {sum:Column} or {avg:Column}.
    Aggregate {
        func: AggregateFunction,
        column: String,
    },

    /// {Column:Index} - the value of Column in the Index-th row of the group.
    Indexed { column: String, index: i64 },

    /// Any other two-part token.
    Qualified { head: String, tail: String },
}

impl Expression {
    /// Classifies a `{head:tail}` pair. An integer tail always means an indexed
    /// lookup, even when the head is an aggregate prefix.
    pub fn from_pair(head: String, tail: String) -> Self {
        if let Some(index) = parse_index(&tail) {
            return Expression::Indexed {
                column: head,
                index,
            };
        }
        match AggregateFunction::from_prefix(&head) {
            Some(func) => Expression::Aggregate { func, column: tail },
            None => Expression::Qualified { head, tail },
        }
    }

    /// The key this expression is stored under in a computed-values map,
    /// e.g. "sum:Amount" or "tableName".
    pub fn key(&self) -> String {
        match self {
            Expression::Name(name) => name.clone(),
            Expression::Aggregate { func, column } => format!("{}:{}", func.prefix(), column),
            Expression::Indexed { column, index } => format!("{}:{}", column, index),
            Expression::Qualified { head, tail } => format!("{}:{}", head, tail),
        }
    }
}

/// A signed run of digits. Values beyond i64 saturate, so they still read
/// as an index that no group can reach.
fn parse_index(tail: &str) -> Option<i64> {
    let tail = tail.trim();
    let (negative, digits) = match tail.as_bytes().first() {
        Some(b'-') => (true, &tail[1..]),
        Some(b'+') => (false, &tail[1..]),
        _ => (false, tail),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match tail.parse::<i64>() {
        Ok(index) => Some(index),
        Err(_) if negative => Some(i64::MIN),
        Err(_) => Some(i64::MAX),
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.key())
    }
}

/// One piece of a template cell.
#[derive(Debug, PartialEq, Clone)]
pub enum Segment {
    Literal(String),
    /// A well-formed token; `source` is the original `{...}` text.
    Expr { expr: Expression, source: String },
}

impl Segment {
    pub fn expression(&self) -> Option<&Expression> {
        match self {
            Segment::Expr { expr, .. } => Some(expr),
            Segment::Literal(_) => None,
        }
    }
}
