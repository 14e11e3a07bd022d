// SPDX-License-Identifier: MIT OR Apache-2.0

//! The typed AST produced by the parser (`spec.md` §2, §3, §4.2).
//!
//! Statements and SQL expressions are closed variant trees (tagged sums),
//! matched exhaustively by later passes rather than modeled as a class
//! hierarchy — the shape `spec.md` §9 prescribes. Pass-specific annotations
//! (resolved symbol, inferred type) are attached by later passes on a
//! side-table keyed by node position, not mutated onto these nodes, so the
//! tree stays immutable after parsing — mirroring how the teacher's
//! `query_api` nodes are built once by a converter and never mutated by
//! downstream passes.

use crate::span::Pos;

/// A possibly schema/alias-qualified name (`a.b` in source).
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedName {
    pub qualifier: Option<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn unqualified(name: impl Into<String>) -> Self {
        QualifiedName {
            qualifier: None,
            name: name.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        QualifiedName {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{q}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Table,
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `load Name from 'path.dict';`
    Load { name: String, dict_path: String },
    /// `table Name for Dict.Stream;` / `stream Name for Dict.Stream;`
    Decl {
        name: String,
        kind: DeclKind,
        dict_stream: QualifiedName,
    },
    /// `open Name as Connector for read|write Dict with 'connString';`
    Open {
        name: String,
        connector: String,
        direction: Direction,
        dict_ref: String,
        conn_string: String,
    },
    /// `select ... into Name;`
    Select { query: Query, into_name: String },
    /// `map Src to Dst [with (Dst.field = Src.field, ...)];`
    Map {
        src: QualifiedName,
        dst: QualifiedName,
        field_map: Option<Vec<(String, String)>>,
    },
    /// `sync Reader to Writer;`
    Sync { reader: String, writer: String },
    /// `abort 'message';`
    Abort { message: String },
}

/// `select` item: an expression with an optional alias. A bare alias
/// (`p.Vendor VendorID`, no `AS`) and an `AS`-qualified alias are both
/// accepted per `spec.md` §4.2.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub table: String,
    pub alias: Option<String>,
    pub left: QualifiedName,
    pub right: QualifiedName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub column: QualifiedName,
    pub direction: OrderDirection,
}

/// One `select` body (`spec.md` §4.2): projection, one-table `FROM`, at
/// most one `JOIN`, optional `WHERE`/`GROUP BY`/`HAVING`/`ORDER BY`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub items: Vec<SelectItem>,
    pub from: FromClause,
    pub join: Option<JoinClause>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<QualifiedName>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByItem>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggKind {
    Max,
    Min,
    Sum,
    Count,
    Avg,
}

impl AggKind {
    pub fn from_name(name: &str) -> Option<AggKind> {
        match name.to_ascii_lowercase().as_str() {
            "max" => Some(AggKind::Max),
            "min" => Some(AggKind::Min),
            "sum" => Some(AggKind::Sum),
            "count" => Some(AggKind::Count),
            "avg" => Some(AggKind::Avg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Decimal(f64),
    String(String),
    Null,
}

/// Boolean/value expression tree (`spec.md` §4.2): column ref, literal,
/// parenthesized expr, comparison, arithmetic, `AND`/`OR`/`NOT`, and the
/// fixed aggregate-function set plus `count(*)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(QualifiedName),
    Literal(Literal),
    Paren(Box<Expr>),
    Compare(Box<Expr>, CompareOp, Box<Expr>),
    Arith(Box<Expr>, ArithOp, Box<Expr>),
    Bool(Box<Expr>, BoolOp, Box<Expr>),
    Not(Box<Expr>),
    /// `max(col)`, `count(*)`, etc. `None` argument means `count(*)`.
    Aggregate(AggKind, Option<Box<Expr>>),
}
