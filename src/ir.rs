// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transformer IR (`spec.md` §3, §4.4): the lowered, position-addressed
//! form the emitter renders into program source. Unlike [`crate::ast`],
//! every column reference here is a resolved `(side, index)` pair rather
//! than a name, and every slot already carries its destination field name
//! and type — the builder has done all the name resolution a code
//! generator would otherwise have to repeat.

use std::rc::Rc;

use crate::ast::{AggKind, ArithOp, BoolOp, CompareOp, Literal};
use crate::dictionary::{FieldType, StreamDefinition};

/// Which side of a (possibly joined) row a column reference reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef {
    Reader(usize),
    Join(usize),
}

/// One output column of a transformer (`spec.md` §3 `slots[i]`).
#[derive(Debug, Clone)]
pub enum Slot {
    ReaderColumn {
        name: String,
        field_type: FieldType,
        index: usize,
    },
    JoinColumn {
        name: String,
        field_type: FieldType,
        index: usize,
    },
    ConstLiteral {
        name: String,
        field_type: FieldType,
        value: Literal,
    },
    AggregatorOutput {
        name: String,
        field_type: FieldType,
        aggregator_index: usize,
    },
}

impl Slot {
    pub fn name(&self) -> &str {
        match self {
            Slot::ReaderColumn { name, .. }
            | Slot::JoinColumn { name, .. }
            | Slot::ConstLiteral { name, .. }
            | Slot::AggregatorOutput { name, .. } => name,
        }
    }

    pub fn field_type(&self) -> &FieldType {
        match self {
            Slot::ReaderColumn { field_type, .. }
            | Slot::JoinColumn { field_type, .. }
            | Slot::ConstLiteral { field_type, .. }
            | Slot::AggregatorOutput { field_type, .. } => field_type,
        }
    }
}

/// A resolved predicate/value expression tree, structurally identical to
/// [`crate::ast::Expr`] but with every [`crate::ast::QualifiedName`]
/// replaced by a [`ColumnRef`] the emitter can index directly.
#[derive(Debug, Clone)]
pub enum FilterExpr {
    Column(ColumnRef),
    Literal(Literal),
    Paren(Box<FilterExpr>),
    Compare(Box<FilterExpr>, CompareOp, Box<FilterExpr>),
    Arith(Box<FilterExpr>, ArithOp, Box<FilterExpr>),
    Bool(Box<FilterExpr>, BoolOp, Box<FilterExpr>),
    Not(Box<FilterExpr>),
}

/// The join probe descriptor (`spec.md` §4.4): a hash (or equivalent)
/// lookup of the streaming row's probe column against the table's primary
/// key, materialized once per transformer.
#[derive(Debug, Clone)]
pub struct JoinDescriptor {
    pub table_var: String,
    pub table_stream: Rc<StreamDefinition>,
    pub from_probe_index: usize,
    pub table_probe_index: usize,
}

/// One `GROUP BY` aggregate column: its kind and the source column it
/// reduces over (`None` for `count(*)`).
#[derive(Debug, Clone)]
pub struct Aggregator {
    pub kind: AggKind,
    pub source_index: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AggregationPlan {
    pub group_by: Vec<usize>,
    pub aggregators: Vec<Aggregator>,
    pub having: Option<FilterExpr>,
}

/// One `select ... into` statement lowered to IR (`spec.md` §4.4
/// "Transformer IR").
#[derive(Debug, Clone)]
pub struct TransformerIr {
    pub into_name: String,
    pub source_var: String,
    pub source_stream: Rc<StreamDefinition>,
    pub source_is_table: bool,
    pub join: Option<JoinDescriptor>,
    pub filter: Option<FilterExpr>,
    pub aggregation: Option<AggregationPlan>,
    pub slots: Vec<Slot>,
    pub dest_stream: Rc<StreamDefinition>,
}

/// The whole compiled program: every transformer in source order, ready
/// for linking (`spec.md` §4.5) and emission (`spec.md` §4.7).
#[derive(Debug, Clone, Default)]
pub struct ProgramIr {
    pub transformers: Vec<TransformerIr>,
}
