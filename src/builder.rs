// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transformation builder (`spec.md` §4.4): lowers each
//! [`crate::semantic::ResolvedSelect`] into a [`crate::ir::TransformerIr`].
//!
//! All name resolution already happened in [`crate::semantic`]; this pass
//! only re-walks `WHERE`/`HAVING` expression trees into position-addressed
//! [`crate::ir::FilterExpr`] trees and assembles slots/aggregation plans in
//! projection order, the way the teacher's `expansion.rs` turns a resolved
//! catalog reference into a concrete execution plan fragment.

use crate::ast::Expr;
use crate::error::{CompilerError, SemanticError};
use crate::ir::{Aggregator, AggregationPlan, ColumnRef, FilterExpr, JoinDescriptor, Slot, TransformerIr};
use crate::semantic::{resolve_column_ref, ColumnSide, ProjSource, ResolvedSelect};

pub fn build(resolved: &ResolvedSelect) -> Result<TransformerIr, CompilerError> {
    let join = resolved.join.as_ref().map(|j| JoinDescriptor {
        table_var: j.table_var.clone(),
        table_stream: j.table_stream.clone(),
        from_probe_index: j.from_probe_idx,
        table_probe_index: j.table_probe_idx,
    });

    let filter = resolved
        .filter
        .as_ref()
        .map(|e| lower_expr(e, &resolved.from_alias, resolved, &join))
        .transpose()?;

    let aggregation = if resolved.is_aggregation() {
        let aggregators: Vec<Aggregator> = resolved
            .projection
            .iter()
            .filter_map(|p| match &p.source {
                ProjSource::Aggregate(kind, idx) => Some(Aggregator {
                    kind: *kind,
                    source_index: *idx,
                }),
                _ => None,
            })
            .collect();
        let having = resolved
            .having
            .as_ref()
            .map(|e| lower_having(e, resolved, &aggregators))
            .transpose()?;
        Some(AggregationPlan {
            group_by: resolved.group_by.clone(),
            aggregators,
            having,
        })
    } else {
        None
    };

    let mut aggregator_cursor = 0;
    let slots = resolved
        .projection
        .iter()
        .map(|p| match &p.source {
            ProjSource::ReaderColumn(idx) => Slot::ReaderColumn {
                name: p.name.clone(),
                field_type: p.field_type.clone(),
                index: *idx,
            },
            ProjSource::JoinColumn(idx) => Slot::JoinColumn {
                name: p.name.clone(),
                field_type: p.field_type.clone(),
                index: *idx,
            },
            ProjSource::Const(lit) => Slot::ConstLiteral {
                name: p.name.clone(),
                field_type: p.field_type.clone(),
                value: lit.clone(),
            },
            ProjSource::Aggregate(..) => {
                let slot = Slot::AggregatorOutput {
                    name: p.name.clone(),
                    field_type: p.field_type.clone(),
                    aggregator_index: aggregator_cursor,
                };
                aggregator_cursor += 1;
                slot
            }
        })
        .collect();

    Ok(TransformerIr {
        into_name: resolved.into_name.clone(),
        source_var: resolved.from_name.clone(),
        source_stream: resolved.from_stream.clone(),
        source_is_table: resolved.from_is_table,
        join,
        filter,
        aggregation,
        slots,
        dest_stream: resolved.into_stream.clone(),
    })
}

fn lower_expr(
    expr: &Expr,
    from_alias: &str,
    resolved: &ResolvedSelect,
    join: &Option<JoinDescriptor>,
) -> Result<FilterExpr, CompilerError> {
    let join_info = resolved.join.as_ref();
    match expr {
        Expr::Column(qn) => {
            let (side, idx, _ty) = resolve_column_ref(qn, from_alias, &resolved.from_stream, join_info)?;
            let col = match side {
                ColumnSide::From => ColumnRef::Reader(idx),
                ColumnSide::Join => ColumnRef::Join(idx),
            };
            let _ = join;
            Ok(FilterExpr::Column(col))
        }
        Expr::Literal(lit) => Ok(FilterExpr::Literal(lit.clone())),
        Expr::Paren(e) => Ok(FilterExpr::Paren(Box::new(lower_expr(e, from_alias, resolved, join)?))),
        Expr::Not(e) => Ok(FilterExpr::Not(Box::new(lower_expr(e, from_alias, resolved, join)?))),
        Expr::Compare(l, op, r) => Ok(FilterExpr::Compare(
            Box::new(lower_expr(l, from_alias, resolved, join)?),
            *op,
            Box::new(lower_expr(r, from_alias, resolved, join)?),
        )),
        Expr::Arith(l, op, r) => Ok(FilterExpr::Arith(
            Box::new(lower_expr(l, from_alias, resolved, join)?),
            *op,
            Box::new(lower_expr(r, from_alias, resolved, join)?),
        )),
        Expr::Bool(l, op, r) => Ok(FilterExpr::Bool(
            Box::new(lower_expr(l, from_alias, resolved, join)?),
            *op,
            Box::new(lower_expr(r, from_alias, resolved, join)?),
        )),
        Expr::Aggregate(..) => Err(SemanticError::InvalidAggregateArgument(
            "aggregate functions cannot appear inside WHERE".to_string(),
        )
        .into()),
    }
}

/// Lowers a `HAVING` expression, which runs after aggregation against the
/// `(group key, aggregator results)` pair `finalize()` produces rather
/// than against a streaming row. A bare column must be one of the `GROUP
/// BY` columns (it becomes its position in the key tuple); an aggregate
/// call must already appear in the `SELECT` list (it becomes that
/// aggregator's position) — `HAVING` cannot introduce a new reduction of
/// its own.
fn lower_having(
    expr: &Expr,
    resolved: &ResolvedSelect,
    aggregators: &[Aggregator],
) -> Result<FilterExpr, CompilerError> {
    match expr {
        Expr::Column(qn) => {
            let idx = resolved.from_stream.field_index(&qn.name).ok_or_else(|| {
                SemanticError::UnknownField {
                    stream: resolved.from_stream.name.clone(),
                    field: qn.name.clone(),
                }
            })?;
            let pos = resolved
                .group_by
                .iter()
                .position(|gi| *gi == idx)
                .ok_or_else(|| {
                    SemanticError::InvalidAggregateArgument(format!(
                        "HAVING may only reference columns that appear in GROUP BY, found '{}'",
                        qn.name
                    ))
                })?;
            Ok(FilterExpr::Column(ColumnRef::Reader(pos)))
        }
        Expr::Literal(lit) => Ok(FilterExpr::Literal(lit.clone())),
        Expr::Paren(e) => Ok(FilterExpr::Paren(Box::new(lower_having(
            e, resolved, aggregators,
        )?))),
        Expr::Not(e) => Ok(FilterExpr::Not(Box::new(lower_having(
            e, resolved, aggregators,
        )?))),
        Expr::Compare(l, op, r) => Ok(FilterExpr::Compare(
            Box::new(lower_having(l, resolved, aggregators)?),
            *op,
            Box::new(lower_having(r, resolved, aggregators)?),
        )),
        Expr::Arith(l, op, r) => Ok(FilterExpr::Arith(
            Box::new(lower_having(l, resolved, aggregators)?),
            *op,
            Box::new(lower_having(r, resolved, aggregators)?),
        )),
        Expr::Bool(l, op, r) => Ok(FilterExpr::Bool(
            Box::new(lower_having(l, resolved, aggregators)?),
            *op,
            Box::new(lower_having(r, resolved, aggregators)?),
        )),
        Expr::Aggregate(kind, arg) => {
            let source_index = match arg {
                None => None,
                Some(e) => match e.as_ref() {
                    Expr::Column(qn) => Some(resolved.from_stream.field_index(&qn.name).ok_or_else(
                        || SemanticError::UnknownField {
                            stream: resolved.from_stream.name.clone(),
                            field: qn.name.clone(),
                        },
                    )?),
                    _ => {
                        return Err(SemanticError::InvalidAggregateArgument(
                            "aggregate arguments must be a bare column or '*'".to_string(),
                        )
                        .into())
                    }
                },
            };
            let pos = aggregators
                .iter()
                .position(|a| a.kind == *kind && a.source_index == source_index)
                .ok_or_else(|| {
                    SemanticError::InvalidAggregateArgument(
                        "HAVING may only reference an aggregate that already appears in the SELECT list"
                            .to_string(),
                    )
                })?;
            Ok(FilterExpr::Column(ColumnRef::Join(pos)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CompareOp, Literal, QualifiedName};
    use crate::dictionary::{FieldDefinition, FieldType, StreamDefinition, TypeTag};
    use crate::semantic::ResolvedProjectedField;
    use std::rc::Rc;

    fn stream() -> Rc<StreamDefinition> {
        Rc::new(
            StreamDefinition::new("dbo", "Products")
                .field(FieldDefinition::new("Id", FieldType::new(TypeTag::Int32)))
                .field(FieldDefinition::new("Price", FieldType::new(TypeTag::Decimal))),
        )
    }

    fn base_resolved(filter: Option<Expr>) -> ResolvedSelect {
        ResolvedSelect {
            pos: crate::span::Pos::start(),
            into_name: "out".to_string(),
            into_stream: stream(),
            from_name: "p".to_string(),
            from_alias: "p".to_string(),
            from_stream: stream(),
            from_is_table: false,
            join: None,
            projection: vec![ResolvedProjectedField {
                name: "Price".to_string(),
                field_type: FieldType::new(TypeTag::Decimal),
                source: ProjSource::ReaderColumn(1),
            }],
            filter,
            group_by: Vec::new(),
            having: None,
        }
    }

    #[test]
    fn builds_reader_column_slot() {
        let ir = build(&base_resolved(None)).unwrap();
        assert_eq!(ir.slots.len(), 1);
        assert_eq!(ir.slots[0].name(), "Price");
    }

    #[test]
    fn lowers_filter_expression() {
        let filter = Expr::Compare(
            Box::new(Expr::Column(QualifiedName::qualified("p", "Price"))),
            CompareOp::Gt,
            Box::new(Expr::Literal(Literal::Integer(10))),
        );
        let ir = build(&base_resolved(Some(filter))).unwrap();
        match ir.filter {
            Some(FilterExpr::Compare(l, CompareOp::Gt, r)) => {
                assert!(matches!(*l, FilterExpr::Column(ColumnRef::Reader(1))));
                assert!(matches!(*r, FilterExpr::Literal(Literal::Integer(10))));
            }
            other => panic!("unexpected lowering: {other:?}"),
        }
    }

    fn grouped_resolved(having: Option<Expr>) -> ResolvedSelect {
        ResolvedSelect {
            pos: crate::span::Pos::start(),
            into_name: "out".to_string(),
            into_stream: stream(),
            from_name: "p".to_string(),
            from_alias: "p".to_string(),
            from_stream: stream(),
            from_is_table: false,
            join: None,
            projection: vec![
                ResolvedProjectedField {
                    name: "Id".to_string(),
                    field_type: FieldType::new(TypeTag::Int32),
                    source: ProjSource::ReaderColumn(0),
                },
                ResolvedProjectedField {
                    name: "CountPrice".to_string(),
                    field_type: FieldType::new(crate::dictionary::TypeTag::Int64),
                    source: ProjSource::Aggregate(crate::ast::AggKind::Count, None),
                },
            ],
            filter: None,
            group_by: vec![0],
            having,
        }
    }

    #[test]
    fn lowers_having_referencing_group_key_and_aggregate() {
        let having = Expr::Compare(
            Box::new(Expr::Aggregate(crate::ast::AggKind::Count, None)),
            CompareOp::Gt,
            Box::new(Expr::Literal(Literal::Integer(5))),
        );
        let ir = build(&grouped_resolved(Some(having))).unwrap();
        let agg = ir.aggregation.unwrap();
        match agg.having {
            Some(FilterExpr::Compare(l, CompareOp::Gt, r)) => {
                assert!(matches!(*l, FilterExpr::Column(ColumnRef::Join(0))));
                assert!(matches!(*r, FilterExpr::Literal(Literal::Integer(5))));
            }
            other => panic!("unexpected lowering: {other:?}"),
        }
    }

    #[test]
    fn having_rejects_column_not_in_group_by() {
        let having = Expr::Compare(
            Box::new(Expr::Column(QualifiedName::qualified("p", "Price"))),
            CompareOp::Gt,
            Box::new(Expr::Literal(Literal::Integer(5))),
        );
        assert!(build(&grouped_resolved(Some(having))).is_err());
    }

    #[test]
    fn having_rejects_aggregate_not_in_select_list() {
        let having = Expr::Compare(
            Box::new(Expr::Aggregate(crate::ast::AggKind::Sum, Some(Box::new(Expr::Column(
                QualifiedName::qualified("p", "Price"),
            ))))),
            CompareOp::Gt,
            Box::new(Expr::Literal(Literal::Integer(5))),
        );
        assert!(build(&grouped_resolved(Some(having))).is_err());
    }
}
