// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic analyzer — passes 1 through 6 of `spec.md` §4.3: resolve
//! declarations, resolve selects, single-use enforcement, join check,
//! ordering check, projection check. (Pass 7, map validation, runs in
//! [`crate::linker`] once a `sync` command makes the concrete source and
//! destination dictionaries available — see DESIGN.md for why that split
//! was made.)
//!
//! Modeled on the teacher's own multi-pass `sql_compiler` shape
//! (`catalog.rs` for the symbol/schema layer, `type_inference.rs` for the
//! type-checking layer) rather than a single monolithic resolver.

use std::collections::HashSet;
use std::rc::Rc;

use crate::ast::*;
use crate::dictionary::{DataDictionary, FieldType, StreamDefinition, TypeTag};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::SemanticError;
use crate::symbol::{SymbolKind, SymbolTable};

/// Where a projected slot's value comes from (`spec.md` §3 Transformer IR
/// `slots[i]`), resolved against concrete schema indices.
#[derive(Debug, Clone)]
pub enum ProjSource {
    ReaderColumn(usize),
    JoinColumn(usize),
    Const(Literal),
    /// Aggregate over an optional source column index in the FROM stream
    /// (`None` for `count(*)`).
    Aggregate(AggKind, Option<usize>),
}

#[derive(Debug, Clone)]
pub struct ResolvedProjectedField {
    pub name: String,
    pub field_type: FieldType,
    pub source: ProjSource,
}

#[derive(Debug, Clone)]
pub struct ResolvedJoin {
    pub table_var: String,
    pub alias: String,
    pub table_stream: Rc<StreamDefinition>,
    pub from_probe_idx: usize,
    pub table_probe_idx: usize,
}

#[derive(Debug, Clone)]
pub struct ResolvedSelect {
    pub pos: crate::span::Pos,
    pub into_name: String,
    pub into_stream: Rc<StreamDefinition>,
    pub from_name: String,
    pub from_alias: String,
    pub from_stream: Rc<StreamDefinition>,
    pub from_is_table: bool,
    pub join: Option<ResolvedJoin>,
    pub projection: Vec<ResolvedProjectedField>,
    pub filter: Option<Expr>,
    pub group_by: Vec<usize>,
    pub having: Option<Expr>,
}

impl ResolvedSelect {
    pub fn is_aggregation(&self) -> bool {
        !self.group_by.is_empty()
            || self
                .projection
                .iter()
                .any(|p| matches!(p.source, ProjSource::Aggregate(..)))
    }
}

#[derive(Debug, Clone)]
pub struct OpenEndpoint {
    pub name: String,
    pub connector: String,
    pub direction: Direction,
    pub dict_name: String,
    pub conn_string: String,
}

/// Output of the semantic analyzer: everything the transformation builder
/// and linker need, with all names resolved against schemas.
pub struct AnalyzedProgram {
    pub dicts: Vec<(String, Rc<DataDictionary>)>,
    pub symbols: SymbolTable,
    pub selects: Vec<ResolvedSelect>,
    pub raw_maps: Vec<(QualifiedName, QualifiedName, Option<Vec<(String, String)>>)>,
    pub opens: Vec<OpenEndpoint>,
    pub syncs: Vec<(String, String)>,
}

pub struct Analyzer<'d> {
    load_dict: &'d dyn Fn(&str) -> Result<DataDictionary, crate::error::DictionaryError>,
    symbols: SymbolTable,
    dicts: Vec<(String, Rc<DataDictionary>)>,
    diagnostics: Diagnostics,
}

impl<'d> Analyzer<'d> {
    pub fn new(load_dict: &'d dyn Fn(&str) -> Result<DataDictionary, crate::error::DictionaryError>) -> Self {
        Analyzer {
            load_dict,
            symbols: SymbolTable::new(),
            dicts: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn analyze(
        mut self,
        script: &Script,
    ) -> Result<(AnalyzedProgram, Diagnostics), crate::error::CompilerError> {
        let mut selects = Vec::new();
        let mut raw_maps = Vec::new();
        let mut opens = Vec::new();
        let mut syncs = Vec::new();

        for stmt in &script.statements {
            match &stmt.kind {
                StatementKind::Load { name, dict_path } => self.resolve_load(name, dict_path)?,
                StatementKind::Decl {
                    name,
                    kind,
                    dict_stream,
                } => {
                    let stream = self.resolve_decl(name, *kind, dict_stream)?;
                    // A `Table` declaration produces its own bootstrap
                    // transformer (`spec.md` §4.4 "Table-declared inputs")
                    // that loads the input into the in-memory join index;
                    // it is never written by user code, so it is
                    // synthesized here rather than requiring a `select`.
                    if *kind == DeclKind::Table {
                        selects.push(self.bootstrap_select(name, stream));
                    }
                }
                StatementKind::Open {
                    name,
                    connector,
                    direction,
                    dict_ref,
                    conn_string,
                } => {
                    self.resolve_open(name, *direction, dict_ref)?;
                    opens.push(OpenEndpoint {
                        name: name.clone(),
                        connector: connector.clone(),
                        direction: *direction,
                        dict_name: dict_ref.clone(),
                        conn_string: conn_string.clone(),
                    });
                }
                StatementKind::Select { query, into_name } => {
                    selects.push(self.resolve_select(query, into_name)?);
                }
                StatementKind::Map {
                    src,
                    dst,
                    field_map,
                } => {
                    raw_maps.push((src.clone(), dst.clone(), field_map.clone()));
                }
                StatementKind::Sync { reader, writer } => {
                    if self.symbols.get(reader).is_none() {
                        return Err(SemanticError::UnknownIdentifier(reader.clone()).into());
                    }
                    if self.symbols.get(writer).is_none() {
                        return Err(SemanticError::UnknownIdentifier(writer.clone()).into());
                    }
                    syncs.push((reader.clone(), writer.clone()));
                }
                StatementKind::Abort { message } => {
                    log::debug!("abort statement reached during analysis: {message}");
                }
            }
        }

        let into_names: HashSet<String> = selects.iter().map(|s: &ResolvedSelect| s.into_name.to_ascii_lowercase()).collect();
        self.warn_unconsumed_streams(&into_names);

        Ok((
            AnalyzedProgram {
                dicts: self.dicts,
                symbols: self.symbols,
                selects,
                raw_maps,
                opens,
                syncs,
            },
            self.diagnostics,
        ))
    }

    fn resolve_load(&mut self, name: &str, dict_path: &str) -> Result<(), crate::error::CompilerError> {
        if self.symbols.contains(name) {
            return Err(SemanticError::DuplicateDeclaration(name.to_string()).into());
        }
        log::debug!("loading dictionary '{name}' from '{dict_path}'");
        let dict = Rc::new((self.load_dict)(dict_path)?);
        self.symbols.bind_dict(name, dict.clone());
        self.dicts.push((name.to_string(), dict));
        Ok(())
    }

    fn resolve_decl(
        &mut self,
        name: &str,
        kind: DeclKind,
        dict_stream: &QualifiedName,
    ) -> Result<Rc<StreamDefinition>, crate::error::CompilerError> {
        if self.symbols.contains(name) {
            return Err(SemanticError::DuplicateDeclaration(name.to_string()).into());
        }
        let dict_name = dict_stream
            .qualifier
            .clone()
            .ok_or_else(|| SemanticError::UnknownIdentifier(dict_stream.to_string()))?;
        let dict = self
            .symbols
            .dict(&dict_name)
            .cloned()
            .ok_or_else(|| SemanticError::UnknownIdentifier(dict_name.clone()))?;
        let stream = dict
            .stream_by_name(&dict_stream.name)
            .cloned()
            .ok_or_else(|| SemanticError::UnknownStream {
                schema: dict_name.clone(),
                name: dict_stream.name.clone(),
            })?;
        let stream = Rc::new(stream);
        self.symbols
            .bind_var(name, kind, dict_name, stream.clone());
        Ok(stream)
    }

    /// Synthesizes the bootstrap `ResolvedSelect` a `Table` declaration
    /// implies: no projection, no filter, `from_is_table: true` so
    /// [`crate::builder::build`] and the emitter route it through
    /// `emit_bootstrap_advance` instead of the normal row path.
    fn bootstrap_select(&self, table_var: &str, stream: Rc<StreamDefinition>) -> ResolvedSelect {
        ResolvedSelect {
            pos: crate::span::Pos::start(),
            into_name: table_var.to_string(),
            into_stream: stream.clone(),
            from_name: table_var.to_string(),
            from_alias: table_var.to_string(),
            from_stream: stream.clone(),
            from_is_table: true,
            join: None,
            projection: Vec::new(),
            filter: None,
            group_by: Vec::new(),
            having: None,
        }
    }

    fn resolve_open(
        &mut self,
        name: &str,
        direction: Direction,
        dict_ref: &str,
    ) -> Result<(), crate::error::CompilerError> {
        if self.symbols.contains(name) {
            return Err(SemanticError::DuplicateDeclaration(name.to_string()).into());
        }
        if self.symbols.dict(dict_ref).is_none() {
            return Err(SemanticError::UnknownIdentifier(dict_ref.to_string()).into());
        }
        let kind = match direction {
            Direction::Read => SymbolKind::Reader,
            Direction::Write => SymbolKind::Writer,
        };
        self.symbols.bind_endpoint(name, kind, dict_ref.to_string());
        Ok(())
    }

    fn resolve_select(
        &mut self,
        query: &Query,
        into_name: &str,
    ) -> Result<ResolvedSelect, crate::error::CompilerError> {
        let from_alias = query.from.alias.clone().unwrap_or_else(|| query.from.name.clone());
        let from_symbol = self
            .symbols
            .get(&query.from.name)
            .ok_or_else(|| SemanticError::UnknownIdentifier(query.from.name.clone()))?
            .clone();
        let from_stream = from_symbol
            .stream
            .clone()
            .ok_or_else(|| SemanticError::UnknownIdentifier(query.from.name.clone()))?;
        let from_is_table = from_symbol.decl_kind() == Some(DeclKind::Table);

        // Pass 3: single-use check on Stream-declared FROM inputs.
        if !from_is_table && !self.symbols.mark_consumed(&query.from.name) {
            return Err(SemanticError::StreamAlreadyProcessed(query.from.name.clone()).into());
        }

        // Pass 4: join check.
        let join = match &query.join {
            Some(j) => Some(self.resolve_join(j, &from_alias, &from_stream)?),
            None => None,
        };

        // Pass 5: ordering check.
        if !query.order_by.is_empty() && !from_is_table {
            return Err(SemanticError::OrderByOnStream.into());
        }

        // Resolve GROUP BY columns against the FROM stream.
        let mut group_by = Vec::new();
        for col in &query.group_by {
            let idx = from_stream.field_index(&col.name).ok_or_else(|| {
                SemanticError::UnknownField {
                    stream: from_stream.name.clone(),
                    field: col.name.clone(),
                }
            })?;
            group_by.push(idx);
        }

        // Pass 6: projection check.
        let into_symbol = self
            .symbols
            .get(into_name)
            .ok_or_else(|| SemanticError::UnknownIdentifier(into_name.to_string()))?
            .clone();
        let into_stream = into_symbol
            .stream
            .clone()
            .ok_or_else(|| SemanticError::UnknownIdentifier(into_name.to_string()))?;

        let mut projection = Vec::new();
        for item in &query.items {
            projection.push(self.resolve_select_item(
                item,
                &from_alias,
                &from_stream,
                join.as_ref(),
                !group_by.is_empty(),
            )?);
        }

        let projection = self.complete_projection(&into_stream, projection)?;

        if let Some(filter) = &query.where_clause {
            self.validate_expr_columns(filter, &from_alias, &from_stream, join.as_ref())?;
        }
        if let Some(having) = &query.having {
            self.validate_expr_columns(having, &from_alias, &from_stream, join.as_ref())?;
        }

        Ok(ResolvedSelect {
            pos: query.pos,
            into_name: into_name.to_string(),
            into_stream,
            from_name: query.from.name.clone(),
            from_alias,
            from_stream,
            from_is_table,
            join,
            projection,
            filter: query.where_clause.clone(),
            group_by,
            having: query.having.clone(),
        })
    }

    fn resolve_join(
        &mut self,
        join: &JoinClause,
        from_alias: &str,
        from_stream: &Rc<StreamDefinition>,
    ) -> Result<ResolvedJoin, crate::error::CompilerError> {
        let table_symbol = self
            .symbols
            .get(&join.table)
            .ok_or_else(|| SemanticError::UnknownIdentifier(join.table.clone()))?
            .clone();
        if table_symbol.decl_kind() != Some(DeclKind::Table) {
            return Err(SemanticError::JoinAgainstNonTable(join.table.clone()).into());
        }
        let table_stream = table_symbol
            .stream
            .clone()
            .ok_or_else(|| SemanticError::NotMaterializable(join.table.clone()))?;
        let alias = join.alias.clone().unwrap_or_else(|| join.table.clone());

        let (from_col, table_col) = self.split_join_sides(join, from_alias, &alias)?;

        let from_probe_idx = from_stream.field_index(&from_col).ok_or_else(|| {
            SemanticError::UnknownField {
                stream: from_stream.name.clone(),
                field: from_col.clone(),
            }
        })?;
        let table_probe_idx = table_stream.field_index(&table_col).ok_or_else(|| {
            SemanticError::UnknownField {
                stream: table_stream.name.clone(),
                field: table_col.clone(),
            }
        })?;
        if !table_stream.is_primary_key_field(&table_col) {
            return Err(SemanticError::JoinKeyNotPrimaryKey.into());
        }

        Ok(ResolvedJoin {
            table_var: join.table.clone(),
            alias,
            table_stream,
            from_probe_idx,
            table_probe_idx,
        })
    }

    fn split_join_sides(
        &self,
        join: &JoinClause,
        from_alias: &str,
        table_alias: &str,
    ) -> Result<(String, String), SemanticError> {
        let left_q = join.left.qualifier.as_deref();
        let right_q = join.right.qualifier.as_deref();
        if left_q == Some(from_alias) && right_q == Some(table_alias) {
            Ok((join.left.name.clone(), join.right.name.clone()))
        } else if left_q == Some(table_alias) && right_q == Some(from_alias) {
            Ok((join.right.name.clone(), join.left.name.clone()))
        } else {
            Err(SemanticError::UnknownIdentifier(format!(
                "{} = {}",
                join.left, join.right
            )))
        }
    }

    fn resolve_select_item(
        &self,
        item: &SelectItem,
        from_alias: &str,
        from_stream: &Rc<StreamDefinition>,
        join: Option<&ResolvedJoin>,
        has_group_by: bool,
    ) -> Result<ResolvedProjectedField, crate::error::CompilerError> {
        match &item.expr {
            Expr::Column(qn) => {
                let (idx_source, idx, field_type) =
                    self.resolve_column(qn, from_alias, from_stream, join)?;
                let name = item.alias.clone().unwrap_or_else(|| qn.name.clone());
                let source = match idx_source {
                    ColumnSide::From => ProjSource::ReaderColumn(idx),
                    ColumnSide::Join => ProjSource::JoinColumn(idx),
                };
                Ok(ResolvedProjectedField {
                    name,
                    field_type,
                    source,
                })
            }
            Expr::Literal(lit) => {
                let name = item.alias.clone().ok_or_else(|| {
                    SemanticError::InvalidAggregateArgument(
                        "a literal projection requires an alias naming the destination field"
                            .to_string(),
                    )
                })?;
                let field_type = literal_field_type(lit);
                Ok(ResolvedProjectedField {
                    name,
                    field_type,
                    source: ProjSource::Const(lit.clone()),
                })
            }
            Expr::Aggregate(kind, arg) => {
                if !has_group_by {
                    return Err(SemanticError::InvalidAggregateArgument(
                        "aggregate functions require a GROUP BY clause".to_string(),
                    )
                    .into());
                }
                let (value_idx, field_type) = match arg {
                    None => (None, FieldType::new(TypeTag::Int64)),
                    Some(expr) => match expr.as_ref() {
                        Expr::Column(qn) => {
                            let (side, idx, ft) =
                                self.resolve_column(qn, from_alias, from_stream, join)?;
                            if side == ColumnSide::Join {
                                return Err(SemanticError::InvalidAggregateArgument(
                                    "aggregates may only read the streaming input's columns"
                                        .to_string(),
                                )
                                .into());
                            }
                            let result_type = match kind {
                                AggKind::Count => FieldType::new(TypeTag::Int64),
                                AggKind::Avg => FieldType::new(TypeTag::Float64),
                                _ => ft.clone(),
                            };
                            (Some(idx), result_type)
                        }
                        _ => {
                            return Err(SemanticError::InvalidAggregateArgument(
                                "aggregate arguments must be a bare column or '*'".to_string(),
                            )
                            .into())
                        }
                    },
                };
                let default_name = format!("{kind:?}");
                let name = item.alias.clone().unwrap_or(default_name);
                Ok(ResolvedProjectedField {
                    name,
                    field_type,
                    source: ProjSource::Aggregate(*kind, value_idx),
                })
            }
            other => Err(SemanticError::InvalidAggregateArgument(format!(
                "unsupported select item expression: {other:?}"
            ))
            .into()),
        }
    }

    fn resolve_column(
        &self,
        qn: &QualifiedName,
        from_alias: &str,
        from_stream: &Rc<StreamDefinition>,
        join: Option<&ResolvedJoin>,
    ) -> Result<(ColumnSide, usize, FieldType), crate::error::CompilerError> {
        resolve_column_ref(qn, from_alias, from_stream, join).map_err(Into::into)
    }

    fn validate_expr_columns(
        &self,
        expr: &Expr,
        from_alias: &str,
        from_stream: &Rc<StreamDefinition>,
        join: Option<&ResolvedJoin>,
    ) -> Result<(), crate::error::CompilerError> {
        match expr {
            Expr::Column(qn) => {
                self.resolve_column(qn, from_alias, from_stream, join)?;
                Ok(())
            }
            Expr::Literal(_) => Ok(()),
            Expr::Paren(e) | Expr::Not(e) => {
                self.validate_expr_columns(e, from_alias, from_stream, join)
            }
            Expr::Compare(l, _, r) | Expr::Arith(l, _, r) | Expr::Bool(l, _, r) => {
                self.validate_expr_columns(l, from_alias, from_stream, join)?;
                self.validate_expr_columns(r, from_alias, from_stream, join)
            }
            Expr::Aggregate(_, arg) => {
                if let Some(e) = arg {
                    self.validate_expr_columns(e, from_alias, from_stream, join)?;
                }
                Ok(())
            }
        }
    }

    /// Validates the literal `SELECT` list against `into_stream` and pads it
    /// out to full destination arity (`spec.md` §3 "Projection arity =
    /// destination stream field count"): every destination field the
    /// `SELECT` list left unassigned is synthesized here as a
    /// `ProjSource::Const(Literal::Null)` slot, in destination field order,
    /// if (and only if) that field is nullable — an unassigned non-nullable
    /// field is still fatal. A `NULL` literal is universally assignable to
    /// any nullable destination regardless of `TypeTag` family (`spec.md`
    /// §4.4 "NULL literal becomes the null sentinel"), so it is exempted
    /// from the normal tag-family `assignable_to` check below.
    fn complete_projection(
        &self,
        into_stream: &Rc<StreamDefinition>,
        projection: Vec<ResolvedProjectedField>,
    ) -> Result<Vec<ResolvedProjectedField>, crate::error::CompilerError> {
        let mut assigned: HashSet<String> = HashSet::new();
        for field in &projection {
            let dest = into_stream
                .field_by_name(&field.name)
                .ok_or_else(|| SemanticError::UnknownDestinationField(field.name.clone()))?;
            let is_null_literal = matches!(field.source, ProjSource::Const(Literal::Null));
            if is_null_literal {
                if !dest.field_type.nullable {
                    return Err(SemanticError::TypeMismatch {
                        field: field.name.clone(),
                        source_tag: field.field_type.tag,
                        dest_tag: dest.field_type.tag,
                    }
                    .into());
                }
            } else if !field.field_type.assignable_to(&dest.field_type) {
                return Err(SemanticError::TypeMismatch {
                    field: field.name.clone(),
                    source_tag: field.field_type.tag,
                    dest_tag: dest.field_type.tag,
                }
                .into());
            }
            assigned.insert(field.name.clone());
        }

        let missing: Vec<&str> = into_stream
            .fields
            .iter()
            .filter(|f| !f.field_type.nullable && !assigned.contains(&f.name))
            .map(|f| f.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(SemanticError::MissingNonNullableFields {
                stream: into_stream.name.clone(),
                fields: missing.join(", "),
            }
            .into());
        }

        let mut completed = projection;
        for field in &into_stream.fields {
            if !assigned.contains(&field.name) {
                completed.push(ResolvedProjectedField {
                    name: field.name.clone(),
                    field_type: field.field_type.clone(),
                    source: ProjSource::Const(Literal::Null),
                });
            }
        }
        Ok(completed)
    }

    /// A `Stream`-kind variable is "unused" only if it is neither read by a
    /// `select` `FROM`/`JOIN` nor ever the destination (`into`) of one —
    /// an output-only stream isn't unused, it just hasn't been read yet.
    fn warn_unconsumed_streams(&mut self, into_names: &HashSet<String>) {
        let unconsumed: Vec<String> = self
            .symbols
            .all_stream_vars()
            .filter(|s| {
                s.kind == SymbolKind::StreamVar
                    && !self.symbols.is_consumed(&s.name)
                    && !into_names.contains(&s.name.to_ascii_lowercase())
            })
            .map(|s| s.name.clone())
            .collect();
        for name in unconsumed {
            self.diagnostics.push(Warning::UnusedStream(name));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSide {
    From,
    Join,
}

/// Resolves a (possibly qualified) column reference against a select's FROM
/// and optional JOIN sides. Shared by the analyzer's own validation passes
/// and by [`crate::builder`], which re-resolves `WHERE`/`HAVING` expression
/// trees into [`crate::ir::FilterExpr`] using the same qualifier rules.
pub fn resolve_column_ref(
    qn: &QualifiedName,
    from_alias: &str,
    from_stream: &Rc<StreamDefinition>,
    join: Option<&ResolvedJoin>,
) -> Result<(ColumnSide, usize, FieldType), SemanticError> {
    match &qn.qualifier {
        Some(q) if q == from_alias => {
            let idx = from_stream
                .field_index(&qn.name)
                .ok_or_else(|| SemanticError::UnknownField {
                    stream: from_stream.name.clone(),
                    field: qn.name.clone(),
                })?;
            Ok((ColumnSide::From, idx, from_stream.fields[idx].field_type.clone()))
        }
        Some(q) if join.is_some() && q == join.unwrap().alias.as_str() => {
            let j = join.unwrap();
            let idx = j
                .table_stream
                .field_index(&qn.name)
                .ok_or_else(|| SemanticError::UnknownField {
                    stream: j.table_stream.name.clone(),
                    field: qn.name.clone(),
                })?;
            Ok((ColumnSide::Join, idx, j.table_stream.fields[idx].field_type.clone()))
        }
        None => {
            let idx = from_stream
                .field_index(&qn.name)
                .ok_or_else(|| SemanticError::UnknownField {
                    stream: from_stream.name.clone(),
                    field: qn.name.clone(),
                })?;
            Ok((ColumnSide::From, idx, from_stream.fields[idx].field_type.clone()))
        }
        Some(q) => Err(SemanticError::UnknownIdentifier(q.clone())),
    }
}

fn literal_field_type(lit: &Literal) -> FieldType {
    match lit {
        Literal::Integer(_) => FieldType::new(TypeTag::Int64),
        Literal::Decimal(_) => FieldType::new(TypeTag::Float64),
        Literal::String(_) => FieldType::new(TypeTag::VarChar),
        Literal::Null => FieldType::new(TypeTag::VarChar).nullable(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::FieldDefinition;

    fn noop_loader(_: &str) -> Result<DataDictionary, crate::error::DictionaryError> {
        unreachable!("not exercised by these tests")
    }

    fn users2() -> Rc<StreamDefinition> {
        Rc::new(
            StreamDefinition::new("dbo", "Users2")
                .field(FieldDefinition::new("Id", FieldType::new(TypeTag::Int32)))
                .field(FieldDefinition::new("Name", FieldType::new(TypeTag::VarChar)))
                .field(FieldDefinition::new(
                    "Note",
                    FieldType::new(TypeTag::VarChar).nullable(),
                ))
                .field(FieldDefinition::new(
                    "CreatedAt",
                    FieldType::new(TypeTag::DateTime).nullable(),
                )),
        )
    }

    #[test]
    fn completes_projection_arity_with_null_sentinels_for_unselected_nullable_fields() {
        let analyzer = Analyzer::new(&noop_loader);
        let into_stream = users2();
        let projection = vec![
            ResolvedProjectedField {
                name: "Id".to_string(),
                field_type: FieldType::new(TypeTag::Int32),
                source: ProjSource::ReaderColumn(0),
            },
            ResolvedProjectedField {
                name: "Name".to_string(),
                field_type: FieldType::new(TypeTag::VarChar),
                source: ProjSource::ReaderColumn(1),
            },
        ];
        let completed = analyzer.complete_projection(&into_stream, projection).unwrap();
        assert_eq!(completed.len(), into_stream.fields.len());
        assert_eq!(completed[2].name, "Note");
        assert!(matches!(completed[2].source, ProjSource::Const(Literal::Null)));
        assert_eq!(completed[3].name, "CreatedAt");
        assert!(matches!(completed[3].source, ProjSource::Const(Literal::Null)));
    }

    #[test]
    fn missing_non_nullable_field_is_still_fatal() {
        let analyzer = Analyzer::new(&noop_loader);
        let into_stream = users2();
        // `Id` is non-nullable and unselected.
        let projection = vec![ResolvedProjectedField {
            name: "Name".to_string(),
            field_type: FieldType::new(TypeTag::VarChar),
            source: ProjSource::ReaderColumn(0),
        }];
        assert!(analyzer.complete_projection(&into_stream, projection).is_err());
    }

    #[test]
    fn explicit_null_literal_is_assignable_to_any_nullable_destination_field() {
        let analyzer = Analyzer::new(&noop_loader);
        let into_stream = users2();
        // NULL explicitly projected onto `CreatedAt` (DateTime), a
        // different TypeTag family than the literal's own VarChar tag.
        let projection = vec![
            ResolvedProjectedField {
                name: "Id".to_string(),
                field_type: FieldType::new(TypeTag::Int32),
                source: ProjSource::ReaderColumn(0),
            },
            ResolvedProjectedField {
                name: "Name".to_string(),
                field_type: FieldType::new(TypeTag::VarChar),
                source: ProjSource::ReaderColumn(1),
            },
            ResolvedProjectedField {
                name: "CreatedAt".to_string(),
                field_type: literal_field_type(&Literal::Null),
                source: ProjSource::Const(Literal::Null),
            },
        ];
        let completed = analyzer.complete_projection(&into_stream, projection).unwrap();
        assert_eq!(completed.len(), into_stream.fields.len());
    }

    #[test]
    fn explicit_null_literal_rejected_against_non_nullable_destination_field() {
        let analyzer = Analyzer::new(&noop_loader);
        let into_stream = users2();
        let projection = vec![
            ResolvedProjectedField {
                name: "Id".to_string(),
                field_type: literal_field_type(&Literal::Null),
                source: ProjSource::Const(Literal::Null),
            },
            ResolvedProjectedField {
                name: "Name".to_string(),
                field_type: FieldType::new(TypeTag::VarChar),
                source: ProjSource::ReaderColumn(1),
            },
        ];
        assert!(analyzer.complete_projection(&into_stream, projection).is_err());
    }
}
