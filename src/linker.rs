// SPDX-License-Identifier: MIT OR Apache-2.0

//! Linker & auto-mapper (`spec.md` §4.5).
//!
//! Runs after semantic analysis and the transformation builder, once every
//! `sync` command makes a concrete (reader dictionary, writer dictionary)
//! pair available. Three jobs:
//!
//! 1. Validate explicit `map` statements against the reader/writer schemas
//!    (pass 7 of `spec.md` §4.3 — deferred here rather than into
//!    [`crate::semantic`] because the source/destination dictionaries
//!    aren't concrete until a `sync` binds them; see DESIGN.md).
//! 2. Auto-map every reader-dictionary stream that isn't consumed by a
//!    `select`, isn't explicitly `map`-ed, and isn't declared as a `TABLE`
//!    (reference data is never mirrored downstream) to a same-named,
//!    type-compatible writer stream.
//! 3. Warn, but don't fail, on streams with no destination at all.

use std::collections::HashSet;
use std::rc::Rc;

use crate::ast::QualifiedName;
use crate::dictionary::{DataDictionary, StreamDefinition};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{CompilerError, LinkError, SemanticError};
use crate::ir::TransformerIr;
use crate::semantic::AnalyzedProgram;
use crate::symbol::SymbolKind;

#[derive(Debug, Clone)]
pub struct MapEntry {
    pub src_stream: Rc<StreamDefinition>,
    pub dst_stream: Rc<StreamDefinition>,
    /// `(destination field index, source field index)` pairs.
    pub field_pairs: Vec<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub reader: String,
    pub writer: String,
    pub maps: Vec<MapEntry>,
}

pub fn link(
    program: &AnalyzedProgram,
    transformers: &[TransformerIr],
    diagnostics: &mut Diagnostics,
) -> Result<Vec<SyncPlan>, CompilerError> {
    let mut plans = Vec::new();
    for (reader, writer) in &program.syncs {
        plans.push(link_one(program, transformers, reader, writer, diagnostics)?);
    }
    Ok(plans)
}

fn link_one(
    program: &AnalyzedProgram,
    transformers: &[TransformerIr],
    reader: &str,
    writer: &str,
    diagnostics: &mut Diagnostics,
) -> Result<SyncPlan, CompilerError> {
    let reader_sym = program
        .symbols
        .get(reader)
        .ok_or_else(|| LinkError::UnknownReader(reader.to_string()))?;
    let writer_sym = program
        .symbols
        .get(writer)
        .ok_or_else(|| LinkError::UnknownWriter(writer.to_string()))?;
    let reader_dict_name = reader_sym
        .origin_dict
        .clone()
        .ok_or_else(|| LinkError::UnknownReader(reader.to_string()))?;
    let writer_dict_name = writer_sym
        .origin_dict
        .clone()
        .ok_or_else(|| LinkError::UnknownWriter(writer.to_string()))?;
    let reader_dict = program
        .symbols
        .dict(&reader_dict_name)
        .cloned()
        .ok_or_else(|| LinkError::UnknownReader(reader.to_string()))?;
    let writer_dict = program
        .symbols
        .dict(&writer_dict_name)
        .cloned()
        .ok_or_else(|| LinkError::UnknownWriter(writer.to_string()))?;

    let mut maps = Vec::new();
    let mut explicitly_mapped: HashSet<String> = HashSet::new();

    for (src, dst, field_map) in &program.raw_maps {
        let entry = resolve_explicit_map(&reader_dict, &writer_dict, src, dst, field_map)?;
        explicitly_mapped.insert(entry.src_stream.name.clone());
        maps.push(entry);
    }

    let table_streams = table_declared_streams(program, &reader_dict_name);
    let consumed_streams = consumed_input_streams(transformers, &reader_dict_name, program);

    for stream in &reader_dict.streams {
        if explicitly_mapped.contains(&stream.name)
            || table_streams.contains(&stream.name)
            || consumed_streams.contains(&stream.name)
        {
            continue;
        }
        match writer_dict.stream_by_name(&stream.name) {
            Some(dst) => match auto_map_fields(stream, dst) {
                Some(field_pairs) => maps.push(MapEntry {
                    src_stream: Rc::new(stream.clone()),
                    dst_stream: Rc::new(dst.clone()),
                    field_pairs,
                }),
                None => {
                    return Err(LinkError::IncompatibleAutoMap(stream.name.clone()).into());
                }
            },
            None => diagnostics.push(Warning::UnmappedStream(stream.name.clone())),
        }
    }

    Ok(SyncPlan {
        reader: reader.to_string(),
        writer: writer.to_string(),
        maps,
    })
}

fn resolve_explicit_map(
    reader_dict: &DataDictionary,
    writer_dict: &DataDictionary,
    src: &QualifiedName,
    dst: &QualifiedName,
    field_map: &Option<Vec<(String, String)>>,
) -> Result<MapEntry, CompilerError> {
    let src_stream = reader_dict
        .stream_by_name(&src.name)
        .ok_or_else(|| LinkError::UnknownMapSource(src.name.clone()))?;
    let dst_stream = writer_dict
        .stream_by_name(&dst.name)
        .ok_or_else(|| LinkError::UnknownMapDestination(dst.name.clone()))?;

    let field_pairs = match field_map {
        Some(pairs) => {
            let mut seen_dst = HashSet::new();
            let mut resolved = Vec::with_capacity(pairs.len());
            for (dst_field, src_field) in pairs {
                if !seen_dst.insert(dst_field.clone()) {
                    return Err(SemanticError::DuplicateFieldMap(dst_field.clone()).into());
                }
                let dst_idx = dst_stream
                    .field_index(dst_field)
                    .ok_or_else(|| SemanticError::UnknownMapField(dst_field.clone()))?;
                let src_idx = src_stream
                    .field_index(src_field)
                    .ok_or_else(|| SemanticError::UnknownMapField(src_field.clone()))?;
                if !src_stream.fields[src_idx]
                    .field_type
                    .assignable_to(&dst_stream.fields[dst_idx].field_type)
                {
                    return Err(SemanticError::TypeMismatch {
                        field: dst_field.clone(),
                        source_tag: src_stream.fields[src_idx].field_type.tag,
                        dest_tag: dst_stream.fields[dst_idx].field_type.tag,
                    }
                    .into());
                }
                resolved.push((dst_idx, src_idx));
            }
            resolved
        }
        None => auto_map_fields(src_stream, dst_stream)
            .ok_or_else(|| LinkError::IncompatibleAutoMap(src_stream.name.clone()))?,
    };

    Ok(MapEntry {
        src_stream: Rc::new(src_stream.clone()),
        dst_stream: Rc::new(dst_stream.clone()),
        field_pairs,
    })
}

/// Matches destination fields to same-named, type-compatible source
/// fields. Returns `None` if a non-nullable destination field has no
/// compatible source match.
fn auto_map_fields(
    src: &StreamDefinition,
    dst: &StreamDefinition,
) -> Option<Vec<(usize, usize)>> {
    let mut pairs = Vec::new();
    for (dst_idx, dst_field) in dst.fields.iter().enumerate() {
        match src.field_index(&dst_field.name) {
            Some(src_idx)
                if src.fields[src_idx]
                    .field_type
                    .assignable_to(&dst_field.field_type) =>
            {
                pairs.push((dst_idx, src_idx));
            }
            _ if dst_field.field_type.nullable => {}
            _ => return None,
        }
    }
    Some(pairs)
}

fn table_declared_streams(program: &AnalyzedProgram, dict_name: &str) -> HashSet<String> {
    program
        .symbols
        .all()
        .filter(|s| {
            s.kind == SymbolKind::TableVar && s.origin_dict.as_deref() == Some(dict_name)
        })
        .filter_map(|s| s.stream.as_ref().map(|st| st.name.clone()))
        .collect()
}

fn consumed_input_streams(
    transformers: &[TransformerIr],
    dict_name: &str,
    program: &AnalyzedProgram,
) -> HashSet<String> {
    transformers
        .iter()
        .filter(|t| {
            !t.source_is_table
                && program
                    .symbols
                    .get(&t.source_var)
                    .and_then(|s| s.origin_dict.as_deref())
                    == Some(dict_name)
        })
        .map(|t| t.source_stream.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{FieldDefinition, FieldType, TypeTag};

    #[test]
    fn auto_maps_same_named_compatible_fields() {
        let src = StreamDefinition::new("dbo", "Orders")
            .field(FieldDefinition::new("Id", FieldType::new(TypeTag::Int32)))
            .field(FieldDefinition::new("Total", FieldType::new(TypeTag::Decimal)));
        let dst = StreamDefinition::new("dbo", "OrderData")
            .field(FieldDefinition::new("Id", FieldType::new(TypeTag::Int64)))
            .field(FieldDefinition::new("Total", FieldType::new(TypeTag::Decimal)));
        let pairs = auto_map_fields(&src, &dst).unwrap();
        assert_eq!(pairs, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn auto_map_fails_on_missing_non_nullable_field() {
        let src = StreamDefinition::new("dbo", "Orders")
            .field(FieldDefinition::new("Id", FieldType::new(TypeTag::Int32)));
        let dst = StreamDefinition::new("dbo", "OrderData")
            .field(FieldDefinition::new("Id", FieldType::new(TypeTag::Int32)))
            .field(FieldDefinition::new("Total", FieldType::new(TypeTag::Decimal)));
        assert!(auto_map_fields(&src, &dst).is_none());
    }

    #[test]
    fn auto_map_allows_missing_nullable_field() {
        let src = StreamDefinition::new("dbo", "Orders")
            .field(FieldDefinition::new("Id", FieldType::new(TypeTag::Int32)));
        let dst = StreamDefinition::new("dbo", "OrderData")
            .field(FieldDefinition::new("Id", FieldType::new(TypeTag::Int32)))
            .field(FieldDefinition::new(
                "Note",
                FieldType::new(TypeTag::VarChar).nullable(),
            ));
        assert_eq!(auto_map_fields(&src, &dst).unwrap(), vec![(0, 0)]);
    }
}
