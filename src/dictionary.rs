// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data dictionaries — schema catalogs bound by `load` statements.
//!
//! The real dictionary file codec (the compressed wire form referenced by
//! `spec.md` §6) is an external collaborator; this module only needs a
//! concrete in-process representation to compile against and a minimal
//! on-disk loader for the CLI and tests (`spec.md` §3a).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DictionaryError;

/// The fixed enumeration of field type tags (`spec.md` §3, `FieldType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeTag {
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    Date,
    DateTime,
    Time,
    Char,
    VarChar,
    Text,
    Binary,
    VarBinary,
    Blob,
    Json,
    Xml,
    Guid,
    Bool,
}

impl TypeTag {
    /// The fixed compatibility matrix from `spec.md` §3: two `TypeTag`s are
    /// assignable iff they are equal or in the same broad family (numeric
    /// widening, text family, binary family).
    pub fn assignable_to(self, dest: TypeTag) -> bool {
        use TypeTag::*;
        if self == dest {
            return true;
        }
        const INT_FAMILY: &[TypeTag] = &[Int16, Int32, Int64];
        const FLOAT_FAMILY: &[TypeTag] = &[Float32, Float64, Decimal];
        const TEXT_FAMILY: &[TypeTag] = &[Char, VarChar, Text];
        const BINARY_FAMILY: &[TypeTag] = &[Binary, VarBinary, Blob];
        const TEMPORAL_FAMILY: &[TypeTag] = &[Date, DateTime, Time];

        let family_match = |family: &[TypeTag]| family.contains(&self) && family.contains(&dest);

        family_match(INT_FAMILY)
            || family_match(FLOAT_FAMILY)
            || family_match(TEXT_FAMILY)
            || family_match(BINARY_FAMILY)
            || family_match(TEMPORAL_FAMILY)
            || (INT_FAMILY.contains(&self) && FLOAT_FAMILY.contains(&dest))
    }
}

/// `(TypeTag, nullable, collection, typeInfo)` per `spec.md` §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldType {
    pub tag: TypeTag,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub collection: bool,
    #[serde(default)]
    pub type_info: Option<String>,
}

impl FieldType {
    pub fn new(tag: TypeTag) -> Self {
        FieldType {
            tag,
            nullable: false,
            collection: false,
            type_info: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Assignability per `spec.md` §3: tags compatible by the fixed matrix,
    /// and the source is non-nullable or the destination is nullable.
    pub fn assignable_to(&self, dest: &FieldType) -> bool {
        self.tag.assignable_to(dest.tag) && (!self.nullable || dest.nullable)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldDefinition {
            name: name.into(),
            field_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDefinition {
    pub schema: String,
    pub name: String,
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub primary_key: Vec<String>,
}

impl StreamDefinition {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        StreamDefinition {
            schema: schema.into(),
            name: name.into(),
            fields: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn field(mut self, def: FieldDefinition) -> Self {
        self.fields.push(def);
        self
    }

    pub fn primary_key(mut self, fields: Vec<String>) -> Self {
        self.primary_key = fields;
        self
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// True if `field` is part of this stream's primary/unique key — used by
    /// the join check (`spec.md` §4.3 pass 4) to validate the probe column.
    pub fn is_primary_key_field(&self, field: &str) -> bool {
        self.primary_key.iter().any(|k| k == field)
    }
}

/// A set of `StreamDefinition`s keyed by `(schema, name)` (`spec.md` §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataDictionary {
    pub streams: Vec<StreamDefinition>,
    #[serde(skip)]
    index: HashMap<(String, String), usize>,
}

impl DataDictionary {
    pub fn new(streams: Vec<StreamDefinition>) -> Self {
        let mut dict = DataDictionary {
            streams,
            index: HashMap::new(),
        };
        dict.rebuild_index();
        dict
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, s) in self.streams.iter().enumerate() {
            self.index.insert((s.schema.clone(), s.name.clone()), i);
        }
    }

    /// Look up a stream by unqualified name, matching within any schema.
    /// Dictionary stream names are case-sensitive (`spec.md` §9 Open
    /// Question resolution).
    pub fn stream_by_name(&self, name: &str) -> Option<&StreamDefinition> {
        self.streams.iter().find(|s| s.name == name)
    }

    pub fn stream(&self, schema: &str, name: &str) -> Option<&StreamDefinition> {
        self.index
            .get(&(schema.to_string(), name.to_string()))
            .map(|&i| &self.streams[i])
    }
}

/// Loads a dictionary from its on-disk JSON form, resolved relative to the
/// script's directory (`spec.md` §6 "Inputs on disk").
pub fn load(path: &Path) -> Result<DataDictionary, DictionaryError> {
    let text = std::fs::read_to_string(path)
        .map_err(|_| DictionaryError::NotFound(path.display().to_string()))?;
    let streams: Vec<StreamDefinition> = serde_json::from_str(&text)
        .map_err(|e| DictionaryError::Unparseable(path.display().to_string(), e.to_string()))?;
    Ok(DataDictionary::new(streams))
}

/// The "compressed wire form" the emitter embeds in generated code
/// (`spec.md` §6), standing in for the external dictionary serializer's
/// `ToCompressedString`. Deterministic: same dictionary, same bytes.
pub fn compress_blob(dict: &DataDictionary) -> Vec<u8> {
    let json = serde_json::to_vec(&dict.streams).expect("dictionary is always serializable");
    zstd::encode_all(&json[..], 19).expect("zstd compression of a dictionary cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignable_same_tag() {
        let a = FieldType::new(TypeTag::Int32);
        let b = FieldType::new(TypeTag::Int32);
        assert!(a.assignable_to(&b));
    }

    #[test]
    fn assignable_int_widening() {
        let a = FieldType::new(TypeTag::Int16);
        let b = FieldType::new(TypeTag::Int64);
        assert!(a.assignable_to(&b));
    }

    #[test]
    fn assignable_int_to_float() {
        let a = FieldType::new(TypeTag::Int32);
        let b = FieldType::new(TypeTag::Float64);
        assert!(a.assignable_to(&b));
        assert!(!b.assignable_to(&a));
    }

    #[test]
    fn not_assignable_across_family() {
        let a = FieldType::new(TypeTag::VarChar);
        let b = FieldType::new(TypeTag::Int32);
        assert!(!a.assignable_to(&b));
    }

    #[test]
    fn nullable_to_non_nullable_rejected() {
        let a = FieldType::new(TypeTag::Int32).nullable();
        let b = FieldType::new(TypeTag::Int32);
        assert!(!a.assignable_to(&b));
    }

    #[test]
    fn non_nullable_to_nullable_ok() {
        let a = FieldType::new(TypeTag::Int32);
        let b = FieldType::new(TypeTag::Int32).nullable();
        assert!(a.assignable_to(&b));
    }

    #[test]
    fn dictionary_lookup_by_schema_and_name() {
        let dict = DataDictionary::new(vec![StreamDefinition::new("dbo", "Users")
            .field(FieldDefinition::new("Id", FieldType::new(TypeTag::Int32)))]);
        assert!(dict.stream("dbo", "Users").is_some());
        assert!(dict.stream("dbo", "Orders").is_none());
    }

    #[test]
    fn compress_blob_is_deterministic() {
        let dict = DataDictionary::new(vec![StreamDefinition::new("dbo", "Users")]);
        assert_eq!(compress_blob(&dict), compress_blob(&dict));
    }
}
