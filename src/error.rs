// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compiler error taxonomy.
//!
//! Every pass raises its own typed error; [`CompilerError`] aggregates them
//! behind `#[from]` so `compile`/`compile_files` can surface the first
//! fatal diagnostic without passes needing to know about each other's
//! error types.

use thiserror::Error;

use crate::span::Pos;

/// Result alias used throughout the compiler.
pub type CompileResult<T> = Result<T, CompilerError>;

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("{0}")]
    Lex(#[from] LexError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Semantic(#[from] SemanticError),

    #[error("{0}")]
    Link(#[from] LinkError),

    #[error("{0}")]
    Network(#[from] NetworkError),

    #[error("{0}")]
    Dictionary(#[from] DictionaryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
#[error("{line}:{col}: {message}")]
pub struct LexError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl LexError {
    pub fn new(pos: Pos, message: impl Into<String>) -> Self {
        LexError {
            line: pos.line,
            col: pos.col,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
#[error("{pos}: expected {expected}, got {got}")]
pub struct ParseError {
    pub pos: Pos,
    pub expected: String,
    pub got: String,
}

impl ParseError {
    pub fn new(pos: Pos, expected: impl Into<String>, got: impl Into<String>) -> Self {
        ParseError {
            pos,
            expected: expected.into(),
            got: got.into(),
        }
    }
}

/// Name resolution, typing and structural errors raised by the semantic
/// analyzer (`spec.md` §4.3, §7).
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("duplicate declaration of '{0}'")]
    DuplicateDeclaration(String),

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("unknown stream '{schema}.{name}'")]
    UnknownStream { schema: String, name: String },

    #[error("unknown field '{field}' on stream '{stream}'")]
    UnknownField { stream: String, field: String },

    #[error("the stream '{0}' has already been processed and cannot be used again")]
    StreamAlreadyProcessed(String),

    #[error("ORDER BY is not supported for queries involving a STREAM input")]
    OrderByOnStream,

    #[error("JOIN right-hand side '{0}' must be a declared TABLE")]
    JoinAgainstNonTable(String),

    #[error("JOIN equality key must reference the table's primary key column")]
    JoinKeyNotPrimaryKey,

    #[error(
        "The following field(s) on {stream} are not nullable, but are not assigned a value: {fields}"
    )]
    MissingNonNullableFields { stream: String, fields: String },

    #[error("field '{0}' in projection has no matching destination field")]
    UnknownDestinationField(String),

    #[error("cannot assign {source_tag:?} into destination field '{field}' of type {dest_tag:?}")]
    TypeMismatch {
        field: String,
        source_tag: crate::dictionary::TypeTag,
        dest_tag: crate::dictionary::TypeTag,
    },

    #[error("duplicate field map target '{0}'")]
    DuplicateFieldMap(String),

    #[error("map references unknown field '{0}'")]
    UnknownMapField(String),

    #[error("'{0}' is not a table and cannot be materialized for a join")]
    NotMaterializable(String),

    #[error("select count(*) requires a star argument; '{0}' is not a valid aggregate argument")]
    InvalidAggregateArgument(String),
}

/// Errors raised while linking/auto-mapping a whole program (`spec.md` §4.5).
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("no type-compatible destination stream found for auto-mapped stream '{0}'")]
    IncompatibleAutoMap(String),

    #[error("reader '{0}' is not declared")]
    UnknownReader(String),

    #[error("writer '{0}' is not declared")]
    UnknownWriter(String),

    #[error("map source stream '{0}' was not found in the reader's dictionary")]
    UnknownMapSource(String),

    #[error("map destination stream '{0}' was not found in the writer's dictionary")]
    UnknownMapDestination(String),
}

/// Errors raised by the multi-script network pass (`spec.md` §4.6).
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("no matching Network reader found for writer '{0}' in script '{1}'")]
    UnmatchedWriter(String, String),

    #[error("no matching Network writer found for reader '{0}' in script '{1}'")]
    UnmatchedReader(String, String),
}

/// Errors raised while loading a dictionary file (`spec.md` §3a / §7 I/O).
#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("dictionary file '{0}' not found")]
    NotFound(String),

    #[error("dictionary file '{0}' could not be parsed: {1}")]
    Unparseable(String, String),
}
