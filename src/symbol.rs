// SPDX-License-Identifier: MIT OR Apache-2.0

//! Symbol table: identifier → (kind, resolved reference) (`spec.md` §3).
//!
//! Top-level bound identifiers are case-insensitive; dictionary-internal
//! stream/field names stay case-sensitive (`spec.md` §9 Open Question,
//! resolved in SPEC_FULL.md §10). Enforced here by normalizing lookup keys
//! to lowercase while leaving `StreamDefinition` untouched.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::DeclKind;
use crate::dictionary::{DataDictionary, StreamDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Dict,
    StreamVar,
    TableVar,
    Reader,
    Writer,
}

/// A bound variable and the schema it carries forward, mirroring
/// `spec.md` §3's "each variable carries its origin dictionary and the
/// underlying `StreamDefinition`".
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub origin_dict: Option<String>,
    pub stream: Option<Rc<StreamDefinition>>,
}

impl Symbol {
    pub fn decl_kind(&self) -> Option<DeclKind> {
        match self.kind {
            SymbolKind::TableVar => Some(DeclKind::Table),
            SymbolKind::StreamVar => Some(DeclKind::Stream),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
    dicts: HashMap<String, Rc<DataDictionary>>,
    /// Stream-kind variables consumed by a `select` `FROM`/`JOIN`, keyed by
    /// lowercased name (`spec.md` §4.3 pass 3, single-use enforcement).
    consumed: HashMap<String, bool>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    fn key(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(&Self::key(name))
    }

    pub fn bind_dict(&mut self, name: &str, dict: Rc<DataDictionary>) {
        self.dicts.insert(Self::key(name), dict.clone());
        self.symbols.insert(
            Self::key(name),
            Symbol {
                name: name.to_string(),
                kind: SymbolKind::Dict,
                origin_dict: None,
                stream: None,
            },
        );
    }

    pub fn dict(&self, name: &str) -> Option<&Rc<DataDictionary>> {
        self.dicts.get(&Self::key(name))
    }

    pub fn bind_var(
        &mut self,
        name: &str,
        decl_kind: DeclKind,
        origin_dict: String,
        stream: Rc<StreamDefinition>,
    ) {
        let kind = match decl_kind {
            DeclKind::Table => SymbolKind::TableVar,
            DeclKind::Stream => SymbolKind::StreamVar,
        };
        self.symbols.insert(
            Self::key(name),
            Symbol {
                name: name.to_string(),
                kind,
                origin_dict: Some(origin_dict),
                stream: Some(stream),
            },
        );
    }

    pub fn bind_endpoint(&mut self, name: &str, kind: SymbolKind, origin_dict: String) {
        self.symbols.insert(
            Self::key(name),
            Symbol {
                name: name.to_string(),
                kind,
                origin_dict: Some(origin_dict),
                stream: None,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(&Self::key(name))
    }

    /// Marks a `Stream`-kind variable as consumed. Returns `false` if it
    /// was already consumed (fatal per `spec.md` §4.3 pass 3).
    pub fn mark_consumed(&mut self, name: &str) -> bool {
        let key = Self::key(name);
        if self.consumed.get(&key).copied().unwrap_or(false) {
            false
        } else {
            self.consumed.insert(key, true);
            true
        }
    }

    pub fn is_consumed(&self, name: &str) -> bool {
        self.consumed.get(&Self::key(name)).copied().unwrap_or(false)
    }

    pub fn all_stream_vars(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols
            .values()
            .filter(|s| s.kind == SymbolKind::StreamVar || s.kind == SymbolKind::TableVar)
    }

    pub fn all(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::StreamDefinition;

    #[test]
    fn lookup_is_case_insensitive_for_bound_names() {
        let mut table = SymbolTable::new();
        table.bind_dict("MyDataDict", Rc::new(DataDictionary::default()));
        assert!(table.get("mydatadict").is_some());
        assert!(table.get("MYDATADICT").is_some());
    }

    #[test]
    fn single_use_enforced_once() {
        let mut table = SymbolTable::new();
        table.bind_var(
            "users",
            DeclKind::Stream,
            "Src".to_string(),
            Rc::new(StreamDefinition::new("Src", "Users")),
        );
        assert!(table.mark_consumed("users"));
        assert!(!table.mark_consumed("Users"));
    }
}
