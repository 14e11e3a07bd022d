// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pansqlc` — a compiler for PanSQL, a small declarative data-
//! synchronization DSL (`spec.md` §1).
//!
//! The pipeline is leaf-first (`spec.md` §2): [`lexer`] and [`parser`]
//! produce a typed [`ast::Script`]; [`semantic`] resolves names, types and
//! the single-use rule; [`builder`] lowers each resolved `select` into
//! [`ir::TransformerIr`]; [`linker`] validates and auto-maps a whole
//! `sync` edge; [`network`] correlates `Network` endpoints across a
//! multi-script bundle; [`emitter`] renders the three output artifacts.
//!
//! This crate stays synchronous and single-threaded throughout (`spec.md`
//! §5) — it only ever compiles a program, never runs one.

pub mod ast;
pub mod builder;
pub mod connector_registry;
pub mod diagnostics;
pub mod dictionary;
pub mod emitter;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod linker;
pub mod network;
pub mod parser;
pub mod semantic;
pub mod span;
pub mod symbol;

use std::path::{Path, PathBuf};

pub use diagnostics::{Diagnostics, Warning};
pub use error::{CompileResult, CompilerError};

/// One script's fully compiled output (`spec.md` §6).
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub code: String,
    pub project_file: String,
    pub connectors: String,
    pub warnings: Vec<Warning>,
}

/// Compiles a single script in isolation — no multi-script network pass
/// (`spec.md` §6, `compile`).
pub fn compile(script_name: &str, script_text: &str) -> CompileResult<CompileOutput> {
    compile_with_loader(script_name, script_text, &dict_loader_relative_to(None))
}

/// Compiles a script whose `load` statements are resolved relative to
/// `base_dir` (typically the script's own directory, `spec.md` §6 "Inputs
/// on disk").
pub fn compile_in_dir(
    script_name: &str,
    script_text: &str,
    base_dir: &Path,
) -> CompileResult<CompileOutput> {
    compile_with_loader(
        script_name,
        script_text,
        &dict_loader_relative_to(Some(base_dir.to_path_buf())),
    )
}

fn dict_loader_relative_to(
    base_dir: Option<PathBuf>,
) -> impl Fn(&str) -> Result<dictionary::DataDictionary, error::DictionaryError> {
    move |path: &str| {
        let full = match &base_dir {
            Some(dir) => dir.join(path),
            None => PathBuf::from(path),
        };
        dictionary::load(&full)
    }
}

fn compile_with_loader(
    script_name: &str,
    script_text: &str,
    load_dict: &dyn Fn(&str) -> Result<dictionary::DataDictionary, error::DictionaryError>,
) -> CompileResult<CompileOutput> {
    log::debug!("compiling script '{script_name}'");

    let script = parser::Parser::parse_script(script_text)?;
    let analyzer = semantic::Analyzer::new(load_dict);
    let (analyzed, mut diagnostics) = analyzer.analyze(&script)?;

    let transformers: Vec<ir::TransformerIr> = analyzed
        .selects
        .iter()
        .map(builder::build)
        .collect::<Result<_, _>>()?;

    let plans = linker::link(&analyzed, &transformers, &mut diagnostics)?;

    let emitted = emitter::emit(&transformers, &plans, &analyzed.opens, &analyzed.dicts);

    log::debug!(
        "finished compiling '{script_name}': {} transformer(s), {} warning(s)",
        transformers.len(),
        diagnostics.warnings().len()
    );

    Ok(CompileOutput {
        code: emitted.code,
        project_file: emitted.project_file,
        connectors: emitted.connectors,
        warnings: diagnostics.warnings().to_vec(),
    })
}

/// Compiles several scripts as one network-sync bundle (`spec.md` §6,
/// `compileFiles`): each script is parsed, analyzed, lowered and linked
/// independently, then the multi-script network pass (`spec.md` §4.6)
/// correlates any `Network` endpoints across the set before emission.
pub fn compile_files(root_dir: &Path, paths: &[PathBuf]) -> CompileResult<Vec<CompileOutput>> {
    struct Unit {
        name: String,
        analyzed: semantic::AnalyzedProgram,
        transformers: Vec<ir::TransformerIr>,
        diagnostics: diagnostics::Diagnostics,
    }

    let mut units = Vec::with_capacity(paths.len());
    for path in paths {
        let script_dir = root_dir.join(path).parent().map(Path::to_path_buf).unwrap_or_else(|| root_dir.to_path_buf());
        let script_text = std::fs::read_to_string(root_dir.join(path))?;
        let script_name = path.display().to_string();

        log::debug!("compiling script '{script_name}' as part of a network-sync bundle");

        let load_dict = dict_loader_relative_to(Some(script_dir));
        let script = parser::Parser::parse_script(&script_text)?;
        let analyzer = semantic::Analyzer::new(&load_dict);
        let (analyzed, diagnostics) = analyzer.analyze(&script)?;
        let transformers: Vec<ir::TransformerIr> = analyzed
            .selects
            .iter()
            .map(builder::build)
            .collect::<Result<_, _>>()?;

        units.push(Unit {
            name: script_name,
            analyzed,
            transformers,
            diagnostics,
        });
    }

    {
        let mut network_units: Vec<network::NetworkUnit<'_>> = units
            .iter_mut()
            .map(|u| network::NetworkUnit {
                script_name: &u.name,
                analyzed: &mut u.analyzed,
            })
            .collect();
        network::apply(&mut network_units)?;
    }

    let mut outputs = Vec::with_capacity(units.len());
    for mut unit in units {
        let plans = linker::link(&unit.analyzed, &unit.transformers, &mut unit.diagnostics)?;
        let emitted = emitter::emit(
            &unit.transformers,
            &plans,
            &unit.analyzed.opens,
            &unit.analyzed.dicts,
        );
        outputs.push(CompileOutput {
            code: emitted.code,
            project_file: emitted.project_file,
            connectors: emitted.connectors,
            warnings: unit.diagnostics.warnings().to_vec(),
        });
    }

    Ok(outputs)
}
