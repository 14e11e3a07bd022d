// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pansqlc` — the thin CLI driver bounded by `SPEC_FULL.md` §9. It
//! contains no compiler logic of its own: both subcommands call straight
//! into [`pansqlc::compile`]/[`pansqlc::compile_files`] and exit non-zero
//! on the first `CompilerError` (`spec.md` §6 "Exit semantics").

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pansqlc", author, version, about = "Compiler for the PanSQL data-synchronization DSL")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a single PanSQL script.
    Compile {
        /// Path to the `.pansql` script.
        script: PathBuf,
        /// Directory to write `<name>.rs`/`<name>.toml`/`<name>.connectors.yaml`
        /// into. Prints to stdout when omitted.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Compile several scripts together as one network-sync bundle,
    /// running the multi-script network pass across them.
    CompileFiles {
        /// Directory the script paths below are resolved relative to.
        root_dir: PathBuf,
        /// Script paths, relative to `root_dir`.
        scripts: Vec<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Compile { script, out_dir } => run_compile(&script, out_dir.as_deref()),
        Command::CompileFiles {
            root_dir,
            scripts,
            out_dir,
        } => run_compile_files(&root_dir, &scripts, out_dir.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_compile(script: &Path, out_dir: Option<&Path>) -> Result<(), pansqlc::CompilerError> {
    let text = std::fs::read_to_string(script)?;
    let name = script
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string());
    let base_dir = script.parent().unwrap_or_else(|| Path::new("."));
    let output = pansqlc::compile_in_dir(&name, &text, base_dir)?;
    emit_warnings(&output.warnings);
    write_or_print(&name, &output, out_dir)
}

fn run_compile_files(
    root_dir: &Path,
    scripts: &[PathBuf],
    out_dir: Option<&Path>,
) -> Result<(), pansqlc::CompilerError> {
    let outputs = pansqlc::compile_files(root_dir, scripts)?;
    for (script, output) in scripts.iter().zip(outputs.iter()) {
        emit_warnings(&output.warnings);
        let name = script
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "script".to_string());
        write_or_print(&name, output, out_dir)?;
    }
    Ok(())
}

fn emit_warnings(warnings: &[pansqlc::Warning]) {
    for w in warnings {
        log::warn!("{w}");
    }
}

fn write_or_print(
    name: &str,
    output: &pansqlc::CompileOutput,
    out_dir: Option<&Path>,
) -> Result<(), pansqlc::CompilerError> {
    match out_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            std::fs::write(dir.join(format!("{name}.rs")), &output.code)?;
            std::fs::write(dir.join(format!("{name}.toml")), &output.project_file)?;
            std::fs::write(dir.join(format!("{name}.connectors.yaml")), &output.connectors)?;
        }
        None => {
            println!("// === {name}.rs ===\n{}", output.code);
            println!("// === {name}.toml ===\n{}", output.project_file);
            println!("// === {name}.connectors.yaml ===\n{}", output.connectors);
        }
    }
    Ok(())
}
