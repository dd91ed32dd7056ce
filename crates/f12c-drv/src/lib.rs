//! f12c-drv - Compiler Driver
//!
//! Orchestrates the pipeline:
//!
//! ```text
//! source text
//!     │  f12c-lex      tokens
//!     │  f12c-par      AST
//!     │  f12c-sem      includes → names/slots → types → entry point
//!     │  f12c-gen      bytecode buffer + string pool
//!     ▼
//! <src>.f12b (raw buffer), <src>.f12s (disassembly listing)
//!     │  f12c-vm
//!     ▼
//! execution
//! ```
//!
//! Lexing, parsing and include errors abort immediately with one rendered
//! diagnostic; semantic errors are collected and reported together. Either
//! way the driver exits nonzero without emitting.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};

use f12c_par::Program;
use f12c_sem::Analysis;
use f12c_util::{Handler, SourceMap};
use f12c_vm::{Vm, VmOptions};

/// Command line interface of the `f12c` binary.
#[derive(Debug, Parser)]
#[command(name = "f12c", about = "Compiler and virtual machine for the F12 language")]
pub struct Cli {
    /// The source file to compile.
    pub source: PathBuf,

    /// Stop after producing the given artifact instead of running.
    #[arg(long, value_enum)]
    pub emit: Option<Emit>,

    /// Do not write the `<src>.f12s` disassembly listing.
    #[arg(long)]
    pub no_listing: bool,

    /// Do not write the `<src>.f12b` bytecode file.
    #[arg(long)]
    pub no_bytecode: bool,

    /// VM memory size in bytes.
    #[arg(long, default_value_t = 1024 * 1024)]
    pub memory: usize,

    /// VM heap region size in bytes.
    #[arg(long, default_value_t = 256 * 1024)]
    pub heap: usize,

    /// Verbose pipeline logging (repeat for more).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Pipeline artifacts the driver can stop at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Emit {
    Tokens,
    Ast,
    Bytecode,
}

/// A successfully compiled program.
#[derive(Debug)]
pub struct CompiledProgram {
    pub code: Vec<u8>,
    pub sources: SourceMap,
}

/// Entry point used by the binary.
pub fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run_cli(&cli)
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the whole pipeline for the given CLI invocation.
pub fn run_cli(cli: &Cli) -> Result<()> {
    let source = fs::read_to_string(&cli.source)
        .with_context(|| format!("cannot read {}", cli.source.display()))?;
    let name = cli.source.to_string_lossy().to_string();

    if cli.emit == Some(Emit::Tokens) {
        let mut sources = SourceMap::new();
        let file = sources.add_file(name.as_str(), source.clone());
        let tokens = f12c_lex::lex(&source, file)
            .map_err(|err| anyhow!("{}", err.render(&sources)))?;
        print_tokens(&tokens);
        return Ok(());
    }

    if cli.emit == Some(Emit::Ast) {
        let (program, _, _) = front_end(&source, &name)?;
        println!("{:#?}", program.elements);
        return Ok(());
    }

    let compiled = compile_source(&source, &name)?;

    if !cli.no_bytecode {
        let path = side_file(&cli.source, "f12b");
        fs::write(&path, &compiled.code)
            .with_context(|| format!("cannot write {}", path.display()))?;
        debug!(path = %path.display(), bytes = compiled.code.len(), "wrote bytecode");
    }

    if !cli.no_listing {
        let disassembly = f12c_ops::disassemble(&compiled.code)
            .context("emitted bytecode failed to disassemble")?;
        let path = side_file(&cli.source, "f12s");
        fs::write(&path, disassembly.to_string())
            .with_context(|| format!("cannot write {}", path.display()))?;
        debug!(path = %path.display(), "wrote listing");
    }

    if cli.emit == Some(Emit::Bytecode) {
        return Ok(());
    }

    info!("running");
    let options = VmOptions {
        memory_size: cli.memory,
        heap_size: cli.heap,
    };
    let mut vm = Vm::with_io(
        &compiled.code,
        options,
        std::io::stdin(),
        std::io::stdout(),
    )
    .map_err(|err| anyhow!("Runtime error : {}", err))?;
    vm.run().map_err(|err| anyhow!("Runtime error : {}", err))?;

    Ok(())
}

/// Lex, parse, resolve includes and analyze one source text.
fn front_end(source: &str, name: &str) -> Result<(Program, Analysis, SourceMap)> {
    let mut sources = SourceMap::new();
    let file = sources.add_file(name, source);

    info!(file = name, "lexing");
    let tokens =
        f12c_lex::lex(source, file).map_err(|err| anyhow!("{}", err.render(&sources)))?;
    debug!(tokens = tokens.len(), "lexed");

    info!("parsing");
    let mut program =
        f12c_par::parse(tokens).map_err(|err| anyhow!("{}", err.render(&sources)))?;

    info!("resolving includes");
    f12c_sem::resolve_includes(&mut program, &mut sources)
        .map_err(|err| anyhow!("{}", err.render(&sources)))?;

    info!("analyzing");
    let mut handler = Handler::new();
    let analysis = f12c_sem::analyze(&mut program, &mut handler);
    if handler.has_errors() {
        bail!("{}", handler.render_all(&sources));
    }

    Ok((program, analysis, sources))
}

/// Compile a source text all the way to bytecode.
pub fn compile_source(source: &str, name: &str) -> Result<CompiledProgram> {
    let (program, analysis, sources) = front_end(source, name)?;

    info!("emitting");
    let code = f12c_gen::emit_program(&program, &analysis);
    debug!(bytes = code.len(), "emitted");

    Ok(CompiledProgram { code, sources })
}

/// Compile a file on disk.
pub fn compile_file(path: &Path) -> Result<CompiledProgram> {
    let source =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    compile_source(&source, &path.to_string_lossy())
}

fn side_file(source: &Path, extension: &str) -> PathBuf {
    source.with_extension(extension)
}

fn print_tokens(tokens: &[f12c_lex::Token]) {
    println!("{:>5} | {:>5} | {:>17} | {:>17}", "ID", "LINE", "TYPE", "VALUE");
    for (index, token) in tokens.iter().enumerate() {
        println!(
            "{:>5} | {:>5} | {:>17} | {:>17}",
            index + 1,
            token.span.line,
            token.kind.to_string(),
            token.lexeme
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_source_produces_bytecode() {
        let compiled = compile_source("fun main { }", "test.f12").unwrap();
        assert!(!compiled.code.is_empty());
        // The buffer begins with ALLOCATE_IN_STACK.
        assert_eq!(&compiled.code[..2], &[0x00, 0x20]);
    }

    #[test]
    fn test_compile_error_is_rendered() {
        let err = compile_source("fun main { int x = 0123; }", "test.f12").unwrap_err();
        let text = format!("{}", err);
        assert!(text.contains("Multi digit integer cannot start with 0"));
        assert!(text.contains("test.f12:1:20"));
    }

    #[test]
    fn test_semantic_errors_are_batched() {
        let err = compile_source("fun main { ret x; ret y; }", "test.f12").unwrap_err();
        let text = format!("{}", err);
        assert!(text.contains("\"x\" is not declared"));
        assert!(text.contains("\"y\" is not declared"));
    }

    #[test]
    fn test_side_file_naming() {
        assert_eq!(
            side_file(Path::new("dir/main.f12"), "f12b"),
            PathBuf::from("dir/main.f12b")
        );
    }
}
