//! Grimoire: turns a raster photo of a hand-drawn magic circle into
//! executable Python source.
//!
//! `compile_bytes`/`compile_path` are the library's only entry points — a
//! compile invocation is a pure function from image bytes to either
//! generated source or a [`GrimoireError`] (spec.md §5: "a compile
//! invocation is a pure, single-threaded function from bytes to bytes").
//! Everything else in this crate is a stage that function drives, in
//! order: [`detector`] -> [`parser`] -> [`generator`].

pub mod config;
pub mod detector;
pub mod error;
pub mod generator;
pub mod optimize;
pub mod parser;
pub mod types;

use config::Config;
use detector::symbol::SymbolType;
use detector::Detector;
use error::{GrimoireError, Location};
use parser::ast::Program;
use std::path::Path;

/// The result of one compile: generated source plus the symbols and
/// connections the detector found, for callers that want the `debug`
/// view without a second pass (spec.md §6's `debug` subcommand).
pub struct CompileOutput {
    pub source: String,
    pub symbols: Vec<detector::symbol::Symbol>,
    pub connections: Vec<detector::connection::Connection>,
}

/// Runs detection and parsing only, stopping short of code generation —
/// what the CLI's `validate` subcommand needs (spec.md §6.2).
pub fn build_program(
    bytes: &[u8],
    path: Option<&Path>,
    config: &Config,
) -> error::Result<(Program, Vec<detector::symbol::Symbol>, Vec<detector::connection::Connection>)> {
    let location = || match path {
        Some(p) => Location::path(p),
        None => Location::none(),
    };

    let detector = Detector::new(config.clone()).with_parallel(config.parallel);
    let (symbols, connections) = detector.detect(bytes, path)?;

    let outer = symbols
        .iter()
        .find(|s| s.symbol_type == SymbolType::OuterCircle)
        .ok_or_else(|| GrimoireError::NoOuterCircle { location: location() })?;
    let outer_centroid = outer.position;

    let non_outer: Vec<_> = symbols.iter().filter(|s| s.symbol_type != SymbolType::OuterCircle).cloned().collect();
    let offset = symbols.len() - non_outer.len();
    let reindexed: Vec<detector::connection::Connection> = connections
        .iter()
        .cloned()
        .map(|mut c| {
            c.from -= offset;
            c.to -= offset;
            c
        })
        .collect();

    let program = parser::parse(&non_outer, &reindexed, outer_centroid, &location())?;
    Ok((program, symbols, connections))
}

/// Runs the full pipeline over in-memory image bytes.
pub fn compile_bytes(bytes: &[u8], path: Option<&Path>, config: &Config) -> error::Result<CompileOutput> {
    let (program, symbols, connections) = build_program(bytes, path, config)?;
    let source = generator::generate_python(&program)?;
    Ok(CompileOutput { source, symbols, connections })
}

/// Like [`compile_bytes`], but runs the `optimize` subcommand's peephole
/// constant-folding pass over the tree before generating source.
pub fn compile_bytes_optimized(bytes: &[u8], path: Option<&Path>, config: &Config) -> error::Result<CompileOutput> {
    let (mut program, symbols, connections) = build_program(bytes, path, config)?;
    optimize::fold_constants(&mut program);
    let source = generator::generate_python(&program)?;
    Ok(CompileOutput { source, symbols, connections })
}

/// Runs the full pipeline over an image file on disk.
pub fn compile_path(path: &Path, config: &Config) -> error::Result<CompileOutput> {
    let bytes = std::fs::read(path).map_err(|_| GrimoireError::FileNotFound { location: Location::path(path) })?;
    compile_bytes(&bytes, Some(path), config)
}

/// Optimized counterpart of [`compile_path`].
pub fn compile_path_optimized(path: &Path, config: &Config) -> error::Result<CompileOutput> {
    let bytes = std::fs::read(path).map_err(|_| GrimoireError::FileNotFound { location: Location::path(path) })?;
    compile_bytes_optimized(&bytes, Some(path), config)
}

/// Runs detection and parsing only — the `validate` subcommand's contract.
pub fn check_path(path: &Path, config: &Config) -> error::Result<Program> {
    let bytes = std::fs::read(path).map_err(|_| GrimoireError::FileNotFound { location: Location::path(path) })?;
    let (program, _, _) = build_program(&bytes, Some(path), config)?;
    Ok(program)
}
