//! CLI execution logic.
//!
//! Keeps `main` minimal: [`run`] resolves the command line paths, loads the
//! target graph and hands it to the selected backend.

mod error;

pub use error::RunnerError;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::path::Path;
use tracing::{debug, info};

use crate::cli::Cli;
use crate::model::TargetGraph;
use crate::options::GeneratorOptions;
use crate::output::GenerationReport;

fn utf8(path: &Path) -> Result<Utf8PathBuf, RunnerError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).map_err(|path| RunnerError::NonUtf8Path {
        path: path.display().to_string(),
    })
}

/// Directory every relative path is resolved against.
fn resolve_root(cli: &Cli) -> Result<Utf8PathBuf, RunnerError> {
    cli.directory
        .as_ref()
        .map_or_else(|| Ok(Utf8PathBuf::from(".")), |dir| utf8(dir))
}

/// Options for one generation pass from the command line.
///
/// # Errors
///
/// Returns [`RunnerError::NonUtf8Path`] when a path argument is not UTF-8.
pub fn generator_options(cli: &Cli) -> Result<GeneratorOptions, RunnerError> {
    Ok(GeneratorOptions {
        output_root: resolve_root(cli)?,
        suffix: cli.suffix.clone(),
        depth: utf8(&cli.depth)?,
        msvs_version: cli.msvs_version,
    })
}

/// Determine the graph path respecting the CLI's directory option.
///
/// # Errors
///
/// Returns [`RunnerError`] when a path is not UTF-8 or the file is missing.
pub fn resolve_graph_path(cli: &Cli) -> Result<Utf8PathBuf, RunnerError> {
    let file = utf8(&cli.file)?;
    let path = resolve_root(cli)?.join(file);
    if path.is_file() {
        Ok(path)
    } else {
        Err(RunnerError::GraphNotFound { path })
    }
}

/// Execute the parsed [`Cli`].
///
/// # Errors
///
/// Returns an error when the graph cannot be loaded or generation fails.
pub fn run(cli: &Cli) -> Result<()> {
    let report = generate(cli)?;
    info!(
        "{} generation finished: {} written, {} unchanged",
        cli.format(),
        report.written(),
        report.files.len() - report.written()
    );
    Ok(())
}

/// Load the graph named by `cli` and generate its files.
///
/// # Errors
///
/// Returns an error when the graph cannot be loaded or generation fails.
pub fn generate(cli: &Cli) -> Result<GenerationReport> {
    let path = resolve_graph_path(cli)?;
    let options = generator_options(cli)?;
    debug!("Loading target graph from {path}");
    let graph = TargetGraph::from_path(&path).with_context(|| format!("loading target graph {path}"))?;
    let format = cli.format();
    debug!(%format, root = %options.output_root, "Generating project files");
    crate::generate(&graph, format, &options).with_context(|| format!("generating {format} files from {path}"))
}
