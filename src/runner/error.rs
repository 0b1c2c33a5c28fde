//! Error types for the runner module.

// The unused_assignments lint fires on thiserror/miette derive expansion in
// some toolchains and not others, so `#[expect]` cannot be used.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised before generation starts.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The target graph does not exist at the expected path.
    #[error("target graph {path} not found")]
    #[diagnostic(
        code(projgen::runner::graph_not_found),
        help("pass the graph with --file or run from its directory with -C")
    )]
    GraphNotFound {
        /// The path that was attempted.
        path: Utf8PathBuf,
    },
    /// A command line path is not valid UTF-8.
    #[error("path {path} is not valid UTF-8")]
    #[diagnostic(code(projgen::runner::non_utf8_path))]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },
}
