//! Projgen core library.
//!
//! Turns a normalized target graph (targets, their settings and the
//! dependencies between them) into Visual Studio solutions and projects or
//! into Xcode project bundles. The input is produced by a separate front end;
//! this crate only plans, assembles and writes the IDE files.

use std::fmt;

use clap::ValueEnum;

pub mod cli;
pub mod error;
pub mod graph;
pub mod ids;
pub mod model;
pub mod msvs;
pub mod options;
pub mod output;
pub mod rules;
pub mod runner;
pub mod settings;
pub mod solution;
pub mod sources;
pub mod steps;
pub mod variables;
pub mod xcode;

use error::GenError;
use model::TargetGraph;
use options::GeneratorOptions;
use output::GenerationReport;

/// IDE whose files are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Visual Studio solutions and `.vcproj` projects.
    Msvs,
    /// Xcode `.xcodeproj` bundles.
    Xcode,
}

impl Format {
    /// The format native to the host platform.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(target_os = "macos") {
            Self::Xcode
        } else {
            Self::Msvs
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Msvs => "msvs",
            Self::Xcode => "xcode",
        })
    }
}

/// Generate every file of `format` for `graph`.
///
/// # Errors
///
/// Returns the backend's [`GenError`] unchanged.
pub fn generate(
    graph: &TargetGraph,
    format: Format,
    options: &GeneratorOptions,
) -> Result<GenerationReport, GenError> {
    match format {
        Format::Msvs => msvs::generate(graph, options),
        Format::Xcode => xcode::generate(graph, options),
    }
}
