//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure consumed by [`crate::runner`].

use clap::Parser;
use std::path::PathBuf;

use crate::Format;
use crate::msvs::MsvsVersion;

/// Generates IDE project files from a normalized target graph.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON target graph.
    #[arg(short, long, value_name = "FILE", default_value = "targets.json")]
    pub file: PathBuf,

    /// Run as if started in this directory.
    ///
    /// Both the graph path and every generated file are resolved against it.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// IDE format to generate; defaults to the host platform's IDE.
    #[arg(long, value_enum)]
    pub format: Option<Format>,

    /// Suffix appended to every generated file stem.
    #[arg(long, default_value = "")]
    pub suffix: String,

    /// Path from the graph root to the top of the source tree.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub depth: PathBuf,

    /// Visual Studio release to write (`2005`, `2008` or `auto`).
    #[arg(long, value_name = "VERSION", default_value = "auto")]
    pub msvs_version: MsvsVersion,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The selected format, falling back to the host platform's.
    #[must_use]
    pub fn format(&self) -> Format {
        self.format.unwrap_or_else(Format::native)
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            file: PathBuf::from("targets.json"),
            directory: None,
            format: None,
            suffix: String::new(),
            depth: PathBuf::from("."),
            msvs_version: MsvsVersion::default(),
            verbose: false,
        }
    }
}
