//! Error types shared by the generators.
//!
//! Every failure carries enough context (target, configuration, path) to be
//! reported without consulting the input graph again.

// The unused_assignments lint fires on thiserror/miette derive expansion in
// some toolchains and not others, so `#[expect]` cannot be used.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::io;

use camino::Utf8PathBuf;
use itertools::Itertools;
use miette::Diagnostic;
use thiserror::Error;

use crate::model::{QualifiedTarget, SettingValue};

fn join_paths(paths: &[Utf8PathBuf]) -> String {
    paths.iter().join(", ")
}

fn join_cycle(cycle: &[QualifiedTarget]) -> String {
    cycle.iter().join(" -> ")
}

/// Malformed or contradictory target settings.
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    /// Two contributions to one setting cannot be merged.
    #[error(
        "cannot merge {appended} into {tool}.{setting} for {target} ({configuration}); \
         previous value was {previous}"
    )]
    #[diagnostic(
        code(projgen::schema::setting_conflict),
        help("only list settings may be appended to list settings")
    )]
    SettingConflict {
        /// Target owning the setting.
        target: QualifiedTarget,
        /// Configuration key (`name|platform` or configuration name).
        configuration: String,
        /// Tool or settings block name.
        tool: String,
        /// Setting name.
        setting: String,
        /// Value already stored.
        previous: SettingValue,
        /// Value that could not be merged.
        appended: SettingValue,
    },
    /// `msvs_settings` names a tool the generator does not know.
    #[error("unknown Visual Studio tool {tool} in {target} ({configuration})")]
    #[diagnostic(code(projgen::schema::unknown_tool))]
    UnknownTool {
        /// Target owning the settings block.
        target: QualifiedTarget,
        /// Configuration key.
        configuration: String,
        /// Tool name as written.
        tool: String,
    },
    /// A linkable target lists more than one module-definition file.
    #[error("{target} has more than one module definition file: {}", join_paths(.files))]
    #[diagnostic(
        code(projgen::schema::multiple_module_definitions),
        help("keep a single .def file in the sources of a shared library")
    )]
    MultipleModuleDefinitions {
        /// Offending target.
        target: QualifiedTarget,
        /// All `.def` sources found.
        files: Vec<Utf8PathBuf>,
    },
}

/// Input that is well-formed but violates a generator constraint.
#[derive(Debug, Error, Diagnostic)]
pub enum ValidationError {
    /// An explicit project GUID is not uppercase hex with dashes.
    #[error("invalid msvs_guid {guid:?} for {target}; only uppercase hexadecimal digits and dashes are allowed")]
    #[diagnostic(code(projgen::validation::invalid_guid))]
    InvalidGuid {
        /// Target declaring the GUID.
        target: QualifiedTarget,
        /// Rejected value.
        guid: String,
    },
    /// A target is listed or referenced but never defined.
    #[error("target {target} is listed but not defined")]
    #[diagnostic(code(projgen::validation::unknown_target))]
    UnknownTarget {
        /// Missing target.
        target: QualifiedTarget,
    },
    /// A configuration name does not exist on the target.
    #[error("{target} has no configuration named {name:?}")]
    #[diagnostic(code(projgen::validation::missing_configuration))]
    MissingConfiguration {
        /// Target being generated.
        target: QualifiedTarget,
        /// Requested configuration name.
        name: String,
    },
    /// Two generated artifacts would occupy the same path.
    #[error("generated file {path} is produced by both {first} and {second}")]
    #[diagnostic(code(projgen::validation::output_collision))]
    OutputCollision {
        /// Colliding path.
        path: Utf8PathBuf,
        /// First producer.
        first: String,
        /// Second producer.
        second: String,
    },
    /// A custom build step has no input file to attach its command to.
    #[error("step {step:?} of {target} has no inputs; Visual Studio can only run steps attached to a file")]
    #[diagnostic(code(projgen::validation::step_without_inputs))]
    StepWithoutInputs {
        /// Target declaring the step.
        target: QualifiedTarget,
        /// Step description.
        step: String,
    },
    /// A file configuration refers to a file the project does not list.
    #[error("file configuration for {path} refers to a file that is not part of project {project}")]
    #[diagnostic(code(projgen::validation::file_not_in_project))]
    FileNotInProject {
        /// Project name.
        project: String,
        /// Project-relative file path.
        path: String,
    },
}

/// Structural problems in the dependency graph.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// The dependency graph contains a cycle.
    #[error("circular dependency detected: {}", join_cycle(.cycle))]
    #[diagnostic(code(projgen::graph::cycle))]
    Cycle {
        /// Members of the cycle, starting and ending at the smallest member.
        cycle: Vec<QualifiedTarget>,
    },
    /// A dependency refers to a target that is not defined.
    #[error("{dependent} depends on undefined target {target}")]
    #[diagnostic(code(projgen::graph::unknown_target))]
    UnknownTarget {
        /// Undefined target.
        target: QualifiedTarget,
        /// Target declaring the dependency.
        dependent: QualifiedTarget,
    },
}

/// Top-level error returned by a generation pass.
#[derive(Debug, Error, Diagnostic)]
pub enum GenError {
    /// Setting or schema problem.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),
    /// Constraint violation.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),
    /// Dependency graph problem.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
    /// Reading the input graph failed.
    #[error("failed to read target graph {path}")]
    #[diagnostic(code(projgen::input::read))]
    Read {
        /// Input path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The input graph is not valid JSON for the model.
    #[error("malformed target graph {path}")]
    #[diagnostic(code(projgen::input::parse))]
    Input {
        /// Input path or `<memory>`.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// Writing an output file failed.
    #[error("failed to write {path}")]
    #[diagnostic(code(projgen::output::io))]
    Io {
        /// File or directory involved.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Two objects in one generated file share an identifier.
    #[error("identifier {id} in {file} is shared by {first} and {second}")]
    #[diagnostic(code(projgen::output::id_collision))]
    IdCollision {
        /// Generated file.
        file: Utf8PathBuf,
        /// Colliding identifier.
        id: String,
        /// First owner.
        first: String,
        /// Second owner.
        second: String,
    },
}

impl GenError {
    /// Wrap an I/O error with the path it concerns.
    pub(crate) fn io(path: impl Into<Utf8PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
