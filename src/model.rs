//! Normalized target graph consumed by the generators.
//!
//! The graph is produced by an external spec parser and arrives as JSON.
//! Every path is relative to the directory of the build file that declares
//! it and uses `/` separators; backends convert separators on emission.
//!
//! ```
//! use projgen::model::TargetGraph;
//!
//! let graph: TargetGraph = r#"{
//!     "targets": {
//!         "base/base.gyp:base": {
//!             "target_name": "base",
//!             "type": "static_library",
//!             "default_configuration": "Debug",
//!             "configurations": { "Debug": {} },
//!             "sources": ["a.cc"]
//!         }
//!     },
//!     "target_list": ["base/base.gyp:base"]
//! }"#.parse().expect("valid graph");
//! assert!(graph.validate().is_ok());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::error::{GenError, GraphError, ValidationError};
use crate::graph::{DependencyGraphBuilder, ProjectFactory, ProjectGraph, ProjectId};

/// Fully qualified target name: `path/to/file.gyp:target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedTarget {
    /// Build file declaring the target.
    pub build_file: Utf8PathBuf,
    /// Target name within the build file.
    pub target_name: String,
}

/// Error returned when a qualified target lacks the `:` separator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("qualified target {0:?} must have the form build_file:target")]
pub struct ParseTargetError(String);

impl QualifiedTarget {
    /// Build a qualified target from its parts.
    pub fn new(build_file: impl Into<Utf8PathBuf>, target_name: impl Into<String>) -> Self {
        Self {
            build_file: build_file.into(),
            target_name: target_name.into(),
        }
    }

    /// Directory containing the build file; empty for top-level files.
    #[must_use]
    pub fn build_dir(&self) -> &Utf8Path {
        self.build_file.parent().unwrap_or_else(|| Utf8Path::new(""))
    }
}

impl fmt::Display for QualifiedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.build_file, self.target_name)
    }
}

impl FromStr for QualifiedTarget {
    type Err = ParseTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once(':') {
            Some((file, name)) if !file.is_empty() && !name.is_empty() => Ok(Self::new(file, name)),
            _ => Err(ParseTargetError(s.to_owned())),
        }
    }
}

impl TryFrom<String> for QualifiedTarget {
    type Error = ParseTargetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QualifiedTarget> for String {
    fn from(value: QualifiedTarget) -> Self {
        value.to_string()
    }
}

/// Kind of artifact a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// Linked program.
    Executable,
    /// Dynamically linked library.
    SharedLibrary,
    /// Plugin-style dynamic library.
    LoadableModule,
    /// Archive of object files.
    StaticLibrary,
    /// Target without a linked product (actions, rules, copies only).
    #[serde(rename = "none")]
    Utility,
    /// Executable built only for its side effects.
    DummyExecutable,
}

impl TargetType {
    /// Whether the product is a dynamic library with module definitions.
    #[must_use]
    pub const fn is_dynamic_library(self) -> bool {
        matches!(self, Self::SharedLibrary | Self::LoadableModule)
    }
}

/// A setting value: single string or ordered list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Single value.
    Scalar(String),
    /// Ordered list of values.
    List(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<RawScalar> for String {
    fn from(value: RawScalar) -> Self {
        match value {
            RawScalar::Text(text) => text,
            RawScalar::Int(n) => n.to_string(),
            RawScalar::Float(n) => n.to_string(),
            RawScalar::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSettingValue {
    Scalar(RawScalar),
    List(Vec<RawScalar>),
}

impl From<RawSettingValue> for SettingValue {
    fn from(value: RawSettingValue) -> Self {
        match value {
            RawSettingValue::Scalar(s) => Self::Scalar(s.into()),
            RawSettingValue::List(items) => Self::List(items.into_iter().map(String::from).collect()),
        }
    }
}

impl<'de> Deserialize<'de> for SettingValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawSettingValue::deserialize(deserializer).map(Self::from)
    }
}

impl SettingValue {
    /// Build a list value.
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Empty contributions are ignored by merges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Scalar(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }

    /// Render the value, joining list items with `sep`.
    #[must_use]
    pub fn join(&self, sep: &str) -> String {
        match self {
            Self::Scalar(s) => s.clone(),
            Self::List(items) => items.join(sep),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_owned())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s:?}"),
            Self::List(items) => write!(f, "{items:?}"),
        }
    }
}

/// Preprocessor definition: `NAME`, `NAME=VALUE` or a `[NAME, VALUE]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SettingValue", into = "SettingValue")]
pub enum Define {
    /// Definition written as one string.
    Plain(String),
    /// Definition split into name and value parts.
    Pair(Vec<String>),
}

impl From<SettingValue> for Define {
    fn from(value: SettingValue) -> Self {
        match value {
            SettingValue::Scalar(s) => Self::Plain(s),
            SettingValue::List(parts) => Self::Pair(parts),
        }
    }
}

impl From<Define> for SettingValue {
    fn from(value: Define) -> Self {
        match value {
            Define::Plain(s) => Self::Scalar(s),
            Define::Pair(parts) => Self::List(parts),
        }
    }
}

impl Define {
    /// Textual `NAME=VALUE` form.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Plain(s) => s.clone(),
            Self::Pair(parts) => parts.join("="),
        }
    }
}

/// One build configuration of a target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Platform half of the composite key; `Win32` when absent.
    pub configuration_platform: Option<String>,
    /// Header search directories.
    pub include_dirs: Vec<Utf8PathBuf>,
    /// Preprocessor definitions.
    pub defines: Vec<Define>,
    /// Raw per-tool Visual Studio settings.
    pub msvs_settings: IndexMap<String, IndexMap<String, SettingValue>>,
    /// Raw Xcode build settings.
    pub xcode_settings: IndexMap<String, SettingValue>,
    /// Extra system header directories.
    pub msvs_system_include_dirs: Vec<Utf8PathBuf>,
    /// Resource compiler search directories; defaults to `include_dirs`.
    pub resource_include_dirs: Option<Vec<Utf8PathBuf>>,
    /// Framework search directories for Xcode.
    pub mac_framework_dirs: Vec<Utf8PathBuf>,
    /// Explicit project GUID.
    pub msvs_guid: Option<String>,
    /// Pre-existing project file used instead of a generated one.
    pub msvs_existing_vcproj: Option<Utf8PathBuf>,
    /// Inherited property sheets.
    pub msvs_props: Vec<Utf8PathBuf>,
    /// Cygwin setup directories; the first is used.
    pub msvs_cygwin_dirs: Vec<Utf8PathBuf>,
    /// Whether commands run through the cygwin shell; defaults to true.
    pub msvs_cygwin_shell: Option<bool>,
    /// Header to precompile.
    pub msvs_precompiled_header: Option<Utf8PathBuf>,
    /// Source file that creates the precompiled header.
    pub msvs_precompiled_source: Option<Utf8PathBuf>,
    /// Warning numbers to disable.
    pub msvs_disabled_warnings: Vec<SettingValue>,
    /// Pre-build event command lines.
    pub msvs_prebuild: Option<SettingValue>,
    /// Post-build event command lines.
    pub msvs_postbuild: Option<SettingValue>,
    /// Extra `.rules` tool files.
    pub msvs_tool_files: Vec<Utf8PathBuf>,
    /// Attributes copied onto the configuration element.
    pub msvs_configuration_attributes: IndexMap<String, SettingValue>,
}

impl Configuration {
    /// Platform name, defaulting to `Win32`.
    #[must_use]
    pub fn platform(&self) -> &str {
        self.configuration_platform.as_deref().unwrap_or("Win32")
    }

    /// Composite `name|platform` key.
    #[must_use]
    pub fn full_name(&self, name: &str) -> String {
        format!("{name}|{}", self.platform())
    }

    /// Whether commands should run through the cygwin shell.
    #[must_use]
    pub fn cygwin_shell(&self) -> bool {
        self.msvs_cygwin_shell.unwrap_or(true)
    }
}

/// Pattern-driven transformation of source files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    /// Rule name.
    pub rule_name: String,
    /// Trigger extension, without the dot.
    pub extension: String,
    /// Extra inputs; may use rule-input placeholders.
    pub inputs: Vec<String>,
    /// Output templates.
    pub outputs: Vec<String>,
    /// Command argv template.
    pub action: Vec<String>,
    /// Progress message.
    pub message: Option<String>,
    /// Whether outputs are compiled as sources.
    pub process_outputs_as_sources: bool,
    /// Expand through a generated makefile instead of a native rule file.
    pub msvs_external_rule: bool,
    /// Cygwin shell override for this rule.
    pub msvs_cygwin_shell: Option<bool>,
}

/// One-shot build step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Action {
    /// Action name.
    pub action_name: String,
    /// Input files.
    pub inputs: Vec<Utf8PathBuf>,
    /// Output files.
    pub outputs: Vec<Utf8PathBuf>,
    /// Command argv.
    pub action: Vec<String>,
    /// Progress message.
    pub message: Option<String>,
    /// Whether outputs are compiled as sources.
    pub process_outputs_as_sources: bool,
    /// Cygwin shell override for this action.
    pub msvs_cygwin_shell: Option<bool>,
}

/// Files copied into a destination directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Copy {
    /// Destination directory.
    pub destination: Utf8PathBuf,
    /// Files to copy.
    pub files: Vec<Utf8PathBuf>,
}

/// Command run after the target is linked (Xcode).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Postbuild {
    /// Display name.
    pub postbuild_name: String,
    /// Command argv.
    pub action: Vec<String>,
}

const fn default_true() -> bool {
    true
}

/// Declaration of one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Unqualified name.
    pub target_name: String,
    /// Kind of product.
    #[serde(rename = "type")]
    pub target_type: TargetType,
    /// Product name override.
    #[serde(default)]
    pub product_name: Option<String>,
    /// Source files.
    #[serde(default)]
    pub sources: Vec<Utf8PathBuf>,
    /// Sources shown in the project but not compiled.
    #[serde(default)]
    pub sources_excluded: Vec<Utf8PathBuf>,
    /// Name of the default configuration.
    pub default_configuration: String,
    /// Configurations by name.
    #[serde(default)]
    pub configurations: BTreeMap<String, Configuration>,
    /// Direct dependencies.
    #[serde(default)]
    pub dependencies: Vec<QualifiedTarget>,
    /// Libraries to link.
    #[serde(default)]
    pub libraries: Vec<String>,
    /// Actions.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Rules.
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Copies.
    #[serde(default)]
    pub copies: Vec<Copy>,
    /// Post-build steps (Xcode).
    #[serde(default)]
    pub postbuilds: Vec<Postbuild>,
    /// Whether the target is a test runner.
    #[serde(default)]
    pub test: bool,
    /// Whether the output file name is filled in automatically.
    #[serde(default = "default_true")]
    pub msvs_auto_output_file: bool,
    /// Output directory override.
    #[serde(default)]
    pub msvs_product_directory: Option<String>,
}

impl TargetSpec {
    /// The default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingConfiguration`] when the default
    /// configuration is not defined.
    pub fn default_config(&self, target: &QualifiedTarget) -> Result<&Configuration, ValidationError> {
        self.configurations
            .get(&self.default_configuration)
            .ok_or_else(|| ValidationError::MissingConfiguration {
                target: target.clone(),
                name: self.default_configuration.clone(),
            })
    }

    /// Name of the produced artifact.
    #[must_use]
    pub fn product_name(&self) -> &str {
        self.product_name.as_deref().unwrap_or(&self.target_name)
    }
}

/// Data attached to a build file rather than to a target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildFileData {
    /// Targets declared by the file, in declaration order.
    pub targets: Vec<QualifiedTarget>,
    /// Files included while loading the build file.
    pub included_files: Vec<Utf8PathBuf>,
    /// Project-wide Xcode settings.
    pub xcode_settings: IndexMap<String, SettingValue>,
}

/// The whole normalized input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetGraph {
    /// Target declarations keyed by qualified name.
    pub targets: IndexMap<QualifiedTarget, TargetSpec>,
    /// Targets in dependency order.
    pub target_list: Vec<QualifiedTarget>,
    /// Per build file data.
    #[serde(default)]
    pub build_files: IndexMap<Utf8PathBuf, BuildFileData>,
}

impl FromStr for TargetGraph {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map_err(|source| GenError::Input {
            path: Utf8PathBuf::from("<memory>"),
            source,
        })
    }
}

impl TargetGraph {
    /// Load a graph from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::Read`] or [`GenError::Input`].
    pub fn from_path(path: &Utf8Path) -> Result<Self, GenError> {
        let text = fs::read_to_string(path).map_err(|source| GenError::Read {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| GenError::Input {
            path: path.to_owned(),
            source,
        })
    }

    /// Look up a target declaration.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownTarget`] when the target is missing.
    pub fn spec(&self, target: &QualifiedTarget) -> Result<&TargetSpec, ValidationError> {
        self.targets
            .get(target)
            .ok_or_else(|| ValidationError::UnknownTarget { target: target.clone() })
    }

    /// Build files with their data, sorted by path.
    ///
    /// Files mentioned only through `target_list` get synthesised data listing
    /// their targets in list order.
    #[must_use]
    pub fn build_files(&self) -> BTreeMap<Utf8PathBuf, BuildFileData> {
        let mut files: BTreeMap<Utf8PathBuf, BuildFileData> = self
            .build_files
            .iter()
            .map(|(path, data)| (path.clone(), data.clone()))
            .collect();
        for target in &self.target_list {
            let data = files.entry(target.build_file.clone()).or_default();
            if !data.targets.contains(target) {
                data.targets.push(target.clone());
            }
        }
        files
    }

    /// Check the graph before anything is generated.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for undefined targets or configurations
    /// and a [`GraphError`] for dangling dependencies or cycles.
    pub fn validate(&self) -> Result<(), GenError> {
        for target in &self.target_list {
            let spec = self.spec(target)?;
            spec.default_config(target)?;
        }
        let mut builder = DependencyGraphBuilder::new(DependencyCheck { graph: self });
        for target in &self.target_list {
            builder.build(target)?;
        }
        Ok(())
    }
}

/// Factory used by [`TargetGraph::validate`]: creates empty nodes so the
/// builder's cycle guard runs over the whole graph.
struct DependencyCheck<'a> {
    graph: &'a TargetGraph,
}

impl ProjectFactory for DependencyCheck<'_> {
    type Node = ();
    type Error = GenError;

    fn dependencies_of(&self, target: &QualifiedTarget) -> Result<Vec<QualifiedTarget>, GenError> {
        let spec = self.graph.spec(target)?;
        for dep in &spec.dependencies {
            if !self.graph.targets.contains_key(dep) {
                return Err(GraphError::UnknownTarget {
                    target: dep.clone(),
                    dependent: target.clone(),
                }
                .into());
            }
        }
        Ok(spec.dependencies.clone())
    }

    fn create(
        &mut self,
        _target: &QualifiedTarget,
        _dependencies: &[ProjectId],
        _graph: &ProjectGraph<()>,
    ) -> Result<(), GenError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("base/base.gyp:base", "base/base.gyp", "base")]
    #[case("C:/src/a.gyp:t", "C:/src/a.gyp", "t")]
    fn parses_qualified_targets(#[case] text: &str, #[case] file: &str, #[case] name: &str) {
        let target: QualifiedTarget = text.parse().expect("parse");
        assert_eq!(target.build_file, Utf8PathBuf::from(file));
        assert_eq!(target.target_name, name);
        assert_eq!(target.to_string(), text);
    }

    #[rstest]
    #[case("no_separator")]
    #[case(":missing_file")]
    #[case("missing_name.gyp:")]
    fn rejects_malformed_targets(#[case] text: &str) {
        assert!(text.parse::<QualifiedTarget>().is_err());
    }

    #[test]
    fn parse_errors_report_the_cause_once() {
        let err = "{ \"targets\": 3 }".parse::<TargetGraph>().expect_err("malformed");
        assert_eq!(err.to_string(), "malformed target graph <memory>");
        let cause = std::error::Error::source(&err).expect("serde cause").to_string();
        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chain.matches(cause.as_str()).count(), 1, "{chain}");
    }

    #[test]
    fn setting_values_accept_numbers_and_bools() {
        let value: SettingValue = serde_json::from_str("[1, true, \"x\"]").expect("list");
        assert_eq!(value, SettingValue::list(["1", "true", "x"]));
        let scalar: SettingValue = serde_json::from_str("2").expect("scalar");
        assert_eq!(scalar, SettingValue::from("2"));
    }

    #[rstest]
    #[case(r#""NDEBUG""#, "NDEBUG")]
    #[case(r#"["VERSION", "2"]"#, "VERSION=2")]
    fn defines_render_as_text(#[case] json: &str, #[case] expected: &str) {
        let define: Define = serde_json::from_str(json).expect("define");
        assert_eq!(define.text(), expected);
    }

    #[test]
    fn validate_reports_missing_default_configuration() {
        let graph: TargetGraph = r#"{
            "targets": {
                "a.gyp:a": {
                    "target_name": "a",
                    "type": "executable",
                    "default_configuration": "Release",
                    "configurations": { "Debug": {} }
                }
            },
            "target_list": ["a.gyp:a"]
        }"#
        .parse()
        .expect("graph");
        let err = graph.validate().expect_err("missing configuration");
        assert!(matches!(
            err,
            GenError::Validation(ValidationError::MissingConfiguration { .. })
        ));
    }

    #[test]
    fn validate_reports_dangling_dependencies() {
        let graph: TargetGraph = r#"{
            "targets": {
                "a.gyp:a": {
                    "target_name": "a",
                    "type": "none",
                    "default_configuration": "Debug",
                    "configurations": { "Debug": {} },
                    "dependencies": ["b.gyp:b"]
                }
            },
            "target_list": ["a.gyp:a"]
        }"#
        .parse()
        .expect("graph");
        let err = graph.validate().expect_err("dangling dependency");
        assert!(matches!(err, GenError::Graph(GraphError::UnknownTarget { .. })));
    }

    #[test]
    fn build_files_include_listed_targets() {
        let graph: TargetGraph = r#"{
            "targets": {
                "b/b.gyp:one": {
                    "target_name": "one",
                    "type": "none",
                    "default_configuration": "Debug"
                }
            },
            "target_list": ["b/b.gyp:one"]
        }"#
        .parse()
        .expect("graph");
        let files = graph.build_files();
        let data = files.get(Utf8Path::new("b/b.gyp")).expect("build file");
        assert_eq!(data.targets, vec![QualifiedTarget::new("b/b.gyp", "one")]);
    }
}
