//! Visual Studio backend.
//!
//! Every listed target gets a `.vcproj` next to its build file, and every
//! `.gyp` build file gets a `.sln` holding its targets and everything they
//! depend on. All documents are rendered in memory first so that a bad
//! setting or identifier stops the pass before any file is touched.

mod project;
mod solution;
mod target;
mod tool;
mod tool_file;
mod xml;

use std::collections::BTreeSet;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info};

pub use project::{ConfigSpec, FinalizedProject, ProjectWriter, SourceEntry, source_tree};
pub use solution::{Solution, SolutionProject};
pub use target::{ProjectFiles, ProjectPlan, build_project};
pub use tool::{MsvsTool, ToolSet};
pub use tool_file::{CustomBuildRule, NativeRuleFile};

use crate::error::{GenError, ValidationError};
use crate::graph::{
    DependencyGraphBuilder, ProjectFactory, ProjectGraph, ProjectId, deep_dependencies, relative_path,
};
use crate::ids::Guid;
use crate::model::{QualifiedTarget, TargetGraph};
use crate::options::GeneratorOptions;
use crate::output::{GenerationReport, write_if_changed};
use crate::solution::assemble;
use crate::variables::to_windows;

/// Visual Studio release whose file formats are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MsvsVersion {
    /// Visual Studio 2005.
    V2005,
    /// Visual Studio 2008.
    #[default]
    V2008,
}

impl MsvsVersion {
    /// `Version` attribute of project and tool files.
    #[must_use]
    pub const fn project_version(self) -> &'static str {
        match self {
            Self::V2005 => "8.00",
            Self::V2008 => "9.00",
        }
    }

    /// Solution file format number.
    #[must_use]
    pub const fn solution_format(self) -> &'static str {
        match self {
            Self::V2005 => "9.00",
            Self::V2008 => "10.00",
        }
    }

    /// Comment line naming the IDE.
    #[must_use]
    pub const fn header(self) -> &'static str {
        match self {
            Self::V2005 => "# Visual Studio 2005",
            Self::V2008 => "# Visual Studio 2008",
        }
    }
}

/// A Visual Studio version name that is not supported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported Visual Studio version {0:?}; expected 2005 or 2008")]
pub struct UnknownMsvsVersion(String);

impl FromStr for MsvsVersion {
    type Err = UnknownMsvsVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2005" => Ok(Self::V2005),
            "2008" | "auto" => Ok(Self::V2008),
            other => Err(UnknownMsvsVersion(other.to_owned())),
        }
    }
}

/// Decide path and GUID of every listed target's project.
fn plan_projects(
    graph: &TargetGraph,
    options: &GeneratorOptions,
) -> Result<IndexMap<QualifiedTarget, ProjectPlan>, GenError> {
    let mut plans = IndexMap::new();
    for target in &graph.target_list {
        let spec = graph.spec(target)?;
        let config = spec.default_config(target)?;
        let (file_name, existing) = config.msvs_existing_vcproj.as_ref().map_or_else(
            || (Utf8PathBuf::from(format!("{}{}.vcproj", spec.target_name, options.suffix)), false),
            |path| (path.clone(), true),
        );
        let path = target.build_dir().join(file_name);
        let guid = match &config.msvs_guid {
            Some(raw) => Guid::parse_explicit(target, raw)?,
            None => Guid::derive(path.as_str()),
        };
        plans.insert(
            target.clone(),
            ProjectPlan {
                target: target.clone(),
                path,
                guid,
                existing,
            },
        );
    }
    Ok(plans)
}

/// Supplies solution nodes from the planned projects.
struct SolutionFactory<'a> {
    graph: &'a TargetGraph,
    plans: &'a IndexMap<QualifiedTarget, ProjectPlan>,
    sln_dir: &'a Utf8Path,
}

impl ProjectFactory for SolutionFactory<'_> {
    type Node = SolutionProject;
    type Error = GenError;

    fn dependencies_of(&self, target: &QualifiedTarget) -> Result<Vec<QualifiedTarget>, GenError> {
        Ok(self.graph.spec(target)?.dependencies.clone())
    }

    fn create(
        &mut self,
        target: &QualifiedTarget,
        dependencies: &[ProjectId],
        graph: &ProjectGraph<SolutionProject>,
    ) -> Result<SolutionProject, GenError> {
        let spec = self.graph.spec(target)?;
        let plan = self
            .plans
            .get(target)
            .ok_or_else(|| ValidationError::UnknownTarget { target: target.clone() })?;
        Ok(SolutionProject {
            name: spec.target_name.clone(),
            path: to_windows(relative_path(&plan.path, self.sln_dir).as_str()),
            guid: plan.guid.clone(),
            dependencies: dependencies
                .iter()
                .filter_map(|id| graph.node(*id))
                .map(|node| node.payload.guid.clone())
                .collect(),
        })
    }
}

/// Render the solution for one build file.
fn render_solution(
    graph: &TargetGraph,
    plans: &IndexMap<QualifiedTarget, ProjectPlan>,
    build_file: &Utf8Path,
    sln_path: &Utf8Path,
    variants: &BTreeSet<String>,
    options: &GeneratorOptions,
) -> Result<String, GenError> {
    let roots: Vec<QualifiedTarget> = graph
        .target_list
        .iter()
        .filter(|t| t.build_file.as_path() == build_file)
        .cloned()
        .collect();
    let deep = deep_dependencies(&graph.targets, &roots)?;

    let mut builder = DependencyGraphBuilder::new(SolutionFactory {
        graph,
        plans,
        sln_dir: sln_path.parent().unwrap_or_else(|| Utf8Path::new("")),
    });
    let mut members = Vec::new();
    for target in roots.iter().chain(&deep) {
        members.push((builder.build(target)?, target));
    }
    let (projects, _) = builder.finish();

    let keys: Vec<String> = members
        .iter()
        .map(|(_, target)| format!("{}.vcproj", target.target_name))
        .collect();
    let entries = assemble(
        members
            .iter()
            .zip(&keys)
            .map(|((id, target), key)| (*id, target.build_dir(), key.as_str())),
        ".vcproj",
    )?;
    let solution = Solution::new(options.msvs_version, &entries, &projects, variants);
    solution.check_ids(sln_path)?;
    Ok(solution.to_string())
}

/// Generate projects and solutions for `graph`.
///
/// # Errors
///
/// Returns a [`GenError`] when the graph is inconsistent, a target's
/// settings cannot be merged, identifiers collide or a file cannot be
/// written. Nothing is written unless every document renders.
pub fn generate(graph: &TargetGraph, options: &GeneratorOptions) -> Result<GenerationReport, GenError> {
    graph.validate()?;
    let plans = plan_projects(graph, options)?;

    let mut projects = Vec::new();
    for plan in plans.values() {
        if plan.existing {
            debug!("Using existing project {} for {}", plan.path, plan.target);
            continue;
        }
        let spec = graph.spec(&plan.target)?;
        projects.push(build_project(spec, plan, options)?);
    }

    let variants: BTreeSet<String> = graph
        .target_list
        .iter()
        .filter_map(|t| graph.targets.get(t))
        .flat_map(|spec| spec.configurations.iter().map(|(name, c)| c.full_name(name)))
        .collect();

    let mut solutions = Vec::new();
    for build_file in graph.build_files().into_keys() {
        if build_file.extension() != Some("gyp") {
            debug!("Skipping solution for {build_file}");
            continue;
        }
        let stem = build_file.file_stem().unwrap_or_default();
        let sln_path = build_file.with_file_name(format!("{stem}{}.sln", options.suffix));
        let text = render_solution(graph, &plans, &build_file, &sln_path, &variants, options)?;
        solutions.push((sln_path, text));
    }

    let mut report = GenerationReport::default();
    for project in projects {
        project.write(&options.output_root, &mut report)?;
    }
    for (path, text) in solutions {
        let full = options.output_root.join(path);
        let outcome = write_if_changed(&full, text.as_bytes())?;
        report.record(full, outcome);
    }
    info!(
        "Visual Studio generation wrote {} of {} files",
        report.written(),
        report.files.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2005", MsvsVersion::V2005)]
    #[case("2008", MsvsVersion::V2008)]
    #[case("auto", MsvsVersion::V2008)]
    fn parses_versions(#[case] text: &str, #[case] version: MsvsVersion) {
        assert_eq!(text.parse::<MsvsVersion>(), Ok(version));
    }

    #[test]
    fn rejects_unknown_versions() {
        assert!("2010".parse::<MsvsVersion>().is_err());
    }

    fn graph(json: &str) -> TargetGraph {
        json.parse().expect("graph")
    }

    #[test]
    fn plans_use_existing_projects_and_explicit_guids() {
        let graph = graph(
            r#"{
                "targets": {
                    "src/a.gyp:a": {
                        "target_name": "a",
                        "type": "none",
                        "default_configuration": "Debug",
                        "configurations": { "Debug": {
                            "msvs_existing_vcproj": "legacy/a.vcproj",
                            "msvs_guid": "0123ABCD-0000-0000-0000-000000000000"
                        } }
                    },
                    "src/a.gyp:b": {
                        "target_name": "b",
                        "type": "none",
                        "default_configuration": "Debug",
                        "configurations": { "Debug": {} }
                    }
                },
                "target_list": ["src/a.gyp:a", "src/a.gyp:b"]
            }"#,
        );
        let options = GeneratorOptions {
            suffix: "_gen".into(),
            ..GeneratorOptions::default()
        };
        let plans = plan_projects(&graph, &options).expect("plans");
        let a = plans.get(&QualifiedTarget::new("src/a.gyp", "a")).expect("a");
        assert!(a.existing);
        assert_eq!(a.path, "src/legacy/a.vcproj");
        assert_eq!(a.guid.braced(), "{0123ABCD-0000-0000-0000-000000000000}");
        let b = plans.get(&QualifiedTarget::new("src/a.gyp", "b")).expect("b");
        assert!(!b.existing);
        assert_eq!(b.path, "src/b_gen.vcproj");
        assert_eq!(b.guid, Guid::derive("src/b_gen.vcproj"));
    }

    #[test]
    fn lowercase_guids_are_rejected() {
        let graph = graph(
            r#"{
                "targets": { "a.gyp:a": {
                    "target_name": "a",
                    "type": "none",
                    "default_configuration": "Debug",
                    "configurations": { "Debug": { "msvs_guid": "abc" } }
                } },
                "target_list": ["a.gyp:a"]
            }"#,
        );
        let err = plan_projects(&graph, &GeneratorOptions::default()).expect_err("bad guid");
        assert!(matches!(err, GenError::Validation(ValidationError::InvalidGuid { .. })));
    }

    #[test]
    fn solutions_include_deep_dependencies() {
        let graph = graph(
            r#"{
                "targets": {
                    "app/app.gyp:app": {
                        "target_name": "app",
                        "type": "executable",
                        "default_configuration": "Debug",
                        "configurations": { "Debug": {} },
                        "dependencies": ["base/base.gyp:base"]
                    },
                    "base/base.gyp:base": {
                        "target_name": "base",
                        "type": "static_library",
                        "default_configuration": "Debug",
                        "configurations": { "Debug": {}, "Release": {} },
                        "dependencies": ["third_party/z.gyp:z"]
                    },
                    "third_party/z.gyp:z": {
                        "target_name": "z",
                        "type": "static_library",
                        "default_configuration": "Debug",
                        "configurations": { "Debug": {} }
                    }
                },
                "target_list": ["third_party/z.gyp:z", "base/base.gyp:base", "app/app.gyp:app"]
            }"#,
        );
        let options = GeneratorOptions::default();
        let plans = plan_projects(&graph, &options).expect("plans");
        let variants = BTreeSet::from(["Debug|Win32".to_owned(), "Release|Win32".to_owned()]);
        let text = render_solution(
            &graph,
            &plans,
            Utf8Path::new("app/app.gyp"),
            Utf8Path::new("app/app.sln"),
            &variants,
            &options,
        )
        .expect("solution");
        assert!(text.contains("\"app\", \"app.vcproj\""));
        assert!(text.contains("\"base\", \"..\\base\\base.vcproj\""));
        assert!(text.contains("\"z\", \"..\\third_party\\z.vcproj\""));
        assert!(text.contains("Release|Win32.ActiveCfg = Release|Win32"));
    }
}
