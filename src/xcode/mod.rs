//! Xcode backend.
//!
//! Every build file gets a `<stem><suffix>.xcodeproj` bundle holding
//! `project.pbxproj` and the makefiles its rules run. Targets are created in
//! dependency order across all projects; a dependency on a target of another
//! bundle is recorded by name and its id filled in once every project has
//! been finalized.

mod objects;
mod print;
mod project;
mod target;

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

pub use objects::{Object, ObjectArena, ObjectRef, RemoteObject, RemoteTarget, Value};
pub use print::{Printer, quote};
pub use project::{ProductKind, XcodeProject};
pub use target::{XcodeNode, add_target, product_kind};

use crate::error::GenError;
use crate::graph::{DependencyGraphBuilder, ProjectFactory, ProjectGraph, ProjectId, ProjectNode};
use crate::model::{BuildFileData, QualifiedTarget, SettingValue, TargetGraph};
use crate::options::GeneratorOptions;
use crate::output::{GenerationReport, OutputDir};
use crate::settings::Settings;

const PROJECT_FILE: &str = "project.pbxproj";

/// Bundle directory for `build_file`.
///
/// ```
/// use camino::Utf8Path;
/// use projgen::xcode::bundle_path;
///
/// assert_eq!(bundle_path(Utf8Path::new("base/base.gyp"), "_gen"), "base/base_gen.xcodeproj");
/// ```
#[must_use]
pub fn bundle_path(build_file: &Utf8Path, suffix: &str) -> Utf8PathBuf {
    let stem = build_file.file_stem().unwrap_or_default();
    build_file.with_file_name(format!("{stem}{suffix}.xcodeproj"))
}

/// Project-wide build settings of one build file.
fn project_settings(data: &BuildFileData) -> Settings {
    let mut settings = Settings::new();
    settings.set(
        "INTERMEDIATE_DIR",
        SettingValue::from("$(PROJECT_DERIVED_FILE_DIR)/$(CONFIGURATION)"),
    );
    settings.set(
        "SHARED_INTERMEDIATE_DIR",
        SettingValue::from("$(SYMROOT)/DerivedSources/$(CONFIGURATION)"),
    );
    for (key, value) in &data.xcode_settings {
        settings.set(key, value.clone());
    }
    settings
}

/// Creates targets in the project of their build file.
struct XcodeFactory<'a> {
    graph: &'a TargetGraph,
    build_files: &'a BTreeMap<Utf8PathBuf, BuildFileData>,
    suffix: &'a str,
    projects: BTreeMap<Utf8PathBuf, XcodeProject>,
}

impl XcodeFactory<'_> {
    fn project(&mut self, build_file: &Utf8Path) -> &mut XcodeProject {
        let build_files = self.build_files;
        let suffix = self.suffix;
        self.projects.entry(build_file.to_owned()).or_insert_with(|| {
            let bundle = bundle_path(build_file, suffix);
            debug!("Creating Xcode project {bundle}");
            let mut project = XcodeProject::new(build_file, &bundle);
            if let Some(name) = build_file.file_name() {
                project.file_in_root_group(name);
            }
            if let Some(data) = build_files.get(build_file) {
                for included in &data.included_files {
                    project.file_in_root_group(included.as_str());
                }
            }
            project
        })
    }
}

impl ProjectFactory for XcodeFactory<'_> {
    type Node = XcodeNode;
    type Error = GenError;

    fn dependencies_of(&self, target: &QualifiedTarget) -> Result<Vec<QualifiedTarget>, GenError> {
        Ok(self.graph.spec(target)?.dependencies.clone())
    }

    fn create(
        &mut self,
        target: &QualifiedTarget,
        dependencies: &[ProjectId],
        graph: &ProjectGraph<XcodeNode>,
    ) -> Result<XcodeNode, GenError> {
        let targets = self.graph;
        let spec = targets.spec(target)?;
        let nodes: Vec<&ProjectNode<XcodeNode>> = dependencies.iter().filter_map(|id| graph.node(*id)).collect();
        add_target(self.project(&target.build_file), target, spec, &nodes)
    }
}

/// A finalized project and its printed `project.pbxproj`.
pub struct RenderedProject {
    /// The project.
    pub project: XcodeProject,
    /// Printed project file.
    pub text: String,
}

impl RenderedProject {
    /// Write the bundle under `root`, removing it again on failure when
    /// this call created it.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::Io`] when a file cannot be written.
    pub fn write(&self, root: &Utf8Path, report: &mut GenerationReport) -> Result<(), GenError> {
        let dir = OutputDir::ensure(&root.join(self.project.bundle()))?;
        match self.write_files(&dir, report) {
            Ok(()) => Ok(()),
            Err(err) => {
                dir.discard();
                Err(err)
            }
        }
    }

    fn write_files(&self, dir: &OutputDir, report: &mut GenerationReport) -> Result<(), GenError> {
        let outcome = dir.write(PROJECT_FILE, self.text.as_bytes())?;
        report.record(dir.path().join(PROJECT_FILE), outcome);
        for (name, text) in self.project.makefiles() {
            let outcome = dir.write(name, text.as_bytes())?;
            report.record(dir.path().join(name), outcome);
        }
        Ok(())
    }
}

/// Build, finalize and print every project without touching the disk.
///
/// # Errors
///
/// Returns a [`GenError`] when the graph is inconsistent, settings cannot
/// be merged, makefile names or object ids collide.
pub fn render_projects(graph: &TargetGraph, options: &GeneratorOptions) -> Result<Vec<RenderedProject>, GenError> {
    graph.validate()?;
    let build_files = graph.build_files();
    let mut builder = DependencyGraphBuilder::new(XcodeFactory {
        graph,
        build_files: &build_files,
        suffix: &options.suffix,
        projects: BTreeMap::new(),
    });
    for target in &graph.target_list {
        builder.build(target)?;
    }
    let (_, factory) = builder.finish();
    let mut projects = factory.projects;

    for (build_file, project) in &mut projects {
        let data = build_files.get(build_file).cloned().unwrap_or_default();
        project.finalize(&data.targets, &project_settings(&data))?;
    }

    let resolve = |remote: &RemoteTarget| {
        projects
            .get(&remote.build_file)
            .and_then(|p| p.remote_id(remote))
            .map(str::to_owned)
    };
    let texts = projects
        .values()
        .map(|project| project.render(resolve))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(projects
        .into_values()
        .zip(texts)
        .map(|(project, text)| RenderedProject { project, text })
        .collect())
}

/// Generate one bundle per build file of `graph`.
///
/// # Errors
///
/// Returns a [`GenError`] when rendering fails or a file cannot be written.
/// Nothing is written unless every project renders.
pub fn generate(graph: &TargetGraph, options: &GeneratorOptions) -> Result<GenerationReport, GenError> {
    let rendered = render_projects(graph, options)?;
    let mut report = GenerationReport::default();
    for project in &rendered {
        project.write(&options.output_root, &mut report)?;
    }
    info!(
        "Xcode generation wrote {} of {} files",
        report.written(),
        report.files.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn graph() -> TargetGraph {
        r#"{
            "targets": {
                "app/app.gyp:app": {
                    "target_name": "app",
                    "type": "executable",
                    "default_configuration": "Debug",
                    "configurations": { "Debug": {} },
                    "sources": ["main.cc"],
                    "dependencies": ["base/base.gyp:base"]
                },
                "base/base.gyp:base": {
                    "target_name": "base",
                    "type": "static_library",
                    "default_configuration": "Debug",
                    "configurations": { "Debug": {}, "Release": {} },
                    "sources": ["base.cc"]
                }
            },
            "target_list": ["base/base.gyp:base", "app/app.gyp:app"],
            "build_files": {
                "base/base.gyp": {
                    "targets": ["base/base.gyp:base"],
                    "included_files": ["../build/common.gypi"],
                    "xcode_settings": { "SYMROOT": "../xcodebuild" }
                }
            }
        }"#
        .parse()
        .expect("graph")
    }

    #[rstest]
    #[case("a.gyp", "", "a.xcodeproj")]
    #[case("net/net.gyp", "_gen", "net/net_gen.xcodeproj")]
    fn bundles_sit_next_to_build_files(#[case] build_file: &str, #[case] suffix: &str, #[case] expected: &str) {
        assert_eq!(bundle_path(Utf8Path::new(build_file), suffix), expected);
    }

    #[test]
    fn remote_dependencies_resolve_to_the_other_projects_target() {
        let rendered = render_projects(&graph(), &GeneratorOptions::default()).expect("render");
        let [app, base] = rendered.as_slice() else {
            panic!("expected two projects");
        };
        assert_eq!(app.project.bundle(), "app/app.xcodeproj");
        let base_id = base.project.target_id("base").expect("base id");
        assert!(app.text.contains(&format!("remoteGlobalIDString = {base_id};")));
        assert!(app.text.contains("path = ../base/base.xcodeproj;"));
        assert!(base.text.contains("SYMROOT = ../xcodebuild;"));
        assert!(base.text.contains("INTERMEDIATE_DIR = \"$(PROJECT_DERIVED_FILE_DIR)/$(CONFIGURATION)\";"));
        assert!(base.text.contains("/* base.gyp */"));
        assert!(base.text.contains("/* common.gypi */"));
    }

    #[test]
    fn libraries_of_other_projects_are_linked_through_reference_proxies() {
        let rendered = render_projects(&graph(), &GeneratorOptions::default()).expect("render");
        let [app, base] = rendered.as_slice() else {
            panic!("expected two projects");
        };
        let product_id = base.project.product_id("base").expect("base product id");
        assert!(app.text.contains(&format!("remoteGlobalIDString = {product_id};")));
        assert!(app.text.contains("isa = PBXReferenceProxy;"));
        assert!(app.text.contains("proxyType = 2;"));
        assert!(app.text.contains("fileType = archive.ar;"));
        assert!(app.text.contains("/* libbase.a in Frameworks */"));
        assert!(!base.text.contains("PBXReferenceProxy"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let first = render_projects(&graph(), &GeneratorOptions::default()).expect("first");
        let second = render_projects(&graph(), &GeneratorOptions::default()).expect("second");
        let texts = |r: &[RenderedProject]| r.iter().map(|p| p.text.clone()).collect::<Vec<_>>();
        assert_eq!(texts(&first), texts(&second));
    }
}
