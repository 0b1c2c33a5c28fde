//! Population of one Xcode target from its declaration.

use camino::{Utf8Path, Utf8PathBuf};

use super::objects::ObjectRef;
use super::project::{ProductKind, XcodeProject};
use crate::error::GenError;
use crate::graph::ProjectNode;
use crate::model::{QualifiedTarget, TargetSpec, TargetType};
use crate::rules::{MakefileFlavor, RuleExpansion, RuleMakefile};
use crate::settings::{MergeError, Settings};
use crate::steps::{CustomBuildStep, Shell, plan_action, plan_copy, plan_rule_driver};
use crate::variables::XCODE;

/// Extensions handled by the sources phase.
const COMPILED: [&str; 7] = ["c", "cc", "cpp", "cxx", "m", "mm", "s"];

/// A target created in some project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XcodeNode {
    /// Bundle of the project holding the target.
    pub bundle: Utf8PathBuf,
    /// Target object in that project's arena.
    pub object: ObjectRef,
    /// Product reference of native targets.
    pub product: Option<ObjectRef>,
    /// Declared kind.
    pub target_type: TargetType,
    /// Name the product file is derived from.
    pub product_name: String,
}

/// Product of `target_type`; `None` for targets built as aggregates.
#[must_use]
pub const fn product_kind(target_type: TargetType) -> Option<ProductKind> {
    let kind = match target_type {
        TargetType::Executable | TargetType::DummyExecutable => ProductKind {
            product_type: "com.apple.product-type.tool",
            file_type: "compiled.mach-o.executable",
            prefix: "",
            suffix: "",
        },
        TargetType::SharedLibrary => ProductKind {
            product_type: "com.apple.product-type.library.dynamic",
            file_type: "compiled.mach-o.dylib",
            prefix: "lib",
            suffix: ".dylib",
        },
        TargetType::LoadableModule => ProductKind {
            product_type: "com.apple.product-type.bundle",
            file_type: "wrapper.cfbundle",
            prefix: "",
            suffix: ".bundle",
        },
        TargetType::StaticLibrary => ProductKind {
            product_type: "com.apple.product-type.library.static",
            file_type: "archive.ar",
            prefix: "lib",
            suffix: ".a",
        },
        TargetType::Utility => return None,
    };
    Some(kind)
}

/// Default configuration first, then the others by name.
fn configuration_names(spec: &TargetSpec) -> Vec<String> {
    std::iter::once(spec.default_configuration.clone())
        .chain(
            spec.configurations
                .keys()
                .filter(|name| **name != spec.default_configuration)
                .cloned(),
        )
        .collect()
}

fn localized(path: &Utf8Path) -> String {
    XCODE.localize_paths(path.as_str())
}

fn is_built_product(path: &str) -> bool {
    path.starts_with("$(BUILT_PRODUCTS_DIR)/")
}

fn is_compiled(path: &str) -> bool {
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| COMPILED.contains(&ext))
}

/// Show `path` in the project and compile it when the sources phase takes
/// its extension.
fn add_source(project: &mut XcodeProject, path: &str, sources: Option<ObjectRef>) {
    let file = project.file_in_root_group(path);
    if let Some(phase) = sources
        && is_compiled(path)
    {
        project.add_to_phase(phase, file);
    }
}

fn step_paths(paths: &[Utf8PathBuf]) -> Vec<String> {
    paths.iter().map(|p| Shell::Xcode.path(p)).collect()
}

/// Show step inputs and outputs that are not built products.
fn show_step_files(project: &mut XcodeProject, step: &CustomBuildStep) {
    for path in step_paths(&step.inputs).iter().chain(&step_paths(&step.outputs)) {
        if !is_built_product(path) {
            project.file_in_root_group(path);
        }
    }
}

/// Create `spec`'s target in `project`.
///
/// `dependencies` are the already created nodes of the target's direct
/// dependencies, possibly living in other projects.
///
/// # Errors
///
/// Returns a [`GenError`] when build settings cannot be merged or two rules
/// would write the same makefile.
pub fn add_target(
    project: &mut XcodeProject,
    target: &QualifiedTarget,
    spec: &TargetSpec,
    dependencies: &[&ProjectNode<XcodeNode>],
) -> Result<XcodeNode, GenError> {
    let configurations = configuration_names(spec);
    let kind = product_kind(spec.target_type);
    let (object, product) = match kind {
        Some(kind) => {
            let (object, product) = project.add_native_target(&spec.target_name, spec.product_name(), kind);
            (object, Some(product))
        }
        None => (project.add_aggregate_target(&spec.target_name, spec.product_name()), None),
    };
    project.register_target(&spec.target_name, object, spec.test, &configurations);

    let (sources_phase, frameworks_phase) = match kind {
        Some(_) => (
            Some(project.add_build_phase(object, "PBXSourcesBuildPhase")),
            Some(project.add_build_phase(object, "PBXFrameworksBuildPhase")),
        ),
        None => (None, None),
    };
    let mut phases = Vec::new();

    for action in &spec.actions {
        let step = plan_action(action, Shell::Xcode);
        let name = format!("Action \"{}\"", action.action_name);
        phases.push(project.add_shell_phase(
            object,
            &name,
            step_paths(&step.inputs),
            step_paths(&step.outputs),
            &step.command,
        ));
        for input in step_paths(&step.inputs) {
            if !is_built_product(&input) {
                project.file_in_root_group(&input);
            }
        }
        for output in step_paths(&step.outputs) {
            if action.process_outputs_as_sources {
                add_source(project, &output, sources_phase);
            } else if !is_built_product(&output) {
                project.file_in_root_group(&output);
            }
        }
    }

    let expansions: Vec<RuleExpansion<'_>> = spec
        .rules
        .iter()
        .map(|rule| RuleExpansion::expand(rule, &spec.sources))
        .collect();
    for expansion in expansions.iter().filter(|e| !e.is_empty()) {
        let rule = expansion.rule;
        let makefile = format!("{}_{}.make", spec.target_name, rule.rule_name);
        let text = RuleMakefile::new(MakefileFlavor::Posix, std::slice::from_ref(expansion)).to_string();
        project.add_makefile(makefile.clone(), format!("rule {} of {target}", rule.rule_name), text)?;
        let outputs: Vec<Utf8PathBuf> = expansion.all_outputs().into_iter().cloned().collect();
        let step = plan_rule_driver(Utf8Path::new(&makefile), outputs, &spec.target_name, Shell::Xcode);
        let name = format!("Rule \"{}\"", rule.rule_name);
        phases.push(project.add_shell_phase(object, &name, Vec::new(), Vec::new(), &step.command));
        for input in expansion.per_trigger.iter().flat_map(|t| &t.inputs) {
            project.file_in_root_group(&localized(input));
        }
        for output in &step.outputs {
            let output = localized(output);
            if rule.process_outputs_as_sources {
                add_source(project, &output, sources_phase);
            } else {
                project.file_in_root_group(&output);
            }
        }
    }

    let rule_suffixes: Vec<String> = spec.rules.iter().map(|r| format!(".{}", r.extension)).collect();
    for source in &spec.sources {
        let path = localized(source);
        if rule_suffixes.iter().any(|suffix| path.ends_with(suffix.as_str())) {
            project.file_in_root_group(&path);
        } else {
            add_source(project, &path, sources_phase);
        }
    }
    for source in &spec.sources_excluded {
        project.file_in_root_group(&localized(source));
    }
    phases.extend(sources_phase);
    phases.extend(frameworks_phase);
    if spec.target_type == TargetType::LoadableModule {
        phases.push(project.add_build_phase(object, "PBXResourcesBuildPhase"));
    }

    let mut library_dirs: Vec<String> = Vec::new();
    let mut linker_flags: Vec<String> = Vec::new();
    for library in &spec.libraries {
        if library.starts_with('-') {
            linker_flags.push(library.clone());
            continue;
        }
        let path = XCODE.localize_paths(library);
        let file = project.file_in_root_group(&path);
        if let Some(phase) = frameworks_phase {
            project.add_to_phase(phase, file);
        }
        if !path.starts_with('$')
            && !path.starts_with('/')
            && let Some((dir, _)) = path.rsplit_once('/')
            && !library_dirs.iter().any(|d| d == dir)
        {
            library_dirs.push(dir.to_owned());
        }
    }

    let links = matches!(
        spec.target_type,
        TargetType::Executable | TargetType::DummyExecutable | TargetType::SharedLibrary | TargetType::LoadableModule
    );
    for dependency in dependencies {
        let node = &dependency.payload;
        let link_phase = frameworks_phase
            .filter(|_| links && matches!(node.target_type, TargetType::StaticLibrary | TargetType::SharedLibrary));
        if node.bundle.as_path() == project.bundle() {
            project.add_local_dependency(object, node.object);
            if let (Some(phase), Some(product)) = (link_phase, node.product) {
                project.add_to_phase(phase, product);
            }
        } else {
            project.add_remote_dependency(object, &node.bundle, &dependency.target);
            if let (Some(phase), Some(kind)) = (link_phase, product_kind(node.target_type)) {
                let product = project.remote_product(&node.bundle, &dependency.target, kind, &node.product_name);
                project.add_to_phase(phase, product);
            }
        }
    }

    for copy in &spec.copies {
        for step in plan_copy(copy, Shell::Xcode) {
            phases.push(project.add_shell_phase(
                object,
                &step.description,
                step_paths(&step.inputs),
                step_paths(&step.outputs),
                &step.command,
            ));
            show_step_files(project, &step);
        }
    }
    for postbuild in &spec.postbuilds {
        let name = format!("Postbuild \"{}\"", postbuild.postbuild_name);
        let script = Shell::Xcode.command(&postbuild.action, false);
        phases.push(project.add_shell_phase(object, &name, Vec::new(), Vec::new(), &script));
    }
    project.set_build_phases(object, &phases);

    let mut configs = Vec::with_capacity(configurations.len());
    for name in &configurations {
        let Some(config) = spec.configurations.get(name) else {
            continue;
        };
        let conflict = |err: MergeError| err.in_context(target, name, "buildSettings");
        let mut settings = Settings::new();
        if kind.is_some() {
            settings.set("PRODUCT_NAME", spec.product_name().into());
        }
        settings
            .append_items("FRAMEWORK_SEARCH_PATHS", config.mac_framework_dirs.iter().map(|d| localized(d)))
            .map_err(conflict)?;
        settings
            .append_items("HEADER_SEARCH_PATHS", config.include_dirs.iter().map(|d| localized(d)))
            .map_err(conflict)?;
        settings
            .append_items(
                "GCC_PREPROCESSOR_DEFINITIONS",
                config.defines.iter().map(|d| d.text().replace('"', "\\\"")),
            )
            .map_err(conflict)?;
        settings
            .append_items("LIBRARY_SEARCH_PATHS", library_dirs.iter().cloned())
            .map_err(conflict)?;
        settings
            .append_items("OTHER_LDFLAGS", linker_flags.iter().cloned())
            .map_err(conflict)?;
        for (key, value) in &config.xcode_settings {
            settings.set(key, value.clone());
        }
        configs.push((name.clone(), settings));
    }
    project.set_configurations(object, &configs);

    Ok(XcodeNode {
        bundle: project.bundle().to_owned(),
        object,
        product,
        target_type: spec.target_type,
        product_name: spec.product_name().to_owned(),
    })
}
