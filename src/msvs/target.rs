//! Assembly of one target's `.vcproj` and the rule files it references.

use std::collections::{BTreeMap, BTreeSet};

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use tracing::debug;

use super::project::{ConfigSpec, FinalizedProject, ProjectWriter, SourceEntry, source_tree};
use super::tool::{MsvsTool, ToolSet};
use super::tool_file::{CustomBuildRule, NativeRuleFile};
use crate::error::{GenError, SchemaError, ValidationError};
use crate::graph::relative_path;
use crate::ids::Guid;
use crate::model::{Configuration, QualifiedTarget, SettingValue, TargetSpec, TargetType};
use crate::options::GeneratorOptions;
use crate::output::{GenerationReport, write_if_changed};
use crate::rules::{MakefileFlavor, RuleExpansion, RuleMakefile};
use crate::settings::MergePolicy;
use crate::sources::{SourceSet, SourceStaging};
use crate::steps::{CustomBuildStep, Shell, excluded_inputs, plan_action, plan_copy, plan_rule_driver};
use crate::variables::{MSVS, to_windows};

/// Where a target's project lives and how it is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPlan {
    /// Target the project is generated for.
    pub target: QualifiedTarget,
    /// Project file path relative to the graph root.
    pub path: Utf8PathBuf,
    /// Project GUID.
    pub guid: Guid,
    /// The project file is maintained by hand and not generated.
    pub existing: bool,
}

/// Rendered files of one target, written together.
#[derive(Debug)]
pub struct ProjectFiles {
    path: Utf8PathBuf,
    project: FinalizedProject,
    extra: Vec<(Utf8PathBuf, String)>,
}

impl ProjectFiles {
    /// Rendered project document.
    #[must_use]
    pub fn project_text(&self) -> String {
        self.project.render()
    }

    /// Rule files and makefiles with their paths.
    #[must_use]
    pub fn extra_files(&self) -> &[(Utf8PathBuf, String)] {
        &self.extra
    }

    /// Write every file under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::Io`] when a file cannot be written.
    pub fn write(self, root: &Utf8Path, report: &mut GenerationReport) -> Result<(), GenError> {
        for (path, text) in self.extra {
            let full = root.join(path);
            let outcome = write_if_changed(&full, text.as_bytes())?;
            report.record(full, outcome);
        }
        let full = root.join(&self.path);
        let outcome = self.project.write(&full)?;
        report.record(full, outcome);
        Ok(())
    }
}

fn windows_path(path: &Utf8Path) -> String {
    to_windows(&MSVS.localize_paths(path.as_str()))
}

/// Merges settings of one configuration, attaching context to conflicts.
struct ToolMerge<'t> {
    tools: ToolSet,
    target: &'t QualifiedTarget,
    configuration: String,
}

impl ToolMerge<'_> {
    fn append(&mut self, tool: MsvsTool, setting: &str, value: SettingValue) -> Result<(), SchemaError> {
        self.merge(tool, setting, value, MergePolicy::Append)
    }

    fn append_if_unset(&mut self, tool: MsvsTool, setting: &str, value: SettingValue) -> Result<(), SchemaError> {
        self.merge(tool, setting, value, MergePolicy::OnlyIfUnset)
    }

    fn merge(
        &mut self,
        tool: MsvsTool,
        setting: &str,
        value: SettingValue,
        policy: MergePolicy,
    ) -> Result<(), SchemaError> {
        self.tools
            .append(tool, setting, value, policy)
            .map_err(|err| err.in_context(self.target, &self.configuration, tool.name()))
    }
}

const fn configuration_type(target_type: TargetType) -> &'static str {
    match target_type {
        TargetType::Executable | TargetType::DummyExecutable => "1",
        TargetType::SharedLibrary | TargetType::LoadableModule => "2",
        TargetType::StaticLibrary => "4",
        TargetType::Utility => "10",
    }
}

/// Tool and path of the automatically named output file.
fn output_file(spec: &TargetSpec) -> Option<(MsvsTool, String)> {
    let (tool, dir, extension) = match spec.target_type {
        TargetType::Executable => (MsvsTool::Linker, "$(OutDir)", ".exe"),
        TargetType::SharedLibrary | TargetType::LoadableModule => (MsvsTool::Linker, "$(OutDir)", ".dll"),
        TargetType::StaticLibrary => (MsvsTool::Librarian, "$(OutDir)\\lib", ".lib"),
        TargetType::DummyExecutable => (MsvsTool::Linker, "$(IntDir)", ".junk"),
        TargetType::Utility => return None,
    };
    if !spec.msvs_auto_output_file {
        return None;
    }
    let dir = spec
        .msvs_product_directory
        .as_deref()
        .map_or_else(|| dir.to_owned(), |d| to_windows(&MSVS.localize_paths(d)));
    let dir = dir.trim_end_matches('\\');
    let name = spec.product_name.as_deref().unwrap_or("$(ProjectName)");
    Some((tool, format!("{dir}\\{name}{extension}")))
}

/// The single `.def` source of a dynamic library, if any.
fn module_definition<'s>(
    target: &QualifiedTarget,
    spec: &'s TargetSpec,
) -> Result<Option<&'s Utf8PathBuf>, SchemaError> {
    if !spec.target_type.is_dynamic_library() {
        return Ok(None);
    }
    let defs: Vec<&Utf8PathBuf> = spec
        .sources
        .iter()
        .filter(|s| s.extension() == Some("def"))
        .collect();
    match defs.as_slice() {
        [] => Ok(None),
        [one] => Ok(Some(*one)),
        _ => Err(SchemaError::MultipleModuleDefinitions {
            target: target.clone(),
            files: defs.into_iter().cloned().collect(),
        }),
    }
}

fn configuration(
    target: &QualifiedTarget,
    spec: &TargetSpec,
    name: &str,
    config: &Configuration,
    def_file: Option<&Utf8PathBuf>,
) -> Result<ConfigSpec, SchemaError> {
    let mut merge = ToolMerge {
        tools: ToolSet::new(),
        target,
        configuration: config.full_name(name),
    };
    for (tool_name, settings) in &config.msvs_settings {
        let tool: MsvsTool = tool_name.parse().map_err(|_| SchemaError::UnknownTool {
            target: target.clone(),
            configuration: merge.configuration.clone(),
            tool: tool_name.clone(),
        })?;
        for (setting, value) in settings {
            merge.append(tool, setting, value.clone())?;
        }
    }

    let include_dirs: Vec<String> = config
        .include_dirs
        .iter()
        .chain(&config.msvs_system_include_dirs)
        .map(|d| windows_path(d))
        .collect();
    let resource_dirs = config.resource_include_dirs.as_ref().map_or_else(
        || include_dirs.clone(),
        |dirs| dirs.iter().map(|d| windows_path(d)).collect(),
    );
    merge.append(MsvsTool::Compiler, "AdditionalIncludeDirectories", SettingValue::List(include_dirs))?;
    merge.append(
        MsvsTool::ResourceCompiler,
        "AdditionalIncludeDirectories",
        SettingValue::List(resource_dirs),
    )?;

    let libraries = spec
        .libraries
        .iter()
        .map(|lib| lib.strip_prefix("-l").unwrap_or(lib.as_str()).to_owned());
    merge.append(MsvsTool::Linker, "AdditionalDependencies", SettingValue::list(libraries))?;

    if let Some((tool, file)) = output_file(spec) {
        merge.append_if_unset(tool, "OutputFile", file.into())?;
    }

    let defines: Vec<String> = config
        .defines
        .iter()
        .map(|d| d.text().replace('"', "\\\""))
        .collect();
    merge.append(MsvsTool::Compiler, "PreprocessorDefinitions", SettingValue::List(defines.clone()))?;
    merge.append(MsvsTool::ResourceCompiler, "PreprocessorDefinitions", SettingValue::List(defines))?;

    merge.append_if_unset(
        MsvsTool::Compiler,
        "ProgramDataBaseFileName",
        "$(IntDir)\\$(ProjectName)\\vc80.pdb".into(),
    )?;

    let warnings = config.msvs_disabled_warnings.iter().map(|w| w.join(";"));
    merge.append(MsvsTool::Compiler, "DisableSpecificWarnings", SettingValue::list(warnings))?;

    if let Some(command) = &config.msvs_prebuild {
        merge.append(MsvsTool::PreBuildEvent, "CommandLine", command.clone())?;
    }
    if let Some(command) = &config.msvs_postbuild {
        merge.append(MsvsTool::PostBuildEvent, "CommandLine", command.clone())?;
    }

    if let Some(header) = config.msvs_precompiled_header.as_deref().and_then(Utf8Path::file_name) {
        merge.append(MsvsTool::Compiler, "UsePrecompiledHeader", "2".into())?;
        merge.append(MsvsTool::Compiler, "PrecompiledHeaderThrough", header.into())?;
        merge.append(MsvsTool::Compiler, "ForcedIncludeFiles", header.into())?;
    }

    if spec.target_type == TargetType::LoadableModule {
        merge.append(MsvsTool::Linker, "IgnoreImportLibrary", "true".into())?;
    }
    if let Some(def) = def_file {
        merge.append(MsvsTool::Linker, "ModuleDefinitionFile", windows_path(def).into())?;
    }

    let mut attrs: BTreeMap<String, String> = config
        .msvs_configuration_attributes
        .iter()
        .map(|(key, value)| (key.clone(), value.join(";")))
        .collect();
    attrs.insert(
        "InheritedPropertySheets".to_owned(),
        config.msvs_props.iter().map(|p| windows_path(p)).join(";"),
    );
    attrs.insert(
        "ConfigurationType".to_owned(),
        configuration_type(spec.target_type).to_owned(),
    );
    Ok(ConfigSpec {
        attrs,
        tools: merge.tools,
    })
}

/// Windows paths of the precompiled header and its source in `config`.
fn precompiled_files(config: &Configuration) -> BTreeSet<String> {
    [&config.msvs_precompiled_header, &config.msvs_precompiled_source]
        .into_iter()
        .flatten()
        .map(|p| windows_path(p))
        .collect()
}

fn excluded_from_build() -> ConfigSpec {
    let mut spec = ConfigSpec::default();
    spec.attrs.insert("ExcludedFromBuild".to_owned(), "true".to_owned());
    spec
}

/// Attach `step` to its primary input as a custom build tool.
fn attach_step(
    writer: &mut ProjectWriter,
    target: &QualifiedTarget,
    configuration: &str,
    step: &CustomBuildStep,
) -> Result<(), ValidationError> {
    let primary = step
        .primary_input()
        .ok_or_else(|| ValidationError::StepWithoutInputs {
            target: target.clone(),
            step: step.description.clone(),
        })?;
    let join = |paths: &[Utf8PathBuf]| paths.iter().map(|p| windows_path(p)).join(";");
    let mut spec = ConfigSpec::default();
    let tool = MsvsTool::CustomBuild;
    spec.tools.set(tool, "Description", step.description.clone().into());
    spec.tools.set(tool, "CommandLine", step.command.clone().into());
    spec.tools.set(tool, "AdditionalDependencies", join(&step.inputs).into());
    spec.tools.set(tool, "Outputs", join(&step.outputs).into());
    writer.add_file_config(&windows_path(primary), configuration, spec);
    Ok(())
}

/// Render the project of `plan` and the rule files it needs.
///
/// # Errors
///
/// Returns a [`SchemaError`] for conflicting settings, unknown tools or
/// several module definition files, and a validation error when a file
/// configuration names a file the project does not list or an action has
/// no inputs.
pub fn build_project(
    spec: &TargetSpec,
    plan: &ProjectPlan,
    options: &GeneratorOptions,
) -> Result<ProjectFiles, GenError> {
    let target = &plan.target;
    let build_dir = target.build_dir();
    debug!("Generating {} for {target}", plan.path);

    let mut writer = ProjectWriter::create(spec.target_name.as_str(), plan.guid.clone(), options.msvs_version);
    let def_file = module_definition(target, spec)?;
    for (name, config) in &spec.configurations {
        writer.add_platform(config.platform());
        writer.add_configuration(
            config.full_name(name),
            configuration(target, spec, name, config, def_file)?,
        );
    }

    // Sources named by actions and copies.
    let mut sources = SourceSet::new(spec.sources.iter().cloned());
    let mut staging = SourceStaging::new();
    if let Some(build_file) = target.build_file.file_name() {
        staging.add(build_file);
    }
    for action in &spec.actions {
        for input in &action.inputs {
            staging.add(input.clone());
        }
        if action.process_outputs_as_sources {
            for output in &action.outputs {
                staging.add(output.clone());
            }
        }
    }
    for copy in &spec.copies {
        for file in &copy.files {
            staging.add(file.clone());
        }
    }
    staging.apply(&mut sources);

    // Rules see the sources known so far and are expanded once.
    let known = sources.to_vec();
    let (external, native): (Vec<RuleExpansion<'_>>, Vec<RuleExpansion<'_>>) = spec
        .rules
        .iter()
        .map(|rule| RuleExpansion::expand(rule, &known))
        .partition(|e| e.rule.msvs_external_rule);

    let mut extra = Vec::new();
    let mut drivers = Vec::new();
    let mut staging = SourceStaging::new();
    for (name, config) in &spec.configurations {
        if !native.is_empty() {
            let file_name = format!("{}_{name}{}.rules", spec.target_name, options.suffix);
            let mut file = NativeRuleFile::new(spec.target_name.as_str());
            for expansion in &native {
                file.add_rule(CustomBuildRule::from_rule(expansion.rule, config));
            }
            extra.push((build_dir.join(&file_name), file.render(options.msvs_version)));
            writer.add_tool_file(file_name);
        }
        if !external.is_empty() {
            let file_name = Utf8PathBuf::from(format!(
                "{}_{name}_rules{}.mk",
                spec.target_name, options.suffix
            ));
            let makefile = RuleMakefile::new(MakefileFlavor::Cygwin, &external);
            extra.push((build_dir.join(&file_name), makefile.to_string()));
            let outputs = external
                .iter()
                .flat_map(|e| e.all_outputs())
                .cloned()
                .unique()
                .collect();
            let shell = Shell::Msvs { config, cygwin: true };
            drivers.push((
                config.full_name(name),
                plan_rule_driver(&file_name, outputs, &spec.target_name, shell),
            ));
            staging.add(file_name);
        }
    }
    for expansion in native.iter().chain(&external) {
        staging.stage_rule_outputs(expansion);
    }
    for path in &spec.sources_excluded {
        staging.exclude(path.clone());
    }
    staging.apply(&mut sources);

    let mut steps = Vec::new();
    for (name, config) in &spec.configurations {
        let full_name = config.full_name(name);
        for action in &spec.actions {
            let cygwin = action.msvs_cygwin_shell.unwrap_or_else(|| config.cygwin_shell());
            steps.push((full_name.clone(), plan_action(action, Shell::Msvs { config, cygwin })));
        }
        for copy in &spec.copies {
            let shell = Shell::Msvs { config, cygwin: false };
            steps.extend(plan_copy(copy, shell).into_iter().map(|s| (full_name.clone(), s)));
        }
    }
    for input in excluded_inputs(steps.iter().map(|(_, s)| s)) {
        sources.exclude(input);
    }

    let listed: BTreeSet<String> = sources.sources().iter().map(|p| windows_path(p)).collect();
    let excluded: BTreeSet<String> = sources.excluded().iter().map(|p| windows_path(p)).collect();
    let precompiled: BTreeSet<String> = spec.configurations.values().flat_map(precompiled_files).collect();
    let fully_excluded: BTreeSet<String> = excluded.difference(&precompiled).cloned().collect();
    let mut tree = source_tree(&listed, &fully_excluded);
    if spec.target_type == TargetType::DummyExecutable {
        let dummy = relative_path(&options.depth.join("tools/gyp/gyp_dummy.c"), build_dir);
        tree.push(SourceEntry::File(to_windows(dummy.as_str())));
    }
    writer.add_files(tree);

    for (configuration, step) in &drivers {
        attach_step(&mut writer, target, configuration, step)?;
    }

    for path in &excluded {
        for (name, config) in &spec.configurations {
            if !precompiled_files(config).contains(path) {
                writer.add_file_config(path, &config.full_name(name), excluded_from_build());
            }
        }
    }

    if spec.rules.iter().any(|r| r.extension == "idl" && r.msvs_external_rule) {
        for path in listed.iter().filter(|p| p.ends_with(".idl")) {
            for (name, config) in &spec.configurations {
                writer.add_file_config(path, &config.full_name(name), excluded_from_build());
            }
        }
    }

    let tool_files: BTreeSet<String> = spec
        .configurations
        .values()
        .flat_map(|c| &c.msvs_tool_files)
        .map(|p| windows_path(p))
        .collect();
    for file in tool_files {
        writer.add_tool_file(file);
    }

    for (name, config) in &spec.configurations {
        if let Some(source) = &config.msvs_precompiled_source {
            let mut create = ConfigSpec::default();
            create
                .tools
                .set(MsvsTool::Compiler, "UsePrecompiledHeader", "1".into());
            writer.add_file_config(&windows_path(source), &config.full_name(name), create);
        }
    }

    for (configuration, step) in &steps {
        attach_step(&mut writer, target, configuration, step)?;
    }

    Ok(ProjectFiles {
        path: plan.path.clone(),
        project: writer.finalize()?,
        extra,
    })
}
