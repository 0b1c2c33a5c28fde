//! One `.xcodeproj` bundle under construction.
//!
//! The project owns its object arena together with the lookup tables that
//! keep files, groups and project references unique. Targets are added in
//! dependency order; [`XcodeProject::finalize`] then orders them, adds the
//! aggregate helpers and tidies the group tree before ids are computed.

use std::collections::{BTreeMap, HashMap, HashSet};

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;

use super::objects::{ObjectArena, ObjectRef, RemoteObject, RemoteTarget, Value};
use super::print::Printer;
use crate::error::{GenError, ValidationError};
use crate::graph::relative_path;
use crate::model::{QualifiedTarget, SettingValue};
use crate::settings::Settings;

const PROJECT_FILE: &str = "project.pbxproj";

/// Top-level groups of the main group, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RootGroup {
    Source,
    Intermediates,
    Frameworks,
    Projects,
    Products,
}

impl RootGroup {
    const fn name(self) -> &'static str {
        match self {
            Self::Source => "Source",
            Self::Intermediates => "Intermediates",
            Self::Frameworks => "Frameworks",
            Self::Projects => "Projects",
            Self::Products => "Products",
        }
    }
}

/// Product of a native target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductKind {
    /// `productType` of the target.
    pub product_type: &'static str,
    /// `explicitFileType` of the product reference.
    pub file_type: &'static str,
    /// File name prefix.
    pub prefix: &'static str,
    /// File name suffix, dot included.
    pub suffix: &'static str,
}

impl ProductKind {
    /// File name of a product called `name`.
    #[must_use]
    pub fn file_name(&self, name: &str) -> String {
        format!("{}{name}{}", self.prefix, self.suffix)
    }
}

struct TargetEntry {
    name: String,
    object: ObjectRef,
    test: bool,
    configurations: Vec<String>,
}

/// A project file being assembled for one build file.
pub struct XcodeProject {
    build_file: Utf8PathBuf,
    bundle: Utf8PathBuf,
    arena: ObjectArena,
    root: ObjectRef,
    main_group: ObjectRef,
    root_groups: BTreeMap<RootGroup, ObjectRef>,
    files: HashMap<String, ObjectRef>,
    dirs: HashMap<String, ObjectRef>,
    file_keys: HashMap<ObjectRef, String>,
    phase_files: HashSet<(ObjectRef, ObjectRef)>,
    /// Project reference file and its `Products` group, per bundle.
    project_refs: IndexMap<Utf8PathBuf, (ObjectRef, ObjectRef)>,
    remote_products: HashMap<QualifiedTarget, ObjectRef>,
    targets: Vec<TargetEntry>,
    configurations: Vec<String>,
    makefiles: BTreeMap<String, (String, String)>,
}

impl XcodeProject {
    /// Empty project for `build_file`, stored in the bundle `bundle`.
    #[must_use]
    pub fn new(build_file: &Utf8Path, bundle: &Utf8Path) -> Self {
        let mut arena = ObjectArena::new();
        let root = arena.add("PBXProject", None, [bundle.as_str()]);
        let main_group = arena.add("PBXGroup", Some(root), ["mainGroup"]);
        arena.set(main_group, "children", Value::List(Vec::new()));
        arena.set(main_group, "sourceTree", "<group>");
        arena.set(root, "mainGroup", main_group);
        Self {
            build_file: build_file.to_owned(),
            bundle: bundle.to_owned(),
            arena,
            root,
            main_group,
            root_groups: BTreeMap::new(),
            files: HashMap::new(),
            dirs: HashMap::new(),
            file_keys: HashMap::new(),
            phase_files: HashSet::new(),
            project_refs: IndexMap::new(),
            remote_products: HashMap::new(),
            targets: Vec::new(),
            configurations: Vec::new(),
            makefiles: BTreeMap::new(),
        }
    }

    /// Build file the project was generated from.
    #[must_use]
    pub fn build_file(&self) -> &Utf8Path {
        &self.build_file
    }

    /// Bundle directory relative to the graph root.
    #[must_use]
    pub fn bundle(&self) -> &Utf8Path {
        &self.bundle
    }

    /// Object arena, for inspection.
    #[must_use]
    pub const fn arena(&self) -> &ObjectArena {
        &self.arena
    }

    fn root_group(&mut self, which: RootGroup) -> ObjectRef {
        if let Some(group) = self.root_groups.get(&which) {
            return *group;
        }
        let group = self.arena.add("PBXGroup", Some(self.main_group), [which.name()]);
        self.arena.set(group, "children", Value::List(Vec::new()));
        self.arena.set(group, "name", which.name());
        self.arena.set(group, "sourceTree", "<group>");
        self.root_groups.insert(which, group);
        group
    }

    fn source_dir(&mut self, dir: &str) -> ObjectRef {
        if dir.is_empty() {
            return self.root_group(RootGroup::Source);
        }
        if let Some(group) = self.dirs.get(dir) {
            return *group;
        }
        let (parent_dir, name) = dir.rsplit_once('/').unwrap_or(("", dir));
        let parent = self.source_dir(parent_dir);
        let group = self.arena.add("PBXGroup", Some(parent), [dir]);
        self.arena.set(group, "children", Value::List(Vec::new()));
        self.arena.set(group, "path", name);
        self.arena.set(group, "sourceTree", "<group>");
        self.arena.append(parent, "children", group);
        self.dirs.insert(dir.to_owned(), group);
        group
    }

    fn add_file_ref(&mut self, group: ObjectRef, key: &str, path: &str, source_tree: &str) -> ObjectRef {
        let file = self.arena.add("PBXFileReference", Some(group), [key]);
        let name = path.rsplit_once('/').map_or(path, |(_, name)| name);
        self.arena.set(file, "lastKnownFileType", file_type(path));
        if name != path {
            self.arena.set(file, "name", name);
        }
        self.arena.set(file, "path", path);
        self.arena.set(file, "sourceTree", source_tree);
        self.arena.append(group, "children", file);
        self.file_keys.insert(file, key.to_owned());
        file
    }

    /// Reference to `path` below the appropriate root group, created once.
    ///
    /// `$(SDKROOT)` paths go to Frameworks, other `$(VAR)/...` paths to a
    /// flat Intermediates group relative to `VAR`, and everything else to
    /// the Source tree with one group per directory.
    pub fn file_in_root_group(&mut self, path: &str) -> ObjectRef {
        if let Some(file) = self.files.get(path) {
            return *file;
        }
        let file = match split_variable(path) {
            Some(("SDKROOT", rest)) => {
                let group = self.root_group(RootGroup::Frameworks);
                self.add_file_ref(group, path, rest, "SDKROOT")
            }
            Some((var, rest)) => {
                let group = self.root_group(RootGroup::Intermediates);
                self.add_file_ref(group, path, rest, var)
            }
            None => {
                let (dir, name) = path.rsplit_once('/').unwrap_or(("", path));
                let group = self.source_dir(dir);
                self.add_file_ref(group, path, name, "<group>")
            }
        };
        self.files.insert(path.to_owned(), file);
        file
    }

    /// Add a build phase of class `isa` owned by `target`.
    pub fn add_build_phase(&mut self, target: ObjectRef, isa: &'static str) -> ObjectRef {
        let phase = self.arena.add(isa, Some(target), Vec::<String>::new());
        self.arena.set(phase, "buildActionMask", "2147483647");
        self.arena.set(phase, "files", Value::List(Vec::new()));
        self.arena.set(phase, "runOnlyForDeploymentPostprocessing", "0");
        phase
    }

    /// Add a shell script phase owned by `target`.
    pub fn add_shell_phase(
        &mut self,
        target: ObjectRef,
        name: &str,
        inputs: Vec<String>,
        outputs: Vec<String>,
        script: &str,
    ) -> ObjectRef {
        let phase = self.arena.add("PBXShellScriptBuildPhase", Some(target), [name]);
        self.arena.set(phase, "buildActionMask", "2147483647");
        self.arena.set(phase, "files", Value::List(Vec::new()));
        self.arena.set(phase, "inputPaths", Value::List(inputs.into_iter().map(Value::Str).collect()));
        self.arena.set(phase, "name", name);
        self.arena.set(phase, "outputPaths", Value::List(outputs.into_iter().map(Value::Str).collect()));
        self.arena.set(phase, "runOnlyForDeploymentPostprocessing", "0");
        self.arena.set(phase, "shellPath", "/bin/sh");
        self.arena.set(phase, "shellScript", script);
        self.arena.set(phase, "showEnvVarsInLog", "0");
        phase
    }

    /// Add `file` to `phase` once.
    pub fn add_to_phase(&mut self, phase: ObjectRef, file: ObjectRef) {
        if !self.phase_files.insert((phase, file)) {
            return;
        }
        let key = self.file_keys.get(&file).cloned().unwrap_or_default();
        let build_file = self.arena.add("PBXBuildFile", Some(phase), [key]);
        self.arena.set(build_file, "fileRef", file);
        self.arena.append(phase, "files", build_file);
    }

    /// Set the ordered build phases of `target`.
    pub fn set_build_phases(&mut self, target: ObjectRef, phases: &[ObjectRef]) {
        self.arena.set_refs(target, "buildPhases", phases);
    }

    /// Add a native target and its product reference.
    pub fn add_native_target(&mut self, name: &str, product_name: &str, kind: ProductKind) -> (ObjectRef, ObjectRef) {
        let target = self.arena.add("PBXNativeTarget", Some(self.root), [name]);
        let products = self.root_group(RootGroup::Products);
        let product_file = kind.file_name(product_name);
        let product = self.arena.add("PBXFileReference", Some(products), [product_file.as_str()]);
        self.arena.set(product, "explicitFileType", kind.file_type);
        self.arena.set(product, "includeInIndex", "0");
        self.arena.set(product, "path", product_file.as_str());
        self.arena.set(product, "sourceTree", "BUILT_PRODUCTS_DIR");
        self.arena.append(products, "children", product);
        self.file_keys
            .insert(product, format!("$(BUILT_PRODUCTS_DIR)/{product_file}"));

        self.arena.set(target, "buildPhases", Value::List(Vec::new()));
        self.arena.set(target, "buildRules", Value::List(Vec::new()));
        self.arena.set(target, "dependencies", Value::List(Vec::new()));
        self.arena.set(target, "name", name);
        self.arena.set(target, "productName", product_name);
        self.arena.set(target, "productReference", product);
        self.arena.set(target, "productType", kind.product_type);
        (target, product)
    }

    /// Add an aggregate target, which has no product.
    pub fn add_aggregate_target(&mut self, name: &str, product_name: &str) -> ObjectRef {
        let target = self.arena.add("PBXAggregateTarget", Some(self.root), [name]);
        self.arena.set(target, "buildPhases", Value::List(Vec::new()));
        self.arena.set(target, "dependencies", Value::List(Vec::new()));
        self.arena.set(target, "name", name);
        self.arena.set(target, "productName", product_name);
        target
    }

    /// Record a target declared by the build file.
    ///
    /// `configurations` lists the target's configuration names, default
    /// first; they join the project's configuration list.
    pub fn register_target(&mut self, name: &str, object: ObjectRef, test: bool, configurations: &[String]) {
        for config in configurations {
            if !self.configurations.contains(config) {
                self.configurations.push(config.clone());
            }
        }
        self.targets.push(TargetEntry {
            name: name.to_owned(),
            object,
            test,
            configurations: configurations.to_vec(),
        });
    }

    /// Object of the declared target `name`.
    #[must_use]
    pub fn target(&self, name: &str) -> Option<ObjectRef> {
        self.targets.iter().find(|t| t.name == name).map(|t| t.object)
    }

    /// Attach a configuration list to `owner`; the first entry is the
    /// default.
    pub fn set_configurations(&mut self, owner: ObjectRef, configurations: &[(String, Settings)]) {
        let list = self.arena.add("XCConfigurationList", Some(owner), Vec::<String>::new());
        let mut refs = Vec::with_capacity(configurations.len());
        for (name, settings) in configurations {
            let config = self.arena.add("XCBuildConfiguration", Some(list), [name.as_str()]);
            let dict = settings
                .sorted()
                .into_iter()
                .map(|(key, value)| (key.to_owned(), setting_value(value)))
                .collect();
            self.arena.set(config, "buildSettings", Value::Dict(dict));
            self.arena.set(config, "name", name.as_str());
            refs.push(config);
        }
        self.arena.set_refs(list, "buildConfigurations", &refs);
        self.arena.set(list, "defaultConfigurationIsVisible", "0");
        if let Some((default, _)) = configurations.first() {
            self.arena.set(list, "defaultConfigurationName", default.as_str());
        }
        self.arena.set(owner, "buildConfigurationList", list);
    }

    /// Make `target` depend on `dependency` of the same project.
    pub fn add_local_dependency(&mut self, target: ObjectRef, dependency: ObjectRef) {
        let name = self
            .arena
            .get(dependency)
            .and_then(|o| o.str_prop("name"))
            .unwrap_or_default()
            .to_owned();
        let node = self.arena.add("PBXTargetDependency", Some(target), [name.as_str()]);
        let proxy = self.arena.add("PBXContainerItemProxy", Some(node), [name.as_str()]);
        self.arena.set(proxy, "containerPortal", self.root);
        self.arena.set(proxy, "proxyType", "1");
        self.arena.set(proxy, "remoteGlobalIDString", dependency);
        self.arena.set(proxy, "remoteInfo", name.as_str());
        self.arena.set(node, "target", dependency);
        self.arena.set(node, "targetProxy", proxy);
        self.arena.append(target, "dependencies", node);
    }

    fn project_reference(&mut self, other_bundle: &Utf8Path) -> (ObjectRef, ObjectRef) {
        if let Some(refs) = self.project_refs.get(other_bundle) {
            return *refs;
        }
        let group = self.root_group(RootGroup::Projects);
        let project_dir = self.bundle.parent().unwrap_or_else(|| Utf8Path::new(""));
        let rel = relative_path(other_bundle, project_dir);
        let file = self.arena.add("PBXFileReference", Some(group), [rel.as_str()]);
        self.arena.set(file, "lastKnownFileType", "wrapper.pb-project");
        self.arena.set(file, "name", other_bundle.file_name().unwrap_or(rel.as_str()));
        self.arena.set(file, "path", rel.as_str());
        self.arena.set(file, "sourceTree", "<group>");
        self.arena.append(group, "children", file);

        let products = self.arena.add("PBXGroup", Some(file), ["Products"]);
        self.arena.set(products, "children", Value::List(Vec::new()));
        self.arena.set(products, "name", "Products");
        self.arena.set(products, "sourceTree", "<group>");
        let entry = IndexMap::from([
            ("ProductGroup".to_owned(), Value::Ref(products)),
            ("ProjectRef".to_owned(), Value::Ref(file)),
        ]);
        self.arena.append(self.root, "projectReferences", Value::Dict(entry));
        self.project_refs.insert(other_bundle.to_owned(), (file, products));
        (file, products)
    }

    /// Make `target` depend on a target of the project in `other_bundle`.
    pub fn add_remote_dependency(&mut self, target: ObjectRef, other_bundle: &Utf8Path, remote: &QualifiedTarget) {
        let (portal, _) = self.project_reference(other_bundle);
        let seed = [remote.build_file.as_str(), remote.target_name.as_str()];
        let node = self.arena.add("PBXTargetDependency", Some(target), seed);
        let proxy = self.arena.add("PBXContainerItemProxy", Some(node), seed);
        self.arena.set(proxy, "containerPortal", portal);
        self.arena.set(proxy, "proxyType", "1");
        self.arena.set(
            proxy,
            "remoteGlobalIDString",
            Value::Remote(RemoteTarget {
                build_file: remote.build_file.clone(),
                target_name: remote.target_name.clone(),
                object: RemoteObject::Target,
            }),
        );
        self.arena.set(proxy, "remoteInfo", remote.target_name.as_str());
        self.arena.set(node, "name", remote.target_name.as_str());
        self.arena.set(node, "targetProxy", proxy);
        self.arena.append(target, "dependencies", node);
    }

    /// Reference to the product of `remote`, a target of the project in
    /// `other_bundle`, for use in this project's build phases.
    ///
    /// The reference proxy sits in the `Products` group of the project
    /// reference; its container proxy names the remote product's id, which
    /// is filled in when the project is rendered.
    pub fn remote_product(
        &mut self,
        other_bundle: &Utf8Path,
        remote: &QualifiedTarget,
        kind: ProductKind,
        product_name: &str,
    ) -> ObjectRef {
        if let Some(product) = self.remote_products.get(remote) {
            return *product;
        }
        let (portal, products) = self.project_reference(other_bundle);
        let file_name = kind.file_name(product_name);
        let reference = self.arena.add("PBXReferenceProxy", Some(products), [file_name.as_str()]);
        self.arena.set(reference, "fileType", kind.file_type);
        self.arena.set(reference, "path", file_name.as_str());
        self.arena.set(reference, "sourceTree", "BUILT_PRODUCTS_DIR");
        let proxy = self.arena.add("PBXContainerItemProxy", Some(reference), [remote.target_name.as_str()]);
        self.arena.set(proxy, "containerPortal", portal);
        self.arena.set(proxy, "proxyType", "2");
        self.arena.set(
            proxy,
            "remoteGlobalIDString",
            Value::Remote(RemoteTarget {
                build_file: remote.build_file.clone(),
                target_name: remote.target_name.clone(),
                object: RemoteObject::Product,
            }),
        );
        self.arena.set(proxy, "remoteInfo", remote.target_name.as_str());
        self.arena.set(reference, "remoteRef", proxy);
        self.arena.append(products, "children", reference);
        self.file_keys.insert(reference, format!("{other_bundle}/{file_name}"));
        self.remote_products.insert(remote.clone(), reference);
        reference
    }

    /// Register a makefile stored inside the bundle.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutputCollision`] when another owner
    /// already produced a makefile of the same name.
    pub fn add_makefile(&mut self, name: String, owner: String, text: String) -> Result<(), ValidationError> {
        if let Some((first, _)) = self.makefiles.get(&name) {
            return Err(ValidationError::OutputCollision {
                path: self.bundle.join(&name),
                first: first.clone(),
                second: owner,
            });
        }
        self.makefiles.insert(name, (owner, text));
        Ok(())
    }

    /// Makefiles by file name.
    pub fn makefiles(&self) -> impl Iterator<Item = (&str, &str)> {
        self.makefiles
            .iter()
            .map(|(name, (_, text))| (name.as_str(), text.as_str()))
    }

    /// Order targets, add aggregate helpers, tidy groups and compute ids.
    ///
    /// `declared` lists the build file's targets in declaration order;
    /// `settings` holds the project-wide build settings.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::IdCollision`] when two objects end up with the
    /// same id.
    pub fn finalize(&mut self, declared: &[QualifiedTarget], settings: &Settings) -> Result<(), GenError> {
        let position = |name: &str| {
            declared
                .iter()
                .position(|t| t.target_name == name)
                .unwrap_or(usize::MAX)
        };
        let mut entries = std::mem::take(&mut self.targets);
        entries.sort_by_key(|t| position(&t.name));

        let mut ordered = Vec::new();
        let mut primaries = Vec::new();
        let mut runners = Vec::new();
        for entry in &entries {
            ordered.push(entry.object);
            primaries.push(entry.object);
            if entry.test {
                let runner = self.add_runner(entry);
                ordered.push(runner);
                runners.push(runner);
            }
        }
        if primaries.len() > 1 {
            let all = self.add_helper("All", &primaries);
            ordered.insert(0, all);
        }
        if runners.len() > 1 {
            let run_all = self.add_helper("Run All Tests", &runners);
            ordered.insert(1.min(ordered.len()), run_all);
        }
        self.targets = entries;
        self.arena.set_refs(self.root, "targets", &ordered);

        let project_configs: Vec<(String, Settings)> = self
            .configurations
            .iter()
            .map(|name| (name.clone(), settings.clone()))
            .collect();
        self.set_configurations(self.root, &project_configs);
        self.arena.set(
            self.root,
            "attributes",
            Value::Dict(IndexMap::from([(
                "BuildIndependentTargetsInParallel".to_owned(),
                Value::from("YES"),
            )])),
        );
        self.arena.set(self.root, "compatibilityVersion", "Xcode 3.1");
        self.arena.set(self.root, "hasScannedForEncodings", "1");
        self.arena.set(self.root, "projectDirPath", "");
        self.arena.set(self.root, "projectRoot", "");

        if let Some(source) = self.root_groups.get(&RootGroup::Source).copied() {
            self.take_over_only_child(source);
        }
        let groups: Vec<ObjectRef> = self.root_groups.values().copied().collect();
        for group in &groups {
            self.sort_group(*group);
        }
        self.arena.set_refs(self.main_group, "children", &groups);
        if let Some(products) = self.root_groups.get(&RootGroup::Products).copied() {
            self.arena.set(self.root, "productRefGroup", products);
        }

        self.arena.compute_ids();
        self.arena.ensure_unique_ids(&self.bundle.join(PROJECT_FILE))
    }

    fn add_runner(&mut self, entry: &TargetEntry) -> ObjectRef {
        let name = format!("Run {}", entry.name);
        let runner = self.add_aggregate_target(&name, &name);
        let script = "exec \"${BUILT_PRODUCTS_DIR}/${PRODUCT_NAME}\"\nexit 1\n";
        let phase = self.add_shell_phase(runner, &format!("Run \"{}\"", entry.name), Vec::new(), Vec::new(), script);
        self.set_build_phases(runner, &[phase]);
        let configs: Vec<(String, Settings)> = entry
            .configurations
            .iter()
            .map(|c| (c.clone(), Settings::new()))
            .collect();
        self.set_configurations(runner, &configs);
        self.add_local_dependency(runner, entry.object);
        runner
    }

    fn add_helper(&mut self, name: &str, members: &[ObjectRef]) -> ObjectRef {
        let helper = self.add_aggregate_target(name, name);
        let configs: Vec<(String, Settings)> = self
            .configurations
            .iter()
            .map(|c| (c.clone(), Settings::new()))
            .collect();
        self.set_configurations(helper, &configs);
        for member in members {
            self.add_local_dependency(helper, *member);
        }
        helper
    }

    fn is_group(&self, r: ObjectRef) -> bool {
        self.arena.isa(r) == Some("PBXGroup")
    }

    fn children(&self, group: ObjectRef) -> Vec<ObjectRef> {
        self.arena.get(group).map(|o| o.refs("children")).unwrap_or_default()
    }

    fn str_prop(&self, r: ObjectRef, key: &str) -> Option<String> {
        self.arena.get(r).and_then(|o| o.str_prop(key)).map(str::to_owned)
    }

    /// Absorb a lone child group into `group`, repeatedly, then recurse.
    fn take_over_only_child(&mut self, group: ObjectRef) {
        loop {
            let children = self.children(group);
            let [only] = children.as_slice() else {
                break;
            };
            let only = *only;
            if !self.is_group(only) {
                break;
            }
            let path = match (self.str_prop(group, "path"), self.str_prop(only, "path")) {
                (Some(outer), Some(inner)) => Some(format!("{outer}/{inner}")),
                (outer, inner) => inner.or(outer),
            };
            if let Some(path) = path {
                self.arena.set(group, "path", path);
            }
            let grandchildren = self.children(only);
            for child in &grandchildren {
                self.arena.set_parent(*child, group);
            }
            self.arena.set_refs(group, "children", &grandchildren);
            self.arena.remove(only);
        }
        for child in self.children(group) {
            if self.is_group(child) {
                self.take_over_only_child(child);
            }
        }
    }

    /// Groups before files, each by display name; recursive.
    fn sort_group(&mut self, group: ObjectRef) {
        let mut children = self.children(group);
        let key = |r: &ObjectRef| {
            let name = self
                .str_prop(*r, "name")
                .or_else(|| self.str_prop(*r, "path"))
                .unwrap_or_default();
            (!self.is_group(*r), name)
        };
        children.sort_by_cached_key(key);
        self.arena.set_refs(group, "children", &children);
        for child in children {
            if self.is_group(child) {
                self.sort_group(child);
            }
        }
    }

    /// Id of the declared target `name`, once ids are computed.
    #[must_use]
    pub fn target_id(&self, name: &str) -> Option<&str> {
        self.target(name).and_then(|r| self.arena.id(r))
    }

    /// Id of the product reference of the declared target `name`.
    #[must_use]
    pub fn product_id(&self, name: &str) -> Option<&str> {
        let target = self.arena.get(self.target(name)?)?;
        match target.props.get("productReference") {
            Some(Value::Ref(product)) => self.arena.id(*product),
            _ => None,
        }
    }

    /// Id of the object `remote` asks this project for.
    #[must_use]
    pub fn remote_id(&self, remote: &RemoteTarget) -> Option<&str> {
        match remote.object {
            RemoteObject::Target => self.target_id(&remote.target_name),
            RemoteObject::Product => self.product_id(&remote.target_name),
        }
    }

    /// Print `project.pbxproj`; `resolve` supplies ids of remote targets.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownTarget`] for a remote dependency
    /// that no project defines.
    pub fn render<R>(&self, resolve: R) -> Result<String, GenError>
    where
        R: Fn(&RemoteTarget) -> Option<String>,
    {
        Printer::new(&self.arena, resolve)
            .print(self.root)
            .map_err(|missing| {
                ValidationError::UnknownTarget {
                    target: QualifiedTarget::new(missing.build_file, missing.target_name),
                }
                .into()
            })
    }
}

fn setting_value(value: &SettingValue) -> Value {
    match value {
        SettingValue::Scalar(s) => Value::from(s.as_str()),
        SettingValue::List(items) => Value::List(items.iter().map(|i| Value::from(i.as_str())).collect()),
    }
}

/// Split `$(VAR)/rest` into `VAR` and `rest`.
fn split_variable(path: &str) -> Option<(&str, &str)> {
    let inner = path.strip_prefix("$(")?;
    let (var, rest) = inner.split_once(')')?;
    let rest = rest.strip_prefix('/')?;
    (!var.is_empty() && !rest.is_empty()).then_some((var, rest))
}

fn file_type(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map_or("", |(_, ext)| ext);
    match ext {
        "a" => "archive.ar",
        "c" => "sourcecode.c.c",
        "cc" | "cpp" | "cxx" => "sourcecode.cpp.cpp",
        "dylib" => "compiled.mach-o.dylib",
        "framework" => "wrapper.framework",
        "h" => "sourcecode.c.h",
        "hh" | "hpp" | "hxx" => "sourcecode.cpp.h",
        "m" => "sourcecode.c.objc",
        "mm" => "sourcecode.cpp.objcpp",
        "s" => "sourcecode.asm",
        "make" => "sourcecode.make",
        "plist" => "text.plist.xml",
        "xib" => "file.xib",
        _ => "text",
    }
}
