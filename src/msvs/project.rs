//! `.vcproj` document model.
//!
//! A [`ProjectWriter`] collects platforms, configurations, files and per-file
//! configurations. [`ProjectWriter::finalize`] checks that every file
//! configuration refers to a listed file and fixes the document; the
//! resulting [`FinalizedProject`] can only be written, once.

use std::collections::{BTreeMap, BTreeSet};

use camino::Utf8Path;

use super::MsvsVersion;
use super::tool::ToolSet;
use super::xml::{Document, Element};
use crate::error::{GenError, ValidationError};
use crate::ids::Guid;
use crate::output::{WriteOutcome, write_if_changed};

/// A file or filter of the project's file tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEntry {
    /// A file, by project-relative Windows path.
    File(String),
    /// A named filter (virtual folder).
    Filter {
        /// Display name.
        name: String,
        /// Contents.
        entries: Vec<SourceEntry>,
    },
}

/// Arrange sorted Windows paths into filters mirroring their directories.
///
/// At each level plain files come first, then an `_excluded_files` filter
/// holding the excluded files of that level, then one filter per
/// subdirectory in sorted order.
#[must_use]
pub fn source_tree(sources: &BTreeSet<String>, excluded: &BTreeSet<String>) -> Vec<SourceEntry> {
    let split: Vec<Vec<&str>> = sources.iter().map(|s| s.split('\\').collect()).collect();
    tree_level(&split, &[], excluded)
}

fn tree_level(sources: &[Vec<&str>], prefix: &[&str], excluded: &BTreeSet<String>) -> Vec<SourceEntry> {
    let mut files = Vec::new();
    let mut excluded_files = Vec::new();
    let mut folders: BTreeMap<&str, Vec<Vec<&str>>> = BTreeMap::new();
    for parts in sources {
        match parts.as_slice() {
            [] => {}
            [name] => {
                let path = prefix.iter().chain(std::iter::once(name)).copied().collect::<Vec<_>>().join("\\");
                if excluded.contains(&path) {
                    excluded_files.push(SourceEntry::File(path));
                } else {
                    files.push(SourceEntry::File(path));
                }
            }
            [folder, rest @ ..] => folders.entry(*folder).or_default().push(rest.to_vec()),
        }
    }
    if !excluded_files.is_empty() {
        files.push(SourceEntry::Filter {
            name: "_excluded_files".to_owned(),
            entries: excluded_files,
        });
    }
    for (folder, contents) in folders {
        let mut nested = prefix.to_vec();
        nested.push(folder);
        files.push(SourceEntry::Filter {
            name: folder.to_owned(),
            entries: tree_level(&contents, &nested, excluded),
        });
    }
    files
}

/// Attributes and tools of a configuration or file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSpec {
    /// Element attributes other than `Name`.
    pub attrs: BTreeMap<String, String>,
    /// Tool settings.
    pub tools: ToolSet,
}

impl ConfigSpec {
    fn element(&self, tag: &str, name: &str) -> Element {
        let mut element = Element::new(tag).attr("Name", name);
        for (key, value) in &self.attrs {
            element = element.attr(key.as_str(), value.as_str());
        }
        element.children(self.tools.elements())
    }
}

/// A project being configured.
#[derive(Debug, Clone)]
pub struct ProjectWriter {
    name: String,
    guid: Guid,
    version: MsvsVersion,
    platforms: BTreeSet<String>,
    tool_files: BTreeSet<String>,
    configurations: BTreeMap<String, ConfigSpec>,
    files: Vec<SourceEntry>,
    file_configs: BTreeMap<String, BTreeMap<String, ConfigSpec>>,
}

impl ProjectWriter {
    /// Start an empty project.
    pub fn create(name: impl Into<String>, guid: Guid, version: MsvsVersion) -> Self {
        Self {
            name: name.into(),
            guid,
            version,
            platforms: BTreeSet::new(),
            tool_files: BTreeSet::new(),
            configurations: BTreeMap::new(),
            files: Vec::new(),
            file_configs: BTreeMap::new(),
        }
    }

    /// Project name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a target platform.
    pub fn add_platform(&mut self, platform: impl Into<String>) {
        self.platforms.insert(platform.into());
    }

    /// Reference a `.rules` tool file.
    pub fn add_tool_file(&mut self, path: impl Into<String>) {
        self.tool_files.insert(path.into());
    }

    /// Add a configuration keyed `name|platform`.
    pub fn add_configuration(&mut self, full_name: impl Into<String>, spec: ConfigSpec) {
        self.configurations.insert(full_name.into(), spec);
    }

    /// Append entries to the file tree.
    pub fn add_files(&mut self, entries: impl IntoIterator<Item = SourceEntry>) {
        self.files.extend(entries);
    }

    /// Merge per-file settings for one configuration.
    ///
    /// Attributes and tool settings given again for the same file and
    /// configuration overwrite the earlier ones.
    pub fn add_file_config(&mut self, path: &str, config: &str, spec: ConfigSpec) {
        let entry = self
            .file_configs
            .entry(path.to_owned())
            .or_default()
            .entry(config.to_owned())
            .or_default();
        entry.attrs.extend(spec.attrs);
        entry.tools.overlay(&spec.tools);
    }

    /// Fix the document.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::FileNotInProject`] when a file
    /// configuration names a file missing from the file tree.
    pub fn finalize(self) -> Result<FinalizedProject, ValidationError> {
        let mut listed = BTreeSet::new();
        collect_files(&self.files, &mut listed);
        if let Some(missing) = self.file_configs.keys().find(|path| !listed.contains(path.as_str())) {
            return Err(ValidationError::FileNotInProject {
                project: self.name.clone(),
                path: missing.clone(),
            });
        }

        let root = Element::new("VisualStudioProject")
            .attr("ProjectType", "Visual C++")
            .attr("Version", self.version.project_version())
            .attr("Name", self.name.as_str())
            .attr("ProjectGUID", self.guid.braced())
            .attr("RootNamespace", self.name.as_str())
            .attr("Keyword", "Win32Proj")
            .child(
                Element::new("Platforms")
                    .children(self.platforms.iter().map(|p| Element::new("Platform").attr("Name", p.as_str()))),
            )
            .child(Element::new("ToolFiles").children(
                self.tool_files
                    .iter()
                    .map(|p| Element::new("ToolFile").attr("RelativePath", p.as_str())),
            ))
            .child(Element::new("Configurations").children(
                self.configurations
                    .iter()
                    .map(|(name, spec)| spec.element("Configuration", name)),
            ))
            .child(Element::new("References"))
            .child(Element::new("Files").children(self.files.iter().map(|e| self.entry_element(e))))
            .child(Element::new("Globals"));
        Ok(FinalizedProject {
            document: Document::new("Windows-1252", root),
        })
    }

    fn entry_element(&self, entry: &SourceEntry) -> Element {
        match entry {
            SourceEntry::File(path) => {
                let configs = self.file_configs.get(path).into_iter().flatten();
                Element::new("File")
                    .attr("RelativePath", path.as_str())
                    .children(configs.map(|(config, spec)| spec.element("FileConfiguration", config)))
            }
            SourceEntry::Filter { name, entries } => Element::new("Filter")
                .attr("Name", name.as_str())
                .children(entries.iter().map(|e| self.entry_element(e))),
        }
    }
}

fn collect_files<'a>(entries: &'a [SourceEntry], out: &mut BTreeSet<&'a str>) {
    for entry in entries {
        match entry {
            SourceEntry::File(path) => {
                out.insert(path.as_str());
            }
            SourceEntry::Filter { entries, .. } => collect_files(entries, out),
        }
    }
}

/// A project whose content is fixed.
#[derive(Debug, Clone)]
pub struct FinalizedProject {
    document: Document,
}

impl FinalizedProject {
    /// Serialised document.
    #[must_use]
    pub fn render(&self) -> String {
        self.document.to_string()
    }

    /// Write the project to `path`, leaving an identical file untouched.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::Io`] when the file cannot be written.
    pub fn write(self, path: &Utf8Path) -> Result<WriteOutcome, GenError> {
        write_if_changed(path, self.render().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SettingValue;
    use crate::msvs::tool::MsvsTool;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    fn names(entries: &[SourceEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| match e {
                SourceEntry::File(path) => path.clone(),
                SourceEntry::Filter { name, entries } => format!("{name}[{}]", names(entries).join(",")),
            })
            .collect()
    }

    #[test]
    fn files_precede_excluded_filter_and_folders() {
        let sources = set(&["a.gyp", "b.cc", "gen\\x.h", "gen\\y.cc", "src\\z.cc"]);
        let excluded = set(&["b.cc", "gen\\x.h"]);
        let tree = source_tree(&sources, &excluded);
        assert_eq!(
            names(&tree),
            [
                "a.gyp",
                "_excluded_files[b.cc]",
                "gen[gen\\y.cc,_excluded_files[gen\\x.h]]",
                "src[src\\z.cc]",
            ]
        );
    }

    #[test]
    fn file_configs_must_name_listed_files() {
        let mut writer = ProjectWriter::create("a", Guid::derive("a"), MsvsVersion::V2008);
        writer.add_files([SourceEntry::File("a.cc".into())]);
        writer.add_file_config("missing.cc", "Debug|Win32", ConfigSpec::default());
        let err = writer.finalize().expect_err("unknown file");
        assert!(matches!(err, ValidationError::FileNotInProject { ref path, .. } if path == "missing.cc"));
    }

    #[test]
    fn file_configs_merge_by_file_and_configuration() {
        let mut writer = ProjectWriter::create("a", Guid::derive("a"), MsvsVersion::V2005);
        writer.add_platform("Win32");
        writer.add_files([SourceEntry::File("a.cc".into())]);
        let mut exclude = ConfigSpec::default();
        exclude.attrs.insert("ExcludedFromBuild".into(), "true".into());
        writer.add_file_config("a.cc", "Debug|Win32", exclude);
        let mut pch = ConfigSpec::default();
        pch.tools
            .set(MsvsTool::Compiler, "UsePrecompiledHeader", SettingValue::from("1"));
        writer.add_file_config("a.cc", "Debug|Win32", pch);
        let text = writer.finalize().expect("finalize").render();
        assert_eq!(text.matches("<FileConfiguration").count(), 1);
        assert!(text.contains("\t\t\t\tExcludedFromBuild=\"true\"\r\n"));
        assert!(text.contains("UsePrecompiledHeader=\"1\""));
        assert!(text.contains("Version=\"8.00\""));
    }
}
