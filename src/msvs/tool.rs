//! Visual C++ tools and their per-configuration settings.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::xml::Element;
use crate::model::SettingValue;
use crate::settings::{MergeError, MergePolicy, Settings};

/// Visual C++ build tools, in the order Visual Studio lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MsvsTool {
    /// `VCPreBuildEventTool`
    PreBuildEvent,
    /// `VCCustomBuildTool`
    CustomBuild,
    /// `VCXMLDataGeneratorTool`
    XmlDataGenerator,
    /// `VCWebServiceProxyGeneratorTool`
    WebServiceProxyGenerator,
    /// `VCMIDLTool`
    Midl,
    /// `VCCLCompilerTool`
    Compiler,
    /// `VCManagedResourceCompilerTool`
    ManagedResourceCompiler,
    /// `VCResourceCompilerTool`
    ResourceCompiler,
    /// `VCPreLinkEventTool`
    PreLinkEvent,
    /// `VCLinkerTool`
    Linker,
    /// `VCLibrarianTool`
    Librarian,
    /// `VCALinkTool`
    ALink,
    /// `VCManifestTool`
    Manifest,
    /// `VCXDCMakeTool`
    XdcMake,
    /// `VCBscMakeTool`
    BscMake,
    /// `VCFxCopTool`
    FxCop,
    /// `VCAppVerifierTool`
    AppVerifier,
    /// `VCWebDeploymentTool`
    WebDeployment,
    /// `VCPostBuildEventTool`
    PostBuildEvent,
}

const TOOL_NAMES: [(MsvsTool, &str); 19] = [
    (MsvsTool::PreBuildEvent, "VCPreBuildEventTool"),
    (MsvsTool::CustomBuild, "VCCustomBuildTool"),
    (MsvsTool::XmlDataGenerator, "VCXMLDataGeneratorTool"),
    (MsvsTool::WebServiceProxyGenerator, "VCWebServiceProxyGeneratorTool"),
    (MsvsTool::Midl, "VCMIDLTool"),
    (MsvsTool::Compiler, "VCCLCompilerTool"),
    (MsvsTool::ManagedResourceCompiler, "VCManagedResourceCompilerTool"),
    (MsvsTool::ResourceCompiler, "VCResourceCompilerTool"),
    (MsvsTool::PreLinkEvent, "VCPreLinkEventTool"),
    (MsvsTool::Linker, "VCLinkerTool"),
    (MsvsTool::Librarian, "VCLibrarianTool"),
    (MsvsTool::ALink, "VCALinkTool"),
    (MsvsTool::Manifest, "VCManifestTool"),
    (MsvsTool::XdcMake, "VCXDCMakeTool"),
    (MsvsTool::BscMake, "VCBscMakeTool"),
    (MsvsTool::FxCop, "VCFxCopTool"),
    (MsvsTool::AppVerifier, "VCAppVerifierTool"),
    (MsvsTool::WebDeployment, "VCWebDeploymentTool"),
    (MsvsTool::PostBuildEvent, "VCPostBuildEventTool"),
];

impl MsvsTool {
    /// Name used in project files.
    #[must_use]
    pub fn name(self) -> &'static str {
        TOOL_NAMES
            .iter()
            .find(|(tool, _)| *tool == self)
            .map_or("", |(_, name)| *name)
    }

    /// Separator used when a list setting is written as one attribute.
    #[must_use]
    pub fn list_separator(self, setting: &str) -> &'static str {
        if self == Self::Linker && setting == "AdditionalDependencies" {
            " "
        } else {
            ";"
        }
    }
}

impl fmt::Display for MsvsTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tool name that is not a known Visual C++ tool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tool {0}")]
pub struct UnknownToolName(pub String);

impl FromStr for MsvsTool {
    type Err = UnknownToolName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TOOL_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(tool, _)| *tool)
            .ok_or_else(|| UnknownToolName(s.to_owned()))
    }
}

/// Settings of every tool in one configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolSet(BTreeMap<MsvsTool, Settings>);

impl ToolSet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one setting of `tool`.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError`] on conflicting contributions.
    pub fn append(
        &mut self,
        tool: MsvsTool,
        name: &str,
        value: SettingValue,
        policy: MergePolicy,
    ) -> Result<(), MergeError> {
        self.0.entry(tool).or_default().append(name, value, policy)
    }

    /// Overwrite one setting of `tool`.
    pub fn set(&mut self, tool: MsvsTool, name: &str, value: SettingValue) {
        self.0.entry(tool).or_default().set(name, value);
    }

    /// Settings of `tool`.
    #[must_use]
    pub fn get(&self, tool: MsvsTool) -> Option<&Settings> {
        self.0.get(&tool)
    }

    /// Overwrite every setting from `other`.
    pub fn overlay(&mut self, other: &Self) {
        for (tool, settings) in &other.0 {
            self.0.entry(*tool).or_default().overlay(settings);
        }
    }

    /// One `<Tool>` element per tool with settings.
    #[must_use]
    pub fn elements(&self) -> Vec<Element> {
        self.0
            .iter()
            .filter(|(_, settings)| !settings.is_empty())
            .map(|(tool, settings)| tool_element(*tool, settings))
            .collect()
    }
}

fn tool_element(tool: MsvsTool, settings: &Settings) -> Element {
    settings
        .sorted()
        .into_iter()
        .fold(Element::new("Tool").attr("Name", tool.name()), |el, (name, value)| {
            el.attr(name, value.join(tool.list_separator(name)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("VCCLCompilerTool", MsvsTool::Compiler)]
    #[case("VCLinkerTool", MsvsTool::Linker)]
    #[case("VCPostBuildEventTool", MsvsTool::PostBuildEvent)]
    fn tool_names_round_trip(#[case] name: &str, #[case] tool: MsvsTool) {
        assert_eq!(name.parse::<MsvsTool>(), Ok(tool));
        assert_eq!(tool.name(), name);
    }

    #[test]
    fn unknown_tool_names_are_rejected() {
        assert_eq!(
            "VCBogusTool".parse::<MsvsTool>(),
            Err(UnknownToolName("VCBogusTool".into()))
        );
    }

    #[test]
    fn every_tool_has_a_name() {
        assert!(TOOL_NAMES.iter().all(|(tool, name)| tool.name() == *name));
    }

    #[test]
    fn linker_dependencies_join_with_spaces() {
        let mut tools = ToolSet::new();
        tools
            .append(MsvsTool::Linker, "AdditionalDependencies", SettingValue::list(["a.lib", "b.lib"]), MergePolicy::Append)
            .expect("deps");
        tools
            .append(MsvsTool::Compiler, "PreprocessorDefinitions", SettingValue::list(["A", "B=1"]), MergePolicy::Append)
            .expect("defines");
        let elements = tools.elements();
        let values: Vec<_> = elements
            .iter()
            .map(|e| {
                (
                    e.get_attr("Name").unwrap_or_default(),
                    e.get_attr("AdditionalDependencies")
                        .or_else(|| e.get_attr("PreprocessorDefinitions"))
                        .unwrap_or_default(),
                )
            })
            .collect();
        assert_eq!(values, [("VCCLCompilerTool", "A;B=1"), ("VCLinkerTool", "a.lib b.lib")]);
    }
}
