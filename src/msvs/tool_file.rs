//! Native `.rules` tool files.
//!
//! Visual Studio applies these rules itself, substituting `$(InputName)` and
//! friends per file, so the templates are written with the IDE's macros
//! rather than expanded.

use super::MsvsVersion;
use super::xml::{Document, Element};
use crate::model::{Configuration, Rule};
use crate::steps::Shell;
use crate::variables::{MSVS, to_windows};

/// One `<CustomBuildRule>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomBuildRule {
    /// Rule name.
    pub name: String,
    /// Progress text.
    pub display_name: String,
    /// Command line with IDE macros.
    pub command: String,
    /// Output templates.
    pub outputs: Vec<String>,
    /// Extra input templates.
    pub additional_dependencies: Vec<String>,
    /// Trigger extensions without the dot.
    pub extensions: Vec<String>,
}

impl CustomBuildRule {
    /// Translate `rule` for `config`.
    #[must_use]
    pub fn from_rule(rule: &Rule, config: &Configuration) -> Self {
        let shell = Shell::Msvs {
            config,
            cygwin: rule.msvs_cygwin_shell.unwrap_or_else(|| config.cygwin_shell()),
        };
        let fix = |items: &[String]| -> Vec<String> {
            items.iter().map(|i| to_windows(&MSVS.localize(i))).collect()
        };
        Self {
            name: rule.rule_name.clone(),
            display_name: MSVS.localize(rule.message.as_deref().unwrap_or(&rule.rule_name)),
            command: shell.command(&rule.action, true),
            outputs: fix(&rule.outputs),
            additional_dependencies: fix(&rule.inputs),
            extensions: vec![rule.extension.clone()],
        }
    }

    fn element(&self) -> Element {
        let extensions: Vec<String> = self.extensions.iter().map(|e| format!("*.{e}")).collect();
        Element::new("CustomBuildRule")
            .attr("Name", self.name.as_str())
            .attr("DisplayName", self.display_name.as_str())
            .attr("CommandLine", self.command.as_str())
            .attr("Outputs", self.outputs.join(";"))
            .attr("AdditionalDependencies", self.additional_dependencies.join(";"))
            .attr("FileExtensions", extensions.join(";"))
            .attr("ExecutionDescription", self.display_name.as_str())
            .child(Element::new("Properties"))
    }
}

/// A `VisualStudioToolFile` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeRuleFile {
    name: String,
    rules: Vec<CustomBuildRule>,
}

impl NativeRuleFile {
    /// Empty tool file named after the target.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Add a rule.
    pub fn add_rule(&mut self, rule: CustomBuildRule) {
        self.rules.push(rule);
    }

    /// Serialise the tool file.
    #[must_use]
    pub fn render(&self, version: MsvsVersion) -> String {
        let root = Element::new("VisualStudioToolFile")
            .attr("Name", self.name.as_str())
            .attr("Version", version.project_version())
            .child(Element::new("Rules").children(self.rules.iter().map(CustomBuildRule::element)));
        Document::new("Windows-1252", root).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_keep_ide_macros() {
        let rule = Rule {
            rule_name: "midl".into(),
            extension: "idl".into(),
            inputs: vec!["tools/midl.py".into()],
            outputs: vec!["$(INTERMEDIATE_DIR)/{base}_i.c".into(), "{base}.h".into()],
            action: vec!["midl".into(), "$(RULE_INPUT_PATH)".into()],
            msvs_cygwin_shell: Some(false),
            ..Rule::default()
        };
        let built = CustomBuildRule::from_rule(&rule, &Configuration::default());
        assert_eq!(built.outputs, ["$(IntDir)\\$(InputName)_i.c", "$(InputName).h"]);
        assert_eq!(built.additional_dependencies, ["tools\\midl.py"]);
        assert_eq!(built.command, "midl $(InputPath)");
        assert_eq!(built.display_name, "midl");
    }

    #[test]
    fn renders_tool_file() {
        let mut file = NativeRuleFile::new("t");
        file.add_rule(CustomBuildRule {
            name: "r".into(),
            display_name: "Running r".into(),
            command: "cmd".into(),
            outputs: vec!["a.h".into()],
            additional_dependencies: Vec::new(),
            extensions: vec!["in".into()],
        });
        let text = file.render(MsvsVersion::V2005);
        let expected = concat!(
            "<?xml version=\"1.0\" encoding=\"Windows-1252\"?>\r\n",
            "<VisualStudioToolFile\r\n",
            "\tName=\"t\"\r\n",
            "\tVersion=\"8.00\"\r\n",
            "\t>\r\n",
            "\t<Rules>\r\n",
            "\t\t<CustomBuildRule\r\n",
            "\t\t\tName=\"r\"\r\n",
            "\t\t\tDisplayName=\"Running r\"\r\n",
            "\t\t\tCommandLine=\"cmd\"\r\n",
            "\t\t\tOutputs=\"a.h\"\r\n",
            "\t\t\tAdditionalDependencies=\"\"\r\n",
            "\t\t\tFileExtensions=\"*.in\"\r\n",
            "\t\t\tExecutionDescription=\"Running r\"\r\n",
            "\t\t\t>\r\n",
            "\t\t\t<Properties>\r\n",
            "\t\t\t</Properties>\r\n",
            "\t\t</CustomBuildRule>\r\n",
            "\t</Rules>\r\n",
            "</VisualStudioToolFile>\r\n",
        );
        assert_eq!(text, expected);
    }
}
