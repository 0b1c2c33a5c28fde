//! Rule expansion.
//!
//! A rule applies to every source whose extension matches. Expansion is done
//! once per trigger file and the result reused by every configuration and by
//! both emission policies: native rule files, where the IDE substitutes the
//! placeholders itself, and external makefiles that list concrete outputs.

mod makefile;

use camino::{Utf8Path, Utf8PathBuf};

use crate::model::Rule;
use crate::variables::RuleInput;

pub use makefile::{MakefileFlavor, RuleMakefile};

/// Concrete values of the rule-input placeholders for one trigger file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInputVars {
    root: String,
    ext: String,
    name: String,
    path: String,
}

impl RuleInputVars {
    /// Values for `trigger`.
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use projgen::rules::RuleInputVars;
    ///
    /// let vars = RuleInputVars::for_trigger(Utf8Path::new("dir/bar.idl"));
    /// assert_eq!(vars.expand("$(RULE_INPUT_ROOT).cc"), "bar.cc");
    /// assert_eq!(vars.expand("{name} {ext} {path}"), "bar.idl .idl dir/bar.idl");
    /// ```
    #[must_use]
    pub fn for_trigger(trigger: &Utf8Path) -> Self {
        let name = trigger.file_name().unwrap_or(trigger.as_str());
        let root = trigger.file_stem().unwrap_or(name);
        let ext = trigger.extension().map(|e| format!(".{e}")).unwrap_or_default();
        Self {
            root: root.to_owned(),
            ext,
            name: name.to_owned(),
            path: trigger.as_str().to_owned(),
        }
    }

    /// Value of one placeholder.
    #[must_use]
    pub fn value(&self, input: RuleInput) -> &str {
        match input {
            RuleInput::Root => &self.root,
            RuleInput::Ext => &self.ext,
            RuleInput::Name => &self.name,
            RuleInput::Path => &self.path,
        }
    }

    /// Substitute every rule-input placeholder in `template`.
    #[must_use]
    pub fn expand(&self, template: &str) -> String {
        let mut out = template.to_owned();
        for input in RuleInput::ALL {
            out = out
                .replace(input.neutral(), self.value(input))
                .replace(input.alias(), self.value(input));
        }
        out
    }
}

/// A rule applied to one trigger file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerExpansion {
    /// Source file that triggered the rule.
    pub trigger: Utf8PathBuf,
    /// Trigger followed by the expanded extra inputs, without duplicates.
    pub inputs: Vec<Utf8PathBuf>,
    /// Expanded outputs.
    pub outputs: Vec<Utf8PathBuf>,
    /// Expanded command argv.
    pub command: Vec<String>,
}

impl TriggerExpansion {
    /// Inputs other than the trigger itself.
    pub fn extra_inputs(&self) -> impl Iterator<Item = &Utf8PathBuf> {
        self.inputs.iter().skip(1)
    }
}

/// A rule expanded over the sources of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleExpansion<'a> {
    /// Rule being applied.
    pub rule: &'a Rule,
    /// One entry per trigger file, in source order.
    pub per_trigger: Vec<TriggerExpansion>,
}

impl<'a> RuleExpansion<'a> {
    /// Expand `rule` for every matching source.
    #[must_use]
    pub fn expand<P: AsRef<Utf8Path>>(rule: &'a Rule, sources: &[P]) -> Self {
        let per_trigger = trigger_files(rule, sources)
            .map(|trigger| expand_trigger(rule, trigger))
            .collect();
        Self { rule, per_trigger }
    }

    /// Whether no source triggered the rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.per_trigger.is_empty()
    }

    /// Every concrete output, in trigger order, without duplicates.
    #[must_use]
    pub fn all_outputs(&self) -> Vec<&Utf8PathBuf> {
        let mut outputs: Vec<&Utf8PathBuf> = Vec::new();
        for output in self.per_trigger.iter().flat_map(|t| &t.outputs) {
            if !outputs.contains(&output) {
                outputs.push(output);
            }
        }
        outputs
    }
}

/// Sources whose name ends with `.<extension>`, in source order.
pub fn trigger_files<'s, P: AsRef<Utf8Path>>(
    rule: &Rule,
    sources: &'s [P],
) -> impl Iterator<Item = &'s Utf8Path> {
    let suffix = format!(".{}", rule.extension);
    sources
        .iter()
        .map(AsRef::as_ref)
        .filter(move |source| source.as_str().ends_with(&suffix))
}

fn expand_trigger(rule: &Rule, trigger: &Utf8Path) -> TriggerExpansion {
    let vars = RuleInputVars::for_trigger(trigger);
    let mut inputs = vec![trigger.to_owned()];
    for input in &rule.inputs {
        let expanded = Utf8PathBuf::from(vars.expand(input));
        if !inputs.contains(&expanded) {
            inputs.push(expanded);
        }
    }
    TriggerExpansion {
        trigger: trigger.to_owned(),
        inputs,
        outputs: rule
            .outputs
            .iter()
            .map(|o| Utf8PathBuf::from(vars.expand(o)))
            .collect(),
        command: rule.action.iter().map(|arg| vars.expand(arg)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn idl_rule() -> Rule {
        Rule {
            rule_name: "midl".into(),
            extension: "idl".into(),
            inputs: vec!["tools/midl.py".into(), "$(RULE_INPUT_PATH)".into()],
            outputs: vec!["$(INTERMEDIATE_DIR)/{base}.cc".into(), "{base}.h".into()],
            action: vec!["python".into(), "tools/midl.py".into(), "{path}".into()],
            ..Rule::default()
        }
    }

    #[rstest]
    #[case("foo.idl", "foo", ".idl", "foo.idl")]
    #[case("dir/bar.idl", "bar", ".idl", "bar.idl")]
    #[case("a/archive.tar.gz", "archive.tar", ".gz", "archive.tar.gz")]
    #[case("Makefile", "Makefile", "", "Makefile")]
    fn trigger_variables(
        #[case] path: &str,
        #[case] root: &str,
        #[case] ext: &str,
        #[case] name: &str,
    ) {
        let vars = RuleInputVars::for_trigger(Utf8Path::new(path));
        assert_eq!(vars.value(RuleInput::Root), root);
        assert_eq!(vars.value(RuleInput::Ext), ext);
        assert_eq!(vars.value(RuleInput::Name), name);
        assert_eq!(vars.value(RuleInput::Path), path);
    }

    #[test]
    fn expands_each_trigger_once() {
        let rule = idl_rule();
        let sources = ["foo.idl", "a.cc", "dir/bar.idl", "notidl"].map(Utf8PathBuf::from);
        let expansion = RuleExpansion::expand(&rule, &sources);
        let outputs: Vec<Vec<&str>> = expansion
            .per_trigger
            .iter()
            .map(|t| t.outputs.iter().map(|p| p.as_str()).collect())
            .collect();
        assert_eq!(
            outputs,
            vec![
                vec!["$(INTERMEDIATE_DIR)/foo.cc", "foo.h"],
                vec!["$(INTERMEDIATE_DIR)/bar.cc", "bar.h"],
            ]
        );
        let bar = expansion.per_trigger.get(1).expect("bar");
        assert_eq!(bar.command, ["python", "tools/midl.py", "dir/bar.idl"]);
    }

    #[test]
    fn inputs_start_with_trigger_and_skip_duplicates() {
        let rule = idl_rule();
        let expansion = RuleExpansion::expand(&rule, &[Utf8PathBuf::from("x.idl")]);
        let trigger = expansion.per_trigger.first().expect("trigger");
        assert_eq!(trigger.inputs, ["x.idl", "tools/midl.py"].map(Utf8PathBuf::from));
        assert_eq!(trigger.extra_inputs().collect::<Vec<_>>(), [&Utf8PathBuf::from("tools/midl.py")]);
    }

    #[test]
    fn all_outputs_deduplicates() {
        let rule = Rule {
            extension: "in".into(),
            outputs: vec!["shared.h".into(), "{base}.out".into()],
            ..Rule::default()
        };
        let sources = [Utf8PathBuf::from("a.in"), Utf8PathBuf::from("b.in")];
        let expansion = RuleExpansion::expand(&rule, &sources);
        let outputs: Vec<&str> = expansion.all_outputs().into_iter().map(|p| p.as_str()).collect();
        assert_eq!(outputs, ["shared.h", "a.out", "b.out"]);
    }

    #[test]
    fn extension_must_follow_a_dot() {
        let rule = Rule {
            extension: "idl".into(),
            ..Rule::default()
        };
        let sources = [Utf8PathBuf::from("noidl"), Utf8PathBuf::from("x.idl")];
        let triggers: Vec<&Utf8Path> = trigger_files(&rule, &sources).collect();
        assert_eq!(triggers, [Utf8Path::new("x.idl")]);
    }
}
