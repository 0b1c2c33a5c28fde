//! Makefiles for rules the IDE cannot express natively.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use camino::Utf8Path;
use itertools::Itertools;

use super::{RuleExpansion, RuleInputVars};
use crate::steps::encode_posix_shell_list;
use crate::variables::{Dialect, MSVS, XCODE};

/// Shell conventions of the generated makefile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MakefileFlavor {
    /// Run by cygwin `make` from a Visual Studio custom build step.
    Cygwin,
    /// Run by `make` from an Xcode shell script phase.
    Posix,
}

impl MakefileFlavor {
    const fn dialect(self) -> Dialect {
        match self {
            Self::Cygwin => MSVS,
            Self::Posix => XCODE,
        }
    }
}

/// A makefile mapping every concrete rule output to its recipe.
#[derive(Debug, Clone, Copy)]
pub struct RuleMakefile<'a, 'r> {
    flavor: MakefileFlavor,
    expansions: &'a [RuleExpansion<'r>],
}

impl<'a, 'r> RuleMakefile<'a, 'r> {
    /// Makefile for `expansions`.
    #[must_use]
    pub const fn new(flavor: MakefileFlavor, expansions: &'a [RuleExpansion<'r>]) -> Self {
        Self { flavor, expansions }
    }

    fn path(&self, path: &Utf8Path) -> String {
        let localized = self.flavor.dialect().localize_paths(path.as_str());
        match self.flavor {
            MakefileFlavor::Cygwin => cygwinify(&localized),
            MakefileFlavor::Posix => localized,
        }
    }

    fn first_outputs(&self) -> Vec<String> {
        self.expansions
            .iter()
            .flat_map(|e| &e.per_trigger)
            .filter_map(|t| t.outputs.first())
            .map(|o| self.path(o))
            .collect()
    }

    fn fmt_cygwin(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "OutDirCygwin:=$(shell cygpath -u \"$(OutDir)\")")?;
        writeln!(f, "IntDirCygwin:=$(shell cygpath -u \"$(IntDir)\")")?;
        writeln!(f, "all: {}", self.first_outputs().join(" "))?;
        let dirs: BTreeSet<String> = self
            .expansions
            .iter()
            .flat_map(|e| &e.per_trigger)
            .flat_map(|t| &t.outputs)
            .filter_map(|o| o.parent())
            .filter(|d| !d.as_str().is_empty())
            .map(|d| MSVS.localize_paths(d.as_str()))
            .collect();
        for dir in dirs {
            writeln!(f, "\tmkdir -p {dir}")?;
        }
        writeln!(f)?;
        for trigger in self.expansions.iter().flat_map(|e| &e.per_trigger) {
            writeln!(
                f,
                "{}: {}",
                trigger.outputs.iter().map(|o| self.path(o)).join(" "),
                trigger.inputs.iter().map(|i| self.path(i)).join(" "),
            )?;
            let command = trigger
                .command
                .iter()
                .map(|arg| format!("\"{}\"", MSVS.localize_paths(arg)))
                .join(" ");
            writeln!(f, "\t{command}")?;
            writeln!(f)?;
        }
        Ok(())
    }

    fn fmt_posix(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let first = self.first_outputs();
        write!(f, "all:")?;
        for output in &first {
            write!(f, " \\\n    {output}")?;
        }
        writeln!(f)?;
        writeln!(f)?;
        for expansion in self.expansions {
            for trigger in &expansion.per_trigger {
                writeln!(
                    f,
                    "{}: {}",
                    trigger.outputs.iter().map(|o| self.path(o)).join(" "),
                    trigger.inputs.iter().map(|i| self.path(i)).join(" "),
                )?;
                let dirs: BTreeSet<String> = trigger
                    .outputs
                    .iter()
                    .filter_map(|o| o.parent())
                    .filter(|d| !d.as_str().is_empty())
                    .map(|d| self.path(d))
                    .collect();
                for dir in dirs {
                    writeln!(f, "\t@mkdir -p \"{dir}\"")?;
                }
                if let Some(message) = &expansion.rule.message {
                    let text = RuleInputVars::for_trigger(&trigger.trigger).expand(message);
                    writeln!(f, "\t@echo note: {}", encode_posix_shell_list(&[text]))?;
                }
                let command: Vec<String> = trigger
                    .command
                    .iter()
                    .map(|arg| XCODE.localize_paths(arg))
                    .collect();
                writeln!(f, "\t{}", encode_posix_shell_list(&command))?;
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl Display for RuleMakefile<'_, '_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.flavor {
            MakefileFlavor::Cygwin => self.fmt_cygwin(f),
            MakefileFlavor::Posix => self.fmt_posix(f),
        }
    }
}

fn cygwinify(path: &str) -> String {
    path.replace("$(OutDir)", "$(OutDirCygwin)")
        .replace("$(IntDir)", "$(IntDirCygwin)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rule;
    use camino::Utf8PathBuf;

    fn rule() -> Rule {
        Rule {
            rule_name: "gen".into(),
            extension: "in".into(),
            inputs: vec!["gen.py".into()],
            outputs: vec!["$(INTERMEDIATE_DIR)/{base}.h".into(), "$(INTERMEDIATE_DIR)/{base}.cc".into()],
            action: vec!["python".into(), "gen.py".into(), "{path}".into()],
            message: Some("Generating {name}".into()),
            ..Rule::default()
        }
    }

    #[test]
    fn cygwin_makefile_lists_first_outputs_and_recipes() {
        let rule = rule();
        let sources = [Utf8PathBuf::from("a.in"), Utf8PathBuf::from("sub/b.in")];
        let expansions = [RuleExpansion::expand(&rule, &sources)];
        let text = RuleMakefile::new(MakefileFlavor::Cygwin, &expansions).to_string();
        let expected = concat!(
            "OutDirCygwin:=$(shell cygpath -u \"$(OutDir)\")\n",
            "IntDirCygwin:=$(shell cygpath -u \"$(IntDir)\")\n",
            "all: $(IntDirCygwin)/a.h $(IntDirCygwin)/b.h\n",
            "\tmkdir -p $(IntDir)\n",
            "\n",
            "$(IntDirCygwin)/a.h $(IntDirCygwin)/a.cc: a.in gen.py\n",
            "\t\"python\" \"gen.py\" \"a.in\"\n",
            "\n",
            "$(IntDirCygwin)/b.h $(IntDirCygwin)/b.cc: sub/b.in gen.py\n",
            "\t\"python\" \"gen.py\" \"sub/b.in\"\n",
            "\n",
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn posix_makefile_creates_output_dirs_per_recipe() {
        let rule = rule();
        let sources = [Utf8PathBuf::from("a.in")];
        let expansions = [RuleExpansion::expand(&rule, &sources)];
        let text = RuleMakefile::new(MakefileFlavor::Posix, &expansions).to_string();
        let expected = concat!(
            "all: \\\n",
            "    $(INTERMEDIATE_DIR)/a.h\n",
            "\n",
            "$(INTERMEDIATE_DIR)/a.h $(INTERMEDIATE_DIR)/a.cc: a.in gen.py\n",
            "\t@mkdir -p \"$(INTERMEDIATE_DIR)\"\n",
            "\t@echo note: \"Generating a.in\"\n",
            "\tpython gen.py a.in\n",
            "\n",
        );
        assert_eq!(text, expected);
    }
}
