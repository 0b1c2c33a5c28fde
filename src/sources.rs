//! Source bookkeeping for one target.
//!
//! Rules, actions and copies add files to a target and exclude some of them
//! from normal compilation. Those changes are collected in a
//! [`SourceStaging`] while the known sources are still being read, then
//! applied in one step.

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};

use crate::rules::RuleExpansion;

/// Sources of a target and the subset excluded from compilation.
///
/// Every excluded file is also a source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    sources: BTreeSet<Utf8PathBuf>,
    excluded: BTreeSet<Utf8PathBuf>,
}

impl SourceSet {
    /// Set holding `sources`, none excluded.
    pub fn new<I, P>(sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            excluded: BTreeSet::new(),
        }
    }

    /// All sources, sorted.
    #[must_use]
    pub const fn sources(&self) -> &BTreeSet<Utf8PathBuf> {
        &self.sources
    }

    /// Excluded sources, sorted.
    #[must_use]
    pub const fn excluded(&self) -> &BTreeSet<Utf8PathBuf> {
        &self.excluded
    }

    /// Whether `path` is a source.
    #[must_use]
    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.sources.contains(path)
    }

    /// Add a source.
    pub fn insert(&mut self, path: impl Into<Utf8PathBuf>) {
        self.sources.insert(path.into());
    }

    /// Add a source and exclude it from compilation.
    pub fn exclude(&mut self, path: impl Into<Utf8PathBuf>) {
        let path = path.into();
        self.sources.insert(path.clone());
        self.excluded.insert(path);
    }

    /// Stop excluding `path` (it stays a source).
    pub fn include(&mut self, path: &Utf8Path) {
        self.excluded.remove(path);
    }

    /// Sources as a sorted list, for rule trigger matching.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Utf8PathBuf> {
        self.sources.iter().cloned().collect()
    }
}

/// Pending additions and exclusions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStaging {
    added: BTreeSet<Utf8PathBuf>,
    excluded: BTreeSet<Utf8PathBuf>,
}

impl SourceStaging {
    /// Empty staging area.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a new source.
    pub fn add(&mut self, path: impl Into<Utf8PathBuf>) {
        self.added.insert(path.into());
    }

    /// Stage a new source that must not be compiled.
    pub fn exclude(&mut self, path: impl Into<Utf8PathBuf>) {
        self.excluded.insert(path.into());
    }

    /// Stage the outputs of a rule whose outputs are listed as sources.
    ///
    /// Concrete outputs and non-trigger inputs become sources excluded from
    /// normal compilation, since the rule's own step builds them.
    pub fn stage_rule_outputs(&mut self, expansion: &RuleExpansion<'_>) {
        if !expansion.rule.process_outputs_as_sources {
            return;
        }
        for trigger in &expansion.per_trigger {
            for output in &trigger.outputs {
                self.exclude(output.clone());
            }
            for input in trigger.extra_inputs() {
                self.exclude(input.clone());
            }
        }
    }

    /// Apply every staged change to `set`.
    pub fn apply(self, set: &mut SourceSet) {
        for path in self.added {
            set.insert(path);
        }
        for path in self.excluded {
            set.exclude(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rule;

    #[test]
    fn staged_rule_outputs_are_sources_and_excluded() {
        let rule = Rule {
            extension: "idl".into(),
            inputs: vec!["tools/midl.py".into()],
            outputs: vec!["{base}.cc".into()],
            process_outputs_as_sources: true,
            ..Rule::default()
        };
        let mut set = SourceSet::new(["foo.idl", "main.cc"]);
        let expansion = RuleExpansion::expand(&rule, &set.to_vec());
        let mut staging = SourceStaging::new();
        staging.stage_rule_outputs(&expansion);
        staging.add("extra.gyp");
        staging.apply(&mut set);

        let sources: Vec<&str> = set.sources().iter().map(|p| p.as_str()).collect();
        assert_eq!(sources, ["extra.gyp", "foo.cc", "foo.idl", "main.cc", "tools/midl.py"]);
        let excluded: Vec<&str> = set.excluded().iter().map(|p| p.as_str()).collect();
        assert_eq!(excluded, ["foo.cc", "tools/midl.py"]);
    }

    #[test]
    fn rules_without_source_outputs_stage_nothing() {
        let rule = Rule {
            extension: "idl".into(),
            outputs: vec!["{base}.cc".into()],
            ..Rule::default()
        };
        let set = SourceSet::new(["foo.idl"]);
        let expansion = RuleExpansion::expand(&rule, &set.to_vec());
        let mut staging = SourceStaging::new();
        staging.stage_rule_outputs(&expansion);
        assert_eq!(staging, SourceStaging::new());
    }

    #[test]
    fn include_keeps_the_source() {
        let mut set = SourceSet::new(["a.h"]);
        set.exclude("a.h");
        set.include(Utf8Path::new("a.h"));
        assert!(set.contains(Utf8Path::new("a.h")));
        assert!(set.excluded().is_empty());
    }
}
