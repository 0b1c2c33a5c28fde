//! Generator variables and their backend spellings.
//!
//! Paths and commands in the input graph use neutral placeholders such as
//! `$(PRODUCT_DIR)` or `$(RULE_INPUT_ROOT)`. Each backend rewrites them to the
//! macros its IDE understands.

/// Placeholders describing the trigger file of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleInput {
    /// File name without directory or extension.
    Root,
    /// Extension including the leading dot.
    Ext,
    /// File name without directory.
    Name,
    /// Path as listed in the sources.
    Path,
}

impl RuleInput {
    /// Every rule-input placeholder.
    pub const ALL: [Self; 4] = [Self::Root, Self::Ext, Self::Name, Self::Path];

    /// Neutral spelling used in the input graph.
    #[must_use]
    pub const fn neutral(self) -> &'static str {
        match self {
            Self::Root => "$(RULE_INPUT_ROOT)",
            Self::Ext => "$(RULE_INPUT_EXT)",
            Self::Name => "$(RULE_INPUT_NAME)",
            Self::Path => "$(RULE_INPUT_PATH)",
        }
    }

    /// Short alias accepted alongside the neutral spelling.
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Self::Root => "{base}",
            Self::Ext => "{ext}",
            Self::Name => "{name}",
            Self::Path => "{path}",
        }
    }
}

/// Backend spellings of the generator variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    rule_root: &'static str,
    rule_ext: &'static str,
    rule_name: &'static str,
    rule_path: &'static str,
    product_dir: &'static str,
    intermediate_dir: &'static str,
    shared_intermediate_dir: &'static str,
    configuration_name: &'static str,
}

/// Visual Studio macros.
pub const MSVS: Dialect = Dialect {
    rule_root: "$(InputName)",
    rule_ext: "$(InputExt)",
    rule_name: "$(InputFileName)",
    rule_path: "$(InputPath)",
    product_dir: "$(OutDir)",
    intermediate_dir: "$(IntDir)",
    shared_intermediate_dir: "$(OutDir)/obj/global_intermediate",
    configuration_name: "$(ConfigurationName)",
};

/// Xcode build setting references.
pub const XCODE: Dialect = Dialect {
    rule_root: "$(INPUT_FILE_BASE)",
    rule_ext: "$(INPUT_FILE_SUFFIX)",
    rule_name: "$(INPUT_FILE_NAME)",
    rule_path: "$(INPUT_FILE_PATH)",
    product_dir: "$(BUILT_PRODUCTS_DIR)",
    intermediate_dir: "$(INTERMEDIATE_DIR)",
    shared_intermediate_dir: "$(SHARED_INTERMEDIATE_DIR)",
    configuration_name: "$(CONFIGURATION)",
};

impl Dialect {
    /// Native spelling of a rule-input placeholder.
    #[must_use]
    pub const fn rule_input(&self, input: RuleInput) -> &'static str {
        match input {
            RuleInput::Root => self.rule_root,
            RuleInput::Ext => self.rule_ext,
            RuleInput::Name => self.rule_name,
            RuleInput::Path => self.rule_path,
        }
    }

    /// Rewrite every neutral placeholder in `text`, rule inputs included.
    #[must_use]
    pub fn localize(&self, text: &str) -> String {
        let mut out = self.localize_paths(text);
        for input in RuleInput::ALL {
            out = out
                .replace(input.neutral(), self.rule_input(input))
                .replace(input.alias(), self.rule_input(input));
        }
        out
    }

    /// Rewrite directory and configuration placeholders, leaving rule inputs
    /// untouched.
    #[must_use]
    pub fn localize_paths(&self, text: &str) -> String {
        if !text.contains("$(") {
            return text.to_owned();
        }
        text.replace("$(PRODUCT_DIR)", self.product_dir)
            .replace("$(SHARED_INTERMEDIATE_DIR)", self.shared_intermediate_dir)
            .replace("$(INTERMEDIATE_DIR)", self.intermediate_dir)
            .replace("$(CONFIGURATION_NAME)", self.configuration_name)
    }
}

/// Convert `/` separators to `\`.
#[must_use]
pub fn to_windows(path: &str) -> String {
    path.replace('/', "\\")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(MSVS, "$(INTERMEDIATE_DIR)/$(RULE_INPUT_ROOT).cc", "$(IntDir)/$(InputName).cc")]
    #[case(XCODE, "$(INTERMEDIATE_DIR)/{base}.cc", "$(INTERMEDIATE_DIR)/$(INPUT_FILE_BASE).cc")]
    #[case(MSVS, "$(PRODUCT_DIR)/gen/{name}", "$(OutDir)/gen/$(InputFileName)")]
    #[case(XCODE, "$(SHARED_INTERMEDIATE_DIR)/x.h", "$(SHARED_INTERMEDIATE_DIR)/x.h")]
    fn localizes_placeholders(#[case] dialect: Dialect, #[case] text: &str, #[case] expected: &str) {
        assert_eq!(dialect.localize(text), expected);
    }

    #[test]
    fn shared_intermediate_dir_is_not_mistaken_for_intermediate_dir() {
        assert_eq!(
            MSVS.localize_paths("$(SHARED_INTERMEDIATE_DIR)/a"),
            "$(OutDir)/obj/global_intermediate/a"
        );
    }

    #[test]
    fn localize_paths_keeps_rule_inputs() {
        assert_eq!(MSVS.localize_paths("$(RULE_INPUT_PATH)"), "$(RULE_INPUT_PATH)");
    }
}
