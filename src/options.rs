//! Options shared by both generators.

use camino::Utf8PathBuf;

use crate::msvs::MsvsVersion;

/// Settings for one generation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Directory the graph's relative paths are resolved against when
    /// writing.
    pub output_root: Utf8PathBuf,
    /// Appended to every generated file stem, for example `_gen`.
    pub suffix: String,
    /// Path from the graph root to the top of the source tree.
    pub depth: Utf8PathBuf,
    /// Visual Studio file format.
    pub msvs_version: MsvsVersion,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            output_root: Utf8PathBuf::from("."),
            suffix: String::new(),
            depth: Utf8PathBuf::from("."),
            msvs_version: MsvsVersion::default(),
        }
    }
}
