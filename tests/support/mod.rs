//! Shared helpers for the integration tests.

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// A graph with an executable depending on a library of another build file.
pub const TWO_FILE_GRAPH: &str = r#"{
    "targets": {
        "app/app.gyp:app": {
            "target_name": "app",
            "type": "executable",
            "default_configuration": "Debug",
            "configurations": {
                "Debug": { "defines": ["DEBUG"], "include_dirs": ["../base"] },
                "Release": {}
            },
            "sources": ["main.cc", "main.h"],
            "dependencies": ["base/base.gyp:base"],
            "actions": [{
                "action_name": "version",
                "inputs": ["version.in"],
                "outputs": ["version.h"],
                "action": ["python", "stamp.py", "version.in", "version.h"]
            }]
        },
        "base/base.gyp:base": {
            "target_name": "base",
            "type": "static_library",
            "default_configuration": "Debug",
            "configurations": { "Debug": {}, "Release": {} },
            "sources": ["base.cc", "util/strings.cc", "schema.proto"],
            "rules": [{
                "rule_name": "protoc",
                "extension": "proto",
                "outputs": ["$(RULE_INPUT_ROOT).pb.cc"],
                "action": ["protoc", "$(RULE_INPUT_PATH)"],
                "process_outputs_as_sources": true
            }]
        }
    },
    "target_list": ["base/base.gyp:base", "app/app.gyp:app"],
    "build_files": {
        "app/app.gyp": { "targets": ["app/app.gyp:app"] },
        "base/base.gyp": { "targets": ["base/base.gyp:base"] }
    }
}"#;

/// A temporary output root.
pub struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    /// Create an empty workspace.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp dir")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|p| anyhow!("non UTF-8 temp dir {}", p.display()))?;
        Ok(Self { _dir: dir, root })
    }

    /// Root directory.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Read a generated file.
    pub fn read(&self, relative: &str) -> Result<String> {
        let path = self.root.join(relative);
        fs::read_to_string(&path).with_context(|| format!("read {path}"))
    }

    /// Whether the workspace holds no entries at all.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(fs::read_dir(&self.root).context("list workspace")?.next().is_none())
    }
}
