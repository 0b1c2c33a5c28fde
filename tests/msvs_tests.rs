//! End-to-end tests for the Visual Studio backend.

use anyhow::{Context, Result, ensure};
use projgen::error::{GenError, ValidationError};
use projgen::model::TargetGraph;
use projgen::msvs::{self, MsvsVersion};
use projgen::options::GeneratorOptions;
use projgen::output::WriteOutcome;
use rstest::rstest;

mod support;

use support::{TWO_FILE_GRAPH, Workspace};

fn options(ws: &Workspace, version: MsvsVersion) -> GeneratorOptions {
    GeneratorOptions {
        output_root: ws.root().to_owned(),
        msvs_version: version,
        ..GeneratorOptions::default()
    }
}

#[rstest]
#[case(MsvsVersion::V2005, "Version=\"8.00\"", "Format Version 9.00")]
#[case(MsvsVersion::V2008, "Version=\"9.00\"", "Format Version 10.00")]
fn writes_projects_and_solutions(
    #[case] version: MsvsVersion,
    #[case] project_version: &str,
    #[case] solution_format: &str,
) -> Result<()> {
    let ws = Workspace::new()?;
    let graph: TargetGraph = TWO_FILE_GRAPH.parse().context("graph")?;
    let report = msvs::generate(&graph, &options(&ws, version)).context("generate")?;
    ensure!(report.written() == report.files.len(), "first run writes every file");

    let app = ws.read("app/app.vcproj")?;
    ensure!(app.contains(project_version), "project version in {app}");
    ensure!(app.contains("RelativePath=\"main.cc\""), "sources listed");
    ensure!(app.contains("PreprocessorDefinitions=\"DEBUG\""), "defines in Debug");
    ensure!(app.contains("version.in"), "action input listed");

    let base = ws.read("base/base.vcproj")?;
    ensure!(base.contains("ConfigurationType=\"4\""), "static library type");
    ensure!(base.contains("RelativePath=\"util\\strings.cc\""), "windows separators");

    let sln = ws.read("app/app.sln")?;
    ensure!(sln.contains(solution_format), "solution format in {sln}");
    ensure!(sln.contains("\"base\", \"..\\base\\base.vcproj\""), "dependency listed");
    ensure!(sln.contains("Release|Win32.ActiveCfg = Release|Win32"), "variants listed");
    Ok(())
}

#[test]
fn second_run_leaves_every_file_unchanged() -> Result<()> {
    let ws = Workspace::new()?;
    let graph: TargetGraph = TWO_FILE_GRAPH.parse().context("graph")?;
    let opts = options(&ws, MsvsVersion::V2008);
    let first = msvs::generate(&graph, &opts).context("first run")?;
    let second = msvs::generate(&graph, &opts).context("second run")?;
    ensure!(first.files.len() == second.files.len(), "same files both runs");
    ensure!(
        second.files.iter().all(|f| f.outcome == WriteOutcome::Unchanged),
        "second run rewrote files: {second:?}"
    );
    Ok(())
}

#[test]
fn invalid_guid_writes_nothing() -> Result<()> {
    let ws = Workspace::new()?;
    let graph: TargetGraph = r#"{
        "targets": { "a/a.gyp:a": {
            "target_name": "a",
            "type": "none",
            "default_configuration": "Debug",
            "configurations": { "Debug": { "msvs_guid": "not-a-guid" } }
        } },
        "target_list": ["a/a.gyp:a"]
    }"#
    .parse()
    .context("graph")?;
    let result = msvs::generate(&graph, &options(&ws, MsvsVersion::V2008));
    ensure!(
        matches!(result, Err(GenError::Validation(ValidationError::InvalidGuid { .. }))),
        "expected an invalid GUID error, got {result:?}"
    );
    ensure!(ws.is_empty()?, "nothing written on error");
    Ok(())
}
