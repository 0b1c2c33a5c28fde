//! Tests for the command line driver.

use anyhow::{Context, Result, ensure};
use projgen::Format;
use projgen::cli::Cli;
use projgen::runner::{self, RunnerError};
use rstest::rstest;
use std::fs;

mod support;

use support::{TWO_FILE_GRAPH, Workspace};

fn cli_in(ws: &Workspace, format: Format) -> Cli {
    Cli {
        directory: Some(ws.root().as_std_path().to_path_buf()),
        format: Some(format),
        ..Cli::default()
    }
}

#[rstest]
#[case(Format::Msvs, "app/app.sln")]
#[case(Format::Xcode, "app/app.xcodeproj/project.pbxproj")]
fn generates_into_the_selected_directory(#[case] format: Format, #[case] expected: &str) -> Result<()> {
    let ws = Workspace::new()?;
    fs::write(ws.root().join("targets.json"), TWO_FILE_GRAPH).context("write graph")?;
    let report = runner::generate(&cli_in(&ws, format)).context("generate")?;
    ensure!(
        report.files.iter().any(|f| f.path.as_str().ends_with(expected)),
        "{expected} missing from {report:?}"
    );
    ensure!(ws.root().join(expected).is_file(), "{expected} on disk");
    Ok(())
}

#[test]
fn missing_graph_is_reported() -> Result<()> {
    let ws = Workspace::new()?;
    let err = runner::resolve_graph_path(&cli_in(&ws, Format::Msvs)).err().context("expected error")?;
    ensure!(matches!(err, RunnerError::GraphNotFound { .. }), "unexpected {err:?}");
    let run = runner::run(&cli_in(&ws, Format::Msvs));
    ensure!(run.is_err(), "run fails without a graph");
    Ok(())
}

#[test]
fn malformed_graph_names_the_file() -> Result<()> {
    let ws = Workspace::new()?;
    fs::write(ws.root().join("targets.json"), "{ not json").context("write graph")?;
    let err = runner::run(&cli_in(&ws, Format::Xcode)).err().context("expected error")?;
    ensure!(format!("{err:#}").contains("targets.json"), "path missing from {err:#}");
    ensure!(ws.root().read_dir().context("list")?.count() == 1, "only the graph exists");
    Ok(())
}
