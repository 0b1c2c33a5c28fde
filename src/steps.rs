//! Custom build step planning.
//!
//! Actions, copies and external-rule drivers all become custom build steps:
//! a command attached to a primary input with a set of outputs. The step's
//! command line is prepared for the shell of the backend that runs it.

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;

use crate::model::{Action, Configuration, Copy};
use crate::variables::{MSVS, XCODE, to_windows};

/// A command run by the IDE to produce outputs from inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomBuildStep {
    /// Input files in declaration order.
    pub inputs: Vec<Utf8PathBuf>,
    /// Output files.
    pub outputs: Vec<Utf8PathBuf>,
    /// Progress text shown by the IDE.
    pub description: String,
    /// Command line ready for the backend shell.
    pub command: String,
}

impl CustomBuildStep {
    /// Input the IDE attaches the step to.
    #[must_use]
    pub fn primary_input(&self) -> Option<&Utf8PathBuf> {
        pick_primary_input(&self.inputs)
    }
}

/// The second input when there is more than one, otherwise the only one.
///
/// By convention the first input of a multi-input step is the script that
/// runs it, so the file being processed is the second.
///
/// ```
/// use projgen::steps::pick_primary_input;
///
/// assert_eq!(pick_primary_input(&["gen.py", "data.in"]), Some(&"data.in"));
/// assert_eq!(pick_primary_input(&["only.in"]), Some(&"only.in"));
/// assert_eq!(pick_primary_input::<&str>(&[]), None);
/// ```
#[must_use]
pub fn pick_primary_input<T>(inputs: &[T]) -> Option<&T> {
    if inputs.len() > 1 {
        inputs.get(1)
    } else {
        inputs.first()
    }
}

/// The shell that will run a step.
#[derive(Debug, Clone, Copy)]
pub enum Shell<'c> {
    /// A Visual Studio custom build tool.
    Msvs {
        /// Configuration supplying cygwin directories.
        config: &'c Configuration,
        /// Run through the cygwin shell instead of `cmd`.
        cygwin: bool,
    },
    /// An Xcode shell script phase.
    Xcode,
}

impl Shell<'_> {
    /// Localise a path for this shell.
    #[must_use]
    pub fn path(&self, path: &Utf8Path) -> String {
        match self {
            Self::Msvs { .. } => to_windows(&MSVS.localize(path.as_str())),
            Self::Xcode => XCODE.localize(path.as_str()),
        }
    }

    /// Prepare `argv` for this shell.
    ///
    /// `has_input_path` marks commands of native rules, where
    /// `$(InputPath)` is available.
    #[must_use]
    pub fn command<S: AsRef<str>>(&self, argv: &[S], has_input_path: bool) -> String {
        match self {
            Self::Msvs { config, cygwin } => {
                let argv: Vec<String> = argv.iter().map(|a| MSVS.localize(a.as_ref())).collect();
                if *cygwin {
                    cygwin_command(config, &argv, has_input_path)
                } else {
                    direct_command(&argv)
                }
            }
            Self::Xcode => {
                let argv: Vec<String> = argv.iter().map(|a| XCODE.localize(a.as_ref())).collect();
                xcode_script(&encode_posix_shell_list(&argv))
            }
        }
    }
}

/// Plan the step for one action.
#[must_use]
pub fn plan_action(action: &Action, shell: Shell<'_>) -> CustomBuildStep {
    CustomBuildStep {
        inputs: action.inputs.clone(),
        outputs: action.outputs.clone(),
        description: action
            .message
            .clone()
            .unwrap_or_else(|| action.action_name.clone()),
        command: shell.command(&action.action, false),
    }
}

/// Plan one step per copied file.
#[must_use]
pub fn plan_copy(copy: &Copy, shell: Shell<'_>) -> Vec<CustomBuildStep> {
    copy.files
        .iter()
        .map(|src| {
            let dst = copy.destination.join(src.file_name().unwrap_or(src.as_str()));
            let (dst_dir, src_path, dst_path) = (
                shell.path(&copy.destination),
                shell.path(src),
                shell.path(&dst),
            );
            let command = match shell {
                Shell::Msvs { .. } => format!(
                    "mkdir \"{dst_dir}\" 2>nul & set ERRORLEVEL=0 & copy /Y \"{src_path}\" \"{dst_path}\""
                ),
                Shell::Xcode => xcode_script(&format!(
                    "mkdir -p {} && cp -Rf {} {}",
                    encode_posix_shell_argument(&dst_dir),
                    encode_posix_shell_argument(&src_path),
                    encode_posix_shell_argument(&dst_path),
                )),
            };
            CustomBuildStep {
                inputs: vec![src.clone()],
                outputs: vec![dst.clone()],
                description: format!("Copying {src} to {dst}"),
                command,
            }
        })
        .collect()
}

/// Plan the step that runs an external-rule makefile.
///
/// The makefile is the only input; the step claims every concrete output of
/// the rules the makefile covers.
#[must_use]
pub fn plan_rule_driver(
    makefile: &Utf8Path,
    outputs: Vec<Utf8PathBuf>,
    target_name: &str,
    shell: Shell<'_>,
) -> CustomBuildStep {
    let command = match shell {
        Shell::Msvs { config, .. } => Shell::Msvs { config, cygwin: true }.command(
            &[
                "make",
                "OutDir=$(OutDir)",
                "IntDir=$(IntDir)",
                "-j",
                "${NUMBER_OF_PROCESSORS_PLUS_1}",
                "-f",
                makefile.as_str(),
            ],
            false,
        ),
        Shell::Xcode => format!(
            "exec \"${{DEVELOPER_BIN_DIR}}/make\" -f \"${{PROJECT_FILE_PATH}}/{makefile}\" -j \"$(sysctl -n hw.ncpu)\"\nexit 1\n"
        ),
    };
    CustomBuildStep {
        inputs: vec![makefile.to_owned()],
        outputs,
        description: format!("Running external rules for {target_name}"),
        command,
    }
}

/// Inputs that must not be compiled normally: every step input that is not
/// the primary input of some step.
#[must_use]
pub fn excluded_inputs<'s, I>(steps: I) -> BTreeSet<Utf8PathBuf>
where
    I: IntoIterator<Item = &'s CustomBuildStep>,
{
    let steps: Vec<&CustomBuildStep> = steps.into_iter().collect();
    let primaries: BTreeSet<&Utf8PathBuf> = steps.iter().filter_map(|s| s.primary_input()).collect();
    steps
        .iter()
        .flat_map(|s| &s.inputs)
        .filter(|input| !primaries.contains(input))
        .cloned()
        .collect()
}

fn direct_command(argv: &[String]) -> String {
    let mut parts = argv.iter();
    let Some(program) = parts.next() else {
        return String::new();
    };
    std::iter::once(program.clone())
        .chain(parts.map(|arg| to_windows(arg)))
        .join(" ")
}

fn cygwin_command(config: &Configuration, argv: &[String], has_input_path: bool) -> String {
    let cygwin_dir = config
        .msvs_cygwin_dirs
        .first()
        .map_or_else(|| ".".to_owned(), |dir| to_windows(dir.as_str()));
    let direct = argv
        .iter()
        .map(|arg| {
            let mut arg = arg
                .replace("$(IntDir)", "`cygpath -m \"${INTDIR}\"`")
                .replace("$(OutDir)", "`cygpath -m \"${OUTDIR}\"`");
            if has_input_path {
                arg = arg.replace("$(InputPath)", "`cygpath -m \"${INPUTPATH}\"`");
            }
            format!("\"{arg}\"")
        })
        .join(" ")
        .replace('"', "\\\"");

    let mut command = format!("$(ProjectDir){cygwin_dir}\\setup_env.bat && set CYGWIN=nontsec&& ");
    if direct.contains("NUMBER_OF_PROCESSORS") {
        command.push_str("set /a NUMBER_OF_PROCESSORS_PLUS_1=%NUMBER_OF_PROCESSORS%+1&& ");
    }
    if direct.contains("INTDIR") {
        command.push_str("set INTDIR=$(IntDir)&& ");
    }
    if direct.contains("OUTDIR") {
        command.push_str("set OUTDIR=$(OutDir)&& ");
    }
    if has_input_path && direct.contains("INPUTPATH") {
        command.push_str("set INPUTPATH=$(InputPath) && ");
    }
    command.push_str(&format!("bash -c \"{direct}\""));
    command
}

/// Wrap an encoded command so the phase fails if `exec` itself fails.
fn xcode_script(encoded: &str) -> String {
    format!("exec {}\nexit 1\n", braces_for_variables(encoded))
}

/// Rewrite make-style `$(VAR)` references to shell-style `${VAR}`.
fn braces_for_variables(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("$(") {
        let (before, tail) = rest.split_at(start);
        out.push_str(before);
        let inner = tail.get(2..).unwrap_or_default();
        match inner.find(')') {
            Some(end) => {
                let (name, after) = inner.split_at(end);
                out.push_str("${");
                out.push_str(name);
                out.push('}');
                rest = after.get(1..).unwrap_or_default();
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

const SHELL_SPECIAL: &[char] = &[
    '\t', '\n', ' ', '#', '$', '%', '&', '\'', '(', ')', '*', ';', '<', '>', '?', '[', '\\', ']', '`',
    '{', '|', '}', '~',
];

/// Quote `arg` for a POSIX shell when it contains special characters.
///
/// `$` forces quoting but is left unescaped so variable references still
/// expand inside the double quotes.
#[must_use]
pub fn encode_posix_shell_argument(arg: &str) -> String {
    let mut escaped = String::with_capacity(arg.len());
    for c in arg.chars() {
        if matches!(c, '"' | '\\' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    if arg.is_empty() || arg.contains(SHELL_SPECIAL) {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

/// Encode an argv as one POSIX shell command line.
#[must_use]
pub fn encode_posix_shell_list<S: AsRef<str>>(argv: &[S]) -> String {
    argv.iter()
        .map(|arg| encode_posix_shell_argument(arg.as_ref()))
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[], None)]
    #[case(&["a.in"], Some("a.in"))]
    #[case(&["gen.py", "data.in"], Some("data.in"))]
    #[case(&["gen.py", "data.in", "extra.h"], Some("data.in"))]
    fn primary_input_selection(#[case] inputs: &[&str], #[case] expected: Option<&str>) {
        assert_eq!(pick_primary_input(inputs).copied(), expected);
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("", "\"\"")]
    #[case("two words", "\"two words\"")]
    #[case("$(SRCROOT)/x", "\"$(SRCROOT)/x\"")]
    #[case("say \"hi\"", "\"say \\\"hi\\\"\"")]
    #[case("a\"b", "a\\\"b")]
    fn posix_argument_encoding(#[case] arg: &str, #[case] expected: &str) {
        assert_eq!(encode_posix_shell_argument(arg), expected);
    }

    #[test]
    fn xcode_actions_exec_with_braced_variables() {
        let action = Action {
            action_name: "gen".into(),
            inputs: vec!["gen.py".into(), "in.txt".into()],
            outputs: vec!["$(INTERMEDIATE_DIR)/out.h".into()],
            action: vec!["python".into(), "gen.py".into(), "$(INTERMEDIATE_DIR)/out.h".into()],
            ..Action::default()
        };
        let step = plan_action(&action, Shell::Xcode);
        assert_eq!(
            step.command,
            "exec python gen.py \"${INTERMEDIATE_DIR}/out.h\"\nexit 1\n"
        );
        assert_eq!(step.description, "gen");
        assert_eq!(step.primary_input().map(|p| p.as_str()), Some("in.txt"));
    }

    #[test]
    fn direct_mode_keeps_program_verbatim() {
        let config = Configuration {
            msvs_cygwin_shell: Some(false),
            ..Configuration::default()
        };
        let shell = Shell::Msvs {
            config: &config,
            cygwin: false,
        };
        assert_eq!(
            shell.command(&["tools/run.bat", "a/b.txt", "$(PRODUCT_DIR)/x"], false),
            "tools/run.bat a\\b.txt $(OutDir)\\x"
        );
    }

    #[test]
    fn cygwin_mode_routes_through_bash() {
        let config = Configuration {
            msvs_cygwin_dirs: vec!["third_party/cygwin".into()],
            ..Configuration::default()
        };
        let shell = Shell::Msvs {
            config: &config,
            cygwin: true,
        };
        let expected = concat!(
            "$(ProjectDir)third_party\\cygwin\\setup_env.bat && set CYGWIN=nontsec&& ",
            "set INTDIR=$(IntDir)&& ",
            "bash -c \"\\\"python\\\" \\\"gen.py\\\" \\\"`cygpath -m \\\"${INTDIR}\\\"`/x\\\"\"",
        );
        assert_eq!(shell.command(&["python", "gen.py", "$(INTERMEDIATE_DIR)/x"], false), expected);
    }

    #[test]
    fn msvs_rule_driver_runs_make_in_parallel() {
        let config = Configuration::default();
        let step = plan_rule_driver(
            Utf8Path::new("t_Debug_rules.mk"),
            vec!["a.h".into()],
            "t",
            Shell::Msvs {
                config: &config,
                cygwin: false,
            },
        );
        assert!(step.command.starts_with("$(ProjectDir).\\setup_env.bat && set CYGWIN=nontsec&& "));
        assert!(step.command.contains("set /a NUMBER_OF_PROCESSORS_PLUS_1=%NUMBER_OF_PROCESSORS%+1&& "));
        assert!(step.command.contains("set OUTDIR=$(OutDir)&& "));
        assert!(step.command.contains("\\\"-f\\\" \\\"t_Debug_rules.mk\\\""));
        assert_eq!(step.primary_input().map(|p| p.as_str()), Some("t_Debug_rules.mk"));
    }

    #[test]
    fn copies_plan_one_step_per_file() {
        let copy = Copy {
            destination: "$(PRODUCT_DIR)/data".into(),
            files: vec!["res/a.txt".into(), "b.txt".into()],
        };
        let config = Configuration::default();
        let steps = plan_copy(
            &copy,
            Shell::Msvs {
                config: &config,
                cygwin: true,
            },
        );
        assert_eq!(steps.len(), 2);
        let first = steps.first().expect("first copy");
        assert_eq!(
            first.command,
            "mkdir \"$(OutDir)\\data\" 2>nul & set ERRORLEVEL=0 & copy /Y \"res\\a.txt\" \"$(OutDir)\\data\\a.txt\""
        );
        assert_eq!(first.outputs, [Utf8PathBuf::from("$(PRODUCT_DIR)/data/a.txt")]);
    }

    #[test]
    fn exclusion_spares_primary_inputs() {
        let step = |inputs: &[&str]| CustomBuildStep {
            inputs: inputs.iter().map(Utf8PathBuf::from).collect(),
            outputs: Vec::new(),
            description: String::new(),
            command: String::new(),
        };
        let steps = [step(&["gen.py", "a.in", "shared.h"]), step(&["shared.h"])];
        let excluded: Vec<String> = excluded_inputs(&steps).into_iter().map(Utf8PathBuf::into_string).collect();
        assert_eq!(excluded, ["gen.py"]);
    }
}
