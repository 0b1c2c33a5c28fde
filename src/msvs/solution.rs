//! `.sln` serialisation.
//!
//! Entries are written flat, sorted by name and GUID, with folder nesting
//! recorded in the `NestedProjects` section. Every line ends in CRLF.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use camino::Utf8Path;

use super::MsvsVersion;
use crate::error::GenError;
use crate::graph::ProjectGraph;
use crate::ids::{Guid, ensure_unique};
use crate::solution::{SolutionEntry, SolutionFolder};

const PROJECT_TYPE_GUID: &str = "{8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942}";
const FOLDER_TYPE_GUID: &str = "{2150E333-8FDC-42A3-9474-1A3956D46DE8}";

macro_rules! crlf {
    ($f:expr, $($arg:tt)*) => {{
        write!($f, $($arg)*)?;
        $f.write_str("\r\n")?;
    }};
}

/// A project as the solution sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionProject {
    /// Display name.
    pub name: String,
    /// Windows path of the project file relative to the solution.
    pub path: String,
    /// Project GUID.
    pub guid: Guid,
    /// GUIDs of direct dependencies.
    pub dependencies: Vec<Guid>,
}

enum Row<'a> {
    Folder(&'a SolutionFolder),
    Project(&'a SolutionProject),
}

impl Row<'_> {
    fn key(&self) -> (&str, &Guid) {
        match self {
            Self::Folder(f) => (&f.name, &f.guid),
            Self::Project(p) => (&p.name, &p.guid),
        }
    }
}

/// A solution ready to be written.
pub struct Solution<'a> {
    version: MsvsVersion,
    entries: &'a [SolutionEntry],
    projects: &'a ProjectGraph<SolutionProject>,
    variants: &'a BTreeSet<String>,
}

impl<'a> Solution<'a> {
    /// Solution over `entries`, whose project ids refer to `projects`.
    #[must_use]
    pub const fn new(
        version: MsvsVersion,
        entries: &'a [SolutionEntry],
        projects: &'a ProjectGraph<SolutionProject>,
        variants: &'a BTreeSet<String>,
    ) -> Self {
        Self {
            version,
            entries,
            projects,
            variants,
        }
    }

    fn guid_of(&self, entry: &'a SolutionEntry) -> Option<&'a Guid> {
        match entry {
            SolutionEntry::Folder(folder) => Some(&folder.guid),
            SolutionEntry::Project(id) => self.projects.node(*id).map(|n| &n.payload.guid),
        }
    }

    fn rows(&self) -> Vec<Row<'a>> {
        let mut rows = Vec::new();
        self.collect_rows(self.entries, &mut rows);
        rows.sort_by(|a, b| a.key().cmp(&b.key()));
        rows
    }

    fn collect_rows(&self, entries: &'a [SolutionEntry], rows: &mut Vec<Row<'a>>) {
        for entry in entries {
            match entry {
                SolutionEntry::Folder(folder) => {
                    rows.push(Row::Folder(folder));
                    self.collect_rows(&folder.entries, rows);
                }
                SolutionEntry::Project(id) => {
                    if let Some(node) = self.projects.node(*id) {
                        rows.push(Row::Project(&node.payload));
                    }
                }
            }
        }
    }

    /// Check that no two entries share a GUID.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::IdCollision`] for the first duplicate.
    pub fn check_ids(&self, path: &Utf8Path) -> Result<(), GenError> {
        ensure_unique(
            path,
            self.rows().iter().map(|row| {
                let (name, guid) = row.key();
                (guid.braced(), name.to_owned())
            }),
        )
    }
}

impl Display for Solution<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rows = self.rows();
        f.write_str("\u{feff}\r\n")?;
        crlf!(
            f,
            "Microsoft Visual Studio Solution File, Format Version {}",
            self.version.solution_format()
        );
        crlf!(f, "{}", self.version.header());

        for row in &rows {
            match row {
                Row::Folder(folder) => {
                    crlf!(
                        f,
                        "Project(\"{FOLDER_TYPE_GUID}\") = \"{}\", \"{}\", \"{}\"",
                        folder.name,
                        folder.name,
                        folder.guid.braced()
                    );
                }
                Row::Project(project) => {
                    crlf!(
                        f,
                        "Project(\"{PROJECT_TYPE_GUID}\") = \"{}\", \"{}\", \"{}\"",
                        project.name,
                        project.path,
                        project.guid.braced()
                    );
                    if !project.dependencies.is_empty() {
                        crlf!(f, "\tProjectSection(ProjectDependencies) = postProject");
                        for dep in &project.dependencies {
                            crlf!(f, "\t\t{dep} = {dep}");
                        }
                        crlf!(f, "\tEndProjectSection");
                    }
                }
            }
            crlf!(f, "EndProject");
        }

        crlf!(f, "Global");
        crlf!(f, "\tGlobalSection(SolutionConfigurationPlatforms) = preSolution");
        for variant in self.variants {
            crlf!(f, "\t\t{variant} = {variant}");
        }
        crlf!(f, "\tEndGlobalSection");

        crlf!(f, "\tGlobalSection(ProjectConfigurationPlatforms) = postSolution");
        for row in &rows {
            let Row::Project(project) = row else {
                continue;
            };
            for variant in self.variants {
                crlf!(f, "\t\t{}.{variant}.ActiveCfg = {variant}", project.guid);
                crlf!(f, "\t\t{}.{variant}.Build.0 = {variant}", project.guid);
            }
        }
        crlf!(f, "\tEndGlobalSection");

        crlf!(f, "\tGlobalSection(SolutionProperties) = preSolution");
        crlf!(f, "\t\tHideSolutionNode = FALSE");
        crlf!(f, "\tEndGlobalSection");

        let folders: Vec<&SolutionFolder> = rows
            .iter()
            .filter_map(|row| match row {
                Row::Folder(folder) => Some(*folder),
                Row::Project(_) => None,
            })
            .collect();
        if !folders.is_empty() {
            crlf!(f, "\tGlobalSection(NestedProjects) = preSolution");
            for folder in folders {
                for child in folder.entries.iter().filter_map(|e| self.guid_of(e)) {
                    crlf!(f, "\t\t{child} = {}", folder.guid);
                }
            }
            crlf!(f, "\tEndGlobalSection");
        }
        crlf!(f, "EndGlobal");
        Ok(())
    }
}
