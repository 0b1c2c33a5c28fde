//! Solution folder hierarchy.
//!
//! Projects are filed into folders mirroring their directories. Directory
//! levels shared by every project are stripped, and a folder holding nothing
//! but the project of the same name collapses into that project.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::ValidationError;
use crate::graph::ProjectId;
use crate::ids::Guid;

/// A node of the folder tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderNode {
    /// A folder with named children.
    Interior(BTreeMap<String, FolderNode>),
    /// A project.
    Leaf(ProjectId),
}

/// An entry of a solution: a folder or a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolutionEntry {
    /// A solution folder.
    Folder(SolutionFolder),
    /// A project reference.
    Project(ProjectId),
}

/// A folder shown in the solution explorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionFolder {
    /// Display name, `(segment)`.
    pub name: String,
    /// Directory path the folder stands for.
    pub path: Utf8PathBuf,
    /// Folder GUID derived from the path.
    pub guid: Guid,
    /// Contents, folders and projects in key order.
    pub entries: Vec<SolutionEntry>,
}

/// Folder tree under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderTree {
    root: BTreeMap<String, FolderNode>,
}

impl FolderTree {
    /// Empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root level of the tree.
    #[must_use]
    pub const fn root(&self) -> &BTreeMap<String, FolderNode> {
        &self.root
    }

    /// File project `id` under `dir` with key `leaf_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutputCollision`] when the slot is already
    /// taken by another project.
    pub fn insert(&mut self, dir: &Utf8Path, leaf_key: &str, id: ProjectId) -> Result<(), ValidationError> {
        let mut level = &mut self.root;
        for segment in dir.iter().filter(|s| *s != ".") {
            let node = level
                .entry(segment.to_owned())
                .or_insert_with(|| FolderNode::Interior(BTreeMap::new()));
            level = match node {
                FolderNode::Interior(children) => children,
                FolderNode::Leaf(other) => {
                    return Err(collision(dir, *other, id));
                }
            };
        }
        if let Some(existing) = level.get(leaf_key) {
            let other = match existing {
                FolderNode::Leaf(other) => format!("project #{}", other.index()),
                FolderNode::Interior(_) => "a folder".to_owned(),
            };
            return Err(ValidationError::OutputCollision {
                path: dir.join(leaf_key),
                first: other,
                second: format!("project #{}", id.index()),
            });
        }
        level.insert(leaf_key.to_owned(), FolderNode::Leaf(id));
        Ok(())
    }

    /// Remove top-level folders shared by every project.
    pub fn strip_common_root(&mut self) {
        while self.root.len() == 1 {
            if !matches!(self.root.values().next(), Some(FolderNode::Interior(_))) {
                break;
            }
            match self.root.pop_first() {
                Some((_, FolderNode::Interior(children))) => self.root = children,
                Some((key, leaf)) => {
                    self.root.insert(key, leaf);
                    break;
                }
                None => break,
            }
        }
    }

    /// Collapse folders whose only child is the project named after them.
    ///
    /// `suffix` is the project file suffix used for leaf keys, for example
    /// `.vcproj`.
    pub fn collapse_singles(&mut self, suffix: &str) {
        let root = std::mem::take(&mut self.root);
        self.root = root
            .into_iter()
            .map(|(key, node)| {
                let collapsed = collapse(&key, node, suffix);
                (key, collapsed)
            })
            .collect();
    }

    /// Convert the tree into solution entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<SolutionEntry> {
        to_entries(Utf8Path::new(""), self.root)
    }
}

fn collision(dir: &Utf8Path, first: ProjectId, second: ProjectId) -> ValidationError {
    ValidationError::OutputCollision {
        path: dir.to_owned(),
        first: format!("project #{}", first.index()),
        second: format!("project #{}", second.index()),
    }
}

fn collapse(name: &str, node: FolderNode, suffix: &str) -> FolderNode {
    match node {
        FolderNode::Leaf(id) => FolderNode::Leaf(id),
        FolderNode::Interior(mut children) => {
            let single_key = format!("{name}{suffix}");
            if children.len() == 1 && children.contains_key(&single_key) {
                if let Some(only) = children.remove(&single_key) {
                    return only;
                }
            }
            FolderNode::Interior(
                children
                    .into_iter()
                    .map(|(key, child)| {
                        let collapsed = collapse(&key, child, suffix);
                        (key, collapsed)
                    })
                    .collect(),
            )
        }
    }
}

fn to_entries(base: &Utf8Path, children: BTreeMap<String, FolderNode>) -> Vec<SolutionEntry> {
    children
        .into_iter()
        .map(|(key, node)| match node {
            FolderNode::Leaf(id) => SolutionEntry::Project(id),
            FolderNode::Interior(grandchildren) => {
                let path = base.join(&key);
                SolutionEntry::Folder(SolutionFolder {
                    name: format!("({key})"),
                    guid: Guid::derive(&format!("folder:{path}")),
                    entries: to_entries(&path, grandchildren),
                    path,
                })
            }
        })
        .collect()
}

/// Build the folder tree for `projects` (directory and leaf key per id).
///
/// # Errors
///
/// Returns [`ValidationError::OutputCollision`] when two projects share a
/// slot.
pub fn assemble<'p, I>(projects: I, suffix: &str) -> Result<Vec<SolutionEntry>, ValidationError>
where
    I: IntoIterator<Item = (ProjectId, &'p Utf8Path, &'p str)>,
{
    let mut tree = FolderTree::new();
    for (id, dir, key) in projects {
        tree.insert(dir, key, id)?;
    }
    tree.strip_common_root();
    tree.collapse_singles(suffix);
    Ok(tree.into_entries())
}
