//! Atomic write-on-diff for generated files.
//!
//! Output directories are opened as capability-scoped [`Dir`] handles
//! anchored at their nearest existing ancestor; directories are created,
//! compared against and removed only through those handles. When a file
//! already holds identical bytes nothing is written and it keeps its
//! timestamp. Otherwise the content goes to a temporary sibling file that
//! replaces the target in a single rename.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use tempfile::Builder;
use tracing::{debug, info, warn};

use crate::error::GenError;

/// Result of writing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file was created or its content changed.
    Written,
    /// The file already held the same bytes.
    Unchanged,
}

/// A file touched by a generation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    /// Path on disk.
    pub path: Utf8PathBuf,
    /// What happened to it.
    pub outcome: WriteOutcome,
}

/// Files touched by a generation pass, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Every file written or left unchanged.
    pub files: Vec<WrittenFile>,
}

impl GenerationReport {
    /// Record one file.
    pub fn record(&mut self, path: Utf8PathBuf, outcome: WriteOutcome) {
        self.files.push(WrittenFile { path, outcome });
    }

    /// Number of files whose content changed.
    #[must_use]
    pub fn written(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.outcome == WriteOutcome::Written)
            .count()
    }
}

/// Open the nearest existing ancestor of `path`.
///
/// Returns the handle and the part of `path` below it, which is empty when
/// `path` itself exists.
fn open_anchor(path: &Utf8Path) -> Result<(Dir, Utf8PathBuf), GenError> {
    for candidate in path.ancestors() {
        let location = if candidate.as_str().is_empty() {
            Utf8Path::new(".")
        } else {
            candidate
        };
        match Dir::open_ambient_dir(location, ambient_authority()) {
            Ok(dir) => {
                let below = path
                    .strip_prefix(candidate)
                    .map_or_else(|_| Utf8PathBuf::new(), Utf8Path::to_owned);
                return Ok((dir, below));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(GenError::io(location)(err)),
        }
    }
    Err(GenError::io(path)(io::Error::from(io::ErrorKind::NotFound)))
}

/// A directory that may have been created by the current pass.
///
/// [`OutputDir::discard`] removes it again when the pass fails, but only if
/// the pass created it.
#[derive(Debug)]
pub struct OutputDir {
    path: Utf8PathBuf,
    dir: Dir,
    anchor: Dir,
    /// First directory created by this pass, relative to `anchor`.
    created: Option<Utf8PathBuf>,
}

impl OutputDir {
    /// Create `path` (and missing parents) if needed.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::Io`] when the directory cannot be created or
    /// opened.
    pub fn ensure(path: &Utf8Path) -> Result<Self, GenError> {
        let (anchor, below) = open_anchor(path)?;
        if below.as_str().is_empty() {
            let dir = anchor.try_clone().map_err(GenError::io(path))?;
            return Ok(Self {
                path: path.to_owned(),
                dir,
                anchor,
                created: None,
            });
        }
        let created = below.components().next().map(|c| Utf8PathBuf::from(c.as_str()));
        let opened = anchor
            .create_dir_all(&below)
            .and_then(|()| anchor.open_dir(&below));
        match opened {
            Ok(dir) => Ok(Self {
                path: path.to_owned(),
                dir,
                anchor,
                created,
            }),
            Err(err) => {
                if let Some(created) = &created {
                    remove_created(&anchor, created);
                }
                Err(GenError::io(path)(err))
            }
        }
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Whether this pass created the directory.
    #[must_use]
    pub const fn was_created(&self) -> bool {
        self.created.is_some()
    }

    /// Write `name` inside the directory.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::Io`] on any filesystem failure.
    pub fn write(&self, name: &str, contents: &[u8]) -> Result<WriteOutcome, GenError> {
        replace_if_changed(&self.dir, &self.path, name, contents)
    }

    /// Remove the directory if this pass created it.
    pub fn discard(self) {
        let Self {
            path,
            dir,
            anchor,
            created,
        } = self;
        drop(dir);
        if let Some(created) = created {
            debug!("Discarding {path}");
            remove_created(&anchor, &created);
        }
    }
}

fn remove_created(anchor: &Dir, created: &Utf8Path) {
    if let Err(err) = anchor.remove_dir_all(created) {
        warn!("Failed to remove {created} after an error: {err}");
    } else {
        debug!("Removed {created} after an error");
    }
}

/// Write `contents` to `path` unless it already holds the same bytes.
///
/// Parent directories are created on demand and removed again if the write
/// fails.
///
/// # Errors
///
/// Returns [`GenError::Io`] on any filesystem failure; no temporary file is
/// left behind.
pub fn write_if_changed(path: &Utf8Path, contents: &[u8]) -> Result<WriteOutcome, GenError> {
    let name = path
        .file_name()
        .ok_or_else(|| GenError::io(path)(io::Error::from(io::ErrorKind::InvalidInput)))?;
    let dir = OutputDir::ensure(parent_dir(path))?;
    match dir.write(name, contents) {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            dir.discard();
            Err(err)
        }
    }
}

fn parent_dir(path: &Utf8Path) -> &Utf8Path {
    path.parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."))
}

fn replace_if_changed(dir: &Dir, dir_path: &Utf8Path, name: &str, contents: &[u8]) -> Result<WriteOutcome, GenError> {
    let path = dir_path.join(name);
    let unchanged = match dir.read(name) {
        Ok(existing) => existing == contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => false,
        Err(err) => return Err(GenError::io(&path)(err)),
    };
    if unchanged {
        debug!("Unchanged {path}");
        return Ok(WriteOutcome::Unchanged);
    }

    let mut tmp = Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".tmp")
        .tempfile_in(dir_path)
        .map_err(GenError::io(dir_path))?;
    {
        let handle = tmp.as_file_mut();
        handle.write_all(contents).map_err(GenError::io(&path))?;
        handle.flush().map_err(GenError::io(&path))?;
    }
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(Permissions::from_mode(0o644))
            .map_err(GenError::io(&path))?;
    }
    tmp.as_file().sync_all().map_err(GenError::io(&path))?;
    tmp.persist(&path).map_err(|err| GenError::io(&path)(err.error))?;
    info!("Wrote {path}");
    Ok(WriteOutcome::Written)
}
