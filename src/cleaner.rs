//! # Transactional Directory Cleanup
//!
//! Before a fetch, the platform output directories are removed. Some platforms
//! lock files that are in use, and the lock covers the directory entries above
//! them too. Deleting file by file and failing half-way would leave a random
//! selection of files gone.
//!
//! The cleaner works in two phases instead:
//!
//! 1. **Renaming**: every target directory is renamed to a sibling staging
//!    name. A rename generally fails when a later delete would have failed. If
//!    any rename fails, the earlier renames are undone in reverse order and
//!    the clean fails without having deleted anything.
//! 2. **Committed**: only once every rename succeeded are the staged trees
//!    deleted.
//!
//! ```text
//! Pending -> Renaming -> Committed
//!               |
//!               +-> RollingBack -> Failed
//! ```

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::{Error, Result};

/// Suffix appended to a directory name while it waits for deletion.
pub const STAGING_SUFFIX: &str = ".deleteme";

/// Filesystem primitives used by the cleaner - allows failure injection in tests
pub trait DirectoryOps {
    fn is_dir(&self, path: &Path) -> bool;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_tree(&self, path: &Path) -> io::Result<()>;
}

/// [`DirectoryOps`] on the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDirectoryOps;

impl DirectoryOps for StdDirectoryOps {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_tree(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }
}

/// Where a [`TransactionalCleaner`] is in its protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanPhase {
    Pending,
    Renaming,
    RollingBack,
    Committed,
    Failed,
}

/// Removes a batch of directories all-or-nothing.
#[derive(Debug)]
pub struct TransactionalCleaner<D = StdDirectoryOps> {
    ops: D,
    phase: CleanPhase,
}

impl TransactionalCleaner<StdDirectoryOps> {
    pub fn new() -> Self {
        Self::with_ops(StdDirectoryOps)
    }
}

impl Default for TransactionalCleaner<StdDirectoryOps> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DirectoryOps> TransactionalCleaner<D> {
    pub fn with_ops(ops: D) -> Self {
        Self {
            ops,
            phase: CleanPhase::Pending,
        }
    }

    pub fn phase(&self) -> CleanPhase {
        self.phase
    }

    fn enter(&mut self, phase: CleanPhase) {
        debug!("Cleaner phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Removes every directory in `directories`. Paths that are not
    /// directories are skipped.
    ///
    /// # Errors
    ///
    /// - [`Error::CleanDirectory`] naming the directory that could not be
    ///   moved aside (nothing was deleted) or could not be deleted.
    /// - [`Error::Rollback`] if a directory that was moved aside could not be
    ///   moved back.
    pub fn clean<P: AsRef<Path>>(&mut self, directories: &[P]) -> Result<()> {
        self.enter(CleanPhase::Renaming);

        let mut moved: Vec<(PathBuf, PathBuf)> = Vec::new();
        for directory in directories {
            let original = normalize(directory.as_ref());
            if !self.ops.is_dir(&original) {
                debug!("Nothing to clean at {}", original.display());
                continue;
            }
            let staged = staging_path(&original);
            if let Err(e) = self.ops.rename(&original, &staged) {
                warn!("Cannot move {} aside: {}", original.display(), e);
                self.roll_back(&moved)?;
                return Err(Error::CleanDirectory {
                    path: original.display().to_string(),
                    message: e.to_string(),
                });
            }
            moved.push((original, staged));
        }

        self.enter(CleanPhase::Committed);
        for (original, staged) in &moved {
            info!("Removing {}", original.display());
            if let Err(e) = self.ops.remove_tree(staged) {
                self.enter(CleanPhase::Failed);
                return Err(Error::CleanDirectory {
                    path: original.display().to_string(),
                    message: e.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Undoes `moved` in reverse order. Every rename is attempted; the first
    /// failure is reported.
    fn roll_back(&mut self, moved: &[(PathBuf, PathBuf)]) -> Result<()> {
        self.enter(CleanPhase::RollingBack);
        let mut first_failure = None;
        for (original, staged) in moved.iter().rev() {
            debug!("Restoring {}", original.display());
            if let Err(e) = self.ops.rename(staged, original) {
                warn!("Cannot restore {}: {}", original.display(), e);
                first_failure.get_or_insert(Error::Rollback {
                    path: original.display().to_string(),
                    message: e.to_string(),
                });
            }
        }
        self.enter(CleanPhase::Failed);
        first_failure.map_or(Ok(()), Err)
    }
}

/// Removes `directories` with a fresh [`TransactionalCleaner`].
pub fn clean_directories<P: AsRef<Path>>(directories: &[P]) -> Result<()> {
    TransactionalCleaner::new().clean(directories)
}

/// Drops trailing separators so the staging name lands beside the directory.
fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

fn staging_path(original: &Path) -> PathBuf {
    let mut name = OsString::from(original.as_os_str());
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}
