//! Source control client used by dependency checkout.
//!
//! Checkout needs three operations: clone a repository into a new directory,
//! fetch from `origin` inside an existing clone, and check out a tag. They are
//! expressed by the [`SourceControl`] trait so tests can substitute a
//! recording implementation. [`GitCli`] is the real implementation and shells
//! out to the system `git`, which picks up SSH keys, credential helpers and
//! anything else configured in `~/.gitconfig`.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// Trait for source control operations - allows mocking in tests
pub trait SourceControl: Send + Sync {
    /// Clones `repo` into `target`, which must not exist yet.
    fn clone_repo(&self, repo: &str, target: &Path) -> Result<()>;

    /// Runs `fetch origin` inside the existing clone at `dir`.
    fn fetch_origin(&self, dir: &Path) -> Result<()>;

    /// Checks out `tag` inside the clone at `dir`.
    fn checkout(&self, dir: &Path, tag: &str) -> Result<()>;
}

/// [`SourceControl`] backed by a `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    /// Uses the `git` executable at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locates `git` on the `PATH` once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolValidation`] if no `git` executable is found.
    pub fn detect() -> Result<Self> {
        which::which("git")
            .map(Self::new)
            .map_err(|e| Error::ToolValidation {
                tool: "git".to_string(),
                message: e.to_string(),
            })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, args: &[&str], cwd: &Path) -> Result<()> {
        let command = format!("git {}", args.join(" "));
        debug!("Running '{}' in {}", command, cwd.display());

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| Error::GitCommand {
                command: command.clone(),
                dir: cwd.display().to_string(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::GitCommand {
                command,
                dir: cwd.display().to_string(),
                stderr: format!("{} ({})", stderr.trim(), output.status),
            });
        }
        Ok(())
    }
}

impl SourceControl for GitCli {
    fn clone_repo(&self, repo: &str, target: &Path) -> Result<()> {
        let parent = target.parent().unwrap_or_else(|| Path::new("."));
        let dir_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::config(format!("Invalid checkout directory '{}'", target.display())))?;
        self.run(&["clone", repo, &dir_name], parent)
    }

    fn fetch_origin(&self, dir: &Path) -> Result<()> {
        self.run(&["fetch", "origin"], dir)
    }

    fn checkout(&self, dir: &Path, tag: &str) -> Result<()> {
        self.run(&["checkout", tag], dir)
    }
}
