//! One dependency and the operations on it.

use std::fs;

use log::{info, warn};
use serde_json::Value;

use crate::archive::Archive;
use crate::config::ProjectLayout;
use crate::error::{Error, Result};
use crate::expander::{Environment, Expander};
use crate::git::SourceControl;
use crate::opener::ArchiveOpener;

/// A dependency with its merged environment.
///
/// Keys are resolved lazily through the record's own [`Expander`], so a
/// dependency only fails on the keys an operation actually needs.
#[derive(Debug, Clone)]
pub struct DependencyRecord {
    name: String,
    expander: Expander,
    has_overrides: bool,
}

impl DependencyRecord {
    /// Builds a record over a flattened environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] if the environment has no `name`, or if
    /// `name` does not resolve to a string. Expansion errors in `name`
    /// propagate unchanged.
    pub fn new(env: Environment, has_overrides: bool) -> Result<Self> {
        let mut expander = Expander::new(env);
        if !expander.has("name") {
            return Err(Error::ConfigParse {
                message: "Dependency definition contains no name".to_string(),
                hint: Some("Add a \"name\" field, or \"type\": \"ignore\" for comments".to_string()),
            });
        }
        let name = match expander.resolve("name")? {
            Value::String(name) => name,
            other => {
                return Err(Error::config(format!(
                    "Dependency name must be a string, got {}",
                    other
                )))
            }
        };
        Ok(Self {
            name,
            expander,
            has_overrides,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a local override contributed any key. Diagnostic only.
    pub fn has_overrides(&self) -> bool {
        self.has_overrides
    }

    pub fn has(&self, key: &str) -> bool {
        self.expander.has(key)
    }

    /// Resolves `key` in this dependency's environment.
    pub fn key(&mut self, key: &str) -> Result<Value> {
        self.expander.resolve(key)
    }

    /// Every key resolved, in environment order.
    pub fn items(&mut self) -> Result<Vec<(String, Value)>> {
        self.expander.items()
    }

    /// Resolves `key`, which must hold a string.
    pub fn string_key(&mut self, key: &str) -> Result<String> {
        match self.key(key)? {
            Value::String(s) => Ok(s),
            other => Err(Error::config(format!(
                "'{}' of dependency '{}' must be a string, got {}",
                key, self.name, other
            ))),
        }
    }

    /// Where the binary archive is fetched from.
    pub fn archive_path(&mut self) -> Result<String> {
        self.string_key("archive-path")
    }

    /// Where the archive is unpacked, relative to the project directory.
    pub fn dest(&mut self) -> Result<String> {
        self.string_key("dest")
    }

    /// The build arguments contributed by this dependency.
    pub fn configure_args(&mut self) -> Result<Vec<Value>> {
        match self.key("configure-args")? {
            Value::Array(args) => Ok(args),
            other => Err(Error::config(format!(
                "'configure-args' of dependency '{}' must be a list, got {}",
                self.name, other
            ))),
        }
    }

    /// Leading archive path segments to drop; 0 when unset.
    pub fn strip_archive_dirs(&mut self) -> Result<usize> {
        if !self.has("strip-archive-dirs") {
            return Ok(0);
        }
        let value = self.key("strip-archive-dirs")?;
        let count = match &value {
            Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        count.ok_or_else(|| {
            Error::config(format!(
                "'strip-archive-dirs' of dependency '{}' must be a non-negative integer, got {}",
                self.name, value
            ))
        })
    }

    /// Downloads the archive and unpacks it into `dest`.
    ///
    /// Returns `Ok(false)` when the archive cannot be fetched or unpacked.
    ///
    /// # Errors
    ///
    /// Configuration errors (undefined keys, zip stripping, ...) and failure
    /// to create the destination directory are returned as errors.
    pub fn fetch(&mut self, opener: &dyn ArchiveOpener, layout: &ProjectLayout) -> Result<bool> {
        let remote_path = self.archive_path()?;
        let local_path = layout.resolve(&self.dest()?);
        let strip_dirs = self.strip_archive_dirs()?;

        info!("Fetching '{}' from '{}'", self.name, remote_path);
        let archive = match opener
            .open(&remote_path)
            .and_then(|stream| Archive::open(&remote_path, stream))
        {
            Ok(archive) => archive,
            Err(e) if e.is_transient() => {
                warn!("Fetching '{}' FAILED: {}", self.name, e);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        fs::create_dir_all(&local_path)?;
        info!("  unpacking to '{}'", local_path.display());
        match archive.extract(&local_path, strip_dirs) {
            Ok(()) => {
                info!("  OK");
                Ok(true)
            }
            Err(e) if e.is_transient() => {
                warn!("Unpacking '{}' FAILED: {}", self.name, e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Clones or updates the source repository in the sibling directory
    /// `../<name>` and checks out `tag`.
    ///
    /// Returns `Ok(false)` when no `source-git` is defined, when the checkout
    /// location is occupied by a file, or when a source control command
    /// fails.
    pub fn checkout(&mut self, scm: &dyn SourceControl, layout: &ProjectLayout) -> Result<bool> {
        let source_git = if self.has("source-git") {
            self.key("source-git")?
        } else {
            Value::Null
        };
        let repo = match source_git {
            Value::Null => {
                info!("No git repo defined for {}.", self.name);
                return Ok(false);
            }
            Value::String(repo) => repo,
            other => {
                return Err(Error::config(format!(
                    "'source-git' of dependency '{}' must be a string or null, got {}",
                    self.name, other
                )))
            }
        };
        let tag = self.string_key("tag")?;
        let target = layout.source_dir(&self.name);
        info!(
            "Fetching source for '{}' into '{}'",
            self.name,
            target.display()
        );

        let updated = if !target.exists() {
            info!("  git clone {} {}", repo, self.name);
            scm.clone_repo(&repo, &target)
        } else if !target.is_dir() {
            warn!(
                "Cannot checkout {0}, because {1} already exists and is not a directory",
                self.name,
                target.display()
            );
            return Ok(false);
        } else {
            info!("  git fetch origin");
            scm.fetch_origin(&target)
        };

        let result = updated.and_then(|()| {
            info!("  git checkout {}", tag);
            scm.checkout(&target, &tag)
        });
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_transient() => {
                warn!("{}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
