//! # Configuration Loading
//!
//! Dependencies are described in a JSON file holding an array of objects, one
//! per dependency. A second, optional file of the same shape holds local
//! overrides, matched to definitions by `name`:
//!
//! ```json
//! [
//!     {"name": "Comment", "type": "ignore", "text": "JSON has no comments"},
//!     {"name": "libA", "type": "openhome", "version": "1.2.3"},
//!     {"name": "zlib", "type": "external", "archive-filename": "zlib-1.2.tar.gz"}
//! ]
//! ```
//!
//! This module also builds the base environment every dependency inherits
//! and the [`ProjectLayout`] that relative paths are resolved against.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::expander::Environment;

/// Directory layout around the project being fetched into.
///
/// Relative `dest` values, the cleaned output directories and the sibling
/// checkout directories are all resolved against the project directory,
/// never against the process working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    project_dir: PathBuf,
}

impl ProjectLayout {
    /// Makes `project_dir` absolute and wraps it.
    pub fn new(project_dir: impl AsRef<Path>) -> Result<Self> {
        let absolute = std::path::absolute(project_dir.as_ref())?;
        Ok(Self {
            project_dir: absolute
                .components()
                .filter(|c| !matches!(c, Component::CurDir))
                .collect(),
        })
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// `relative` resolved against the project directory. Absolute paths are
    /// returned unchanged.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.project_dir.join(relative)
    }

    /// The sibling directory `../<name>` a dependency's source is checked out
    /// into.
    pub fn source_dir(&self, name: &str) -> PathBuf {
        self.project_dir
            .parent()
            .unwrap_or(&self.project_dir)
            .join(name)
    }

    /// Output directories a fetch for `platform` writes into.
    pub fn platform_dirs(&self, platform: &str) -> Vec<PathBuf> {
        let root = self.resolve(crate::defaults::DEPENDENCIES_DIR);
        vec![root.join(crate::defaults::ANY_PLATFORM), root.join(platform)]
    }
}

/// Parses a JSON array of dependency objects. `origin` names the source in
/// error messages.
pub fn parse_definitions(text: &str, origin: &str) -> Result<Vec<Environment>> {
    let value: Value = serde_json::from_str(text).map_err(|e| Error::ConfigParse {
        message: format!("{}: {}", origin, e),
        hint: None,
    })?;
    let Value::Array(entries) = value else {
        return Err(Error::ConfigParse {
            message: format!("{}: expected a JSON array of dependency objects", origin),
            hint: None,
        });
    };
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            Value::Object(map) => Ok(map),
            other => Err(Error::config(format!(
                "{}: entry {} must be an object, got {}",
                origin, index, other
            ))),
        })
        .collect()
}

/// Loads the primary definitions file.
///
/// # Errors
///
/// Returns [`Error::ConfigParse`] if the file is missing or malformed.
pub fn load_definitions(path: &Path) -> Result<Vec<Environment>> {
    if !path.is_file() {
        return Err(Error::ConfigParse {
            message: format!("Dependency file not found: {}", path.display()),
            hint: Some("Pass --dependencies or run from the project directory".to_string()),
        });
    }
    let text = fs::read_to_string(path)?;
    parse_definitions(&text, &path.display().to_string())
}

/// Loads the overrides file. A missing file, or no file at all, means no
/// overrides.
pub fn load_overrides(path: Option<&Path>) -> Result<Vec<Environment>> {
    match path {
        Some(path) if path.is_file() => {
            let text = fs::read_to_string(path)?;
            parse_definitions(&text, &path.display().to_string())
        }
        _ => Ok(Vec::new()),
    }
}

/// Splits a `KEY=VALUE` command-line assignment.
pub fn parse_assignment(text: &str) -> Result<(String, String)> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(Error::config(format!(
            "Expected KEY=VALUE, got '{}'",
            text
        ))),
    }
}

/// Builds the base environment shared by every dependency, returning it with
/// the platform it settled on.
///
/// Platform precedence: `explicit_platform`, then a `platform` key in
/// `assignments`, then `default_platform`.
///
/// # Errors
///
/// Returns [`Error::ConfigParse`] when no source yields a platform.
pub fn base_environment<F>(
    assignments: &[(String, String)],
    explicit_platform: Option<&str>,
    default_platform: F,
) -> Result<(Environment, String)>
where
    F: FnOnce() -> Option<String>,
{
    let mut env = Environment::new();
    for (key, value) in assignments {
        env.insert(key.clone(), Value::String(value.clone()));
    }

    let platform = match explicit_platform {
        Some(platform) => platform.to_string(),
        None => match env.get("platform") {
            Some(Value::String(platform)) => platform.clone(),
            _ => default_platform().ok_or_else(|| Error::ConfigParse {
                message: "Platform not specified and unable to guess.".to_string(),
                hint: Some("Pass --platform, e.g. --platform Linux-x64".to_string()),
            })?,
        },
    };
    env.insert("platform".to_string(), Value::String(platform.clone()));
    Ok((env, platform))
}
