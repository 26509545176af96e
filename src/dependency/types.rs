//! Built-in dependency types and environment layering.
//!
//! A definition may name a `type` to inherit a set of default keys. The
//! environment a dependency resolves against is built by merging four layers,
//! later layers winning:
//!
//! ```text
//! base environment < type defaults < definition < override
//! ```

use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::expander::Environment;

/// Marks an entry that should be skipped entirely. JSON has no comments, so
/// this is also how comment entries are written.
pub const IGNORE: &str = "ignore";

/// Dependencies built by our own CI, with a git repository and a versioned
/// directory layout on the artifact server.
///
/// Requires at least `name` and `version`.
pub const OPENHOME: &str = "openhome";

/// Third-party dependencies whose source repository, if any, does not follow
/// our conventions.
///
/// Requires at least `name` and `archive-filename`.
pub const EXTERNAL: &str = "external";

pub const BUILTIN_TYPES: &[&str] = &[IGNORE, OPENHOME, EXTERNAL];

/// Default keys for the built-in type `name`, or `None` if there is no such
/// type.
pub fn builtin_type(name: &str) -> Option<Environment> {
    let defaults = match name {
        IGNORE => json!({
            "ignore": true,
        }),
        OPENHOME => json!({
            "archive-extension": ".tar.gz",
            "archive-prefix": "",
            "archive-suffix": "",
            "binary-repo": "http://openhome.org/releases/artifacts",
            "archive-directory": "${binary-repo}/${name}/",
            "archive-filename": "${archive-prefix}${name}-${version}-${archive-platform}${archive-suffix}${archive-extension}",
            "remote-archive-path": "${archive-directory}${archive-filename}",
            "use-local-archive": false,
            "archive-path": "${use-local-archive?local-archive-path:remote-archive-path}",
            "source-path": "${linn-git-user}@core.linn.co.uk:/home/git",
            "repo-name": "${name}",
            "source-git": "${source-path}/${repo-name}.git",
            "tag": "${repo-name}_${version}",
            "any-platform": "AnyPlatform",
            "platform-specific": true,
            "archive-platform": "${platform-specific?platform:any-platform}",
            "dest": "dependencies/${archive-platform}/",
            "configure-args": [],
            "strip-archive-dirs": 0,
        }),
        EXTERNAL => json!({
            "binary-repo": "http://openhome.org/releases/artifacts",
            "source-git": null,
            "any-platform": "AnyPlatform",
            "platform-specific": true,
            "archive-platform": "${platform-specific?platform:any-platform}",
            "archive-path": "${binary-repo}/${archive-platform}/${archive-filename}",
            "dest": "dependencies/${archive-platform}/",
            "configure-args": [],
            "strip-archive-dirs": 0,
        }),
        _ => return None,
    };
    match defaults {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Merges the four layers into a new environment. Later layers win key by
/// key; none of the inputs is modified.
pub fn merge_layers(
    base: &Environment,
    type_defaults: Option<&Environment>,
    definition: &Environment,
    overrides: &Environment,
) -> Environment {
    let mut env = base.clone();
    let layers = type_defaults.into_iter().chain([definition, overrides]);
    for layer in layers {
        for (key, value) in layer {
            env.insert(key.clone(), value.clone());
        }
    }
    env
}

/// Looks up the definition's `type` and merges all layers.
///
/// Only the definition selects the type; an override cannot change it.
///
/// # Errors
///
/// Returns [`Error::ConfigParse`] if `type` is not a string or names no
/// built-in type.
pub fn flatten(
    base: &Environment,
    definition: &Environment,
    overrides: &Environment,
) -> Result<Environment> {
    let type_defaults = match definition.get("type") {
        None => None,
        Some(Value::String(name)) => Some(builtin_type(name).ok_or_else(|| Error::ConfigParse {
            message: format!("Unknown dependency type '{}'", name),
            hint: Some(format!("Known types: {}", BUILTIN_TYPES.join(", "))),
        })?),
        Some(other) => {
            return Err(Error::config(format!(
                "Dependency type must be a string, got {}",
                other
            )))
        }
    };
    Ok(merge_layers(base, type_defaults.as_ref(), definition, overrides))
}
