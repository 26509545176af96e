//! # Dependency Fetching Library
//!
//! This library fetches the binary dependencies of a project. It is used by
//! the `dep-fetch` command-line tool, and can be embedded by build scripts
//! that need the same behavior.
//!
//! ## Quick Example
//!
//! ```
//! use dep_fetch::expander::{Environment, Expander};
//! use serde_json::json;
//!
//! let mut env = Environment::new();
//! env.insert("name".into(), json!("zlib"));
//! env.insert("version".into(), json!("1.2"));
//! env.insert("archive".into(), json!("${name}-${version}.tar.gz"));
//!
//! let mut expander = Expander::new(env);
//! assert_eq!(expander.resolve("archive").unwrap(), json!("zlib-1.2.tar.gz"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Templates (`expander`)**: Dependency values may reference other keys
//!   with `$name`, `${name}` and conditionals `${cond?a:b}`, resolved lazily
//!   and memoized per dependency.
//! - **Dependencies (`dependency`)**: Definitions are layered with built-in
//!   type defaults and local overrides, then fetched as a batch in which one
//!   failure does not stop the others.
//! - **Transport (`opener`, `archive`, `git`)**: Archives are read from local
//!   paths, `file:`/`smb:` URLs or HTTP, unpacked from tar, tar.gz or zip, and
//!   source trees are checked out with git.
//! - **Cleaning (`cleaner`)**: Output directories are removed with a
//!   rename-then-delete transaction that restores them if any rename fails.
//!
//! ## Execution Flow
//!
//! The main entry point is [`orchestrator::run`], which settles the platform,
//! cleans the output directories, loads `projectdata/dependencies.json` with
//! its overrides, and fetches or checks out the requested dependencies.

pub mod archive;
pub mod cleaner;
pub mod config;
pub mod defaults;
pub mod dependency;
pub mod error;
pub mod expander;
pub mod git;
pub mod opener;
pub mod orchestrator;
pub mod output;

#[cfg(test)]
mod expander_proptest;

#[cfg(test)]
pub(crate) mod test_support;
