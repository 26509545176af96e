//! # Error Handling
//!
//! This module defines the centralized error type for `dep-fetch`. It uses the
//! `thiserror` library to build an `Error` enum covering every anticipated
//! failure mode, each variant carrying the context needed to act on it.
//!
//! ## Fatal versus transient
//!
//! Errors fall into two families:
//!
//! - **Configuration and cycle errors** (undefined keys, malformed
//!   conditionals, recursive expansion, missing names, unsupported strip
//!   requests, missing platform). These are always fatal and are never
//!   swallowed inside the library.
//! - **Transient operation failures** (I/O while fetching, network errors,
//!   undecodable archives, failing git commands). The `fetch` and `checkout`
//!   operation boundaries catch these, log them and report a boolean failure
//!   instead. See [`Error::is_transient`].
//!
//! The directory cleaner is the exception: its rename and rollback failures are
//! fatal, because the state of the tree can no longer be vouched for.

use thiserror::Error;

/// Main error type for dep-fetch operations
#[derive(Error, Debug)]
pub enum Error {
    /// A dependency definition, override file or run option is invalid.
    ///
    /// Includes an optional hint about how to fix it.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A referenced key does not exist in the dependency environment.
    #[error("Key undefined: {key}")]
    UndefinedKey { key: String },

    /// A key refers back to itself, directly or through other keys.
    #[error("Recursive expansion for key '{key}': {chain}")]
    RecursiveExpansion { key: String, chain: String },

    /// A `${...}` conditional is not of the form `condition?primary:alternative`.
    #[error("Malformed expression '${{{expression}}}': conditional must be of form ${{condition?result:alternative}}")]
    MalformedExpression { expression: String },

    /// A value could not be substituted into a string template.
    ///
    /// May include the name of the offending key when applicable.
    #[error("Template processing error: {message}{}", variable.as_ref().map(|v| format!(" (variable: {})", v)).unwrap_or_default())]
    Template {
        message: String,
        /// The key whose value caused the error, if applicable
        variable: Option<String>,
    },

    /// Leading directories were requested to be stripped from a zip archive.
    #[error("Cannot strip leading directories from zip archive '{archive}'")]
    UnsupportedStrip { archive: String },

    /// One or more requested dependency names are not in the collection.
    #[error("No entries in dependency file named: {}.", names.join(", "))]
    MissingDependencies { names: Vec<String> },

    /// A fetched byte stream could not be decoded or unpacked as an archive.
    #[error("Archive error for {name}: {message}")]
    Archive { name: String, message: String },

    /// An error occurred while executing a source control command.
    #[error("Git command failed in {dir}: {command} - {stderr}")]
    GitCommand {
        command: String,
        dir: String,
        stderr: String,
    },

    /// A required external tool could not be located.
    #[error("Tool validation error: {tool} - {message}")]
    ToolValidation { tool: String, message: String },

    /// An error occurred during a network operation.
    #[error("Network operation error: {url} - {message}")]
    Network { url: String, message: String },

    /// A directory could not be moved aside or removed during cleaning.
    #[error("Failed to remove directory '{path}'. Try closing applications that might be using it. ({message})")]
    CleanDirectory { path: String, message: String },

    /// A directory that was moved aside could not be restored.
    #[error("Failed to restore directory '{path}' after an aborted clean: {message}")]
    Rollback { path: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` for failures that an operation boundary reports as a
    /// failed item instead of aborting the run.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Network { .. } | Error::Archive { .. } | Error::GitCommand { .. }
        )
    }

    /// Shorthand for a configuration error without a hint.
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
            hint: None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
