//! Opening archive locations as byte streams.
//!
//! An `archive-path` is one of:
//!
//! - a `file:` or `smb:` URL, resolved to a local or UNC path;
//! - any other `scheme:` prefix of two to eight letters, fetched over the
//!   network;
//! - a plain filesystem path.
//!
//! Single-letter prefixes are never schemes, so `C:\deps\a.zip` is a path.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};

static NETWORK_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\W\d]{2,8}:").expect("scheme pattern is a valid regex"));

/// Source of archive byte streams, keyed by path.
///
/// Failures to reach or read the location must surface as transient errors
/// ([`Error::Io`] or [`Error::Network`]); a location that can never work, such
/// as a malformed URL, is a configuration error.
pub trait ArchiveOpener: Send + Sync {
    fn open(&self, path: &str) -> Result<Box<dyn Read>>;
}

/// How a path string is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// `file:` or `smb:` URL.
    FileUrl,
    /// Any other URL scheme, fetched over the network.
    Network,
    /// A plain filesystem path.
    Local,
}

impl Scheme {
    pub fn for_path(path: &str) -> Self {
        if path.starts_with("file:") || path.starts_with("smb:") {
            Scheme::FileUrl
        } else if NETWORK_SCHEME.is_match(path) {
            Scheme::Network
        } else {
            Scheme::Local
        }
    }
}

/// The default [`ArchiveOpener`], dispatching on [`Scheme`].
///
/// Relative local paths are resolved against `base_dir` when set, and
/// against the working directory otherwise.
#[derive(Debug, Default, Clone)]
pub struct SchemeOpener {
    base_dir: Option<PathBuf>,
}

impl SchemeOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// An opener resolving relative local paths against `base_dir`.
    pub fn relative_to(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn local_path(&self, path: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(path),
            None => PathBuf::from(path),
        }
    }
}

impl ArchiveOpener for SchemeOpener {
    fn open(&self, path: &str) -> Result<Box<dyn Read>> {
        match Scheme::for_path(path) {
            Scheme::FileUrl => {
                let local = file_url_to_path(path)?;
                Ok(Box::new(File::open(local)?))
            }
            Scheme::Network => fetch_url(path),
            Scheme::Local => Ok(Box::new(File::open(self.local_path(path))?)),
        }
    }
}

/// Downloads `url` completely into memory.
fn fetch_url(url: &str) -> Result<Box<dyn Read>> {
    let network = |e: reqwest::Error| Error::Network {
        url: url.to_string(),
        message: e.to_string(),
    };
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(network)?;
    let bytes = response.bytes().map_err(network)?;
    Ok(Box::new(Cursor::new(bytes.to_vec())))
}

/// Resolves a `file:` or `smb:` URL to a path on this machine.
///
/// `smb://host/share/file` and `file://host/share/file` name remote shares and
/// only resolve on Windows, where they become UNC paths.
pub fn file_url_to_path(location: &str) -> Result<PathBuf> {
    let (smb, rest) = match location.strip_prefix("smb:") {
        Some(rest) => (true, rest),
        None => (false, location.strip_prefix("file:").unwrap_or(location)),
    };
    // file:////host/share is the legacy spelling of a remote share. The url
    // crate folds it into a host-less path, so it is recognised on the text.
    let legacy_remote = rest.starts_with("////");
    let url_text = match rest.strip_prefix("////") {
        Some(unc) => format!("file://{}", unc),
        None => format!("file:{}", rest),
    };
    let url = Url::parse(&url_text)?;

    let host = url.host_str().filter(|h| !h.is_empty() && *h != "localhost");
    let remote = host.is_some();

    if smb && (legacy_remote || !remote) {
        return Err(Error::ConfigParse {
            message: format!("Bad smb:// path '{}'", location),
            hint: Some("Use 'smb://hostname/path/to/file.ext'".to_string()),
        });
    }
    if remote && !cfg!(windows) {
        return Err(Error::config(format!(
            "SMB file access not supported on non-Windows platforms: '{}'",
            location
        )));
    }

    url.to_file_path()
        .map_err(|()| Error::config(format!("Cannot convert '{}' to a local path", location)))
}
