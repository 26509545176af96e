//! Archive decoding and extraction.
//!
//! A fetched byte stream is buffered in memory and tagged as a zip-family or
//! tar-family container from the name it was fetched under. Tar archives may
//! be gzip, bzip2 or xz compressed; compression is detected from the stream
//! itself.
//!
//! Archives often wrap their contents in a top-level directory whose name
//! carries a version number. Stripping leading path segments at extraction
//! time lets every version land at the same place. Only tar archives support
//! stripping.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use log::{debug, warn};
use xz2::read::XzDecoder;

use crate::error::{Error, Result};

/// Extensions (upper-cased, without the dot) that mark a zip-family archive.
const ZIP_EXTENSIONS: &[&str] = &["ZIP", "NUPKG", "JAR"];

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";
const XZ_MAGIC: [u8; 6] = [0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];

/// The container family of an [`Archive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Tar,
    Zip,
}

impl ArchiveKind {
    /// Picks the container family from a file name or URL.
    pub fn for_name(name: &str) -> Self {
        let is_zip = Path::new(name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_uppercase())
            .is_some_and(|ext| ZIP_EXTENSIONS.contains(&ext.as_str()));
        if is_zip {
            ArchiveKind::Zip
        } else {
            ArchiveKind::Tar
        }
    }
}

/// An in-memory archive ready for extraction.
#[derive(Debug, Clone)]
pub struct Archive {
    name: String,
    kind: ArchiveKind,
    bytes: Vec<u8>,
}

impl Archive {
    /// Reads the whole of `reader` into memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the stream cannot be read to the end.
    pub fn open(name: &str, mut reader: impl Read) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::from_bytes(name, bytes))
    }

    /// Wraps already-buffered archive bytes.
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            kind: ArchiveKind::for_name(name),
            bytes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    /// Extracts every entry under `destination`, dropping the first
    /// `strip_count` path segments of each entry. Existing files are
    /// overwritten.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedStrip`] if `strip_count > 0` on a zip archive.
    /// - [`Error::Archive`] if the archive cannot be decoded or unpacked.
    pub fn extract(&self, destination: &Path, strip_count: usize) -> Result<()> {
        match self.kind {
            ArchiveKind::Zip if strip_count > 0 => Err(Error::UnsupportedStrip {
                archive: self.name.clone(),
            }),
            ArchiveKind::Zip => self.extract_zip(destination),
            ArchiveKind::Tar => self.extract_tar(destination, strip_count),
        }
    }

    fn extract_zip(&self, destination: &Path) -> Result<()> {
        let mut zip = zip::ZipArchive::new(Cursor::new(self.bytes.as_slice()))
            .map_err(|e| self.error(e))?;
        zip.extract(destination).map_err(|e| self.error(e))
    }

    fn decompressed(&self) -> Box<dyn Read + '_> {
        let bytes = self.bytes.as_slice();
        if bytes.starts_with(&GZIP_MAGIC) {
            Box::new(GzDecoder::new(bytes))
        } else if bytes.starts_with(BZIP2_MAGIC) {
            Box::new(BzDecoder::new(bytes))
        } else if bytes.starts_with(&XZ_MAGIC) {
            Box::new(XzDecoder::new(bytes))
        } else {
            Box::new(bytes)
        }
    }

    fn extract_tar(&self, destination: &Path, strip_count: usize) -> Result<()> {
        let mut tar = tar::Archive::new(self.decompressed());
        tar.set_overwrite(true);

        if strip_count == 0 {
            return tar.unpack(destination).map_err(|e| self.error(e));
        }

        for entry in tar.entries().map_err(|e| self.error(e))? {
            let mut entry = entry.map_err(|e| self.error(e))?;
            let original = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let Some(relative) = strip_leading_segments(&original, strip_count) else {
                warn!("Skipping archive entry with unsafe path '{}'", original);
                continue;
            };

            if relative.as_os_str().is_empty() {
                if entry.header().entry_type().is_dir() {
                    fs::create_dir_all(destination)?;
                } else {
                    debug!("Skipping '{}': nothing left after stripping", original);
                }
                continue;
            }

            let target = destination.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            entry.unpack(&target).map_err(|e| self.error(e))?;
        }
        Ok(())
    }

    fn error(&self, err: impl std::fmt::Display) -> Error {
        Error::Archive {
            name: self.name.clone(),
            message: err.to_string(),
        }
    }
}

/// Drops the first `count` `/`-separated segments of an entry name.
///
/// Returns `None` when the remainder would escape the destination.
pub(crate) fn strip_leading_segments(name: &str, count: usize) -> Option<PathBuf> {
    let remainder = name.split('/').skip(count).collect::<Vec<_>>().join("/");
    let path = PathBuf::from(remainder);
    let safe = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    safe.then_some(path)
}
