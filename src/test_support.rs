//! Archive fixtures and mock collaborators shared by unit tests.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::Mutex;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Error, Result};
use crate::git::SourceControl;
use crate::opener::ArchiveOpener;

/// One entry of a test tar archive.
pub struct TarEntry {
    pub path: &'static str,
    pub contents: Option<&'static str>,
}

impl TarEntry {
    pub fn file(path: &'static str, contents: &'static str) -> Self {
        Self {
            path,
            contents: Some(contents),
        }
    }

    pub fn dir(path: &'static str) -> Self {
        Self {
            path,
            contents: None,
        }
    }
}

fn append_entries<W: Write>(builder: &mut tar::Builder<W>, entries: &[TarEntry]) {
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        match entry.contents {
            Some(contents) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(contents.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder
                    .append_data(&mut header, entry.path, contents.as_bytes())
                    .unwrap();
            }
            None => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                header.set_cksum();
                builder
                    .append_data(&mut header, entry.path, std::io::empty())
                    .unwrap();
            }
        }
    }
}

pub fn tar_bytes(entries: &[TarEntry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    append_entries(&mut builder, entries);
    builder.into_inner().unwrap()
}

pub fn tar_gz_bytes(entries: &[TarEntry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    append_entries(&mut builder, entries);
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn tar_bz2_bytes(entries: &[TarEntry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(bzip2::write::BzEncoder::new(
        Vec::new(),
        bzip2::Compression::default(),
    ));
    append_entries(&mut builder, entries);
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn tar_xz_bytes(entries: &[TarEntry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(xz2::write::XzEncoder::new(Vec::new(), 6));
    append_entries(&mut builder, entries);
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, contents) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Serves archives from memory; unknown paths fail like a missing download.
#[derive(Default)]
pub struct MemoryOpener {
    archives: HashMap<String, Vec<u8>>,
    pub requested: Mutex<Vec<String>>,
}

impl MemoryOpener {
    pub fn with(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.archives.insert(path.to_string(), bytes);
        self
    }
}

impl ArchiveOpener for MemoryOpener {
    fn open(&self, path: &str) -> Result<Box<dyn Read>> {
        self.requested.lock().unwrap().push(path.to_string());
        match self.archives.get(path) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(Error::Network {
                url: path.to_string(),
                message: "404 Not Found".to_string(),
            }),
        }
    }
}

/// Records source control calls; any call mentioning one of `failing` fails.
#[derive(Default)]
pub struct RecordingGit {
    pub calls: Mutex<Vec<String>>,
    pub failing: Vec<String>,
}

impl RecordingGit {
    fn run(&self, call: String, dir: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(call.clone());
        if self.failing.iter().any(|f| call.contains(f.as_str())) {
            return Err(Error::GitCommand {
                command: call,
                dir: dir.display().to_string(),
                stderr: "fatal: repository not found".to_string(),
            });
        }
        Ok(())
    }
}

impl SourceControl for RecordingGit {
    fn clone_repo(&self, repo: &str, target: &Path) -> Result<()> {
        self.run(format!("clone {} {}", repo, target.display()), target)?;
        std::fs::create_dir_all(target)?;
        Ok(())
    }

    fn fetch_origin(&self, dir: &Path) -> Result<()> {
        self.run(format!("fetch origin in {}", dir.display()), dir)
    }

    fn checkout(&self, dir: &Path, tag: &str) -> Result<()> {
        self.run(format!("checkout {}", tag), dir)
    }
}
