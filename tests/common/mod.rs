//! Shared test utilities for integration and E2E tests.
//!
//! A [`TestFixture`] is a temporary directory laid out the way `dep-fetch`
//! expects to find a project:
//!
//! ```text
//! <root>/
//!   dependency_overrides.json      (optional)
//!   archives/                      (test archives)
//!   project/
//!     projectdata/dependencies.json
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_dependencies(json!([]));
//!     fixture.command().arg("list").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;
    pub use serde_json::json;

    pub use super::TestFixture;
}

/// A temporary project directory with its dependency files and archives.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new fixture with an empty project directory.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("project/projectdata")
            .create_dir_all()
            .expect("Failed to create project directory");
        Self { temp_dir }
    }

    /// Write `projectdata/dependencies.json`.
    pub fn with_dependencies(self, definitions: Value) -> Self {
        self.temp_dir
            .child("project/projectdata/dependencies.json")
            .write_str(&definitions.to_string())
            .expect("Failed to write dependencies file");
        self
    }

    /// Write `../dependency_overrides.json` next to the project.
    #[allow(dead_code)]
    pub fn with_overrides(self, overrides: Value) -> Self {
        self.temp_dir
            .child("dependency_overrides.json")
            .write_str(&overrides.to_string())
            .expect("Failed to write overrides file");
        self
    }

    /// Add a gzip-compressed tar archive under `archives/`.
    #[allow(dead_code)]
    pub fn with_tar_gz(self, name: &str, files: &[(&str, &str)]) -> Self {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, contents.as_bytes())
                .expect("Failed to append tar entry");
        }
        let bytes = builder
            .into_inner()
            .and_then(|gz| gz.finish())
            .expect("Failed to finish tar.gz");
        self.with_archive(name, &bytes)
    }

    /// Add a zip archive under `archives/`.
    #[allow(dead_code)]
    pub fn with_zip(self, name: &str, files: &[(&str, &str)]) -> Self {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (path, contents) in files {
            writer
                .start_file(*path, options)
                .expect("Failed to start zip entry");
            writer
                .write_all(contents.as_bytes())
                .expect("Failed to write zip entry");
        }
        let bytes = writer.finish().expect("Failed to finish zip").into_inner();
        self.with_archive(name, &bytes)
    }

    #[allow(dead_code)]
    pub fn with_archive(self, name: &str, bytes: &[u8]) -> Self {
        self.temp_dir
            .child("archives")
            .child(name)
            .write_binary(bytes)
            .expect("Failed to write archive");
        self
    }

    /// Add a file relative to the project directory.
    #[allow(dead_code)]
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.project_child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Absolute path of an archive added with `with_*`, as a string for
    /// embedding in dependency definitions.
    #[allow(dead_code)]
    pub fn archive(&self, name: &str) -> String {
        self.temp_dir
            .path()
            .join("archives")
            .join(name)
            .to_string_lossy()
            .into_owned()
    }

    /// `file:` URL of an archive added with `with_*`.
    #[allow(dead_code)]
    pub fn archive_url(&self, name: &str) -> String {
        url::Url::from_file_path(self.temp_dir.path().join("archives").join(name))
            .expect("archive path is absolute")
            .to_string()
    }

    /// The fixture root, parent of the project directory.
    #[allow(dead_code)]
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn project_dir(&self) -> PathBuf {
        self.temp_dir.path().join("project")
    }

    /// A path relative to the project directory.
    #[allow(dead_code)]
    pub fn project_child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child("project").child(path)
    }

    /// A `dep-fetch` command running in the project directory, isolated from
    /// the caller's environment variables.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("dep-fetch");
        cmd.current_dir(self.project_dir())
            .env_remove("DEP_FETCH_PROJECT_DIR")
            .env_remove("DEP_FETCH_PLATFORM")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fixture_creates_project_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.project_dir().join("projectdata").is_dir());
    }

    #[test]
    fn test_fixture_writes_dependencies() {
        let fixture = TestFixture::new().with_dependencies(json!([{"name": "A"}]));
        assert!(fixture
            .project_dir()
            .join("projectdata/dependencies.json")
            .exists());
    }

    #[test]
    fn test_fixture_archive_url_is_file_url() {
        let fixture = TestFixture::new().with_zip("a.zip", &[("a.txt", "a")]);
        assert!(fixture.archive_url("a.zip").starts_with("file://"));
        assert!(Path::new(&fixture.archive("a.zip")).exists());
    }
}
