//! Default locations and the host platform guess.
//!
//! Paths here are relative to the project directory.

use std::env::consts::{ARCH, OS};

/// Definitions file read when `--dependencies` is not given.
pub const DEPENDENCIES_FILE: &str = "projectdata/dependencies.json";

/// Local overrides file read when `--overrides` is not given.
pub const OVERRIDES_FILE: &str = "../dependency_overrides.json";

/// Root of the fetched output directories.
pub const DEPENDENCIES_DIR: &str = "dependencies";

/// Output directory for platform-independent dependencies.
pub const ANY_PLATFORM: &str = "AnyPlatform";

/// Guesses the platform name of the machine we are running on.
///
/// Names follow the `<System>-<arch>` convention used on the artifact server:
/// `Windows-x86`, `Windows-x64`, `Linux-x86`, `Linux-x64`, `Linux-ARM`,
/// `Linux-ARM64`, `Mac-x64` and `Mac-ARM64`. Returns `None` for any other
/// host.
pub fn default_platform() -> Option<String> {
    platform_name(OS, ARCH).map(str::to_string)
}

fn platform_name(os: &str, arch: &str) -> Option<&'static str> {
    let name = match (os, arch) {
        ("windows", "x86") => "Windows-x86",
        ("windows", "x86_64") => "Windows-x64",
        ("linux", "x86") => "Linux-x86",
        ("linux", "x86_64") => "Linux-x64",
        ("linux", "arm") => "Linux-ARM",
        ("linux", "aarch64") => "Linux-ARM64",
        ("macos", "x86_64") => "Mac-x64",
        ("macos", "aarch64") => "Mac-ARM64",
        _ => return None,
    };
    Some(name)
}
