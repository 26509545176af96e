//! # Output Configuration
//!
//! Controls the appearance of command output: whether status markers are
//! emoji or plain text, and how a fetch report and dependency listing are
//! printed.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;
use std::fmt::Write;
use std::path::Path;

use crate::orchestrator::{DependencyListing, RunReport};

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is the value of `--color`: "always", "never", or "auto".
    /// In auto mode, colors are disabled if `NO_COLOR` is set, `CLICOLOR=0`,
    /// `TERM=dumb`, or stdout is not a TTY (unless `CLICOLOR_FORCE=1`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns `emoji_str` when colors are enabled, otherwise `plain`.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Formats a listing in the layout used by `dep-fetch list`.
///
/// `overrides_file` is named in the note on overridden dependencies.
pub fn format_listing(listing: &[DependencyListing], overrides_file: &Path) -> String {
    let mut out = String::new();
    for entry in listing {
        let _ = writeln!(out, "Dependency '{}':", entry.name);
        let _ = writeln!(out, "    fetches from:     {:?}", entry.archive_path);
        let _ = writeln!(out, "    unpacks to:       {:?}", entry.dest);
        let override_note = if entry.has_overrides {
            format!("YES (see '{}')", overrides_file.display())
        } else {
            "no".to_string()
        };
        let _ = writeln!(out, "    local override:   {}", override_note);
        if !entry.items.is_empty() {
            let _ = writeln!(out, "    all keys:");
            for (key, value) in &entry.items {
                let _ = writeln!(out, "        {} = {}", key, value);
            }
        }
        out.push('\n');
    }
    out
}

/// Formats the one-line summary printed after a fetch or checkout.
pub fn format_summary(config: &OutputConfig, report: &RunReport) -> String {
    let mut out = String::new();
    for (label, batch) in [("Fetched", &report.fetch), ("Checked out", &report.checkout)] {
        let Some(batch) = batch else { continue };
        let ok = batch.attempted.len() - batch.failed.len();
        if batch.is_success() {
            let _ = writeln!(
                out,
                "{} {} {} of {} dependencies for {}",
                emoji(config, "✅", "[OK]"),
                label,
                ok,
                batch.attempted.len(),
                report.platform
            );
        } else {
            let _ = writeln!(
                out,
                "{} {} {} of {} dependencies for {}; failed: {}",
                emoji(config, "❌", "[FAILED]"),
                label,
                ok,
                batch.attempted.len(),
                report.platform,
                batch.failed.join(", ")
            );
        }
    }
    out
}
