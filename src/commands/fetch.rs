//! # Fetch Command Implementation
//!
//! Cleans `dependencies/AnyPlatform` and `dependencies/<platform>`, then
//! downloads and unpacks each requested dependency. With `--source` the
//! source repositories are checked out afterwards.
//!
//! Every requested dependency is attempted even when an earlier one fails.
//! The command exits non-zero if any of them failed.

use anyhow::Result;
use clap::Args;

use dep_fetch::git::{GitCli, SourceControl};
use dep_fetch::opener::SchemeOpener;
use dep_fetch::orchestrator;
use dep_fetch::output::format_summary;

use crate::cli::GlobalArgs;

/// Fetch dependencies into the project's dependencies directory
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Dependencies to fetch (default: all)
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,

    /// Keep existing output directories instead of cleaning them first
    #[arg(long)]
    pub no_clean: bool,

    /// Also clone or update each dependency's source repository
    #[arg(short, long)]
    pub source: bool,
}

/// Execute the `fetch` command.
pub fn execute(args: FetchArgs, global: &GlobalArgs) -> Result<()> {
    let mut options = global.run_options(args.names)?;
    options.fetch = true;
    options.clean = !args.no_clean;
    options.source = args.source;

    let git = if args.source {
        Some(GitCli::detect()?)
    } else {
        None
    };
    let report = orchestrator::run(
        &options,
        &SchemeOpener::relative_to(options.layout.project_dir()),
        git.as_ref().map(|git| git as &dyn SourceControl),
    )?;

    print!("{}", format_summary(&global.output(), &report));
    if !report.is_success() {
        anyhow::bail!(
            "Failed to fetch some dependencies: {}",
            report.failures().join(" ")
        );
    }
    Ok(())
}
