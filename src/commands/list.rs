//! # List Command Implementation
//!
//! Shows, for each dependency, where its archive is fetched from, where it is
//! unpacked to, and whether a local override applies. This command is
//! read-only: nothing is cleaned or fetched.

use anyhow::Result;
use clap::Args;

use dep_fetch::opener::SchemeOpener;
use dep_fetch::orchestrator;
use dep_fetch::output::format_listing;

use crate::cli::GlobalArgs;

/// Describe dependencies without fetching them
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Dependencies to describe (default: all)
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,

    /// Also show every key with its resolved value
    #[arg(short, long)]
    pub verbose: bool,
}

/// Execute the `list` command.
pub fn execute(args: ListArgs, global: &GlobalArgs) -> Result<()> {
    let mut options = global.run_options(args.names)?;
    options.list_details = true;
    options.verbose = args.verbose;

    let opener = SchemeOpener::relative_to(options.layout.project_dir());
    let report = orchestrator::run(&options, &opener, None)?;
    let listing = report.listing.unwrap_or_default();
    if listing.is_empty() {
        println!("No dependencies defined.");
        return Ok(());
    }
    print!(
        "{}",
        format_listing(&listing, options.overrides_file_name())
    );
    Ok(())
}
