//! # Checkout Command Implementation
//!
//! Clones each requested dependency's `source-git` repository into the
//! sibling directory `../<name>`, or fetches it if it is already there, and
//! checks out the dependency's `tag`. Nothing is cleaned or downloaded.

use anyhow::Result;
use clap::Args;

use dep_fetch::git::GitCli;
use dep_fetch::opener::SchemeOpener;
use dep_fetch::orchestrator;
use dep_fetch::output::format_summary;

use crate::cli::GlobalArgs;

/// Check out the source of dependencies next to the project
#[derive(Args, Debug)]
pub struct CheckoutArgs {
    /// Dependencies to check out (default: all)
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,
}

/// Execute the `checkout` command.
pub fn execute(args: CheckoutArgs, global: &GlobalArgs) -> Result<()> {
    let mut options = global.run_options(args.names)?;
    options.source = true;

    let git = GitCli::detect()?;
    let opener = SchemeOpener::relative_to(options.layout.project_dir());
    let report = orchestrator::run(&options, &opener, Some(&git))?;

    print!("{}", format_summary(&global.output(), &report));
    if !report.is_success() {
        anyhow::bail!(
            "Failed to check out some dependencies: {}",
            report.failures().join(" ")
        );
    }
    Ok(())
}
