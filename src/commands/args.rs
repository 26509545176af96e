//! # Args Command Implementation
//!
//! Prints the `configure-args` of the requested dependencies, concatenated in
//! order, one argument per line, for a build script to pass on to its
//! configure step.

use anyhow::Result;
use clap::Args;
use serde_json::Value;

use dep_fetch::orchestrator;

use crate::cli::GlobalArgs;

/// Print configure arguments of dependencies
#[derive(Args, Debug)]
pub struct ArgsArgs {
    /// Dependencies whose arguments to print (default: all)
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,
}

/// Execute the `args` command.
pub fn execute(args: ArgsArgs, global: &GlobalArgs) -> Result<()> {
    let options = global.run_options(args.names)?;
    let (mut collection, _) = orchestrator::load_collection(&options)?;
    for arg in collection.configure_args(options.names.as_deref())? {
        match arg {
            Value::String(text) => println!("{}", text),
            other => println!("{}", other),
        }
    }
    Ok(())
}
