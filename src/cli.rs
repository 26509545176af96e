//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use dep_fetch::config::{self, ProjectLayout};
use dep_fetch::orchestrator::RunOptions;
use dep_fetch::output::OutputConfig;

use crate::commands;

/// Fetch the binary dependencies of a project
#[derive(Parser, Debug)]
#[command(name = "dep-fetch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Project directory containing projectdata/dependencies.json
    #[arg(
        long,
        global = true,
        value_name = "DIR",
        env = "DEP_FETCH_PROJECT_DIR"
    )]
    pub project_dir: Option<PathBuf>,

    /// Target platform, e.g. Windows-x86, Linux-x64, Mac-x64
    #[arg(long, global = true, value_name = "PLATFORM", env = "DEP_FETCH_PLATFORM")]
    pub platform: Option<String>,

    /// Extra variable visible to every dependency (repeatable)
    #[arg(
        short = 'e',
        long = "env",
        global = true,
        value_name = "KEY=VALUE"
    )]
    pub env: Vec<String>,

    /// Dependency definitions file, relative to the project directory
    #[arg(long, global = true, value_name = "PATH")]
    pub dependencies: Option<PathBuf>,

    /// Local overrides file, relative to the project directory
    #[arg(long, global = true, value_name = "PATH")]
    pub overrides: Option<PathBuf>,

    /// Ignore the local overrides file
    #[arg(long, global = true)]
    pub no_local_overrides: bool,
}

impl GlobalArgs {
    /// Run options for `names`, with every step disabled. Commands switch on
    /// the steps they perform.
    pub fn run_options(&self, names: Vec<String>) -> Result<RunOptions> {
        let project_dir = match &self.project_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to get current directory")?,
        };
        let env = self
            .env
            .iter()
            .map(|assignment| config::parse_assignment(assignment))
            .collect::<Result<Vec<_>, _>>()?;

        let mut options = RunOptions::new(ProjectLayout::new(project_dir)?);
        options.names = (!names.is_empty()).then_some(names);
        options.platform = self.platform.clone();
        options.env = env;
        options.fetch = false;
        options.clean = false;
        options.local_overrides = !self.no_local_overrides;
        options.definitions_file = self.dependencies.clone();
        options.overrides_file = self.overrides.clone();
        Ok(options)
    }

    pub fn output(&self) -> OutputConfig {
        OutputConfig::from_env_and_flag(&self.color)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clean the output directories and fetch dependencies
    Fetch(commands::fetch::FetchArgs),

    /// Clone or update the source repositories of dependencies
    Checkout(commands::checkout::CheckoutArgs),

    /// Show where each dependency is fetched from and unpacked to
    List(commands::list::ListArgs),

    /// Print the configure arguments of dependencies, one per line
    Args(commands::args::ArgsArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.global.log_level);

        match self.command {
            Commands::Fetch(args) => commands::fetch::execute(args, &self.global),
            Commands::Checkout(args) => commands::checkout::execute(args, &self.global),
            Commands::List(args) => commands::list::execute(args, &self.global),
            Commands::Args(args) => commands::args::execute(args, &self.global),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Logs go to stderr so `args` and `list` output stays clean on stdout.
fn init_logging(level: &str) {
    let filter = match level.to_lowercase().as_str() {
        "error" | "warn" | "info" | "debug" | "trace" | "off" => level.to_lowercase(),
        _ => "info".to_string(),
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_target(false)
        .format_timestamp(None)
        .try_init();
}
