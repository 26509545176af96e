//! # Orchestrated Run
//!
//! Ties the pieces together the way the command line uses them:
//!
//! 1. Settle the platform and the base environment.
//! 2. Clean the output directories for the platform, unless listing.
//! 3. Load definitions and overrides into a [`DependencyCollection`].
//! 4. List, or fetch then check out.
//!
//! Fetch and checkout failures of individual dependencies do not abort the
//! run; they are reported in the returned [`RunReport`].

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_json::Value;

use crate::cleaner::TransactionalCleaner;
use crate::config::{self, ProjectLayout};
use crate::defaults;
use crate::dependency::{BatchReport, DependencyCollection};
use crate::error::{Error, Result};
use crate::git::SourceControl;
use crate::opener::ArchiveOpener;

/// What a run should do.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Dependencies to work on; all of them when `None`.
    pub names: Option<Vec<String>>,
    /// Target platform. Falls back to a `platform` assignment in `env`, then
    /// to the host platform.
    pub platform: Option<String>,
    /// Extra `KEY=VALUE` variables visible to every dependency.
    pub env: Vec<(String, String)>,
    pub fetch: bool,
    pub clean: bool,
    /// Check out source repositories after fetching.
    pub source: bool,
    /// Describe the dependencies instead of fetching them.
    pub list_details: bool,
    /// Include every resolved key in the listing.
    pub verbose: bool,
    /// Read the overrides file.
    pub local_overrides: bool,
    pub layout: ProjectLayout,
    /// Defaults to [`defaults::DEPENDENCIES_FILE`] in the project directory.
    pub definitions_file: Option<PathBuf>,
    /// Defaults to [`defaults::OVERRIDES_FILE`] in the project directory.
    pub overrides_file: Option<PathBuf>,
}

impl RunOptions {
    /// Options for a plain fetch of every dependency into `layout`.
    pub fn new(layout: ProjectLayout) -> Self {
        Self {
            names: None,
            platform: None,
            env: Vec::new(),
            fetch: true,
            clean: true,
            source: false,
            list_details: false,
            verbose: false,
            local_overrides: true,
            layout,
            definitions_file: None,
            overrides_file: None,
        }
    }

    pub fn definitions_path(&self) -> PathBuf {
        self.layout.resolve(
            self.definitions_file
                .as_deref()
                .unwrap_or(Path::new(defaults::DEPENDENCIES_FILE)),
        )
    }

    /// The overrides file as given, relative to the project directory
    /// unless absolute.
    pub fn overrides_file_name(&self) -> &Path {
        self.overrides_file
            .as_deref()
            .unwrap_or(Path::new(defaults::OVERRIDES_FILE))
    }

    /// The overrides file, or `None` when local overrides are disabled.
    pub fn overrides_path(&self) -> Option<PathBuf> {
        self.local_overrides
            .then(|| self.layout.resolve(self.overrides_file_name()))
    }

    fn subset(&self) -> Option<&[String]> {
        self.names.as_deref()
    }
}

/// Description of one dependency for `list`.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyListing {
    pub name: String,
    pub archive_path: String,
    pub dest: String,
    pub has_overrides: bool,
    /// Every key resolved, sorted by key. Empty unless verbose.
    pub items: Vec<(String, Value)>,
}

/// Outcome of [`run`].
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub platform: String,
    pub listing: Option<Vec<DependencyListing>>,
    pub fetch: Option<BatchReport>,
    pub checkout: Option<BatchReport>,
}

impl RunReport {
    /// Whether every batch that ran succeeded.
    pub fn is_success(&self) -> bool {
        [&self.fetch, &self.checkout]
            .into_iter()
            .flatten()
            .all(BatchReport::is_success)
    }

    /// Names that failed in any batch, fetch failures first.
    pub fn failures(&self) -> Vec<&str> {
        [&self.fetch, &self.checkout]
            .into_iter()
            .flatten()
            .flat_map(|report| report.failed.iter().map(String::as_str))
            .collect()
    }
}

/// Loads the definitions and overrides named by `options` into a collection,
/// returning it with the platform that was settled on.
///
/// # Errors
///
/// Returns [`Error::ConfigParse`] when the platform cannot be determined or a
/// file is missing or malformed.
pub fn load_collection(options: &RunOptions) -> Result<(DependencyCollection, String)> {
    let (base_env, platform) = config::base_environment(
        &options.env,
        options.platform.as_deref(),
        defaults::default_platform,
    )?;
    let definitions = config::load_definitions(&options.definitions_path())?;
    let overrides = config::load_overrides(options.overrides_path().as_deref())?;
    debug!(
        "Loaded {} definitions and {} overrides for {}",
        definitions.len(),
        overrides.len(),
        platform
    );
    let collection = DependencyCollection::build(&definitions, &overrides, &base_env)?;
    Ok((collection, platform))
}

/// Runs the clean, fetch and checkout steps selected by `options`.
///
/// `scm` is only used when `options.source` is set.
///
/// # Errors
///
/// Configuration errors, unknown dependency names and cleaning failures
/// abort the run. Individual fetch or checkout failures are reported in the
/// returned [`RunReport`] instead.
pub fn run(
    options: &RunOptions,
    opener: &dyn ArchiveOpener,
    scm: Option<&dyn SourceControl>,
) -> Result<RunReport> {
    // The platform is settled before cleaning so a missing one fails early.
    let (_, platform) = config::base_environment(
        &options.env,
        options.platform.as_deref(),
        defaults::default_platform,
    )?;

    if options.clean && options.fetch && !options.list_details {
        let directories = options.layout.platform_dirs(&platform);
        info!("Cleaning {} output directories", directories.len());
        TransactionalCleaner::new().clean(&directories)?;
    }

    let (mut collection, platform) = load_collection(options)?;
    let mut report = RunReport {
        platform,
        ..Default::default()
    };

    if options.list_details {
        report.listing = Some(list_details(&mut collection, options.subset(), options.verbose)?);
        return Ok(report);
    }

    if options.fetch {
        report.fetch = Some(collection.fetch(opener, &options.layout, options.subset())?);
    }
    if options.source {
        let scm = scm.ok_or_else(|| Error::ToolValidation {
            tool: "git".to_string(),
            message: "source checkout requested without a source control tool".to_string(),
        })?;
        report.checkout = Some(collection.checkout(scm, &options.layout, options.subset())?);
    }
    Ok(report)
}

/// Describes the selected dependencies in collection order.
pub fn list_details(
    collection: &mut DependencyCollection,
    subset: Option<&[String]>,
    verbose: bool,
) -> Result<Vec<DependencyListing>> {
    let mut listing = Vec::new();
    for name in collection.selected_names(subset)? {
        let Some(record) = collection.get_mut(&name) else {
            continue;
        };
        let items = if verbose {
            let mut items = record.items()?;
            items.sort_by(|a, b| a.0.cmp(&b.0));
            items
        } else {
            Vec::new()
        };
        listing.push(DependencyListing {
            archive_path: record.archive_path()?,
            dest: record.dest()?,
            has_overrides: record.has_overrides(),
            items,
            name,
        });
    }
    Ok(listing)
}
