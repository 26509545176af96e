//! The set of dependencies of one project.

use std::collections::HashMap;

use log::{debug, warn};
use serde_json::Value;

use super::record::DependencyRecord;
use super::types;
use crate::config::ProjectLayout;
use crate::error::{Error, Result};
use crate::expander::{is_truthy, Environment};
use crate::git::SourceControl;
use crate::opener::ArchiveOpener;

/// Outcome of a batch fetch or checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Every dependency the batch ran, in order.
    pub attempted: Vec<String>,
    /// The dependencies whose operation reported failure, in order.
    pub failed: Vec<String>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Dependencies keyed by name, in definition order.
///
/// Entries flagged `ignore` are dropped while building and are invisible
/// afterwards, including to name lookups.
#[derive(Debug, Clone, Default)]
pub struct DependencyCollection {
    records: Vec<DependencyRecord>,
    index: HashMap<String, usize>,
}

impl DependencyCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from raw definitions and overrides.
    ///
    /// Each definition is layered as base environment < type defaults <
    /// definition < override, where the override is the entry of `overrides`
    /// with the same `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] for an override without a name, an
    /// unknown type, or a definition that has no name after layering.
    pub fn build(
        definitions: &[Environment],
        overrides: &[Environment],
        base_env: &Environment,
    ) -> Result<Self> {
        let mut overrides_by_name: HashMap<&str, &Environment> = HashMap::new();
        for (position, entry) in overrides.iter().enumerate() {
            match entry.get("name") {
                Some(Value::String(name)) => {
                    overrides_by_name.insert(name.as_str(), entry);
                }
                _ => {
                    return Err(Error::config(format!(
                        "Override entry {} has no name",
                        position
                    )))
                }
            }
        }

        let empty = Environment::new();
        let mut collection = Self::new();
        for definition in definitions {
            let matching = definition
                .get("name")
                .and_then(Value::as_str)
                .and_then(|name| overrides_by_name.get(name).copied())
                .unwrap_or(&empty);
            collection.add(base_env, definition, matching)?;
        }
        Ok(collection)
    }

    /// Layers one definition and adds it unless it is ignored. A later
    /// definition with the same name replaces the earlier one in place.
    pub fn add(
        &mut self,
        base_env: &Environment,
        definition: &Environment,
        overrides: &Environment,
    ) -> Result<()> {
        let env = types::flatten(base_env, definition, overrides)?;
        if env.get("ignore").is_some_and(is_truthy) {
            debug!("Ignoring entry {:?}", definition.get("name"));
            return Ok(());
        }
        let record = DependencyRecord::new(env, !overrides.is_empty())?;
        match self.index.get(record.name()) {
            Some(&position) => self.records[position] = record,
            None => {
                self.index
                    .insert(record.name().to_string(), self.records.len());
                self.records.push(record);
            }
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&DependencyRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DependencyRecord> {
        self.index.get(name).map(|&i| &mut self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DependencyRecord> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DependencyRecord> {
        self.records.iter_mut()
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(DependencyRecord::name).collect()
    }

    /// Positions of the requested records; all of them when `subset` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDependencies`] naming every requested name that
    /// is not in the collection.
    fn select(&self, subset: Option<&[String]>) -> Result<Vec<usize>> {
        let Some(names) = subset else {
            return Ok((0..self.records.len()).collect());
        };
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !self.contains(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingDependencies { names: missing });
        }
        Ok(names.iter().map(|name| self.index[name.as_str()]).collect())
    }

    /// Names of the selected records, checked against the collection.
    pub fn selected_names(&self, subset: Option<&[String]>) -> Result<Vec<String>> {
        Ok(self
            .select(subset)?
            .into_iter()
            .map(|position| self.records[position].name().to_string())
            .collect())
    }

    /// Runs `operation` on each selected record, collecting failures instead
    /// of stopping at the first one.
    fn run_batch<F>(&mut self, subset: Option<&[String]>, mut operation: F) -> Result<BatchReport>
    where
        F: FnMut(&mut DependencyRecord) -> Result<bool>,
    {
        let selected = self.select(subset)?;
        let mut report = BatchReport::default();
        for position in selected {
            let record = &mut self.records[position];
            report.attempted.push(record.name().to_string());
            if !operation(record)? {
                report.failed.push(record.name().to_string());
            }
        }
        Ok(report)
    }

    /// Fetches the selected dependencies.
    ///
    /// # Errors
    ///
    /// Unknown names fail before anything is fetched. Configuration errors
    /// abort the batch; fetch failures are collected in the report.
    pub fn fetch(
        &mut self,
        opener: &dyn ArchiveOpener,
        layout: &ProjectLayout,
        subset: Option<&[String]>,
    ) -> Result<BatchReport> {
        let report = self.run_batch(subset, |record| record.fetch(opener, layout))?;
        if !report.is_success() {
            warn!(
                "Failed to fetch some dependencies: {}",
                report.failed.join(" ")
            );
        }
        Ok(report)
    }

    /// Checks out the source of the selected dependencies.
    ///
    /// # Errors
    ///
    /// As for [`DependencyCollection::fetch`].
    pub fn checkout(
        &mut self,
        scm: &dyn SourceControl,
        layout: &ProjectLayout,
        subset: Option<&[String]>,
    ) -> Result<BatchReport> {
        let report = self.run_batch(subset, |record| record.checkout(scm, layout))?;
        if !report.is_success() {
            warn!(
                "Failed to check out some dependencies: {}",
                report.failed.join(" ")
            );
        }
        Ok(report)
    }

    /// The `configure-args` of the selected dependencies, concatenated in
    /// order.
    pub fn configure_args(&mut self, subset: Option<&[String]>) -> Result<Vec<Value>> {
        let selected = self.select(subset)?;
        let mut args = Vec::new();
        for position in selected {
            args.extend(self.records[position].configure_args()?);
        }
        Ok(args)
    }
}
