//! # Dependencies
//!
//! A dependency definition is layered with its type defaults, the shared base
//! environment and any local override into a [`DependencyRecord`]. The
//! records of a project form a [`DependencyCollection`], which runs fetch and
//! checkout batches with per-dependency failure isolation: every requested
//! dependency is attempted, and the batch reports which ones failed.

pub mod collection;
pub mod record;
pub mod types;

pub use collection::{BatchReport, DependencyCollection};
pub use record::DependencyRecord;
