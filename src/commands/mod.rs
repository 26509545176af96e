//! # CLI Command Implementations
//!
//! Each subcommand of `dep-fetch` lives in its own file and contains:
//! - An `Args` struct that defines the command-specific arguments, derived
//!   using `clap`.
//! - An `execute` function that takes the parsed `Args` together with the
//!   global options and calls into the `dep_fetch` library.

pub mod args;
pub mod checkout;
pub mod completions;
pub mod fetch;
pub mod list;
