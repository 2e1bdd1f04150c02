//! Configuration for the Geia normalization tools.
//!
//! The configuration is a single YAML file. Every section is optional:
//!
//! ```yaml
//! logging:
//!   level: debug
//! abbreviations:
//!   path: abbreviations.csv
//! input:
//!   text_columns: [TASK_DESCRIPTION, PROBLEM_NOTE]
//!   facility_column: FACILITY
//! ```
//!
//! Relative paths resolve against the directory of the configuration file.

#![warn(missing_docs)]

mod config;

pub use self::config::*;
