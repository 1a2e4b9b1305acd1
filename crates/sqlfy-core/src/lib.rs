//! SQLfy Core
//!
//! Domain types shared by the template, engine and CLI crates.
//! Error codes in the run report are part of the public output format - never rename them.

pub mod config;
pub mod report;

pub use config::{Config, ConfigError, FailurePolicy, MethodSpec, CONFIG_FILE_NAME};
pub use report::{FileFailure, FileOutcome, OutcomeStatus, ReportVersion, RunReport, RunSummary};
