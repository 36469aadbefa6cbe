//! Job controller, configuration, logging and output writing for the
//! `compactor` command-line front end.
pub mod config;
mod controller;
pub mod logging;
pub mod mime;
pub mod output;

pub use config::{AppConfig, ConfigError};
pub use controller::JobController;
pub use logging::LogDestination;
pub use output::{write_results, OutputError, OutputReport, RunSummary};
