//! Scripted AT sessions from the command line.
//!
//! This crate provides:
//! - [`RunnerConfig`]: YAML configuration with defaults for every field
//! - [`Runner`]: builds a [`at_wrapper::Session`] from the configuration and
//!   runs the configured commands against an attached transport
//! - [`init_logging`]: `tracing` subscriber setup for the `atwrap` binary

mod config;
mod error;
mod logging;
mod runner;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use runner::*;
