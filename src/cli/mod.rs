//! Command line interface module
//!
//! Argument parsing, configuration layering (environment, then flags) and the
//! runner that maps subcommands onto the library.

pub mod args;
pub mod config;
pub mod runner;

pub use args::{Args, Command};
pub use config::{AppConfig, AuthConfig, ConfigOverrides};
pub use runner::Runner;
