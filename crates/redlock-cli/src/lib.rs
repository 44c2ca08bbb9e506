//! Redlock CLI - configuration, logging and commands for the `redlock` binary

pub mod command;
pub mod config;
pub mod logging;

pub use command::{build_manager, print_nodes, run_acquire};
pub use config::{AppConfig, Cli, Command};
pub use logging::init_logging;
