//! Command handlers module.
//!
//! This module organizes the CLI command implementations into separate files:
//! - `core.rs`: Pipeline commands (process, match, snapshot)
//! - `config.rs`: Configuration display command

mod config;
mod core;

pub use config::cmd_config;
pub use core::{cmd_match, cmd_process, cmd_snapshot};
