//! Command line interface for webgal_apk_builder.
//!
//! Parses arguments, runs one build and reports progress either as colored
//! terminal output or as JSON lines.

mod args;
pub mod commands;
mod output;

pub use args::{Args, RuntimeConfig};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    match Args::try_parse_args() {
        Ok(args) => execute_command(args).await,
        Err(exit_code) => Ok(exit_code),
    }
}
