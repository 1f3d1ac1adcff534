//! Command execution.
//!
//! The tool has a single operation: package one project. This module wires
//! argument validation, the build and error reporting together.

mod build;

use crate::bundler::{BuildStage, ProgressEvent};
use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;

use build::{BuildReport, execute_build, print_json};

/// Execute the build described by the parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    let config = RuntimeConfig::from(&args);

    if let Err(validation_error) = args.validate() {
        let output = super::OutputManager::new(false);
        output.error(&validation_error.to_string());
        return Ok(1);
    }

    match execute_build(&args, &config).await {
        Ok(exit_code) => Ok(exit_code),
        Err(e) if config.is_json() => {
            // Failures before the pipeline starts still end the stream with ERROR.
            print_json(&ProgressEvent::new(BuildStage::Error, 0, e.to_string()));
            print_json(&BuildReport::from(&e));
            Err(e)
        }
        Err(e) => Err(e),
    }
}
