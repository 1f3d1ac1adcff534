//! Pipeline orchestration and the tool adapters it drives.

pub mod checksum;
pub mod orchestrator;
pub mod signing;
pub mod tool_detection;

pub use orchestrator::ApkBuilder;
pub use tool_detection::{
    CoreTools, ExecutableProbe, Signer, SystemProbe, Tool, ToolLocator, ToolSet, first_existing,
};
