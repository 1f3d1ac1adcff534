//! Android APK repackaging for WebGAL games.
//!
//! A WebGAL game is plain web content. To ship it on Android this module
//! takes a prebuilt template APK, decompiles it with APKEditor, rewrites its
//! identity (package, display name, version), drops the engine and the game
//! into its assets, and rebuilds, aligns and signs the result.
//!
//! # Pipeline
//!
//! | Step              | Progress | Failure                        |
//! |-------------------|----------|--------------------------------|
//! | validate project  | 5%       | fatal                          |
//! | validate keystore | 8%       | warning, build continues unsigned |
//! | locate tools      | 10%      | fatal for APKEditor, template, JDK |
//! | clean work dir    | 15%      | fatal                          |
//! | decompile         | 20%      | fatal                          |
//! | patch identity    | 40%      | fatal                          |
//! | relocate package  | 50%      | fatal                          |
//! | inject content    | 60%      | fatal (icons are optional)     |
//! | recompile         | 70%      | fatal                          |
//! | align             | 85%      | skipped without zipalign       |
//! | sign              | 92%      | skipped without signer or keystore |
//!
//! # Example
//!
//! ```no_run
//! use webgal_apk_builder::bundler::{ApkBuilder, ProjectInfo, SettingsBuilder};
//!
//! # async fn example() -> webgal_apk_builder::bundler::Result<()> {
//! let settings = SettingsBuilder::new()
//!     .project_dir("/srv/terre/public/games/demo")
//!     .build()?;
//!
//! let project = ProjectInfo {
//!     app_name: "Demo".into(),
//!     package_name: "com.example.demo".into(),
//!     version_name: "1.0".into(),
//!     version_code: 1,
//! };
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let result = ApkBuilder::new(settings).build(&project, None, &tx).await;
//! drop(tx);
//! while let Some(event) = rx.recv().await {
//!     println!("[{}] {}% {}", event.stage, event.percentage, event.message);
//! }
//! println!("{:?}", result.output_path);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod apkeditor;
pub mod builder;
mod error;
pub mod inject;
pub mod patch;
pub mod platform;
pub mod progress;
mod settings;
pub mod utils;

// Public re-exports
pub use builder::{ApkBuilder, ExecutableProbe, Signer, SystemProbe, Tool, ToolLocator, ToolSet};
pub use error::{Context, Error, ErrorExt, ErrorKind, Result};
pub use platform::HostPlatform;
pub use progress::{BuildStage, NoopListener, PipelineStep, ProgressEvent, ProgressListener};
pub use settings::{
    ArtifactPaths, BuildSettings, DEFAULT_DNAME, DEFAULT_KEYSTORE_VALIDITY, Dname, Keystore,
    ProjectInfo, SettingsBuilder, is_valid_package_name,
};
pub use utils::process::{CommandRunner, Invocation, SystemRunner, redact_args};

use std::path::PathBuf;

/// Terminal value of one build run.
///
/// # Fields
///
/// - `success`: whether an APK was produced
/// - `message`: human readable summary, stage specific on failure
/// - `output_path`: the produced APK (signed, or the unsigned/aligned one)
/// - `error`: the underlying failure, if any
#[derive(Debug)]
pub struct BuildResult {
    /// Whether an APK was produced.
    pub success: bool,

    /// Human readable summary. On failure it names the failing stage.
    pub message: String,

    /// The produced APK.
    ///
    /// Points at the signed APK, or at the unsigned (possibly aligned) one
    /// when signing was skipped.
    pub output_path: Option<PathBuf>,

    /// Underlying error of a failed run.
    pub error: Option<Error>,

    /// Last step reached: the failing step, or [`PipelineStep::Completed`].
    pub step: PipelineStep,

    /// Whether the output carries an APK signature.
    pub signed: bool,

    /// SHA-256 of the produced APK for integrity verification.
    pub checksum: Option<String>,
}

impl BuildResult {
    /// Failure class of a failed run.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(Error::kind)
    }
}
