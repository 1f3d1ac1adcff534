//! # WebGAL APK Builder
//!
//! Packages WebGAL visual novel projects as Android applications.
//!
//! A prebuilt template APK is decompiled, given the game's identity and
//! content, rebuilt, aligned and signed. External tools (APKEditor, a JDK,
//! zipalign, apksigner) do the heavy lifting; this crate locates them,
//! drives them in order and reports progress.
//!
//! ## Usage
//!
//! ```bash
//! webgal_apk_builder public/games/MyGame
//! webgal_apk_builder public/games/MyGame --create-keystore --progress-json
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bundler;
pub mod cli;
pub mod error;
pub mod metadata;

pub use bundler::{
    ApkBuilder, BuildResult, BuildSettings, Keystore, ProgressEvent, ProjectInfo, SettingsBuilder,
};
pub use cli::Args;
pub use error::{AppError, CliError, ProjectError, Result};
