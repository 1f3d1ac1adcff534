//! Command line argument parsing and validation.
//!
//! Point the tool at a WebGAL game project and it produces an APK next to
//! the other exported builds of that game.

use crate::error::CliError;
use clap::Parser;
use std::path::PathBuf;

/// Package a WebGAL game as an Android APK
#[derive(Parser, Debug)]
#[command(
    name = "webgal_apk_builder",
    version,
    about = "Package a WebGAL game as an Android APK",
    long_about = "Repackage the WebGAL template APK with a game's content and identity.

The project directory must contain game/config.txt. Signing credentials are
read from key.properties next to game/ when present.

Usage:
  webgal_apk_builder public/games/MyGame
  webgal_apk_builder public/games/MyGame --create-keystore
  webgal_apk_builder public/games/MyGame --progress-json"
)]
pub struct Args {
    /// WebGAL game project directory
    #[arg(index = 1, value_name = "PROJECT")]
    pub project: PathBuf,

    /// Directory holding APKEditor.jar, the template APK and bundled tools
    #[arg(long, value_name = "DIR", env = "WEBGAL_APK_LIB_DIR")]
    pub lib_dir: Option<PathBuf>,

    /// WebGAL engine template to inject
    #[arg(long, value_name = "DIR")]
    pub engine_dir: Option<PathBuf>,

    /// Where the APK and the work directory go
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Generate the keystore named in key.properties if it does not exist
    #[arg(long)]
    pub create_keystore: bool,

    /// Emit progress events and the result as JSON lines on stdout
    #[arg(long)]
    pub progress_json: bool,
}

impl Args {
    /// Parse command line arguments, printing help or errors.
    ///
    /// Returns the exit code to use when parsing did not produce arguments:
    /// 0 for `--help`/`--version`, 1 for invalid input.
    pub fn try_parse_args() -> Result<Self, i32> {
        Self::try_parse().map_err(|e| {
            let _ = e.print();
            if e.use_stderr() { 1 } else { 0 }
        })
    }

    /// Validate arguments for consistency
    ///
    /// Directories read as inputs must exist; the output directory is created
    /// on demand.
    pub fn validate(&self) -> Result<(), CliError> {
        for (flag, dir) in [("--lib-dir", &self.lib_dir), ("--engine-dir", &self.engine_dir)] {
            if let Some(dir) = dir
                && !dir.is_dir()
            {
                return Err(CliError::InvalidArguments {
                    reason: format!("{flag} {} is not a directory", dir.display()),
                });
            }
        }
        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
    json: bool,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(json: bool) -> Self {
        Self {
            // Machine output owns stdout; keep human output off it.
            output: super::OutputManager::new(json),
            json,
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Whether progress and results go out as JSON lines
    pub fn is_json(&self) -> bool {
        self.json
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.progress_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "webgal_apk_builder",
            "games/demo",
            "--engine-dir",
            "engine",
            "--create-keystore",
            "--progress-json",
        ])
        .expect("parse");
        assert_eq!(args.project, PathBuf::from("games/demo"));
        assert_eq!(args.engine_dir, Some(PathBuf::from("engine")));
        assert!(args.create_keystore);
        assert!(args.progress_json);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_project_is_required() {
        let err = Args::try_parse_from(["webgal_apk_builder"]).expect_err("missing project");
        assert!(err.use_stderr());
    }

    #[test]
    fn test_empty_dir_flag_is_rejected_by_parser() {
        let err = Args::try_parse_from(["webgal_apk_builder", "games/demo", "--output-dir", ""])
            .expect_err("empty path");
        assert!(err.use_stderr());
    }

    #[test]
    fn test_missing_input_dir_is_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let missing = tmp.path().join("no-engine");
        let args = Args::try_parse_from([
            OsStr::new("webgal_apk_builder"),
            OsStr::new("games/demo"),
            OsStr::new("--engine-dir"),
            missing.as_os_str(),
            OsStr::new("--lib-dir"),
            tmp.path().as_os_str(),
        ])
        .expect("parse");
        match args.validate() {
            Err(CliError::InvalidArguments { reason }) => {
                assert!(reason.starts_with("--engine-dir"));
            }
            other => panic!("expected invalid arguments, got {other:?}"),
        }
    }
}
