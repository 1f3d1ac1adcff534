//! Error types for the command line tool.
//!
//! Pipeline failures come through as [`crate::bundler::Error`]; reading the
//! project store and parsing arguments have their own types. Every error can
//! produce recovery suggestions for the user.

use crate::bundler::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the command line tool.
pub type Result<T> = std::result::Result<T, AppError>;

/// Main error type for all tool operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Project store errors
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Pipeline errors
    #[error("Build error: {0}")]
    Bundler(#[from] crate::bundler::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reading `game/config.txt` or `key.properties`.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// The project directory does not exist
    #[error("Project directory {path} does not exist")]
    NotFound {
        /// Path that was given
        path: PathBuf,
    },

    /// The game configuration file is missing
    #[error("Game configuration not found at {path}")]
    ConfigNotFound {
        /// Expected location
        path: PathBuf,
    },

    /// A store file could not be read
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A value could not be parsed
    #[error("Invalid {key} '{value}' in {path}: {reason}")]
    InvalidValue {
        /// Key holding the value
        key: String,
        /// Raw value
        value: String,
        /// File containing it
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl AppError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            AppError::Project(ProjectError::NotFound { .. }) => vec![
                "Pass the path of a WebGAL game project (the directory containing game/)"
                    .to_string(),
            ],
            AppError::Project(ProjectError::ConfigNotFound { path }) => vec![
                format!("Create {} with Game_name and Package_name entries", path.display()),
                "Open the project once in WebGAL Terre to generate its configuration".to_string(),
            ],
            AppError::Project(ProjectError::InvalidValue { key, .. }) => {
                vec![format!("Fix the value of {key}; version codes must be positive integers")]
            }
            AppError::Bundler(err) => bundler_suggestions(err.kind()),
            AppError::Cli(_) => vec!["Run with --help to see the expected arguments".to_string()],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

/// Suggestions for a pipeline failure class.
pub fn bundler_suggestions(kind: ErrorKind) -> Vec<String> {
    match kind {
        ErrorKind::Configuration => vec![
            "Check Game_name, Package_name, Version_name and Version_code in game/config.txt"
                .to_string(),
            "Package names look like com.example.game: lowercase segments joined by dots"
                .to_string(),
        ],
        ErrorKind::ToolMissing => vec![
            "Place APKEditor.jar and webgal-template.apk in the tools directory (--lib-dir)"
                .to_string(),
            "Install a JDK so that `java` is on PATH, or bundle one under <lib>/jdk-21".to_string(),
        ],
        ErrorKind::ExternalProcess => vec![
            "Read the tool output in the log above (set RUST_LOG=debug for more)".to_string(),
            "Make sure the template APK matches the APKEditor version".to_string(),
        ],
        ErrorKind::StructuralMismatch => vec![
            "The template APK does not contain the expected package; reinstall the tools"
                .to_string(),
        ],
        ErrorKind::Filesystem => vec![
            "Check that the output directory is writable and not open in another program"
                .to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_missing_suggests_lib_dir() {
        let err = AppError::from(crate::bundler::Error::ToolMissing {
            tool: "APKEditor".into(),
        });
        assert!(
            err.recovery_suggestions()
                .iter()
                .any(|s| s.contains("--lib-dir"))
        );
    }

    #[test]
    fn test_project_error_display() {
        let err = AppError::from(ProjectError::InvalidValue {
            key: "Version_code".into(),
            value: "abc".into(),
            path: PathBuf::from("game/config.txt"),
            reason: "not a number".into(),
        });
        assert_eq!(
            err.to_string(),
            "Project error: Invalid Version_code 'abc' in game/config.txt: not a number"
        );
    }
}
