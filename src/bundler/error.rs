//! Error types for the repackaging pipeline.
//!
//! Provides contextual error chaining, filesystem errors that carry the
//! offending path, and the failure taxonomy every pipeline stage reports into.
//!
//! # Features
//!
//! - **Context trait**: Add context to errors similar to anyhow
//! - **ErrorExt trait**: Filesystem operations with automatic path context
//! - **bail! macro**: Early return with formatted error messages
//! - **ErrorKind**: Coarse classification used by the orchestrator and the CLI
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use webgal_apk_builder::bundler::{Context, ErrorExt, Result};
//!
//! fn read_manifest(path: &Path) -> Result<String> {
//!     let contents = std::fs::read_to_string(path)
//!         .fs_context("reading decompiled manifest", path)?;
//!
//!     if !contents.contains("<manifest") {
//!         webgal_apk_builder::bail!("{} is not an Android manifest", path.display());
//!     }
//!
//!     Ok(contents)
//! }
//! ```

use std::{
    fmt::{self, Display},
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned by the pipeline.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "removing work directory")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// An external command could not be spawned at all.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to execute
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// An external command ran and exited unsuccessfully.
    #[error("{stage} failed: {command} exited with {}", display_code(.code))]
    ProcessExit {
        /// Human readable name of the step (e.g., "APK decompilation")
        stage: String,
        /// Program that was run
        command: String,
        /// Exit code, `None` when the process was killed by a signal
        code: Option<i32>,
    },

    /// Missing or malformed project input.
    #[error("invalid {field}: {reason}")]
    Configuration {
        /// Name of the offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// A required external tool could not be located.
    #[error("{tool} not found")]
    ToolMissing {
        /// Tool name as shown to the user
        tool: String,
    },

    /// The decompiled tree does not have the layout the template promises.
    #[error("could not find package directory in decompiled APK (searched {})", display_paths(.searched))]
    StructuralMismatch {
        /// Every candidate directory that was probed
        searched: Vec<PathBuf>,
    },

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Error walking a directory tree.
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// A blocking filesystem task panicked or was cancelled.
    #[error("background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Coarse failure classes a caller can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad project input; the user must fix it.
    Configuration,
    /// A tool is missing.
    ToolMissing,
    /// An external process exited non-zero or could not start.
    ExternalProcess,
    /// The decompiled template does not match expectations.
    StructuralMismatch,
    /// Anything touching the filesystem.
    Filesystem,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::ToolMissing => "tool missing",
            ErrorKind::ExternalProcess => "external process error",
            ErrorKind::StructuralMismatch => "structural mismatch",
            ErrorKind::Filesystem => "filesystem error",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Maps this error onto its failure class. Context wrappers are looked through.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Context(_, inner) => inner.kind(),
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::ToolMissing { .. } => ErrorKind::ToolMissing,
            Error::CommandFailed { .. } | Error::ProcessExit { .. } => ErrorKind::ExternalProcess,
            Error::StructuralMismatch { .. } => ErrorKind::StructuralMismatch,
            Error::Fs { .. }
            | Error::IoError(_)
            | Error::WalkdirError(_)
            | Error::StripError(_)
            | Error::TaskJoin(_)
            | Error::GenericError(_) => ErrorKind::Filesystem,
        }
    }

    /// Exit code of the failed external process, if that is what went wrong.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::Context(_, inner) => inner.exit_code(),
            Error::ProcessExit { code, .. } => *code,
            _ => None,
        }
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with the pipeline's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "moving package directory".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::Error::GenericError(format!($msg)))
    };
    ($err:expr $(,)?) => {
        return Err($crate::bundler::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_looks_through_context() {
        let err: Result<()> = Err(Error::ToolMissing {
            tool: "APKEditor".into(),
        });
        let err = err.context("locating tools").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolMissing);
        assert_eq!(err.to_string(), "locating tools: APKEditor not found");
    }

    #[test]
    fn test_process_exit_message_carries_code_and_stage() {
        let err = Error::ProcessExit {
            stage: "APK decompilation".into(),
            command: "java".into(),
            code: Some(2),
        };
        assert_eq!(err.kind(), ErrorKind::ExternalProcess);
        assert_eq!(err.exit_code(), Some(2));
        assert_eq!(
            err.to_string(),
            "APK decompilation failed: java exited with code 2"
        );
    }

    #[test]
    fn test_fs_context_keeps_path() {
        let result: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let err = result.fs_context("removing work directory", "/tmp/build").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert!(err.to_string().contains("/tmp/build"));
    }
}
