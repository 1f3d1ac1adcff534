//! External process execution.
//!
//! Exactly one child process is spawned per [`CommandRunner::run`] call. Its
//! stdout and stderr are streamed line by line into the log, and the
//! invocation line is logged with credential-bearing arguments masked.

use crate::bundler::error::{Error, Result};
use std::{
    ffi::OsString,
    future::Future,
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
};

/// Replacement text for redacted credentials.
pub const REDACTION_MASK: &str = "***";

/// Flags whose following argument is a secret.
const SECRET_FLAGS: &[&str] = &[
    "--ks-pass",
    "--key-pass",
    "--ksPass",
    "--ksKeyPass",
    "-storepass",
    "-keypass",
    "-srcstorepass",
    "-deststorepass",
    "-srckeypass",
    "-destkeypass",
];

/// Log target for child process output.
const LOG_TARGET: &str = "webgal_apk_builder::process";

/// A fully described external command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Program to run, a path or a bare name resolved through `PATH`.
    pub program: PathBuf,
    /// Arguments passed verbatim.
    pub args: Vec<OsString>,
    /// Human readable step name, e.g. "APK decompilation".
    pub description: String,
}

impl Invocation {
    /// Starts an invocation of `program`.
    pub fn new(program: impl AsRef<Path>, description: impl Into<String>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Arguments as lossy strings, for inspection and logging.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// The command line as it is written to the log, secrets masked.
    pub fn display_redacted(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in redact_args(&self.args_lossy()) {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }
}

/// Masks credentials in an argument list.
///
/// The value after any flag in the secret-flag list is replaced with
/// [`REDACTION_MASK`], and any argument of the form `pass:<secret>` becomes
/// `pass:***`. The input is not modified.
pub fn redact_args(args: &[String]) -> Vec<String> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut mask_next = false;

    for arg in args {
        if mask_next {
            mask_next = false;
            if arg.starts_with("pass:") {
                redacted.push(format!("pass:{REDACTION_MASK}"));
            } else {
                redacted.push(REDACTION_MASK.to_string());
            }
            continue;
        }

        if SECRET_FLAGS.contains(&arg.as_str()) {
            mask_next = true;
            redacted.push(arg.clone());
        } else if arg.starts_with("pass:") {
            redacted.push(format!("pass:{REDACTION_MASK}"));
        } else {
            redacted.push(arg.clone());
        }
    }

    redacted
}

/// Runs external commands for the pipeline.
///
/// The production implementation is [`SystemRunner`]; tests substitute a
/// scripted runner to exercise the pipeline without a JDK.
pub trait CommandRunner: Send + Sync {
    /// Runs `invocation` to completion.
    ///
    /// Resolves to `Ok(())` on exit code 0, [`Error::ProcessExit`] on any other
    /// exit status and [`Error::CommandFailed`] if the process cannot start.
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<()>> + Send;
}

/// Spawns real child processes with tokio.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<()> {
        log::info!("Executing: {}", invocation.display_redacted());

        let command_name = invocation.program.display().to_string();
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| Error::CommandFailed {
                command: command_name.clone(),
                error,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (status, _, _) = tokio::join!(
            child.wait(),
            forward_lines(stdout, log::Level::Info),
            forward_lines(stderr, log::Level::Warn),
        );

        let status = status.map_err(|error| Error::CommandFailed {
            command: command_name.clone(),
            error,
        })?;

        if status.success() {
            log::info!("{} completed successfully", invocation.description);
            Ok(())
        } else {
            log::error!(
                "{} exited with {:?}",
                invocation.description,
                status.code()
            );
            Err(Error::ProcessExit {
                stage: invocation.description.clone(),
                command: command_name,
                code: status.code(),
            })
        }
    }
}

/// Copies every line of `stream` into the log at `level`.
async fn forward_lines<R>(stream: Option<R>, level: log::Level)
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return;
    };

    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => log::log!(target: LOG_TARGET, level, "{}", line),
            Ok(None) => break,
            Err(e) => {
                // Non UTF-8 output ends the stream; the exit status still decides.
                log::debug!(target: LOG_TARGET, "stopped reading child output: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_redacts_apksigner_passwords() {
        let args = strings(&[
            "sign",
            "--ks",
            "release.jks",
            "--ks-pass",
            "pass:hunter2",
            "--key-pass",
            "pass:hunter3",
            "--out",
            "app.apk",
        ]);
        let redacted = redact_args(&args);
        assert_eq!(
            redacted,
            strings(&[
                "sign",
                "--ks",
                "release.jks",
                "--ks-pass",
                "pass:***",
                "--key-pass",
                "pass:***",
                "--out",
                "app.apk",
            ])
        );
        // The original arguments are untouched.
        assert_eq!(args[4], "pass:hunter2");
    }

    #[test]
    fn test_redacts_keytool_passwords() {
        let redacted = redact_args(&strings(&[
            "-genkey",
            "-storepass",
            "hunter2",
            "-keypass",
            "hunter3",
            "-alias",
            "key0",
        ]));
        assert_eq!(
            redacted,
            strings(&["-genkey", "-storepass", "***", "-keypass", "***", "-alias", "key0"])
        );
    }

    #[test]
    fn test_redacts_bare_pass_prefix() {
        assert_eq!(redact_args(&strings(&["pass:abc"])), strings(&["pass:***"]));
        assert_eq!(redact_args(&strings(&["passport"])), strings(&["passport"]));
    }

    #[test]
    fn test_display_redacted_line() {
        let invocation = Invocation::new("apksigner", "APK signing")
            .args(["sign", "--ks-pass", "pass:secret"]);
        assert_eq!(
            invocation.display_redacted(),
            "apksigner sign --ks-pass pass:***"
        );
        assert_eq!(invocation.args_lossy()[2], "pass:secret");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_success_and_exit_code() {
        let ok = Invocation::new("sh", "shell success").args(["-c", "echo hello; echo oops >&2"]);
        assert!(SystemRunner.run(&ok).await.is_ok());

        let failing = Invocation::new("sh", "shell failure").args(["-c", "exit 3"]);
        match SystemRunner.run(&failing).await {
            Err(Error::ProcessExit { code, stage, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stage, "shell failure");
            }
            other => panic!("expected process exit error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_system_runner_reports_spawn_failure() {
        let missing = Invocation::new("definitely-not-a-real-tool-4f2a", "missing tool");
        match SystemRunner.run(&missing).await {
            Err(Error::CommandFailed { command, .. }) => {
                assert_eq!(command, "definitely-not-a-real-tool-4f2a")
            }
            other => panic!("expected spawn failure, got {other:?}"),
        }
    }
}
