//! Rendering of progress events and build results.

use crate::bundler::{BuildResult, BuildStage, PipelineStep, ProgressEvent};
use crate::cli::RuntimeConfig;
use crate::error::{AppError, bundler_suggestions};
use serde::Serialize;
use std::path::PathBuf;

/// Final line of `--progress-json` output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BuildReport {
    pub success: bool,
    pub message: String,
    pub output_path: Option<PathBuf>,
    pub signed: bool,
    pub checksum: Option<String>,
    pub step: Option<PipelineStep>,
    pub error: Option<String>,
}

impl From<&BuildResult> for BuildReport {
    fn from(result: &BuildResult) -> Self {
        Self {
            success: result.success,
            message: result.message.clone(),
            output_path: result.output_path.clone(),
            signed: result.signed,
            checksum: result.checksum.clone(),
            step: Some(result.step),
            error: result.error.as_ref().map(ToString::to_string),
        }
    }
}

impl From<&AppError> for BuildReport {
    fn from(error: &AppError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            output_path: None,
            signed: false,
            checksum: None,
            step: None,
            error: Some(error.to_string()),
        }
    }
}

/// Writes a serializable value as one JSON line on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => log::warn!("Failed to serialize output: {}", e),
    }
}

/// Shows one progress event in the configured format.
pub(crate) fn show_event(config: &RuntimeConfig, event: &ProgressEvent) {
    if config.is_json() {
        print_json(event);
        return;
    }

    let output = config.output();
    let _ = match event.stage {
        BuildStage::Warning => output.warn(&event.message),
        BuildStage::Error => {
            output.error(&format!("[{:>3}%] {}", event.percentage, event.message));
            Ok(())
        }
        BuildStage::Completed => output.success(&event.message),
        _ => output.progress(event.percentage, &event.message),
    };
}

/// Prints the outcome of a run.
pub(crate) fn print_summary(config: &RuntimeConfig, result: &BuildResult) {
    if config.is_json() {
        print_json(&BuildReport::from(result));
        return;
    }

    let output = config.output();
    if result.success {
        if let Some(path) = &result.output_path {
            let _ = output.println("");
            let _ = output.info(&format!(
                "{} APK: {}",
                if result.signed { "Signed" } else { "Unsigned" },
                path.display()
            ));
        }
        if let Some(checksum) = &result.checksum {
            let _ = output.indent(&format!("SHA-256: {checksum}"));
        }
        return;
    }

    if let Some(error) = &result.error {
        output.error(&error.to_string());
    }
    if let Some(kind) = result.error_kind() {
        let _ = output.println("\n💡 Recovery suggestions:");
        for suggestion in bundler_suggestions(kind) {
            let _ = output.indent(&format!("• {suggestion}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json_shape() {
        let result = BuildResult {
            success: true,
            message: "Build successful".into(),
            output_path: Some(PathBuf::from("out/app-signed.apk")),
            error: None,
            step: PipelineStep::Completed,
            signed: true,
            checksum: Some("ab".into()),
        };
        let json = serde_json::to_value(BuildReport::from(&result)).expect("json");
        assert_eq!(json["success"], true);
        assert_eq!(json["outputPath"], "out/app-signed.apk");
        assert_eq!(json["step"], "COMPLETED");
        assert!(json["error"].is_null());
    }
}
