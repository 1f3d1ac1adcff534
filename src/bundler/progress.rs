//! Progress reporting for a build run.
//!
//! Events are delivered synchronously, in execution order, on the task that
//! drives the pipeline. Every run ends with exactly one terminal event
//! ([`BuildStage::Completed`] or [`BuildStage::Error`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

/// Coarse status a UI binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStage {
    /// Nothing has happened yet.
    NotStarted,
    /// Inputs and tools are being checked.
    Initializing,
    /// Work is in progress.
    Running,
    /// Something was degraded; the run continues.
    Warning,
    /// Terminal failure.
    Error,
    /// Terminal success.
    Completed,
}

impl BuildStage {
    /// Whether this stage ends a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, BuildStage::Error | BuildStage::Completed)
    }

    /// Whether a run in this stage is still in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, BuildStage::Initializing | BuildStage::Running)
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStage::NotStarted => "NOT_STARTED",
            BuildStage::Initializing => "INITIALIZING",
            BuildStage::Running => "RUNNING",
            BuildStage::Warning => "WARNING",
            BuildStage::Error => "ERROR",
            BuildStage::Completed => "COMPLETED",
        };
        f.write_str(name)
    }
}

/// Steps of the pipeline state machine, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStep {
    /// Run accepted.
    Init,
    /// App name, package, version checks.
    ValidateProject,
    /// Signing credentials check.
    ValidateKeystore,
    /// Tool resolution.
    LocateTools,
    /// Removal of previous output.
    CleanWorkdir,
    /// Template APK to editable tree.
    Decompile,
    /// Literal text substitution.
    PatchIdentity,
    /// Package directory move.
    RelocatePackage,
    /// Engine, game and icon copy.
    InjectContent,
    /// Tree back to an APK.
    Recompile,
    /// Zip alignment.
    Align,
    /// APK signing.
    Sign,
    /// Done.
    Completed,
}

impl PipelineStep {
    /// Every step, in order.
    pub const ALL: [PipelineStep; 13] = [
        PipelineStep::Init,
        PipelineStep::ValidateProject,
        PipelineStep::ValidateKeystore,
        PipelineStep::LocateTools,
        PipelineStep::CleanWorkdir,
        PipelineStep::Decompile,
        PipelineStep::PatchIdentity,
        PipelineStep::RelocatePackage,
        PipelineStep::InjectContent,
        PipelineStep::Recompile,
        PipelineStep::Align,
        PipelineStep::Sign,
        PipelineStep::Completed,
    ];

    /// Progress reported when this step starts.
    pub fn percentage(self) -> u8 {
        match self {
            PipelineStep::Init => 0,
            PipelineStep::ValidateProject => 5,
            PipelineStep::ValidateKeystore => 8,
            PipelineStep::LocateTools => 10,
            PipelineStep::CleanWorkdir => 15,
            PipelineStep::Decompile => 20,
            PipelineStep::PatchIdentity => 40,
            PipelineStep::RelocatePackage => 50,
            PipelineStep::InjectContent => 60,
            PipelineStep::Recompile => 70,
            PipelineStep::Align => 85,
            PipelineStep::Sign => 92,
            PipelineStep::Completed => 100,
        }
    }

    /// Stage a UI shows while this step runs.
    pub fn stage(self) -> BuildStage {
        match self {
            PipelineStep::Init
            | PipelineStep::ValidateProject
            | PipelineStep::ValidateKeystore
            | PipelineStep::LocateTools => BuildStage::Initializing,
            PipelineStep::Completed => BuildStage::Completed,
            _ => BuildStage::Running,
        }
    }

    /// Human readable description of the step.
    pub fn description(self) -> &'static str {
        match self {
            PipelineStep::Init => "Starting build",
            PipelineStep::ValidateProject => "Validating project information",
            PipelineStep::ValidateKeystore => "Checking signing configuration",
            PipelineStep::LocateTools => "Locating build tools",
            PipelineStep::CleanWorkdir => "Cleaning previous build output",
            PipelineStep::Decompile => "Decompiling template APK",
            PipelineStep::PatchIdentity => "Applying app name, package and version",
            PipelineStep::RelocatePackage => "Moving package sources",
            PipelineStep::InjectContent => "Copying engine and game content",
            PipelineStep::Recompile => "Building APK",
            PipelineStep::Align => "Aligning APK",
            PipelineStep::Sign => "Signing APK",
            PipelineStep::Completed => "Build successful",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Human readable message.
    pub message: String,
    /// Status for UI binding.
    pub stage: BuildStage,
    /// Overall completion, 0 to 100.
    pub percentage: u8,
}

impl ProgressEvent {
    /// Creates an event, clamping `percentage` to 100.
    pub fn new(stage: BuildStage, percentage: u8, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stage,
            percentage: percentage.min(100),
        }
    }

    /// Start-of-step event for `step`.
    pub fn step(step: PipelineStep) -> Self {
        Self::new(step.stage(), step.percentage(), step.description())
    }

    /// One line JSON rendering for machine consumers.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Receives progress events.
///
/// Implemented for closures taking `&ProgressEvent` and for unbounded tokio
/// channel senders. A slow listener stalls the pipeline.
pub trait ProgressListener: Send + Sync {
    /// Called once per event, in pipeline order.
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressListener for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

impl ProgressListener for UnboundedSender<ProgressEvent> {
    fn on_progress(&self, event: &ProgressEvent) {
        // A dropped receiver only means nobody is watching.
        if self.send(event.clone()).is_err() {
            log::trace!("progress receiver dropped; discarding {}", event.stage);
        }
    }
}

/// Listener that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl ProgressListener for NoopListener {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_percentages_increase_monotonically() {
        let percentages: Vec<u8> = PipelineStep::ALL.iter().map(|s| s.percentage()).collect();
        assert!(percentages.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(percentages.first(), Some(&0));
        assert_eq!(percentages.last(), Some(&100));
    }

    #[test]
    fn test_event_json_shape() {
        let event = ProgressEvent::step(PipelineStep::Decompile);
        let json = event.to_json_line().expect("serialize");
        assert_eq!(
            json,
            r#"{"message":"Decompiling template APK","stage":"RUNNING","percentage":20}"#
        );

        let parsed: ProgressEvent =
            serde_json::from_str(r#"{"message":"x","stage":"NOT_STARTED","percentage":0}"#)
                .expect("deserialize");
        assert_eq!(parsed.stage, BuildStage::NotStarted);
    }

    #[test]
    fn test_closure_listener_receives_events_in_order() {
        let seen = Mutex::new(Vec::new());
        let listener = |event: &ProgressEvent| {
            if let Ok(mut seen) = seen.lock() {
                seen.push(event.percentage);
            }
        };
        listener.on_progress(&ProgressEvent::step(PipelineStep::Init));
        listener.on_progress(&ProgressEvent::step(PipelineStep::Completed));
        assert_eq!(*seen.lock().expect("lock"), vec![0, 100]);
    }

    #[tokio::test]
    async fn test_channel_listener_forwards_and_tolerates_closed_receiver() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.on_progress(&ProgressEvent::new(BuildStage::Warning, 8, "unsigned"));
        let event = rx.recv().await.expect("event");
        assert_eq!(event.stage, BuildStage::Warning);

        drop(rx);
        tx.on_progress(&ProgressEvent::step(PipelineStep::Completed));
    }

    #[test]
    fn test_stage_classification() {
        assert!(BuildStage::Error.is_terminal());
        assert!(BuildStage::Completed.is_terminal());
        assert!(!BuildStage::Warning.is_terminal());
        assert!(BuildStage::Running.is_busy());
        assert_eq!(PipelineStep::LocateTools.stage(), BuildStage::Initializing);
        assert_eq!(PipelineStep::Sign.stage(), BuildStage::Running);
    }
}
