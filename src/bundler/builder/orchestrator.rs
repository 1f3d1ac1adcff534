//! The repackaging state machine.
//!
//! [`ApkBuilder::build`] walks the steps of [`PipelineStep`] strictly in
//! order. Every step announces itself to the progress listener before it
//! runs; the first failure is turned into an ERROR event and a failed
//! [`BuildResult`], and nothing after it executes.
//!
//! Degradations that still yield an installable APK (no keystore, no signer,
//! keystore generation failing) produce a WARNING event and the run carries
//! on unsigned. A missing aligner is skipped silently.

use crate::bundler::{
    BuildResult,
    apkeditor::{decompile_invocation, recompile_invocation},
    builder::{
        checksum::calculate_sha256,
        signing::{align_invocation, create_keystore, sign_invocation},
        tool_detection::{CoreTools, ExecutableProbe, SystemProbe, ToolLocator, ToolSet},
    },
    error::{Error, ErrorExt, Result},
    inject::inject_content,
    patch::{IdentityPatch, Relocation, relocate_package},
    progress::{BuildStage, PipelineStep, ProgressEvent, ProgressListener},
    settings::{ArtifactPaths, BuildSettings, Keystore, ProjectInfo},
    utils::{
        fs::{exists, remove_dir_all, remove_file},
        process::{CommandRunner, SystemRunner},
    },
};
use std::path::PathBuf;

/// Everything one run works with. Built at the start of a run and dropped at
/// its end.
#[derive(Debug)]
struct BuildContext<'a> {
    project: &'a ProjectInfo,
    keystore: Option<Keystore>,
    tools: ToolSet,
    core: CoreTools,
    paths: ArtifactPaths,
}

/// Successful end state of the stages.
struct Outcome {
    output_path: PathBuf,
    signed: bool,
}

/// Tracks the current step and forwards events to the listener.
struct Reporter<'a, L: ?Sized> {
    listener: &'a L,
    step: PipelineStep,
}

impl<'a, L: ProgressListener + ?Sized> Reporter<'a, L> {
    fn new(listener: &'a L) -> Self {
        Self {
            listener,
            step: PipelineStep::Init,
        }
    }

    fn enter(&mut self, step: PipelineStep) {
        self.step = step;
        log::info!("[{:>3}%] {}", step.percentage(), step);
        self.listener.on_progress(&ProgressEvent::step(step));
    }

    fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.listener.on_progress(&ProgressEvent::new(
            BuildStage::Warning,
            self.step.percentage(),
            message,
        ));
    }

    fn fail(&self, message: &str) {
        self.listener.on_progress(&ProgressEvent::new(
            BuildStage::Error,
            self.step.percentage(),
            message,
        ));
    }
}

/// Builds an APK for a WebGAL project from the template APK.
///
/// # Examples
///
/// ```no_run
/// use webgal_apk_builder::bundler::{ApkBuilder, ProgressEvent, ProjectInfo, SettingsBuilder};
///
/// # async fn example() -> webgal_apk_builder::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .project_dir("/srv/terre/public/games/demo")
///     .build()?;
/// let project = ProjectInfo {
///     app_name: "Demo".into(),
///     package_name: "com.example.demo".into(),
///     version_name: "1.0".into(),
///     version_code: 1,
/// };
///
/// let result = ApkBuilder::new(settings)
///     .build(&project, None, &|event: &ProgressEvent| println!("{}%", event.percentage))
///     .await;
/// assert!(result.success);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ApkBuilder<R = SystemRunner, P = SystemProbe> {
    settings: BuildSettings,
    runner: R,
    locator: ToolLocator<P>,
    create_keystore: bool,
}

impl ApkBuilder {
    /// Builder that runs real processes and probes the real system.
    pub fn new(settings: BuildSettings) -> Self {
        let locator = ToolLocator::new(&settings);
        Self::with_parts(settings, SystemRunner, locator)
    }
}

impl<R: CommandRunner, P: ExecutableProbe + Clone + 'static> ApkBuilder<R, P> {
    /// Builder with a custom process runner and tool locator.
    pub fn with_parts(settings: BuildSettings, runner: R, locator: ToolLocator<P>) -> Self {
        Self {
            settings,
            runner,
            locator,
            create_keystore: false,
        }
    }

    /// Generate the keystore file with keytool when it does not exist yet.
    pub fn create_keystore(mut self, enabled: bool) -> Self {
        self.create_keystore = enabled;
        self
    }

    /// The run configuration.
    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Runs the whole pipeline once.
    ///
    /// Never panics and never returns early without a terminal event: the
    /// listener always sees exactly one COMPLETED or ERROR event last.
    pub async fn build<L>(
        &self,
        project: &ProjectInfo,
        keystore: Option<Keystore>,
        listener: &L,
    ) -> BuildResult
    where
        L: ProgressListener + ?Sized,
    {
        let mut reporter = Reporter::new(listener);
        reporter.enter(PipelineStep::Init);

        match self.run_stages(project, keystore, &mut reporter).await {
            Ok(outcome) => {
                let checksum = match calculate_sha256(&outcome.output_path).await {
                    Ok(checksum) => Some(checksum),
                    Err(e) => {
                        log::warn!("Could not checksum {}: {}", outcome.output_path.display(), e);
                        None
                    }
                };
                reporter.enter(PipelineStep::Completed);
                log::info!("APK written to {}", outcome.output_path.display());
                BuildResult {
                    success: true,
                    message: PipelineStep::Completed.description().to_string(),
                    output_path: Some(outcome.output_path),
                    error: None,
                    step: PipelineStep::Completed,
                    signed: outcome.signed,
                    checksum,
                }
            }
            Err(error) => {
                let step = reporter.step;
                let message = failure_message(step, &error);
                log::error!("{}: {}", message, error);
                reporter.fail(&message);
                BuildResult {
                    success: false,
                    message,
                    output_path: None,
                    error: Some(error),
                    step,
                    signed: false,
                    checksum: None,
                }
            }
        }
    }

    async fn run_stages<L>(
        &self,
        project: &ProjectInfo,
        keystore: Option<Keystore>,
        reporter: &mut Reporter<'_, L>,
    ) -> Result<Outcome>
    where
        L: ProgressListener + ?Sized,
    {
        reporter.enter(PipelineStep::ValidateProject);
        project.validate()?;
        log::info!("App name: {}", project.app_name);
        log::info!("Package name: {}", project.package_name);
        log::info!("Version: {} ({})", project.version_name, project.version_code);
        log::info!("Output directory: {}", self.settings.output_dir().display());

        reporter.enter(PipelineStep::ValidateKeystore);
        let (mut keystore, pending_creation) = self.check_keystore(keystore, reporter).await;

        reporter.enter(PipelineStep::LocateTools);
        let locator = self.locator.clone();
        let tools = tokio::task::spawn_blocking(move || locator.locate_all()).await?;
        let core = tools.require_core()?;

        if pending_creation {
            keystore = self.generate_keystore(keystore, &tools, reporter).await;
        }
        if keystore.is_some() && tools.signer.is_none() {
            reporter.warn("apksigner not found; the APK will not be signed");
            keystore = None;
        }

        let ctx = BuildContext {
            project,
            keystore,
            paths: ArtifactPaths::new(self.settings.output_dir(), project),
            tools,
            core,
        };

        reporter.enter(PipelineStep::CleanWorkdir);
        self.clean(&ctx).await?;

        reporter.enter(PipelineStep::Decompile);
        self.runner
            .run(&decompile_invocation(
                &ctx.core.java,
                &ctx.core.apkeditor,
                &ctx.core.template,
                &ctx.paths.work_dir,
            ))
            .await?;

        reporter.enter(PipelineStep::PatchIdentity);
        IdentityPatch::for_project(ctx.project)
            .apply(&ctx.paths.work_dir)
            .await?;
        log::info!("Replacement completed");

        reporter.enter(PipelineStep::RelocatePackage);
        match relocate_package(&ctx.paths.work_dir, &ctx.project.package_name).await? {
            Relocation::Moved { to, .. } => log::info!("Package sources now at {}", to.display()),
            Relocation::AlreadyInPlace(path) => {
                log::info!("Package sources already at {}", path.display())
            }
        }

        reporter.enter(PipelineStep::InjectContent);
        let report = inject_content(
            &ctx.paths.work_dir,
            self.settings.engine_dir(),
            &self.settings.game_dir(),
            &self.settings.icons_dir(),
        )
        .await?;
        log::debug!("Injected content: {:?}", report);

        reporter.enter(PipelineStep::Recompile);
        self.runner
            .run(&recompile_invocation(
                &ctx.core.java,
                &ctx.core.apkeditor,
                &ctx.paths.work_dir,
                &ctx.paths.unsigned_apk,
            ))
            .await?;

        if let Some(zipalign) = &ctx.tools.zipalign {
            reporter.enter(PipelineStep::Align);
            self.runner
                .run(&align_invocation(
                    zipalign,
                    &ctx.paths.unsigned_apk,
                    &ctx.paths.aligned_apk,
                ))
                .await?;
            remove_file(&ctx.paths.unsigned_apk).await?;
            tokio::fs::rename(&ctx.paths.aligned_apk, &ctx.paths.unsigned_apk)
                .await
                .fs_context("replacing unsigned APK", &ctx.paths.aligned_apk)?;
        } else {
            log::info!("zipalign not available; skipping alignment");
        }

        match (&ctx.tools.signer, &ctx.keystore) {
            (Some(signer), Some(keystore)) => {
                reporter.enter(PipelineStep::Sign);
                self.runner
                    .run(&sign_invocation(
                        signer,
                        &ctx.core.java,
                        keystore,
                        &ctx.paths.unsigned_apk,
                        &ctx.paths.signed_apk,
                    ))
                    .await?;
                remove_file(&ctx.paths.unsigned_apk).await?;
                Ok(Outcome {
                    output_path: ctx.paths.signed_apk.clone(),
                    signed: true,
                })
            }
            _ => {
                log::info!("Skipping signing");
                Ok(Outcome {
                    output_path: ctx.paths.unsigned_apk.clone(),
                    signed: false,
                })
            }
        }
    }

    /// Returns the keystore to sign with and whether it still has to be generated.
    async fn check_keystore<L>(
        &self,
        keystore: Option<Keystore>,
        reporter: &Reporter<'_, L>,
    ) -> (Option<Keystore>, bool)
    where
        L: ProgressListener + ?Sized,
    {
        let Some(keystore) = keystore else {
            reporter.warn("No keystore configured; the APK will not be signed");
            return (None, false);
        };

        let missing = keystore.missing_fields();
        if !missing.is_empty() {
            reporter.warn(format!(
                "Keystore is missing {}; the APK will not be signed",
                missing.join(", ")
            ));
            return (None, false);
        }

        if exists(&keystore.store_file).await {
            return (Some(keystore), false);
        }
        if self.create_keystore {
            return (Some(keystore), true);
        }

        reporter.warn(format!(
            "Keystore file {} not found; the APK will not be signed",
            keystore.store_file.display()
        ));
        (None, false)
    }

    async fn generate_keystore<L>(
        &self,
        keystore: Option<Keystore>,
        tools: &ToolSet,
        reporter: &Reporter<'_, L>,
    ) -> Option<Keystore>
    where
        L: ProgressListener + ?Sized,
    {
        let keystore = keystore?;
        let Some(keytool) = &tools.keytool else {
            reporter.warn("keytool not found; cannot create keystore, the APK will not be signed");
            return None;
        };

        match create_keystore(&self.runner, keytool, &keystore).await {
            Ok(_) => Some(keystore),
            Err(e) => {
                reporter.warn(format!(
                    "Keystore creation failed ({e}); the APK will not be signed"
                ));
                None
            }
        }
    }

    async fn clean(&self, ctx: &BuildContext<'_>) -> Result<()> {
        remove_dir_all(&ctx.paths.work_dir).await?;
        for stale in ctx.paths.stale_files() {
            remove_file(stale).await?;
        }
        let output_dir = self.settings.output_dir();
        tokio::fs::create_dir_all(output_dir)
            .await
            .fs_context("creating output directory", output_dir)?;
        Ok(())
    }
}

/// User-facing message for a failure during `step`.
fn failure_message(step: PipelineStep, error: &Error) -> String {
    match step {
        PipelineStep::ValidateProject | PipelineStep::LocateTools => error.to_string(),
        PipelineStep::CleanWorkdir => "Failed to clean previous build output".into(),
        PipelineStep::Decompile => "APK decompilation failed".into(),
        PipelineStep::PatchIdentity => "Error replacing assets".into(),
        PipelineStep::RelocatePackage => match error {
            Error::StructuralMismatch { .. } => {
                "Could not find package directory in decompiled APK".into()
            }
            _ => "Error moving package directory".into(),
        },
        PipelineStep::InjectContent => "Error copying game content".into(),
        PipelineStep::Recompile => "Build APK failed".into(),
        PipelineStep::Align => "APK alignment failed".into(),
        PipelineStep::Sign => "APK signing failed".into(),
        PipelineStep::Init
        | PipelineStep::ValidateKeystore
        | PipelineStep::Completed => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages_name_the_stage() {
        let exit = Error::ProcessExit {
            stage: "APK decompilation".into(),
            command: "java".into(),
            code: Some(1),
        };
        assert_eq!(
            failure_message(PipelineStep::Decompile, &exit),
            "APK decompilation failed"
        );
        let missing = Error::ToolMissing {
            tool: "APKEditor".into(),
        };
        assert_eq!(
            failure_message(PipelineStep::LocateTools, &missing),
            "APKEditor not found"
        );
        let mismatch = Error::StructuralMismatch { searched: vec![] };
        assert_eq!(
            failure_message(PipelineStep::RelocatePackage, &mismatch),
            "Could not find package directory in decompiled APK"
        );
    }
}
