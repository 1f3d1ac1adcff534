//! Build command implementation.
//!
//! Reads the project store, assembles settings and runs the pipeline once.

mod report;

use crate::bundler::{ApkBuilder, ProgressEvent, SettingsBuilder};
use crate::cli::{Args, RuntimeConfig};
use crate::error::{ProjectError, Result};
use crate::metadata::{read_keystore, read_project_info};
use path_absolutize::Absolutize;

pub(super) use report::{BuildReport, print_json};
use report::{print_summary, show_event};

/// Execute the build
pub(super) async fn execute_build(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let project_dir = args.project.absolutize()?.into_owned();
    if !project_dir.is_dir() {
        return Err(ProjectError::NotFound { path: project_dir }.into());
    }
    log::debug!("Project directory: {}", project_dir.display());

    let project = read_project_info(&project_dir)?;
    let keystore = read_keystore(&project_dir)?;

    let mut builder = SettingsBuilder::new().project_dir(&project_dir);
    if let Some(dir) = &args.lib_dir {
        builder = builder.lib_dir(dir.absolutize()?);
    }
    if let Some(dir) = &args.engine_dir {
        builder = builder.engine_dir(dir.absolutize()?);
    }
    if let Some(dir) = &args.output_dir {
        builder = builder.output_dir(dir.absolutize()?);
    }
    let settings = builder.build()?;

    if !config.is_json() {
        let _ = config.output().info(&format!(
            "Packaging {} ({}) for Android",
            project.app_name, project.package_name
        ));
    }

    let listener = |event: &ProgressEvent| show_event(config, event);
    let result = ApkBuilder::new(settings)
        .create_keystore(args.create_keystore)
        .build(&project, keystore, &listener)
        .await;

    print_summary(config, &result);
    Ok(if result.success { 0 } else { 1 })
}
