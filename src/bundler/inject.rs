//! Places the web engine, the project's game content and its launcher icons
//! into the decompiled tree.

use crate::bundler::{
    error::{Context, Result},
    utils::fs::{copy_dir, exists, remove_path},
};
use std::path::{Path, PathBuf};

/// Members of the engine template that must not ship in the APK.
pub const STALE_ENGINE_MEMBERS: &[&str] = &["game", "webgal-serviceworker.js", "icons"];

/// Marker file whose presence means the project has a full Android icon set.
pub const ICON_MARKER: &str = "ic_launcher-playstore.png";

/// Engine location inside the decompiled tree.
pub fn engine_dest(work_dir: &Path) -> PathBuf {
    work_dir.join("root").join("assets").join("webgal")
}

/// Resource directory of the decompiled tree.
pub fn resources_dest(work_dir: &Path) -> PathBuf {
    work_dir
        .join("resources")
        .join("package_1")
        .join("res")
}

/// What [`inject_content`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectionReport {
    /// Files copied from the engine template.
    pub engine_files: usize,
    /// Files copied from the game directory.
    pub game_files: usize,
    /// Icon files copied, `None` when the icon step was skipped.
    pub icon_files: Option<usize>,
}

/// Copies the engine template and the game content into `work_dir`.
///
/// The engine is copied first, then its stale members are removed, then the
/// project's `game` directory fills the vacated slot. Icons are copied into
/// the resource tree only when `icons_dir` holds [`ICON_MARKER`].
pub async fn inject_content(
    work_dir: &Path,
    engine_dir: &Path,
    game_dir: &Path,
    icons_dir: &Path,
) -> Result<InjectionReport> {
    let engine_dest = engine_dest(work_dir);

    log::info!(
        "Copying engine from {} to {}",
        engine_dir.display(),
        engine_dest.display()
    );
    let engine_files = copy_dir(engine_dir, &engine_dest)
        .await
        .context("copying engine template")?;

    for member in STALE_ENGINE_MEMBERS {
        remove_path(&engine_dest.join(member)).await?;
    }

    let game_dest = engine_dest.join("game");
    log::info!(
        "Copying game resources from {} to {}",
        game_dir.display(),
        game_dest.display()
    );
    let game_files = copy_dir(game_dir, &game_dest)
        .await
        .context("copying game content")?;

    let icon_files = if exists(&icons_dir.join(ICON_MARKER)).await {
        let res_dest = resources_dest(work_dir);
        log::info!(
            "Copying icons from {} to {}",
            icons_dir.display(),
            res_dest.display()
        );
        Some(
            copy_dir(icons_dir, &res_dest)
                .await
                .context("copying launcher icons")?,
        )
    } else {
        log::info!("Skip copying icons");
        None
    };

    Ok(InjectionReport {
        engine_files,
        game_files,
        icon_files,
    })
}
