//! Identity patching of the decompiled template.
//!
//! The template APK is built with fixed sentinel values (package
//! `com.openwebgal.demo`, display name `WebGAL`, version `1.0` / `1`). After
//! decompilation those literals appear in the manifest, resource XML, JSON
//! metadata and smali sources. This module rewrites them to the project's
//! identity and then moves the smali package directory so that its path
//! mirrors the new package name.
//!
//! # Ordering
//!
//! Substitutions run in a fixed order: dotted package, slash package path,
//! `app_name` element, `versionCode`, `versionName`. A later pass never
//! re-matches text written by an earlier one because each pass targets a
//! distinct literal.
//!
//! # Scope
//!
//! Only files with an allow-listed extension are touched, and a file is
//! rewritten only if it contains the exact old value. Files that are not
//! valid UTF-8 are skipped.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    settings::ProjectInfo,
    utils::fs::{first_existing, move_dir_merge, prune_empty_dirs},
};
use std::path::{Path, PathBuf};

/// Package identifier the template is built with.
pub const TEMPLATE_PACKAGE: &str = "com.openwebgal.demo";

/// Display-name element of the template's string resources.
pub const TEMPLATE_APP_NAME_ELEMENT: &str = r#"<string name="app_name">WebGAL</string>"#;

/// Version code attribute of the template manifest.
pub const TEMPLATE_VERSION_CODE_ATTR: &str = r#"android:versionCode="1""#;

/// Version name attribute of the template manifest.
pub const TEMPLATE_VERSION_NAME_ATTR: &str = r#"android:versionName="1.0""#;

/// Extensions of text-bearing files in a decompiled tree.
pub const PATCHABLE_EXTENSIONS: &[&str] = &["xml", "json", "smali"];

/// Highest numbered smali container probed for the package directory.
const MAX_SMALI_CONTAINER: u32 = 10;

/// Converts a dotted package name to its slash-path form.
pub fn package_path(package_name: &str) -> String {
    package_name.replace('.', "/")
}

/// Relative directory mirroring `package_name`, one segment per dot.
fn package_rel_dir(package_name: &str) -> PathBuf {
    package_name.split('.').collect()
}

/// Escapes a display name for use inside an Android `<string>` element.
pub fn escape_android_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escapes a value for use inside a double-quoted XML attribute.
pub fn escape_xml_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// One literal substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    /// Exact text to find.
    pub from: String,
    /// Replacement text.
    pub to: String,
}

/// The ordered set of substitutions that turns the template into a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPatch {
    substitutions: Vec<Substitution>,
}

impl IdentityPatch {
    /// Builds the substitutions for `project`, in application order.
    pub fn for_project(project: &ProjectInfo) -> Self {
        let pairs = [
            (TEMPLATE_PACKAGE.to_string(), project.package_name.clone()),
            (
                package_path(TEMPLATE_PACKAGE),
                package_path(&project.package_name),
            ),
            (
                TEMPLATE_APP_NAME_ELEMENT.to_string(),
                format!(
                    r#"<string name="app_name">{}</string>"#,
                    escape_android_string(&project.app_name)
                ),
            ),
            (
                TEMPLATE_VERSION_CODE_ATTR.to_string(),
                format!(r#"android:versionCode="{}""#, project.version_code),
            ),
            (
                TEMPLATE_VERSION_NAME_ATTR.to_string(),
                format!(
                    r#"android:versionName="{}""#,
                    escape_xml_attribute(&project.version_name)
                ),
            ),
        ];

        Self {
            substitutions: pairs
                .into_iter()
                .map(|(from, to)| Substitution { from, to })
                .collect(),
        }
    }

    /// Substitutions in the order they are applied.
    pub fn substitutions(&self) -> &[Substitution] {
        &self.substitutions
    }

    /// Applies every substitution under `root`.
    ///
    /// Returns the number of file rewrites per substitution.
    pub async fn apply(&self, root: &Path) -> Result<Vec<usize>> {
        let mut counts = Vec::with_capacity(self.substitutions.len());
        for sub in &self.substitutions {
            if sub.from == sub.to {
                counts.push(0);
                continue;
            }
            let rewritten = replace_text_in_folder(root, &sub.from, &sub.to).await?;
            log::debug!("Replaced '{}' in {} files", sub.from, rewritten);
            counts.push(rewritten);
        }
        Ok(counts)
    }
}

/// Replaces every occurrence of `from` with `to` in the allow-listed files
/// below `root`.
///
/// Walks depth-first in a stable order. Returns the number of files written.
pub async fn replace_text_in_folder(root: &Path, from: &str, to: &str) -> Result<usize> {
    let root = root.to_path_buf();
    let from = from.to_string();
    let to = to.to_string();
    tokio::task::spawn_blocking(move || replace_text_blocking(&root, &from, &to)).await?
}

fn is_patchable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            PATCHABLE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

fn replace_text_blocking(root: &Path, from: &str, to: &str) -> Result<usize> {
    let mut rewritten = 0;

    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_patchable(entry.path()) {
            continue;
        }

        let path = entry.path();
        let bytes = std::fs::read(path).fs_context("reading file", path)?;
        let Ok(contents) = String::from_utf8(bytes) else {
            log::debug!("Skipping non UTF-8 file {}", path.display());
            continue;
        };

        if !contents.contains(from) {
            continue;
        }

        std::fs::write(path, contents.replace(from, to)).fs_context("writing file", path)?;
        rewritten += 1;
    }

    Ok(rewritten)
}

/// Candidate locations of the template package directory, in search order.
///
/// The decompiler may split bytecode across `smali/classes`,
/// `smali/classes2`, and so on.
pub fn package_dir_candidates(work_dir: &Path, package_name: &str) -> Vec<PathBuf> {
    let rel = package_rel_dir(package_name);
    smali_containers(work_dir)
        .into_iter()
        .map(|container| container.join(&rel))
        .collect()
}

fn smali_containers(work_dir: &Path) -> Vec<PathBuf> {
    let smali = work_dir.join("smali");
    std::iter::once(smali.join("classes"))
        .chain((2..=MAX_SMALI_CONTAINER).map(|n| smali.join(format!("classes{n}"))))
        .collect()
}

/// Outcome of [`relocate_package`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    /// The package directory was moved.
    Moved {
        /// Old location.
        from: PathBuf,
        /// New location.
        to: PathBuf,
        /// Empty directories removed after the move.
        pruned: Vec<PathBuf>,
    },
    /// The tree already matched the target layout.
    AlreadyInPlace(PathBuf),
}

/// Moves the template package directory so that it mirrors `package_name`.
///
/// The first existing candidate from [`package_dir_candidates`] is moved into
/// the same smali container. Running this on a tree that already has the
/// target layout is a no-op. If neither layout is found the template and the
/// decompiler disagree, reported as [`Error::StructuralMismatch`].
pub async fn relocate_package(work_dir: &Path, package_name: &str) -> Result<Relocation> {
    let work_dir = work_dir.to_path_buf();
    let package_name = package_name.to_string();
    tokio::task::spawn_blocking(move || relocate_blocking(&work_dir, &package_name)).await?
}

fn relocate_blocking(work_dir: &Path, package_name: &str) -> Result<Relocation> {
    let old_rel = package_rel_dir(TEMPLATE_PACKAGE);
    let new_rel = package_rel_dir(package_name);
    let candidates = package_dir_candidates(work_dir, TEMPLATE_PACKAGE);

    let Some(source) = first_existing(&candidates) else {
        if let Some(existing) = first_existing(package_dir_candidates(work_dir, package_name)) {
            log::info!("Package directory already at {}", existing.display());
            return Ok(Relocation::AlreadyInPlace(existing));
        }
        return Err(Error::StructuralMismatch {
            searched: candidates,
        });
    };
    log::info!("Found package directory at: {}", source.display());

    let container = source
        .ancestors()
        .nth(old_rel.components().count())
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::StructuralMismatch {
            searched: vec![source.clone()],
        })?;
    let target = container.join(&new_rel);

    if target == source {
        return Ok(Relocation::AlreadyInPlace(target));
    }

    // Park the sources outside the package tree first so the target may be an
    // ancestor or a descendant of the source.
    let staging = container.join(".relocating");
    if staging.exists() {
        std::fs::remove_dir_all(&staging).fs_context("removing directory", &staging)?;
    }
    std::fs::rename(&source, &staging).fs_context("moving package directory", &source)?;

    let pruned = match source.parent() {
        Some(parent) => prune_empty_dirs(parent, &container)?,
        None => Vec::new(),
    };

    log::info!(
        "Moving files from {} to {}",
        source.display(),
        target.display()
    );
    move_dir_merge(&staging, &target)?;

    Ok(Relocation::Moved {
        from: source,
        to: target,
        pruned,
    })
}
