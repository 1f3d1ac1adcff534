//! Invocations of APKEditor, the decompiler/recompiler run on the JVM.

use crate::bundler::utils::process::Invocation;
use std::path::Path;

/// File name of the APKEditor archive in the tools directory.
pub const APKEDITOR_JAR: &str = "APKEditor.jar";

/// File name of the template APK in the tools directory.
pub const TEMPLATE_APK: &str = "webgal-template.apk";

/// `java -jar APKEditor.jar d -i <template> -o <work_dir>`
pub fn decompile_invocation(
    java: &Path,
    apkeditor: &Path,
    template: &Path,
    work_dir: &Path,
) -> Invocation {
    Invocation::new(java, "APK decompilation")
        .arg("-jar")
        .arg(apkeditor)
        .args(["d", "-i"])
        .arg(template)
        .arg("-o")
        .arg(work_dir)
}

/// `java -jar APKEditor.jar b -i <work_dir> -o <unsigned_apk>`
pub fn recompile_invocation(
    java: &Path,
    apkeditor: &Path,
    work_dir: &Path,
    unsigned_apk: &Path,
) -> Invocation {
    Invocation::new(java, "Build APK")
        .arg("-jar")
        .arg(apkeditor)
        .args(["b", "-i"])
        .arg(work_dir)
        .arg("-o")
        .arg(unsigned_apk)
}
