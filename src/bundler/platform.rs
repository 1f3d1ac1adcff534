//! Host platform detection and the bundled-tools layout for each OS.
//!
//! The bundled tools directory mirrors what the desktop distribution ships:
//!
//! | Tool      | Windows                        | macOS                                   | Linux                |
//! |-----------|--------------------------------|-----------------------------------------|----------------------|
//! | java      | `jdk-21/bin/java.exe`          | `jdk-21/Contents/Home/bin/java`         | `jdk-21/bin/java`    |
//! | keytool   | `jdk-21/bin/keytool.exe`       | `jdk-21/Contents/Home/bin/keytool`      | `jdk-21/bin/keytool` |
//! | zipalign  | `build-tools/zipalign.exe`     | `build-tools/zipalign`                  | `build-tools/zipalign` |
//! | apksigner | `build-tools/lib/apksigner.jar` (all platforms, run through java)                |
//!
//! Paths are computed as plain values; nothing here touches the filesystem.

use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Bundled JDK directory name.
const JDK_DIR: &str = "jdk-21";

/// Operating systems with a known bundled-tools layout.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HostPlatform {
    /// Microsoft Windows
    Windows,
    /// Apple macOS
    MacOs,
    /// Linux and other Unix-likes
    Linux,
}

impl HostPlatform {
    /// Platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            HostPlatform::Windows
        } else if cfg!(target_os = "macos") {
            HostPlatform::MacOs
        } else {
            HostPlatform::Linux
        }
    }

    /// Short lowercase name used in logs.
    pub fn short_name(&self) -> &'static str {
        match self {
            HostPlatform::Windows => "windows",
            HostPlatform::MacOs => "macos",
            HostPlatform::Linux => "linux",
        }
    }

    /// Appends the executable suffix for this platform.
    pub fn executable_name(&self, name: &str) -> String {
        match self {
            HostPlatform::Windows => format!("{name}.exe"),
            _ => name.to_string(),
        }
    }

    /// `bin` directory of the bundled JDK.
    pub fn jdk_bin_dir(&self, lib_dir: &Path) -> PathBuf {
        let jdk = lib_dir.join(JDK_DIR);
        match self {
            HostPlatform::MacOs => jdk.join("Contents").join("Home").join("bin"),
            _ => jdk.join("bin"),
        }
    }

    /// Ordered fallback locations for the Java runtime.
    pub fn java_candidates(&self, lib_dir: &Path) -> Vec<PathBuf> {
        vec![self.jdk_bin_dir(lib_dir).join(self.executable_name("java"))]
    }

    /// Ordered fallback locations for the credential tool.
    pub fn keytool_candidates(&self, lib_dir: &Path) -> Vec<PathBuf> {
        vec![self.jdk_bin_dir(lib_dir).join(self.executable_name("keytool"))]
    }

    /// Ordered fallback locations for the aligner.
    pub fn zipalign_candidates(&self, lib_dir: &Path) -> Vec<PathBuf> {
        vec![lib_dir.join("build-tools").join(self.executable_name("zipalign"))]
    }

    /// Ordered fallback locations for the signer archive.
    pub fn apksigner_jar_candidates(&self, lib_dir: &Path) -> Vec<PathBuf> {
        vec![lib_dir.join("build-tools").join("lib").join("apksigner.jar")]
    }

    /// File name of the signer launcher inside an Android SDK build-tools directory.
    pub fn sdk_apksigner_name(&self) -> &'static str {
        match self {
            HostPlatform::Windows => "apksigner.bat",
            _ => "apksigner",
        }
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_layout_per_platform() {
        let lib = Path::new("/lib");
        assert_eq!(
            HostPlatform::Windows.java_candidates(lib),
            vec![PathBuf::from("/lib/jdk-21/bin/java.exe")]
        );
        assert_eq!(
            HostPlatform::MacOs.java_candidates(lib),
            vec![PathBuf::from("/lib/jdk-21/Contents/Home/bin/java")]
        );
        assert_eq!(
            HostPlatform::Linux.keytool_candidates(lib),
            vec![PathBuf::from("/lib/jdk-21/bin/keytool")]
        );
    }

    #[test]
    fn test_build_tools_layout() {
        let lib = Path::new("/lib");
        assert_eq!(
            HostPlatform::Windows.zipalign_candidates(lib),
            vec![PathBuf::from("/lib/build-tools/zipalign.exe")]
        );
        assert_eq!(
            HostPlatform::Linux.apksigner_jar_candidates(lib),
            vec![PathBuf::from("/lib/build-tools/lib/apksigner.jar")]
        );
    }
}
