//! Resolution of the external tools the pipeline drives.
//!
//! System-wide installs win: a tool found on `PATH` that can actually be
//! started is used as is. Otherwise the bundled tools directory is searched
//! using the layout in [`HostPlatform`], and for the Android build tools an
//! SDK pointed to by `ANDROID_SDK_ROOT` or `ANDROID_HOME` is tried last.
//!
//! Lookups never fail; an unresolved tool is `None` and the orchestrator
//! decides whether that is fatal.

use crate::bundler::{
    apkeditor::{APKEDITOR_JAR, TEMPLATE_APK},
    error::{Error, Result},
    platform::HostPlatform,
    settings::BuildSettings,
};
use std::{
    fmt,
    path::{Path, PathBuf},
    process::Stdio,
};

pub use crate::bundler::utils::fs::first_existing;

/// Checks whether a bare command name can be started from `PATH`.
///
/// Isolated behind a trait so tests can decide what is "installed".
pub trait ExecutableProbe: Send + Sync {
    /// Returns the resolved path if `name` is invocable.
    fn probe(&self, name: &str) -> Option<PathBuf>;
}

/// Probes the real system with `which` and a trivial spawn.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl ExecutableProbe for SystemProbe {
    fn probe(&self, name: &str) -> Option<PathBuf> {
        let path = match which::which(name) {
            Ok(path) => path,
            Err(e) => {
                log::debug!("{} not found in PATH: {}", name, e);
                return None;
            }
        };

        // Any exit status counts; only a failure to start disqualifies.
        match std::process::Command::new(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(_) => {
                log::debug!("Found {} at: {}", name, path.display());
                Some(path)
            }
            Err(e) => {
                log::warn!(
                    "{} found at {} but failed to execute: {}",
                    name,
                    path.display(),
                    e
                );
                None
            }
        }
    }
}

/// Tools the pipeline can look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// APKEditor archive, run through java.
    ApkEditor,
    /// Template APK every build starts from.
    Template,
    /// Java runtime.
    Java,
    /// Keystore generator shipped with the JDK.
    Keytool,
    /// Android zip aligner.
    Zipalign,
    /// Android APK signer.
    Apksigner,
}

impl Tool {
    /// Name used in messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Tool::ApkEditor => "APKEditor",
            Tool::Template => "WebGAL template",
            Tool::Java => "JDK",
            Tool::Keytool => "keytool",
            Tool::Zipalign => "zipalign",
            Tool::Apksigner => "apksigner",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How the APK signer is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signer {
    /// A launcher script or binary (`apksigner`, `apksigner.bat`).
    Executable(PathBuf),
    /// `apksigner.jar`, run with `java -jar`.
    Jar(PathBuf),
}

impl Signer {
    /// Path of the launcher or archive.
    pub fn path(&self) -> &Path {
        match self {
            Signer::Executable(path) | Signer::Jar(path) => path,
        }
    }
}

/// Every tool location resolved for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolSet {
    /// APKEditor archive.
    pub apkeditor: Option<PathBuf>,
    /// Template APK.
    pub template: Option<PathBuf>,
    /// Java runtime.
    pub java: Option<PathBuf>,
    /// Keystore generator.
    pub keytool: Option<PathBuf>,
    /// Zip aligner; absent means ALIGN is skipped.
    pub zipalign: Option<PathBuf>,
    /// Signer; absent means SIGN is skipped.
    pub signer: Option<Signer>,
}

/// The tools without which no APK can be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreTools {
    /// APKEditor archive.
    pub apkeditor: PathBuf,
    /// Template APK.
    pub template: PathBuf,
    /// Java runtime.
    pub java: PathBuf,
}

impl ToolSet {
    /// Returns the core tools, or names the first one missing.
    ///
    /// Checked in the order APKEditor, template, JDK.
    pub fn require_core(&self) -> Result<CoreTools> {
        let missing = |tool: Tool| Error::ToolMissing {
            tool: tool.display_name().to_string(),
        };
        Ok(CoreTools {
            apkeditor: self.apkeditor.clone().ok_or_else(|| missing(Tool::ApkEditor))?,
            template: self.template.clone().ok_or_else(|| missing(Tool::Template))?,
            java: self.java.clone().ok_or_else(|| missing(Tool::Java))?,
        })
    }
}

/// Finds tools for one build.
#[derive(Debug, Clone)]
pub struct ToolLocator<P = SystemProbe> {
    probe: P,
    platform: HostPlatform,
    lib_dir: PathBuf,
    exe_dir: PathBuf,
    sdk_root: Option<PathBuf>,
}

impl ToolLocator<SystemProbe> {
    /// Locator probing the real system, with the SDK taken from the environment.
    pub fn new(settings: &BuildSettings) -> Self {
        Self::with_probe(settings, SystemProbe).sdk_root(sdk_root_from_env())
    }
}

impl<P: ExecutableProbe> ToolLocator<P> {
    /// Locator using a custom probe and no SDK fallback.
    pub fn with_probe(settings: &BuildSettings, probe: P) -> Self {
        Self {
            probe,
            platform: settings.platform(),
            lib_dir: settings.lib_dir().to_path_buf(),
            exe_dir: settings.exe_dir().to_path_buf(),
            sdk_root: None,
        }
    }

    /// Sets the Android SDK root used as the last fallback for build tools.
    pub fn sdk_root(mut self, sdk_root: Option<PathBuf>) -> Self {
        self.sdk_root = sdk_root;
        self
    }

    /// Resolves a single tool.
    pub fn locate(&self, tool: Tool) -> Option<PathBuf> {
        let found = match tool {
            Tool::ApkEditor => first_existing(self.archive_candidates(APKEDITOR_JAR)),
            Tool::Template => first_existing(self.archive_candidates(TEMPLATE_APK)),
            Tool::Java => self
                .probe
                .probe("java")
                .or_else(|| first_existing(self.platform.java_candidates(&self.lib_dir))),
            Tool::Keytool => self
                .probe
                .probe("keytool")
                .or_else(|| first_existing(self.platform.keytool_candidates(&self.lib_dir))),
            Tool::Zipalign => self.probe.probe("zipalign").or_else(|| {
                first_existing(self.platform.zipalign_candidates(&self.lib_dir)).or_else(|| {
                    let name = self.platform.executable_name("zipalign");
                    self.sdk_build_tools()
                        .into_iter()
                        .map(|dir| dir.join(&name))
                        .find(|path| path.exists())
                })
            }),
            Tool::Apksigner => self.signer().map(|signer| signer.path().to_path_buf()),
        };

        match &found {
            Some(path) => log::debug!("{} resolved to {}", tool, path.display()),
            None => log::debug!("{} not found", tool),
        }
        found
    }

    /// Resolves the signer, keeping track of how it must be started.
    pub fn signer(&self) -> Option<Signer> {
        if let Some(path) = self.probe.probe("apksigner") {
            return Some(Signer::Executable(path));
        }
        if let Some(jar) = first_existing(self.platform.apksigner_jar_candidates(&self.lib_dir)) {
            return Some(Signer::Jar(jar));
        }

        self.sdk_build_tools().into_iter().find_map(|dir| {
            let launcher = dir.join(self.platform.sdk_apksigner_name());
            if launcher.exists() {
                return Some(Signer::Executable(launcher));
            }
            let jar = dir.join("lib").join("apksigner.jar");
            jar.exists().then_some(Signer::Jar(jar))
        })
    }

    /// Resolves everything.
    pub fn locate_all(&self) -> ToolSet {
        let tools = ToolSet {
            apkeditor: self.locate(Tool::ApkEditor),
            template: self.locate(Tool::Template),
            java: self.locate(Tool::Java),
            keytool: self.locate(Tool::Keytool),
            zipalign: self.locate(Tool::Zipalign),
            signer: self.signer(),
        };
        log::info!(
            "Tools on {}: java={}, zipalign={}, apksigner={}",
            self.platform,
            display_opt(tools.java.as_deref()),
            display_opt(tools.zipalign.as_deref()),
            display_opt(tools.signer.as_ref().map(Signer::path)),
        );
        tools
    }

    /// `lib_dir/<name>`, then `exe_dir/<name>`.
    fn archive_candidates(&self, name: &str) -> [PathBuf; 2] {
        [self.lib_dir.join(name), self.exe_dir.join(name)]
    }

    /// Versioned `build-tools/<version>` directories of the SDK, highest first.
    ///
    /// Each tool is taken from the highest version that actually ships it.
    fn sdk_build_tools(&self) -> Vec<PathBuf> {
        let Some(build_tools) = self.sdk_root.as_ref().map(|root| root.join("build-tools")) else {
            return Vec::new();
        };
        let Ok(entries) = std::fs::read_dir(&build_tools) else {
            return Vec::new();
        };
        let mut versions: Vec<(Vec<u32>, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                parse_version(&name).map(|version| (version, entry.path()))
            })
            .collect();
        versions.sort_by(|a, b| b.0.cmp(&a.0));
        versions.into_iter().map(|(_, dir)| dir).collect()
    }
}

/// `ANDROID_SDK_ROOT`, then `ANDROID_HOME`.
pub fn sdk_root_from_env() -> Option<PathBuf> {
    ["ANDROID_SDK_ROOT", "ANDROID_HOME"]
        .into_iter()
        .filter_map(std::env::var_os)
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Parses `34.0.0` or `35.0.0-rc1` into comparable numeric parts.
fn parse_version(name: &str) -> Option<Vec<u32>> {
    let numeric = name.split('-').next()?;
    numeric
        .split('.')
        .map(|part| part.parse::<u32>().ok())
        .collect()
}

fn display_opt(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::SettingsBuilder;
    use std::collections::HashMap;

    #[derive(Default, Clone)]
    struct FakeProbe(HashMap<&'static str, PathBuf>);

    impl ExecutableProbe for FakeProbe {
        fn probe(&self, name: &str) -> Option<PathBuf> {
            self.0.get(name).cloned()
        }
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, "").expect("write");
    }

    fn settings(root: &Path) -> BuildSettings {
        SettingsBuilder::new()
            .project_dir(root.join("project"))
            .lib_dir(root.join("lib"))
            .exe_dir(root.join("bin"))
            .platform(HostPlatform::Linux)
            .build()
            .expect("settings")
    }

    #[test]
    fn test_archives_prefer_lib_dir_then_exe_dir() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = tmp.path();
        touch(&root.join("bin/APKEditor.jar"));
        touch(&root.join("lib/webgal-template.apk"));
        touch(&root.join("bin/webgal-template.apk"));

        let locator = ToolLocator::with_probe(&settings(root), FakeProbe::default());
        assert_eq!(
            locator.locate(Tool::ApkEditor),
            Some(root.join("bin/APKEditor.jar"))
        );
        assert_eq!(
            locator.locate(Tool::Template),
            Some(root.join("lib/webgal-template.apk"))
        );
    }

    #[test]
    fn test_system_install_wins_over_bundled() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = tmp.path();
        touch(&root.join("lib/jdk-21/bin/java"));
        touch(&root.join("lib/jdk-21/bin/keytool"));

        let mut probe = FakeProbe::default();
        probe.0.insert("java", PathBuf::from("/usr/bin/java"));

        let locator = ToolLocator::with_probe(&settings(root), probe);
        assert_eq!(locator.locate(Tool::Java), Some(PathBuf::from("/usr/bin/java")));
        assert_eq!(
            locator.locate(Tool::Keytool),
            Some(root.join("lib/jdk-21/bin/keytool"))
        );
    }

    #[test]
    fn test_bundled_signer_is_a_jar() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = tmp.path();
        touch(&root.join("lib/build-tools/lib/apksigner.jar"));
        touch(&root.join("lib/build-tools/zipalign"));

        let locator = ToolLocator::with_probe(&settings(root), FakeProbe::default());
        let tools = locator.locate_all();
        assert_eq!(
            tools.signer,
            Some(Signer::Jar(root.join("lib/build-tools/lib/apksigner.jar")))
        );
        assert_eq!(tools.zipalign, Some(root.join("lib/build-tools/zipalign")));
        assert_eq!(tools.java, None);
    }

    #[test]
    fn test_sdk_fallback_uses_highest_build_tools() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = tmp.path();
        let sdk = root.join("sdk");
        touch(&sdk.join("build-tools/9.0.0/apksigner"));
        touch(&sdk.join("build-tools/34.0.0/apksigner"));
        touch(&sdk.join("build-tools/34.0.0/zipalign"));
        touch(&sdk.join("build-tools/35.0.0-rc1/lib/apksigner.jar"));
        std::fs::create_dir_all(sdk.join("build-tools/not-a-version")).expect("mkdir");

        let locator = ToolLocator::with_probe(&settings(root), FakeProbe::default())
            .sdk_root(Some(sdk.clone()));
        assert_eq!(
            locator.signer(),
            Some(Signer::Jar(sdk.join("build-tools/35.0.0-rc1/lib/apksigner.jar")))
        );
        assert_eq!(
            locator.locate(Tool::Zipalign),
            Some(sdk.join("build-tools/34.0.0/zipalign"))
        );
    }

    #[test]
    fn test_sdk_launcher_preferred_within_same_version() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = tmp.path();
        let sdk = root.join("sdk");
        touch(&sdk.join("build-tools/34.0.0/apksigner"));
        touch(&sdk.join("build-tools/34.0.0/lib/apksigner.jar"));
        std::fs::create_dir_all(sdk.join("build-tools/36.0.0")).expect("mkdir");

        let locator = ToolLocator::with_probe(&settings(root), FakeProbe::default())
            .sdk_root(Some(sdk.clone()));
        assert_eq!(
            locator.signer(),
            Some(Signer::Executable(sdk.join("build-tools/34.0.0/apksigner")))
        );
        assert_eq!(locator.locate(Tool::Zipalign), None);
    }

    #[test]
    fn test_require_core_names_missing_tool() {
        let tools = ToolSet {
            apkeditor: Some("APKEditor.jar".into()),
            template: None,
            java: None,
            ..Default::default()
        };
        match tools.require_core() {
            Err(err) => assert_eq!(err.to_string(), "WebGAL template not found"),
            Ok(core) => panic!("expected missing template, got {core:?}"),
        }

        let tools = ToolSet::default();
        match tools.require_core() {
            Err(err) => assert_eq!(err.to_string(), "APKEditor not found"),
            Ok(core) => panic!("expected missing APKEditor, got {core:?}"),
        }
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("34.0.0"), Some(vec![34, 0, 0]));
        assert_eq!(parse_version("35.0.0-rc1"), Some(vec![35, 0, 0]));
        assert_eq!(parse_version("latest"), None);
        assert!(parse_version("9.0.0") < parse_version("34.0.0"));
    }
}
