//! Build configuration and the project data the pipeline consumes.
//!
//! [`ProjectInfo`] and [`Keystore`] are read from the project store by the
//! caller; [`BuildSettings`] is the immutable per-run configuration built once
//! through [`SettingsBuilder`] and threaded explicitly through every stage.

use crate::bundler::{
    error::{Context, Error, Result},
    platform::HostPlatform,
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

/// Dotted lowercase package identifier, e.g. `com.example.game`.
static PACKAGE_NAME_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-z0-9][a-z0-9_]*(?:\.[a-z0-9_]+)+$")
        .expect("package name regex is valid")
});

/// Returns true when `name` is a well-formed Android package identifier.
///
/// Segments are `[a-z0-9_]+`, at least two of them, joined by single dots,
/// and the first character is a lowercase letter or a digit.
pub fn is_valid_package_name(name: &str) -> bool {
    PACKAGE_NAME_RE.is_match(name)
}

/// Identity of the app being produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    /// Display name shown under the launcher icon.
    pub app_name: String,
    /// Dotted package identifier.
    pub package_name: String,
    /// Free-form version label.
    pub version_name: String,
    /// Monotonic version number used by the installer.
    pub version_code: u32,
}

impl ProjectInfo {
    /// Checks every field, naming the first one that is wrong.
    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(Error::Configuration {
                field: "appName",
                reason: "app name must not be empty".into(),
            });
        }
        if self.package_name.is_empty() {
            return Err(Error::Configuration {
                field: "packageName",
                reason: "package name must not be empty".into(),
            });
        }
        if !is_valid_package_name(&self.package_name) {
            return Err(Error::Configuration {
                field: "packageName",
                reason: format!(
                    "'{}' is not a valid package name (expected lowercase segments joined by dots, e.g. com.example.game)",
                    self.package_name
                ),
            });
        }
        if self.version_name.trim().is_empty() {
            return Err(Error::Configuration {
                field: "versionName",
                reason: "version name must not be empty".into(),
            });
        }
        if self.version_code == 0 {
            return Err(Error::Configuration {
                field: "versionCode",
                reason: "version code must be a positive integer".into(),
            });
        }
        Ok(())
    }

    /// Base name shared by every artifact of this project:
    /// `<packageName>-<versionName>-build<versionCode>`.
    ///
    /// Characters that are not allowed in file names are replaced with `_`,
    /// so every artifact lands directly in the output directory.
    pub fn artifact_stem(&self) -> String {
        let version: String = self
            .version_name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        format!(
            "{}-{}-build{}",
            self.package_name, version, self.version_code
        )
    }
}

/// Distinguished-name fields used when generating a new keystore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dname {
    /// CN
    pub first_and_last_name: Option<String>,
    /// OU
    pub organizational_unit: Option<String>,
    /// O
    pub organization: Option<String>,
    /// L
    pub city_or_locality: Option<String>,
    /// ST
    pub state_or_province: Option<String>,
    /// C
    pub country_code: Option<String>,
}

/// Distinguished name used when none of the fields are set.
pub const DEFAULT_DNAME: &str = "CN=Android Debug,O=Android,C=US";

impl Dname {
    /// Renders the fields as an X.500 distinguished name, skipping blanks.
    pub fn to_x500(&self) -> String {
        let parts: Vec<String> = [
            ("CN", &self.first_and_last_name),
            ("OU", &self.organizational_unit),
            ("O", &self.organization),
            ("L", &self.city_or_locality),
            ("ST", &self.state_or_province),
            ("C", &self.country_code),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                // Escape RDN separators.
                .map(|v| format!("{key}={}", v.replace(',', "\\,")))
        })
        .collect();

        if parts.is_empty() {
            DEFAULT_DNAME.to_string()
        } else {
            parts.join(",")
        }
    }
}

/// Signing credentials.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keystore {
    /// Path of the keystore file.
    pub store_file: PathBuf,
    /// Store password.
    pub store_password: String,
    /// Alias of the signing key.
    pub key_alias: String,
    /// Key password.
    pub key_password: String,
    /// Validity in days, only used when creating a keystore.
    pub validity: Option<u32>,
    /// Owner fields, only used when creating a keystore.
    pub dname: Option<Dname>,
}

impl std::fmt::Debug for Keystore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keystore")
            .field("store_file", &self.store_file)
            .field("store_password", &"***")
            .field("key_alias", &self.key_alias)
            .field("key_password", &"***")
            .field("validity", &self.validity)
            .field("dname", &self.dname)
            .finish()
    }
}

/// Validity used for generated keystores, in days.
pub const DEFAULT_KEYSTORE_VALIDITY: u32 = 10000;

impl Keystore {
    /// Names of required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.store_file.as_os_str().is_empty() {
            missing.push("storeFile");
        }
        if self.store_password.is_empty() {
            missing.push("storePassword");
        }
        if self.key_alias.is_empty() {
            missing.push("keyAlias");
        }
        if self.key_password.is_empty() {
            missing.push("keyPassword");
        }
        missing
    }

    /// All four required fields are present.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Validity to pass to the credential tool.
    pub fn validity_days(&self) -> u32 {
        self.validity.unwrap_or(DEFAULT_KEYSTORE_VALIDITY)
    }

    /// Distinguished name to pass to the credential tool.
    pub fn dname_string(&self) -> String {
        self.dname
            .as_ref()
            .map(Dname::to_x500)
            .unwrap_or_else(|| DEFAULT_DNAME.to_string())
    }
}

/// Every path a single run reads or writes in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Scratch directory holding the decompiled tree.
    pub work_dir: PathBuf,
    /// Recompiled, not yet signed APK. Also the final output when signing is skipped.
    pub unsigned_apk: PathBuf,
    /// Temporary output of the aligner.
    pub aligned_apk: PathBuf,
    /// Final signed APK.
    pub signed_apk: PathBuf,
    /// Companion v4 signature file written next to the signed APK.
    pub idsig: PathBuf,
}

impl ArtifactPaths {
    /// Lays out artifact paths for `project` below `output_dir`.
    pub fn new(output_dir: &Path, project: &ProjectInfo) -> Self {
        let stem = project.artifact_stem();
        let signed_apk = output_dir.join(format!("{stem}-signed.apk"));
        let mut idsig = signed_apk.clone().into_os_string();
        idsig.push(".idsig");

        Self {
            work_dir: output_dir.join("build"),
            unsigned_apk: output_dir.join(format!("{stem}-unsigned.apk")),
            aligned_apk: output_dir.join(format!("{stem}-aligned.apk")),
            signed_apk,
            idsig: PathBuf::from(idsig),
        }
    }

    /// Files a previous run may have left behind.
    pub fn stale_files(&self) -> [&Path; 4] {
        [
            &self.unsigned_apk,
            &self.aligned_apk,
            &self.signed_apk,
            &self.idsig,
        ]
    }
}

/// Immutable configuration of one build run.
///
/// # Examples
///
/// ```no_run
/// use webgal_apk_builder::bundler::SettingsBuilder;
///
/// # fn example() -> webgal_apk_builder::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .project_dir("/srv/terre/public/games/demo")
///     .lib_dir("/opt/webgal/lib")
///     .build()?;
/// assert!(settings.work_dir().ends_with("build"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct BuildSettings {
    platform: HostPlatform,
    project_dir: PathBuf,
    lib_dir: PathBuf,
    exe_dir: PathBuf,
    engine_dir: PathBuf,
    output_dir: PathBuf,
}

impl BuildSettings {
    /// Host platform the bundled-tool layout is chosen for.
    pub fn platform(&self) -> HostPlatform {
        self.platform
    }

    /// Game project directory (holds `game/` and optionally `icons/android/`).
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Directory of bundled tools (APKEditor, template, JDK, build-tools).
    pub fn lib_dir(&self) -> &Path {
        &self.lib_dir
    }

    /// Directory the running executable lives in.
    pub fn exe_dir(&self) -> &Path {
        &self.exe_dir
    }

    /// Web engine template copied into the APK assets.
    pub fn engine_dir(&self) -> &Path {
        &self.engine_dir
    }

    /// Where artifacts are written.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Scratch directory holding the decompiled tree.
    pub fn work_dir(&self) -> PathBuf {
        self.output_dir.join("build")
    }

    /// The project's game content directory.
    pub fn game_dir(&self) -> PathBuf {
        self.project_dir.join("game")
    }

    /// The project's Android launcher icon set.
    pub fn icons_dir(&self) -> PathBuf {
        self.project_dir.join("icons").join("android")
    }
}

/// Builder for [`BuildSettings`].
///
/// Only the project directory is required; everything else is derived from
/// the conventional WebGAL workspace layout when unset.
#[derive(Default)]
pub struct SettingsBuilder {
    platform: Option<HostPlatform>,
    project_dir: Option<PathBuf>,
    lib_dir: Option<PathBuf>,
    exe_dir: Option<PathBuf>,
    engine_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the game project directory.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn project_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.project_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the bundled tools directory.
    ///
    /// Default: `<exe dir>/lib`
    pub fn lib_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.lib_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the executable directory used for fallback lookups.
    ///
    /// Default: directory of the current executable
    pub fn exe_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.exe_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the engine template directory.
    ///
    /// Default: `<project>/../../../assets/templates/WebGAL_Template`
    pub fn engine_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.engine_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the output directory.
    ///
    /// Default: `<project>/../../../Exported_Games/<project name>/apk`
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Overrides the detected host platform.
    pub fn platform(mut self, platform: HostPlatform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the project directory is missing or the executable
    /// directory cannot be determined.
    pub fn build(self) -> Result<BuildSettings> {
        let project_dir = self.project_dir.context("project_dir is required")?;

        let exe_dir = match self.exe_dir {
            Some(dir) => dir,
            None => std::env::current_exe()?
                .parent()
                .map(Path::to_path_buf)
                .context("executable has no parent directory")?,
        };

        // <root>/public/games/<project>
        let workspace_root = project_dir.join("..").join("..").join("..");
        let project_name = project_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "game".to_string());

        Ok(BuildSettings {
            platform: self.platform.unwrap_or_else(HostPlatform::current),
            lib_dir: self.lib_dir.unwrap_or_else(|| exe_dir.join("lib")),
            engine_dir: self.engine_dir.unwrap_or_else(|| {
                workspace_root
                    .join("assets")
                    .join("templates")
                    .join("WebGAL_Template")
            }),
            output_dir: self.output_dir.unwrap_or_else(|| {
                workspace_root
                    .join("Exported_Games")
                    .join(project_name)
                    .join("apk")
            }),
            exe_dir,
            project_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> ProjectInfo {
        ProjectInfo {
            app_name: "Demo".into(),
            package_name: "com.example.demo".into(),
            version_name: "1.0".into(),
            version_code: 1,
        }
    }

    #[test]
    fn test_package_name_validation() {
        assert!(is_valid_package_name("com.example.app"));
        assert!(is_valid_package_name("com.example_1.app2"));
        assert!(is_valid_package_name("1up.games"));
        assert!(!is_valid_package_name("Com.example"));
        assert!(!is_valid_package_name("com"));
        assert!(!is_valid_package_name(".com.example"));
        assert!(!is_valid_package_name("com.example."));
        assert!(!is_valid_package_name("com..example"));
        assert!(!is_valid_package_name("_com.example"));
        assert!(!is_valid_package_name("com.exa-mple"));
    }

    #[test]
    fn test_validate_names_failing_field() {
        let mut project = demo();
        project.package_name = "Com.Example".into();
        match project.validate() {
            Err(Error::Configuration { field, .. }) => assert_eq!(field, "packageName"),
            other => panic!("expected configuration error, got {other:?}"),
        }

        let mut project = demo();
        project.version_code = 0;
        match project.validate() {
            Err(Error::Configuration { field, .. }) => assert_eq!(field, "versionCode"),
            other => panic!("expected configuration error, got {other:?}"),
        }

        let mut project = demo();
        project.app_name = "  ".into();
        match project.validate() {
            Err(Error::Configuration { field, .. }) => assert_eq!(field, "appName"),
            other => panic!("expected configuration error, got {other:?}"),
        }

        assert!(demo().validate().is_ok());
    }

    #[test]
    fn test_artifact_paths_naming() {
        let paths = ArtifactPaths::new(Path::new("/out"), &demo());
        assert_eq!(paths.work_dir, Path::new("/out/build"));
        assert_eq!(
            paths.unsigned_apk,
            Path::new("/out/com.example.demo-1.0-build1-unsigned.apk")
        );
        assert_eq!(
            paths.aligned_apk,
            Path::new("/out/com.example.demo-1.0-build1-aligned.apk")
        );
        assert_eq!(
            paths.signed_apk,
            Path::new("/out/com.example.demo-1.0-build1-signed.apk")
        );
        assert_eq!(
            paths.idsig,
            Path::new("/out/com.example.demo-1.0-build1-signed.apk.idsig")
        );
    }

    #[test]
    fn test_artifact_stem_stays_in_output_dir() {
        let project = ProjectInfo {
            version_name: "1.0/beta\\2:rc".into(),
            ..demo()
        };
        assert_eq!(project.artifact_stem(), "com.example.demo-1.0_beta_2_rc-build1");

        let paths = ArtifactPaths::new(Path::new("/out"), &project);
        for path in paths.stale_files() {
            assert_eq!(path.parent(), Some(Path::new("/out")));
        }
    }

    #[test]
    fn test_keystore_missing_fields() {
        let keystore = Keystore {
            store_file: "release.jks".into(),
            store_password: "secret".into(),
            key_alias: String::new(),
            key_password: "secret".into(),
            ..Default::default()
        };
        assert_eq!(keystore.missing_fields(), vec!["keyAlias"]);
        assert!(!keystore.is_complete());
        assert!(!format!("{keystore:?}").contains("secret"));
    }

    #[test]
    fn test_dname_rendering() {
        assert_eq!(Dname::default().to_x500(), DEFAULT_DNAME);
        let dname = Dname {
            first_and_last_name: Some("Ada Lovelace".into()),
            organization: Some("Analytical, Ltd".into()),
            country_code: Some("GB".into()),
            ..Default::default()
        };
        assert_eq!(dname.to_x500(), "CN=Ada Lovelace,O=Analytical\\, Ltd,C=GB");
    }

    #[test]
    fn test_settings_defaults_follow_workspace_layout() {
        let settings = SettingsBuilder::new()
            .project_dir("/terre/public/games/demo")
            .exe_dir("/opt/builder")
            .build()
            .expect("settings");
        assert_eq!(settings.lib_dir(), Path::new("/opt/builder/lib"));
        assert_eq!(
            settings.engine_dir(),
            Path::new("/terre/public/games/demo/../../../assets/templates/WebGAL_Template")
        );
        assert_eq!(
            settings.output_dir(),
            Path::new("/terre/public/games/demo/../../../Exported_Games/demo/apk")
        );
        assert_eq!(settings.game_dir(), Path::new("/terre/public/games/demo/game"));
    }

    #[test]
    fn test_settings_requires_project_dir() {
        assert!(SettingsBuilder::new().exe_dir("/opt").build().is_err());
    }
}
