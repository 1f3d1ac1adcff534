//! Project store readers.
//!
//! A WebGAL project keeps its identity in `game/config.txt` and, optionally,
//! its signing credentials in `key.properties` next to `game/`.
//!
//! `config.txt` holds one `Key:value;` entry per line:
//!
//! ```text
//! Game_name:My Visual Novel;
//! Package_name:com.example.novel;
//! Version_name:1.2;
//! Version_code:3;
//! ```
//!
//! `key.properties` is a Java properties file:
//!
//! ```text
//! storeFile=keys/release.jks
//! storePassword=...
//! keyAlias=release
//! keyPassword=...
//! validity=10000
//! dname.firstAndLastName=Studio
//! ```

use crate::bundler::{Dname, Keystore, ProjectInfo};
use crate::error::ProjectError;
use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
};

/// Game configuration file, relative to the project directory.
pub const CONFIG_FILE: &str = "game/config.txt";

/// Keystore properties file, relative to the project directory.
pub const KEY_PROPERTIES_FILE: &str = "key.properties";

const DEFAULT_VERSION_NAME: &str = "1.0";
const DEFAULT_VERSION_CODE: u32 = 1;

/// Reads the project identity from `game/config.txt`.
///
/// Missing name or package entries come back empty so that pipeline
/// validation can name the field; only unparsable numbers fail here.
pub fn read_project_info(project_dir: &Path) -> Result<ProjectInfo, ProjectError> {
    let path = project_dir.join(CONFIG_FILE);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ProjectError::ConfigNotFound { path });
        }
        Err(source) => return Err(ProjectError::ReadFailed { path, source }),
    };
    parse_game_config(&contents, &path)
}

/// Parses the `Key:value;` format of `config.txt`.
pub fn parse_game_config(contents: &str, path: &Path) -> Result<ProjectInfo, ProjectError> {
    let entries: HashMap<&str, &str> = contents
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let (key, value) = line.split_once(':')?;
            let value = value.trim();
            let value = value.strip_suffix(';').unwrap_or(value).trim();
            Some((key.trim(), value))
        })
        .collect();

    let text = |key: &str| entries.get(key).map(|v| v.to_string()).unwrap_or_default();

    let version_name = entries
        .get("Version_name")
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| DEFAULT_VERSION_NAME.to_string());

    let version_code = match entries.get("Version_code").filter(|v| !v.is_empty()) {
        None => DEFAULT_VERSION_CODE,
        Some(raw) => raw.parse::<u32>().map_err(|e| ProjectError::InvalidValue {
            key: "Version_code".into(),
            value: raw.to_string(),
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?,
    };

    Ok(ProjectInfo {
        app_name: text("Game_name"),
        package_name: text("Package_name"),
        version_name,
        version_code,
    })
}

/// Reads signing credentials from `key.properties`.
///
/// Returns `Ok(None)` when the file does not exist. A relative `storeFile`
/// is resolved against `project_dir`. An unparsable `validity` is logged and
/// left unset.
pub fn read_keystore(project_dir: &Path) -> Result<Option<Keystore>, ProjectError> {
    let path = project_dir.join(KEY_PROPERTIES_FILE);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("No {} in {}", KEY_PROPERTIES_FILE, project_dir.display());
            return Ok(None);
        }
        Err(source) => return Err(ProjectError::ReadFailed { path, source }),
    };

    let props = parse_properties(&contents);
    Ok(Some(keystore_from_properties(&props, project_dir, &path)))
}

/// Parses Java-properties style `key=value` / `key: value` lines.
///
/// Blank lines and lines starting with `#` or `!` are ignored. The first `=`
/// or `:` separates key from value; both are trimmed.
pub fn parse_properties(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let idx = line.find(['=', ':'])?;
            let (key, value) = line.split_at(idx);
            Some((key.trim().to_string(), value[1..].trim().to_string()))
        })
        .collect()
}

fn keystore_from_properties(
    props: &HashMap<String, String>,
    project_dir: &Path,
    path: &Path,
) -> Keystore {
    let get = |key: &str| props.get(key).cloned().unwrap_or_default();
    let opt = |key: &str| props.get(key).filter(|v| !v.is_empty()).cloned();

    let store_file = match props.get("storeFile").filter(|v| !v.is_empty()) {
        None => PathBuf::new(),
        Some(file) => {
            let file = PathBuf::from(file);
            if file.is_absolute() {
                file
            } else {
                project_dir.join(file)
            }
        }
    };

    // Only keystore creation reads this; an unparsable value falls back to the default.
    let validity = opt("validity").and_then(|raw| match raw.parse::<u32>() {
        Ok(days) => Some(days),
        Err(e) => {
            log::warn!(
                "Ignoring validity '{}' in {}: {}; using the default",
                raw,
                path.display(),
                e
            );
            None
        }
    });

    let dname = Dname {
        first_and_last_name: opt("dname.firstAndLastName"),
        organizational_unit: opt("dname.organizationalUnit"),
        organization: opt("dname.organization"),
        city_or_locality: opt("dname.cityOrLocality"),
        state_or_province: opt("dname.stateOrProvince"),
        country_code: opt("dname.countryCode"),
    };

    Keystore {
        store_file,
        store_password: get("storePassword"),
        key_alias: get("keyAlias"),
        key_password: get("keyPassword"),
        validity,
        dname: (dname != Dname::default()).then_some(dname),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_game_config() {
        let info = parse_game_config(
            "Game_name:星之所在;\nGame_key:0f1e2d;\nPackage_name:com.example.star;\r\nVersion_name: 2.0 ;\nVersion_code:12;\nTitle_img:Title.webp;\n",
            Path::new("config.txt"),
        )
        .expect("parse");
        assert_eq!(info.app_name, "星之所在");
        assert_eq!(info.package_name, "com.example.star");
        assert_eq!(info.version_name, "2.0");
        assert_eq!(info.version_code, 12);
    }

    #[test]
    fn test_game_config_defaults() {
        let info = parse_game_config("Game_name:Demo;\n", Path::new("config.txt")).expect("parse");
        assert_eq!(info.package_name, "");
        assert_eq!(info.version_name, "1.0");
        assert_eq!(info.version_code, 1);
    }

    #[test]
    fn test_bad_version_code() {
        match parse_game_config("Version_code:-3;", Path::new("config.txt")) {
            Err(ProjectError::InvalidValue { key, value, .. }) => {
                assert_eq!(key, "Version_code");
                assert_eq!(value, "-3");
            }
            other => panic!("expected invalid value, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_properties() {
        let props = parse_properties(
            "# comment\n! also comment\n\nstoreFile = keys/release.jks\nkeyAlias: release\nstorePassword=a=b\n",
        );
        assert_eq!(props["storeFile"], "keys/release.jks");
        assert_eq!(props["keyAlias"], "release");
        assert_eq!(props["storePassword"], "a=b");
        assert_eq!(props.len(), 3);
    }

    #[test]
    fn test_read_keystore_resolves_relative_store_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            tmp.path().join(KEY_PROPERTIES_FILE),
            "storeFile=keys/release.jks\nstorePassword=pw\nkeyAlias=release\nkeyPassword=pw2\nvalidity=365\ndname.countryCode=CN\n",
        )
        .expect("write");

        let keystore = read_keystore(tmp.path()).expect("read").expect("present");
        assert_eq!(keystore.store_file, tmp.path().join("keys/release.jks"));
        assert_eq!(keystore.validity, Some(365));
        assert!(keystore.is_complete());
        assert_eq!(keystore.dname_string(), "C=CN");
    }

    #[test]
    fn test_bad_validity_keeps_keystore_usable() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            tmp.path().join(KEY_PROPERTIES_FILE),
            "storeFile=release.jks\nstorePassword=pw\nkeyAlias=release\nkeyPassword=pw2\nvalidity=forever\n",
        )
        .expect("write");

        let keystore = read_keystore(tmp.path()).expect("read").expect("present");
        assert!(keystore.is_complete());
        assert_eq!(keystore.validity, None);
        assert_eq!(keystore.validity_days(), crate::bundler::DEFAULT_KEYSTORE_VALIDITY);
    }

    #[test]
    fn test_missing_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        assert!(read_keystore(tmp.path()).expect("read").is_none());
        assert!(matches!(
            read_project_info(tmp.path()),
            Err(ProjectError::ConfigNotFound { .. })
        ));
    }
}
