//! Zip alignment, APK signing and keystore generation.

use crate::bundler::{
    builder::tool_detection::Signer,
    error::{Error, ErrorExt, Result},
    settings::Keystore,
    utils::{
        fs::exists,
        process::{CommandRunner, Invocation},
    },
};
use std::path::Path;

/// `zipalign -v -p 4 <input> <output>`
pub fn align_invocation(zipalign: &Path, input: &Path, output: &Path) -> Invocation {
    Invocation::new(zipalign, "APK alignment")
        .args(["-v", "-p", "4"])
        .arg(input)
        .arg(output)
}

/// Signs `input` into `output` with every signature scheme enabled.
///
/// A [`Signer::Jar`] is started through `java`; an executable signer is run
/// directly.
pub fn sign_invocation(
    signer: &Signer,
    java: &Path,
    keystore: &Keystore,
    input: &Path,
    output: &Path,
) -> Invocation {
    let invocation = match signer {
        Signer::Executable(path) => Invocation::new(path, "APK signing"),
        Signer::Jar(jar) => Invocation::new(java, "APK signing").arg("-jar").arg(jar),
    };

    invocation
        .args(["sign", "--ks"])
        .arg(&keystore.store_file)
        .arg("--ks-key-alias")
        .arg(&keystore.key_alias)
        .arg("--ks-pass")
        .arg(format!("pass:{}", keystore.store_password))
        .arg("--key-pass")
        .arg(format!("pass:{}", keystore.key_password))
        .args([
            "--v1-signing-enabled",
            "true",
            "--v2-signing-enabled",
            "true",
            "--v3-signing-enabled",
            "true",
            "--v4-signing-enabled",
            "true",
        ])
        .arg("--out")
        .arg(output)
        .arg(input)
}

/// `keytool -genkey` for an RSA 2048 key with the keystore's validity and dname.
pub fn keystore_invocation(keytool: &Path, keystore: &Keystore) -> Invocation {
    Invocation::new(keytool, "Keystore creation")
        .args(["-genkey", "-v", "-keystore"])
        .arg(&keystore.store_file)
        .arg("-alias")
        .arg(&keystore.key_alias)
        .args(["-keyalg", "RSA", "-keysize", "2048", "-validity"])
        .arg(keystore.validity_days().to_string())
        .arg("-storepass")
        .arg(&keystore.store_password)
        .arg("-keypass")
        .arg(&keystore.key_password)
        .arg("-dname")
        .arg(keystore.dname_string())
}

/// Generates the keystore file unless it already exists.
///
/// Returns `true` when a new file was written.
pub async fn create_keystore<R: CommandRunner>(
    runner: &R,
    keytool: &Path,
    keystore: &Keystore,
) -> Result<bool> {
    let missing = keystore.missing_fields();
    if !missing.is_empty() {
        return Err(Error::Configuration {
            field: "keystore",
            reason: format!("missing {}", missing.join(", ")),
        });
    }

    if exists(&keystore.store_file).await {
        log::debug!(
            "Keystore {} already exists",
            keystore.store_file.display()
        );
        return Ok(false);
    }

    if let Some(parent) = keystore.store_file.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating keystore directory", parent)?;
    }

    runner.run(&keystore_invocation(keytool, keystore)).await?;
    log::info!("Created keystore {}", keystore.store_file.display());
    Ok(true)
}
