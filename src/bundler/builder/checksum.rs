//! SHA-256 of produced artifacts.

use crate::bail;
use crate::bundler::error::{ErrorExt, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Streams `path` through SHA-256 and returns the lowercase hex digest.
pub async fn calculate_sha256(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading artifact metadata", path)?;
    if !metadata.is_file() {
        bail!("Artifact is not a file: {}", path.display());
    }

    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening artifact", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading artifact", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_digest() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("app.apk");
        std::fs::write(&path, b"abc").expect("write");
        assert_eq!(
            calculate_sha256(&path).await.expect("hash"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_directory_is_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        assert!(calculate_sha256(tmp.path()).await.is_err());
    }
}
