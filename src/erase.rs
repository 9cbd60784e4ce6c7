//! Evidence Vault - Secure Erase
//!
//! Overwrite-then-remove of a file's bytes. Used for plaintext capture
//! intermediates and for panic wipe.
//!
//! Stated limitation: on flash storage with wear-leveling, the controller
//! may remap blocks outside OS control, so physical recovery of prior
//! blocks cannot be ruled out by this primitive alone. The guarantee here
//! is overwrite-then-unlink of the logical file.

use std::path::Path;

use rand::RngCore;
use tokio::io::AsyncWriteExt;

use crate::error::{VaultError, VaultResult};

/// Overwrite chunk size
const WIPE_CHUNK: usize = 8 * 1024;

/// Secure-erase primitive
pub struct SecureEraser;

impl SecureEraser {
    /// Overwrite the file with cryptographically random bytes in bounded
    /// chunks, flush, then remove the directory entry.
    ///
    /// A missing path or 0-byte file is not an error. If the overwrite step
    /// fails, removal is still attempted as a fallback - the target is never
    /// left both un-overwritten and un-removed when removal alone works.
    /// The call errors only when the file still exists afterwards; failures
    /// are also logged so batch callers can keep their loops alive.
    pub async fn wipe<P: AsRef<Path>>(path: P) -> VaultResult<()> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(());
        }

        if let Err(e) = Self::overwrite(path).await {
            log::warn!(
                "overwrite failed for {}, falling back to removal: {e}",
                path.display()
            );
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                log::debug!("securely erased {}", path.display());
                Ok(())
            }
            Err(e) => {
                log::error!("failed to remove {}: {e}", path.display());
                Err(VaultError::EraseFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Overwrite the file's current length with random bytes
    async fn overwrite(path: &Path) -> std::io::Result<()> {
        let len = tokio::fs::metadata(path).await?.len();
        if len == 0 {
            return Ok(());
        }

        let mut file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
        let mut buf = vec![0u8; WIPE_CHUNK];
        let mut remaining = len;

        while remaining > 0 {
            let n = remaining.min(WIPE_CHUNK as u64) as usize;
            rand::rngs::OsRng.fill_bytes(&mut buf[..n]);
            file.write_all(&buf[..n]).await?;
            remaining -= n as u64;
        }

        file.sync_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_wipe_removes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("evidence.jpg");
        tokio::fs::write(&path, vec![0xABu8; 20_000]).await.unwrap();

        SecureEraser::wipe(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_wipe_empty_file_does_not_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty");
        tokio::fs::write(&path, b"").await.unwrap();

        SecureEraser::wipe(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_wipe_missing_path_is_noop() {
        let dir = tempdir().unwrap();
        SecureEraser::wipe(dir.path().join("never-existed")).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_readonly_file_still_removed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("locked");
        tokio::fs::write(&path, b"cannot overwrite me").await.unwrap();
        tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o400))
            .await
            .unwrap();

        // Overwrite fails (read-only), removal fallback must still succeed
        SecureEraser::wipe(&path).await.unwrap();
        assert!(!path.exists());
    }
}
