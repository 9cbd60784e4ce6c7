//! Evidence Vault - Integrity Verification
//!
//! Content hashing for evidence provenance. The SHA-256 digest of the
//! plaintext is computed before encryption and recorded alongside the
//! artifact; it lets a later export prove the decrypted bytes are the
//! bytes that were captured.
//!
//! Anchoring a digest in an external timestamping service is declared but
//! not wired to a backend in this build.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::error::{VaultError, VaultResult};

const HASH_CHUNK: usize = 8 * 1024;

/// SHA-256 of a file's contents as lowercase hex
pub async fn sha256_file<P: AsRef<Path>>(path: P) -> VaultResult<String> {
    let mut file = tokio::fs::File::open(path.as_ref()).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 of an in-memory buffer as lowercase hex
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Anchor a content digest in an external timestamping authority.
///
/// Placeholder until a notarization backend is selected; callers must
/// treat `Unsupported` as "not anchored", never as a verification failure.
pub async fn anchor_digest(_digest: &str) -> VaultResult<String> {
    Err(VaultError::Unsupported(
        "digest anchoring backend not configured".into(),
    ))
}
