//! Evidence Vault - Error Types

use thiserror::Error;

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Vault error types
#[derive(Error, Debug)]
pub enum VaultError {
    // ═══════════════════════════════════════════════════════════════
    // CRYPTO ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Key provisioning failed: {0}")]
    KeyProvisioning(String),

    #[error("Authentication failed - ciphertext corrupted or tampered")]
    Authentication,

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid blob: {0}")]
    InvalidBlob(String),

    // ═══════════════════════════════════════════════════════════════
    // HARDWARE / FILE ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("Erase failed for {path}: {reason}")]
    EraseFailed { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════
    // RECORD STORE ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Record store error: {0}")]
    Store(String),

    // ═══════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    // ═══════════════════════════════════════════════════════════════
    // STUBS
    // ═══════════════════════════════════════════════════════════════

    #[error("Operation not supported: {0}")]
    Unsupported(String),
}

impl VaultError {
    /// Errors that block all cryptographic operations
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VaultError::KeyProvisioning(_) | VaultError::HardwareUnavailable(_)
        )
    }

    /// Errors indicating tampering or corruption of protected data
    pub fn is_security_critical(&self) -> bool {
        matches!(
            self,
            VaultError::Authentication | VaultError::InvalidBlob(_)
        )
    }
}

impl From<rusqlite::Error> for VaultError {
    fn from(e: rusqlite::Error) -> Self {
        VaultError::Store(e.to_string())
    }
}
