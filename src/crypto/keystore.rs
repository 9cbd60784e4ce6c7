//! Evidence Vault - Key Custodian
//!
//! Provisions and holds the single non-exportable 256-bit master key.
//! The key store is an injected handle so tests and non-Android hosts can
//! substitute a software-backed implementation.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use secrecy::{ExposeSecret, Secret};
use zeroize::ZeroizeOnDrop;

use crate::error::{VaultError, VaultResult};

/// Key length for AES-256
pub const KEY_LEN: usize = 32;

/// Opaque handle to the installation's 256-bit master key.
///
/// Created once on first run, flagged encrypt/decrypt-only, never exported
/// in plaintext and never rotated (stated limitation). Key bytes are
/// zeroized when the handle is dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct MasterKey {
    #[zeroize(skip)]
    inner: Secret<[u8; KEY_LEN]>,
}

impl MasterKey {
    /// Wrap raw key bytes
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            inner: Secret::new(bytes),
        }
    }

    /// Expose the key bytes (use with caution)
    pub fn expose(&self) -> &[u8; KEY_LEN] {
        self.inner.expose_secret()
    }

    /// Generate a fresh random key
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self::new(bytes)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.write_str("MasterKey(..)")
    }
}

/// Backing store for the master key.
///
/// A hardware-backed implementation keeps key material inside the secure
/// element; panic operations must be usable without user-presence
/// confirmation, so implementations must not gate `load` on biometrics.
pub trait SecureKeyStore: Send + Sync {
    /// Load the provisioned key, or `None` if no key exists yet
    fn load(&self) -> VaultResult<Option<MasterKey>>;

    /// Persist a newly generated key
    fn store(&self, key: &MasterKey) -> VaultResult<()>;

    /// Whether the key material lives in secure hardware
    fn is_hardware_backed(&self) -> bool;
}

/// Key custodian - one per installation.
///
/// `ensure_key_exists` is idempotent; concurrent encrypt/decrypt callers
/// share the cached handle, each call is stateless beyond key access.
pub struct KeyCustodian {
    store: Arc<dyn SecureKeyStore>,
    cached: RwLock<Option<MasterKey>>,
}

impl KeyCustodian {
    /// Create a custodian over the given key store
    pub fn new(store: Arc<dyn SecureKeyStore>) -> Self {
        Self {
            store,
            cached: RwLock::new(None),
        }
    }

    /// Provision the master key if absent. Idempotent.
    ///
    /// Fails with `KeyProvisioning` when the key store is unavailable -
    /// fatal, blocks all crypto.
    pub fn ensure_key_exists(&self) -> VaultResult<()> {
        if self.cached.read().is_some() {
            return Ok(());
        }

        let mut cached = self.cached.write();
        // Re-check under the write lock
        if cached.is_some() {
            return Ok(());
        }

        match self.store.load()? {
            Some(key) => {
                *cached = Some(key);
            }
            None => {
                let key = MasterKey::generate();
                self.store.store(&key)?;
                if !self.store.is_hardware_backed() {
                    log::warn!("master key provisioned without secure hardware backing");
                }
                log::info!("master key provisioned");
                *cached = Some(key);
            }
        }

        Ok(())
    }

    /// Get a handle to the master key, provisioning it on first use
    pub fn master_key(&self) -> VaultResult<MasterKey> {
        self.ensure_key_exists()?;
        self.cached
            .read()
            .clone()
            .ok_or_else(|| VaultError::KeyProvisioning("key cache empty after provisioning".into()))
    }
}

/// File-backed key store for hosts without secure hardware.
///
/// The key file is written with owner-only permissions on unix. This is a
/// fallback: it cannot make the key non-exportable the way a secure element
/// can, and `is_hardware_backed` reports `false` accordingly.
pub struct SoftwareKeyStore {
    path: PathBuf,
}

impl SoftwareKeyStore {
    /// Key store rooted at the given file path
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl SecureKeyStore for SoftwareKeyStore {
    fn load(&self) -> VaultResult<Option<MasterKey>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = std::fs::read(&self.path)
            .map_err(|e| VaultError::KeyProvisioning(format!("key file unreadable: {e}")))?;

        let arr: [u8; KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
            VaultError::KeyProvisioning(format!(
                "key file has wrong length: expected {KEY_LEN}, got {}",
                bytes.len()
            ))
        })?;

        Ok(Some(MasterKey::new(arr)))
    }

    fn store(&self, key: &MasterKey) -> VaultResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VaultError::KeyProvisioning(format!("key dir: {e}")))?;
        }

        std::fs::write(&self.path, key.expose())
            .map_err(|e| VaultError::KeyProvisioning(format!("key write: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| VaultError::KeyProvisioning(format!("key perms: {e}")))?;
        }

        Ok(())
    }

    fn is_hardware_backed(&self) -> bool {
        false
    }
}
