//! Evidence Vault - Configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::VaultResult;
use crate::shake::ShakeConfig;

/// Vault-wide settings, persisted as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Root for encrypted artifacts, key material and the record store
    pub data_dir: PathBuf,
    /// Ephemeral directory for pre-encryption capture output; cleared by
    /// every panic wipe
    pub temp_cache_dir: PathBuf,
    /// Shake-to-wipe tunables
    pub shake: ShakeConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./vault-data"),
            temp_cache_dir: PathBuf::from("./vault-data/cache"),
            shake: ShakeConfig::default(),
        }
    }
}

impl VaultConfig {
    /// Load from a JSON file, falling back to defaults if it is absent
    pub fn load<P: AsRef<Path>>(path: P) -> VaultResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Persist to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> VaultResult<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Where the master-key file lives in software-keystore mode
    pub fn key_path(&self) -> PathBuf {
        self.data_dir.join("master.key")
    }

    /// Where the SQLite record store lives
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("records.db")
    }

    /// Where encrypted artifacts are written
    pub fn artifact_dir(&self) -> PathBuf {
        self.data_dir.join("artifacts")
    }
}
