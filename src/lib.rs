//! # Evidence Vault
//!
//! Evidence protection core for at-risk users: silent capture, encrypted
//! storage and rapid destruction of sensitive material.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     EVIDENCE VAULT                        │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────┐   │
//! │  │   SILENT    │  │  KEY         │  │  PANIC WIPE    │   │
//! │  │   CAPTURE   │  │  CUSTODIAN   │  │  + SHAKE       │   │
//! │  │  mute→shoot │  │  AES-256 key │  │  TRIGGER       │   │
//! │  └──────┬──────┘  └──────┬───────┘  └───────┬────────┘   │
//! │         │                │                   │            │
//! │  ┌──────┴────────────────┴───────────────────┴─────────┐ │
//! │  │          AES-256-GCM  [IV | ciphertext | tag]        │ │
//! │  │        one-shot blobs + single-tag file streams      │ │
//! │  └──────────────────────────────────────────────────────┘ │
//! │                                                           │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────┐   │
//! │  │  METADATA   │  │  RECORD      │  │  SECURE        │   │
//! │  │  STRIPPER   │  │  STORE       │  │  ERASE         │   │
//! │  └─────────────┘  └──────────────┘  └────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//!
//! - All artifacts encrypted with AES-256-GCM under a device master key
//! - Plaintext exists on disk only inside the temp cache, and only between
//!   capture and encryption
//! - GPS/EXIF metadata stripped before encryption
//! - Decryption fails closed: any authentication failure destroys partial
//!   output
//! - Panic wipe overwrites blobs before unlinking and purges all records

pub mod capture;
pub mod config;
pub mod crypto;
pub mod erase;
pub mod error;
pub mod shake;
pub mod store;
pub mod strip;
pub mod verify;
pub mod volume;
pub mod wipe;

pub use capture::{CaptureArtifact, CaptureHardware, CaptureOrchestrator};
pub use config::VaultConfig;
pub use crypto::{decrypt_stream, encrypt_stream, KeyCustodian, MasterKey, SecureKeyStore};
pub use erase::SecureEraser;
pub use error::{VaultError, VaultResult};
pub use shake::{ShakeConfig, ShakeDetector, WipeTriggered};
pub use store::{ArtifactHandle, ArtifactKind, RecordStore, SqliteRecordStore};
pub use volume::{MuteGuard, VolumeControl};
pub use wipe::{WipeOrchestrator, WipeResult};

/// Evidence Vault version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
