//! Evidence Vault - Cryptographic Core
//!
//! Key custodian plus the authenticated cipher used for all at-rest
//! protection. Every protected artifact, whether a raw file or a base64
//! database field, carries the same `[IV 12B][ciphertext][TAG 16B]` layout.

pub mod aead;
pub mod keystore;
pub mod stream;

pub use aead::{decrypt_bytes, decrypt_string, encrypt_bytes, encrypt_string, IV_LEN, TAG_LEN};
pub use keystore::{KeyCustodian, MasterKey, SecureKeyStore, SoftwareKeyStore, KEY_LEN};
pub use stream::{decrypt_stream, encrypt_stream, CHUNK_SIZE};
