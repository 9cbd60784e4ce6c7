//! Evidence Vault - AEAD Encryption
//!
//! AES-256-GCM over the canonical blob layout:
//!
//! ```text
//! [IV 12B][ciphertext][TAG 16B]
//! ```
//!
//! Raw bytes for media files, base64 text for database string fields.
//! This exact layout is the interoperability contract between every
//! encrypt and decrypt path (one-shot and streaming) and must not change.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use zeroize::Zeroizing;

use super::keystore::MasterKey;
use crate::error::{VaultError, VaultResult};

/// IV (nonce) length for AES-GCM - 96 bits
pub const IV_LEN: usize = 12;

/// GCM authentication tag length - 128 bits
pub const TAG_LEN: usize = 16;

/// Smallest valid blob: IV + tag around an empty ciphertext
pub const MIN_BLOB_LEN: usize = IV_LEN + TAG_LEN;

/// Generate a fresh random IV. Must be unique per encryption call.
pub fn generate_iv() -> [u8; IV_LEN] {
    use rand::RngCore;
    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypt a byte buffer. Empty plaintext still yields `IV ‖ tag`.
///
/// Ciphertext length equals plaintext length - no padding.
pub fn encrypt_bytes(key: &MasterKey, plaintext: &[u8]) -> VaultResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| VaultError::Crypto(e.to_string()))?;

    let iv = generate_iv();
    let nonce = Nonce::from_slice(&iv);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::Crypto(e.to_string()))?;

    let mut blob = Vec::with_capacity(IV_LEN + ciphertext.len());
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob. Verifies the tag before returning anything; on mismatch
/// fails closed with `Authentication` - no partial plaintext is ever
/// returned.
pub fn decrypt_bytes(key: &MasterKey, blob: &[u8]) -> VaultResult<Zeroizing<Vec<u8>>> {
    if blob.len() < MIN_BLOB_LEN {
        return Err(VaultError::InvalidBlob(format!(
            "blob too short: {} bytes",
            blob.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| VaultError::Crypto(e.to_string()))?;

    let (iv, ciphertext) = blob.split_at(IV_LEN);
    let nonce = Nonce::from_slice(iv);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| VaultError::Authentication)?;

    Ok(Zeroizing::new(plaintext))
}

/// Encrypt a string field for database storage. Returns base64 text.
pub fn encrypt_string(key: &MasterKey, plaintext: &str) -> VaultResult<String> {
    let blob = encrypt_bytes(key, plaintext.as_bytes())?;
    Ok(BASE64.encode(blob))
}

/// Decrypt a base64 string field.
pub fn decrypt_string(key: &MasterKey, encoded: &str) -> VaultResult<String> {
    let blob = BASE64.decode(encoded)?;
    let plaintext = decrypt_bytes(key, &blob)?;
    String::from_utf8(plaintext.to_vec())
        .map_err(|_| VaultError::InvalidBlob("decrypted field is not valid UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> MasterKey {
        MasterKey::new([0x42u8; 32])
    }

    #[test]
    fn test_roundtrip() {
        let key = test_key();
        let plaintext = b"incident narrative, strictly confidential";

        let blob = encrypt_bytes(&key, plaintext).unwrap();
        assert_eq!(blob.len(), IV_LEN + plaintext.len() + TAG_LEN);

        let decrypted = decrypt_bytes(&key, &blob).unwrap();
        assert_eq!(decrypted.as_slice(), plaintext);
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let key = test_key();

        let blob = encrypt_bytes(&key, b"").unwrap();
        assert_eq!(blob.len(), MIN_BLOB_LEN);

        let decrypted = decrypt_bytes(&key, &blob).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_iv_is_unique_per_call() {
        let key = test_key();
        let blob1 = encrypt_bytes(&key, b"same plaintext").unwrap();
        let blob2 = encrypt_bytes(&key, b"same plaintext").unwrap();

        assert_ne!(blob1[..IV_LEN], blob2[..IV_LEN]);
        assert_ne!(blob1, blob2);
    }

    #[test]
    fn test_every_bit_flip_fails_closed() {
        let key = test_key();
        let blob = encrypt_bytes(&key, b"evidence").unwrap();

        // Flip each bit of ciphertext and tag in turn
        for byte in IV_LEN..blob.len() {
            for bit in 0..8 {
                let mut tampered = blob.clone();
                tampered[byte] ^= 1 << bit;

                let err = decrypt_bytes(&key, &tampered).unwrap_err();
                assert!(matches!(err, VaultError::Authentication));
                assert!(err.is_security_critical());
            }
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let blob = encrypt_bytes(&test_key(), b"secret").unwrap();
        let other = MasterKey::new([0x43u8; 32]);
        assert!(matches!(
            decrypt_bytes(&other, &blob),
            Err(VaultError::Authentication)
        ));
    }

    #[test]
    fn test_truncated_blob_rejected() {
        let key = test_key();
        assert!(matches!(
            decrypt_bytes(&key, &[0u8; MIN_BLOB_LEN - 1]),
            Err(VaultError::InvalidBlob(_))
        ));
    }

    #[test]
    fn test_string_field_roundtrip() {
        let key = test_key();
        let encoded = encrypt_string(&key, "survivor profile notes").unwrap();

        // Stored form is printable base64, not plaintext
        assert!(!encoded.contains("survivor"));

        let decoded = decrypt_string(&key, &encoded).unwrap();
        assert_eq!(decoded, "survivor profile notes");
    }
}
