//! Evidence Vault - Streaming AEAD
//!
//! Chunked AES-256-GCM for multi-megabyte media. Same wire format as the
//! one-shot path - one IV at the head, one tag at the tail:
//!
//! ```text
//! [IV 12B][ciphertext][TAG 16B]
//! ```
//!
//! The high-level `aes-gcm` API is one-shot only, so the stream variant is
//! assembled from the parts GCM is made of: an AES-256 CTR keystream
//! (32-bit big-endian counter) plus a GHASH tag over the ciphertext.
//! Peak memory is bounded by one 8 KiB chunk regardless of file size.
//!
//! If decryption fails tag verification at finalization, the partially
//! written plaintext output is securely erased, never left behind as a
//! corrupt-but-present file.

use std::path::Path;

use aes::cipher::{BlockEncrypt, KeyInit, KeyIvInit, StreamCipher};
use aes::Aes256;
use ctr::Ctr32BE;
use ghash::universal_hash::UniversalHash;
use ghash::GHash;
use subtle::ConstantTimeEq;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use zeroize::Zeroizing;

use super::aead::{IV_LEN, MIN_BLOB_LEN, TAG_LEN};
use super::keystore::MasterKey;
use crate::error::{VaultError, VaultResult};

/// Chunk size for stream operations - bounds peak memory
pub const CHUNK_SIZE: usize = 8 * 1024;

// ---------------------------------------------------------------------------
// GCM core
// ---------------------------------------------------------------------------

/// Incremental GCM state: CTR keystream + GHASH accumulator.
///
/// Chunks must be multiples of 16 bytes except the final one, which is the
/// natural shape of a fixed-size read loop.
struct GcmStream {
    ctr: Ctr32BE<Aes256>,
    ghash: GHash,
    tag_mask: [u8; TAG_LEN],
    ct_len: u64,
}

impl GcmStream {
    fn new(key: &MasterKey, iv: &[u8; IV_LEN]) -> VaultResult<Self> {
        let aes = Aes256::new_from_slice(key.expose())
            .map_err(|e| VaultError::Crypto(e.to_string()))?;

        // H = E(K, 0^128) keys the GHASH polynomial
        let mut h = ghash::Block::default();
        aes.encrypt_block(&mut h);
        let ghash = GHash::new(&h);

        // J0 = IV || 0^31 || 1; E(K, J0) masks the tag, data starts at J0+1
        let mut j0 = [0u8; 16];
        j0[..IV_LEN].copy_from_slice(iv);
        j0[15] = 1;

        let mut ctr = Ctr32BE::<Aes256>::new_from_slices(key.expose(), &j0)
            .map_err(|e| VaultError::Crypto(e.to_string()))?;

        let mut tag_mask = [0u8; TAG_LEN];
        ctr.apply_keystream(&mut tag_mask);

        Ok(Self {
            ctr,
            ghash,
            tag_mask,
            ct_len: 0,
        })
    }

    /// Encrypt a plaintext chunk in place, folding the ciphertext into the tag
    fn encrypt_chunk(&mut self, chunk: &mut [u8]) {
        self.ctr.apply_keystream(chunk);
        self.ghash.update_padded(chunk);
        self.ct_len += chunk.len() as u64;
    }

    /// Fold a ciphertext chunk into the tag, then decrypt it in place
    fn decrypt_chunk(&mut self, chunk: &mut [u8]) {
        self.ghash.update_padded(chunk);
        self.ctr.apply_keystream(chunk);
        self.ct_len += chunk.len() as u64;
    }

    /// Finalize: GHASH length block, then XOR with the J0 mask
    fn finalize(mut self) -> [u8; TAG_LEN] {
        let mut len_block = [0u8; 16];
        // [aad bits (0)][ciphertext bits], both 64-bit big-endian
        len_block[8..].copy_from_slice(&(self.ct_len * 8).to_be_bytes());
        self.ghash.update(&[ghash::Block::clone_from_slice(&len_block)]);

        let s = self.ghash.finalize();
        let mut tag = [0u8; TAG_LEN];
        for (i, byte) in tag.iter_mut().enumerate() {
            *byte = s[i] ^ self.tag_mask[i];
        }
        tag
    }
}

/// Fill `buf` from the reader, returning the number of bytes read.
/// Short only at end of stream, so every chunk but the last stays
/// block-aligned for GHASH.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

// ---------------------------------------------------------------------------
// Public stream operations
// ---------------------------------------------------------------------------

/// Encrypt a file in 8 KiB chunks. Returns the encrypted byte count.
///
/// Generates a fresh IV, writes `IV ‖ ciphertext ‖ tag` and syncs before
/// returning. A 0-byte input yields a 28-byte output.
pub async fn encrypt_stream<P: AsRef<Path>, Q: AsRef<Path>>(
    key: &MasterKey,
    input: P,
    output: Q,
) -> VaultResult<u64> {
    let mut reader = File::open(input.as_ref()).await?;
    let mut writer = File::create(output.as_ref()).await?;

    let iv = super::aead::generate_iv();
    let mut gcm = GcmStream::new(key, &iv)?;

    writer.write_all(&iv).await?;

    let mut buf = Zeroizing::new(vec![0u8; CHUNK_SIZE]);
    loop {
        let n = read_full(&mut reader, &mut buf).await?;
        if n == 0 {
            break;
        }
        gcm.encrypt_chunk(&mut buf[..n]);
        writer.write_all(&buf[..n]).await?;
        if n < CHUNK_SIZE {
            break;
        }
    }

    let written = IV_LEN as u64 + gcm.ct_len + TAG_LEN as u64;
    let tag = gcm.finalize();
    writer.write_all(&tag).await?;
    writer.sync_all().await?;

    Ok(written)
}

/// Decrypt a file in 8 KiB chunks, verifying the whole-stream tag at
/// finalization.
///
/// Plaintext is written as chunks decrypt; if the tag does not verify (or
/// any I/O fails midway) the partial output is erased before the error is
/// surfaced.
pub async fn decrypt_stream<P: AsRef<Path>, Q: AsRef<Path>>(
    key: &MasterKey,
    input: P,
    output: Q,
) -> VaultResult<u64> {
    let output = output.as_ref();

    match decrypt_stream_inner(key, input.as_ref(), output).await {
        Ok(n) => Ok(n),
        Err(e) => {
            // Never leave a corrupt-but-present plaintext file
            let _ = crate::erase::SecureEraser::wipe(output).await;
            Err(e)
        }
    }
}

async fn decrypt_stream_inner(
    key: &MasterKey,
    input: &Path,
    output: &Path,
) -> VaultResult<u64> {
    let mut reader = File::open(input).await?;
    let total = reader.metadata().await?.len();

    if total < MIN_BLOB_LEN as u64 {
        return Err(VaultError::InvalidBlob(format!(
            "encrypted file too short: {total} bytes"
        )));
    }
    let mut ct_remaining = total - (IV_LEN + TAG_LEN) as u64;

    let mut iv = [0u8; IV_LEN];
    reader.read_exact(&mut iv).await?;
    let mut gcm = GcmStream::new(key, &iv)?;

    let mut writer = File::create(output).await?;
    let mut buf = Zeroizing::new(vec![0u8; CHUNK_SIZE]);

    while ct_remaining > 0 {
        let want = ct_remaining.min(CHUNK_SIZE as u64) as usize;
        reader.read_exact(&mut buf[..want]).await?;
        gcm.decrypt_chunk(&mut buf[..want]);
        writer.write_all(&buf[..want]).await?;
        ct_remaining -= want as u64;
    }

    let mut stored_tag = [0u8; TAG_LEN];
    reader.read_exact(&mut stored_tag).await?;

    let computed = gcm.finalize();
    if computed.as_ref().ct_eq(stored_tag.as_ref()).unwrap_u8() != 1 {
        return Err(VaultError::Authentication);
    }

    writer.sync_all().await?;
    Ok(total - (IV_LEN + TAG_LEN) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::aead::{decrypt_bytes, encrypt_bytes};
    use tempfile::tempdir;

    fn test_key() -> MasterKey {
        MasterKey::new([0x42u8; 32])
    }

    async fn roundtrip(len: usize) {
        let key = test_key();
        let dir = tempdir().unwrap();

        let plain = dir.path().join("plain.bin");
        let enc = dir.path().join("plain.enc");
        let out = dir.path().join("out.bin");

        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        tokio::fs::write(&plain, &data).await.unwrap();

        let written = encrypt_stream(&key, &plain, &enc).await.unwrap();
        assert_eq!(written, (IV_LEN + len + TAG_LEN) as u64);

        decrypt_stream(&key, &enc, &out).await.unwrap();
        assert_eq!(tokio::fs::read(&out).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_roundtrip_empty_file() {
        roundtrip(0).await;
    }

    #[tokio::test]
    async fn test_roundtrip_sub_chunk() {
        roundtrip(1000).await;
    }

    #[tokio::test]
    async fn test_roundtrip_exact_chunk() {
        roundtrip(CHUNK_SIZE).await;
    }

    #[tokio::test]
    async fn test_roundtrip_multi_chunk() {
        roundtrip(3 * CHUNK_SIZE + 777).await;
    }

    #[tokio::test]
    async fn test_stream_format_matches_one_shot() {
        let key = test_key();
        let dir = tempdir().unwrap();
        let data = b"interoperability contract between encrypt paths".to_vec();

        // Stream-encrypted file decrypts with the one-shot path
        let plain = dir.path().join("p");
        let enc = dir.path().join("e");
        tokio::fs::write(&plain, &data).await.unwrap();
        encrypt_stream(&key, &plain, &enc).await.unwrap();

        let blob = tokio::fs::read(&enc).await.unwrap();
        assert_eq!(decrypt_bytes(&key, &blob).unwrap().as_slice(), &data[..]);

        // One-shot blob decrypts with the stream path
        let blob2 = encrypt_bytes(&key, &data).unwrap();
        let enc2 = dir.path().join("e2");
        let out2 = dir.path().join("o2");
        tokio::fs::write(&enc2, &blob2).await.unwrap();
        decrypt_stream(&key, &enc2, &out2).await.unwrap();
        assert_eq!(tokio::fs::read(&out2).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_tampered_stream_fails_and_discards_output() {
        let key = test_key();
        let dir = tempdir().unwrap();

        let plain = dir.path().join("p");
        let enc = dir.path().join("e");
        let out = dir.path().join("o");

        tokio::fs::write(&plain, vec![7u8; 2 * CHUNK_SIZE]).await.unwrap();
        encrypt_stream(&key, &plain, &enc).await.unwrap();

        // Flip one ciphertext bit mid-stream
        let mut blob = tokio::fs::read(&enc).await.unwrap();
        let mid = blob.len() / 2;
        blob[mid] ^= 0x01;
        tokio::fs::write(&enc, &blob).await.unwrap();

        let err = decrypt_stream(&key, &enc, &out).await.unwrap_err();
        assert!(matches!(err, VaultError::Authentication));

        // Partial plaintext must not survive
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_tampered_tag_fails() {
        let key = test_key();
        let dir = tempdir().unwrap();

        let plain = dir.path().join("p");
        let enc = dir.path().join("e");
        let out = dir.path().join("o");

        tokio::fs::write(&plain, b"short").await.unwrap();
        encrypt_stream(&key, &plain, &enc).await.unwrap();

        let mut blob = tokio::fs::read(&enc).await.unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x80;
        tokio::fs::write(&enc, &blob).await.unwrap();

        let err = decrypt_stream(&key, &enc, &out).await.unwrap_err();
        assert!(matches!(err, VaultError::Authentication));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_same_file_encrypts_differently() {
        let key = test_key();
        let dir = tempdir().unwrap();

        let plain = dir.path().join("p");
        tokio::fs::write(&plain, b"same bytes").await.unwrap();

        let e1 = dir.path().join("e1");
        let e2 = dir.path().join("e2");
        encrypt_stream(&key, &plain, &e1).await.unwrap();
        encrypt_stream(&key, &plain, &e2).await.unwrap();

        assert_ne!(
            tokio::fs::read(&e1).await.unwrap(),
            tokio::fs::read(&e2).await.unwrap()
        );
    }
}
