//! Evidence Vault - Metadata Stripper
//!
//! Removes GPS coordinates, timestamps and device-identifying tags from
//! captured photos before they are encrypted. Works at the JPEG segment
//! level - EXIF (APP1), XMP (APP1), vendor blocks (APP2..APP15) and COM
//! comments are dropped wholesale without re-encoding, so the evidence
//! pixel data stays bit-exact.

use std::path::Path;

use crate::error::{VaultError, VaultResult};

/// Start-of-image marker
const SOI: [u8; 2] = [0xFF, 0xD8];

/// What the stripper did with a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripOutcome {
    /// JPEG rewritten with metadata segments removed
    Stripped { bytes_removed: usize },
    /// Not a JPEG; left unchanged
    NotJpeg,
}

/// Strip metadata segments from an in-memory JPEG.
///
/// Returns `None` when the input is not a JPEG. Errors on a truncated or
/// malformed segment table rather than passing suspect bytes through.
pub fn strip_jpeg(data: &[u8]) -> VaultResult<Option<Vec<u8>>> {
    if data.len() < 4 || data[..2] != SOI {
        return Ok(None);
    }

    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&SOI);

    let mut i = 2;
    loop {
        if i + 2 > data.len() {
            return Err(VaultError::InvalidBlob(
                "truncated JPEG segment table".into(),
            ));
        }
        if data[i] != 0xFF {
            return Err(VaultError::InvalidBlob(format!(
                "malformed JPEG marker at offset {i}"
            )));
        }

        // Skip fill bytes
        let mut m = i + 1;
        while m < data.len() && data[m] == 0xFF {
            m += 1;
        }
        if m >= data.len() {
            return Err(VaultError::InvalidBlob(
                "truncated JPEG segment table".into(),
            ));
        }
        let marker = data[m];

        match marker {
            // Start of scan: entropy-coded data follows, copy verbatim
            0xDA => {
                out.extend_from_slice(&data[i..]);
                return Ok(Some(out));
            }
            // End of image
            0xD9 => {
                out.extend_from_slice(&[0xFF, 0xD9]);
                return Ok(Some(out));
            }
            // Standalone markers carry no length field
            0x01 | 0xD0..=0xD7 => {
                out.extend_from_slice(&[0xFF, marker]);
                i = m + 1;
            }
            _ => {
                if m + 3 > data.len() {
                    return Err(VaultError::InvalidBlob(
                        "truncated JPEG segment length".into(),
                    ));
                }
                let len = u16::from_be_bytes([data[m + 1], data[m + 2]]) as usize;
                let end = m + 1 + len;
                if len < 2 || end > data.len() {
                    return Err(VaultError::InvalidBlob(
                        "JPEG segment overruns file".into(),
                    ));
                }

                // APP1..APP15 hold EXIF/XMP/vendor metadata, COM holds
                // free-text comments; APP0 (JFIF) stays
                let is_metadata = matches!(marker, 0xE1..=0xEF | 0xFE);
                if !is_metadata {
                    out.extend_from_slice(&[0xFF, marker]);
                    out.extend_from_slice(&data[m + 1..end]);
                }
                i = end;
            }
        }
    }
}

/// Strip metadata from a photo file in place.
///
/// Non-JPEG files are left untouched with a warning - the capture pipeline
/// only produces JPEGs, but imported files may not be.
pub async fn strip_file<P: AsRef<Path>>(path: P) -> VaultResult<StripOutcome> {
    let path = path.as_ref();
    let data = tokio::fs::read(path).await?;

    match strip_jpeg(&data)? {
        Some(stripped) => {
            let removed = data.len() - stripped.len();
            tokio::fs::write(path, &stripped).await?;
            log::debug!(
                "stripped {removed} metadata bytes from {}",
                path.display()
            );
            Ok(StripOutcome::Stripped {
                bytes_removed: removed,
            })
        }
        None => {
            log::warn!("{} is not a JPEG, metadata left as-is", path.display());
            Ok(StripOutcome::NotJpeg)
        }
    }
}
