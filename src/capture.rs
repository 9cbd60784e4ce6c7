//! Evidence Vault - Silent Capture Orchestrator
//!
//! Captures evidence without the audible shutter side-channel and converts
//! the plaintext into a protected artifact before returning:
//!
//! ```text
//! Idle → Muting → Capturing → Restoring → PostProcessing → Idle
//! ```
//!
//! Volume restore is unconditional on every exit path - success, sensor
//! error, or task cancellation. Any error during post-processing erases the
//! plaintext intermediates before it is surfaced; each invocation yields at
//! most one artifact or a clean failure with no residual plaintext.
//!
//! Known limitation: if the host process is killed outright mid-capture
//! (not merely an error), application code cannot restore the volume. That
//! is an OS-level boundary, not something this orchestrator can fix.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::crypto::{encrypt_stream, KeyCustodian};
use crate::erase::SecureEraser;
use crate::error::VaultResult;
use crate::strip;
use crate::volume::{MuteGuard, VolumeControl};

/// External capture sensor. Camera lifecycle and preview management live
/// behind this seam; the orchestrator only sees the single async contract.
#[async_trait]
pub trait CaptureHardware: Send + Sync {
    /// Capture one frame into `output`. Bounded by the hardware framework;
    /// no explicit timeout is imposed here.
    async fn capture(&self, output: &Path) -> VaultResult<()>;
}

/// Capture pipeline phase, exposed for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Muting,
    Capturing,
    Restoring,
    PostProcessing,
}

/// Handle for the record store to persist after a successful capture
#[derive(Debug, Clone)]
pub struct CaptureArtifact {
    /// Unique artifact id
    pub id: String,
    /// Location of the encrypted blob
    pub path: PathBuf,
    /// Encrypted size in bytes
    pub size: u64,
    /// MIME type of the protected plaintext
    pub mime_type: String,
    /// Capture timestamp
    pub captured_at: DateTime<Utc>,
}

/// Silent-capture orchestrator
pub struct CaptureOrchestrator {
    hardware: Arc<dyn CaptureHardware>,
    volume: Arc<dyn VolumeControl>,
    custodian: Arc<KeyCustodian>,
    /// Plaintext intermediates land here, then get erased
    temp_dir: PathBuf,
    /// Encrypted artifacts land here
    output_dir: PathBuf,
    phase: Mutex<CapturePhase>,
}

impl CaptureOrchestrator {
    pub fn new(
        hardware: Arc<dyn CaptureHardware>,
        volume: Arc<dyn VolumeControl>,
        custodian: Arc<KeyCustodian>,
        temp_dir: PathBuf,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            hardware,
            volume,
            custodian,
            temp_dir,
            output_dir,
            phase: Mutex::new(CapturePhase::Idle),
        }
    }

    /// Current pipeline phase
    pub fn phase(&self) -> CapturePhase {
        *self.phase.lock()
    }

    fn set_phase(&self, phase: CapturePhase) {
        *self.phase.lock() = phase;
    }

    /// Capture one piece of evidence silently.
    ///
    /// Mutes the output channel, captures, restores the recorded level,
    /// strips identifying metadata, encrypts via the stream cipher and
    /// erases every plaintext intermediate. Not idempotent.
    pub async fn capture_silently(&self) -> VaultResult<CaptureArtifact> {
        let result = self.capture_inner().await;
        self.set_phase(CapturePhase::Idle);
        result
    }

    async fn capture_inner(&self) -> VaultResult<CaptureArtifact> {
        // Key access must not block on user presence; fail before muting
        let key = self.custodian.master_key()?;

        tokio::fs::create_dir_all(&self.temp_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let id = Uuid::new_v4().to_string();
        let raw_path = self.temp_dir.join(format!("capture_{id}.jpg"));
        let enc_path = self.output_dir.join(format!("evidence_{id}.enc"));

        // Mute completes before capture starts; the guard also restores on
        // panic or cancellation at the capture await point
        self.set_phase(CapturePhase::Muting);
        let guard = MuteGuard::mute(self.volume.as_ref())?;

        self.set_phase(CapturePhase::Capturing);
        let captured = self.hardware.capture(&raw_path).await;

        // Capture (success or error) completes before restore is attempted,
        // and restore runs before any post-processing
        self.set_phase(CapturePhase::Restoring);
        guard.restore();

        if let Err(e) = captured {
            log::error!("capture hardware failed: {e}");
            let _ = SecureEraser::wipe(&raw_path).await;
            return Err(e);
        }

        self.set_phase(CapturePhase::PostProcessing);

        let mime_type = detect_mime(&tokio::fs::read(&raw_path).await?);

        if let Err(e) = strip::strip_file(&raw_path).await {
            log::error!("metadata strip failed: {e}");
            let _ = SecureEraser::wipe(&raw_path).await;
            return Err(e);
        }

        if let Err(e) = encrypt_stream(&key, &raw_path, &enc_path).await {
            log::error!("evidence encryption failed: {e}");
            let _ = SecureEraser::wipe(&enc_path).await;
            let _ = SecureEraser::wipe(&raw_path).await;
            return Err(e);
        }

        // The plaintext intermediate must not outlive this call
        if let Err(e) = SecureEraser::wipe(&raw_path).await {
            let _ = SecureEraser::wipe(&enc_path).await;
            return Err(e);
        }

        let size = tokio::fs::metadata(&enc_path).await?.len();
        log::info!("evidence captured: {} ({size} bytes encrypted)", enc_path.display());

        Ok(CaptureArtifact {
            id,
            path: enc_path,
            size,
            mime_type,
            captured_at: Utc::now(),
        })
    }
}

/// Detect MIME type from magic bytes
fn detect_mime(data: &[u8]) -> String {
    if data.len() >= 3 && data[..3] == [0xFF, 0xD8, 0xFF] {
        "image/jpeg".into()
    } else if data.len() >= 8 && data[..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        "image/png".into()
    } else {
        "application/octet-stream".into()
    }
}
