//! Evidence Vault - System Volume Handle
//!
//! The system output volume is a device-wide mutable resource. During a
//! silent capture the orchestrator is its sole owner and must release
//! (restore) it on every exit path, so the mute/restore pair is modeled as
//! a scoped guard rather than an ambient global. Tests substitute an
//! in-memory implementation.

use parking_lot::Mutex;

use crate::error::VaultResult;

/// Handle to the device's output-volume channel.
///
/// A production build bridges this to the platform audio service; the
/// in-process [`SharedVolume`] implementation backs tests and the CLI.
pub trait VolumeControl: Send + Sync {
    /// Current output-volume level
    fn level(&self) -> VaultResult<u32>;

    /// Set the output-volume level, synchronously
    fn set_level(&self, level: u32) -> VaultResult<()>;
}

/// Scoped mute: records the current level and sets the channel to zero on
/// acquisition; restores the recorded level when dropped.
///
/// Dropping covers every exit path - success, error, panic, task
/// cancellation. `restore` can be called explicitly where the orchestration
/// order matters (restore-before-post-processing).
pub struct MuteGuard<'a> {
    control: &'a dyn VolumeControl,
    original: u32,
    restored: bool,
}

impl<'a> MuteGuard<'a> {
    /// Read the current level and mute the channel
    pub fn mute(control: &'a dyn VolumeControl) -> VaultResult<Self> {
        let original = control.level()?;
        control.set_level(0)?;
        log::debug!("output volume muted (was {original})");

        Ok(Self {
            control,
            original,
            restored: false,
        })
    }

    /// The level recorded before muting
    pub fn original_level(&self) -> u32 {
        self.original
    }

    /// Restore the recorded level now instead of at scope end
    pub fn restore(mut self) {
        self.restore_inner();
    }

    fn restore_inner(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;

        match self.control.set_level(self.original) {
            Ok(()) => log::debug!("output volume restored to {}", self.original),
            Err(e) => log::error!("failed to restore output volume: {e}"),
        }
    }
}

impl Drop for MuteGuard<'_> {
    fn drop(&mut self) {
        self.restore_inner();
    }
}

/// In-memory volume channel
pub struct SharedVolume {
    level: Mutex<u32>,
}

impl SharedVolume {
    pub fn new(level: u32) -> Self {
        Self {
            level: Mutex::new(level),
        }
    }
}

impl VolumeControl for SharedVolume {
    fn level(&self) -> VaultResult<u32> {
        Ok(*self.level.lock())
    }

    fn set_level(&self, level: u32) -> VaultResult<()> {
        *self.level.lock() = level;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_mutes_and_restores() {
        let volume = SharedVolume::new(7);

        {
            let guard = MuteGuard::mute(&volume).unwrap();
            assert_eq!(volume.level().unwrap(), 0);
            assert_eq!(guard.original_level(), 7);
        }

        assert_eq!(volume.level().unwrap(), 7);
    }

    #[test]
    fn test_explicit_restore() {
        let volume = SharedVolume::new(3);

        let guard = MuteGuard::mute(&volume).unwrap();
        guard.restore();
        assert_eq!(volume.level().unwrap(), 3);
    }

    #[test]
    fn test_restore_fires_on_panic() {
        let volume = SharedVolume::new(5);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = MuteGuard::mute(&volume).unwrap();
            panic!("capture blew up");
        }));

        assert!(result.is_err());
        assert_eq!(volume.level().unwrap(), 5);
    }
}
