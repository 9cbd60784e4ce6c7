//! Evidence Vault - Shake Trigger
//!
//! Turns a stream of accelerometer samples into a single wipe trigger.
//! A qualifying impulse is a sample whose gravity-removed acceleration
//! magnitude exceeds the threshold; the required number of impulses must
//! land inside a sliding time window to fire. One shake sequence produces
//! exactly one trigger - the detector resets after firing and a fresh
//! sequence must be built from scratch.
//!
//! The detector is a pure state machine fed with sample timestamps, so it
//! has no clock or sensor dependency of its own and is fully deterministic
//! under test.

use serde::{Deserialize, Serialize};

/// Standard gravity in m/s^2, subtracted from raw magnitudes
const STANDARD_GRAVITY: f64 = 9.80665;

/// Tunables for the shake trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShakeConfig {
    /// Gravity-removed acceleration magnitude (m/s^2) a sample must exceed
    /// to count as an impulse
    pub threshold: f64,
    /// Impulses required within the window to fire
    pub required_count: u32,
    /// Maximum gap between consecutive impulses in one sequence
    pub window_ms: u64,
}

impl Default for ShakeConfig {
    fn default() -> Self {
        Self {
            threshold: 12.0,
            required_count: 3,
            window_ms: 2000,
        }
    }
}

/// Emitted when a complete shake sequence is recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WipeTriggered {
    /// Timestamp of the impulse that completed the sequence
    pub at_ms: u64,
}

/// Shake-to-wipe state machine
pub struct ShakeDetector {
    config: ShakeConfig,
    count: u32,
    last_impulse_ms: Option<u64>,
}

impl ShakeDetector {
    pub fn new(config: ShakeConfig) -> Self {
        Self {
            config,
            count: 0,
            last_impulse_ms: None,
        }
    }

    /// Feed one accelerometer sample.
    ///
    /// `now_ms` is the sample timestamp on a monotonic millisecond clock.
    /// Returns `Some(WipeTriggered)` exactly once per completed sequence.
    pub fn on_sample(&mut self, x: f64, y: f64, z: f64, now_ms: u64) -> Option<WipeTriggered> {
        let magnitude = (x * x + y * y + z * z).sqrt() - STANDARD_GRAVITY;
        if magnitude <= self.config.threshold {
            return None;
        }

        let within_window = self
            .last_impulse_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.config.window_ms);

        if within_window {
            self.count += 1;
        } else {
            // Too long since the last impulse: start a fresh sequence
            self.count = 1;
        }
        self.last_impulse_ms = Some(now_ms);

        if self.count >= self.config.required_count {
            log::warn!("shake sequence complete, wipe triggered");
            self.reset();
            return Some(WipeTriggered { at_ms: now_ms });
        }
        None
    }

    /// Discard any partial sequence
    pub fn reset(&mut self) {
        self.count = 0;
        self.last_impulse_ms = None;
    }
}
