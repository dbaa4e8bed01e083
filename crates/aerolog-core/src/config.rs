//! Device configuration
//!
//! Every period, threshold and identity string the station uses lives here.
//! The defaults reproduce the shipped firmware; a provisioning step can
//! override them with a postcard-encoded blob stored in flash or on the card.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::clock::{DateTime, Millis};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config blob could not be decoded")]
    Decode,
    #[error("config could not be encoded")]
    Encode,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct DeviceConfig<'a> {
    pub schedule: ScheduleConfig,
    pub air: AirConfig,
    pub clock: ClockConfig<'a>,
    pub storage: StorageConfig<'a>,
    pub internet: InternetConfig<'a>,
}

impl<'a> DeviceConfig<'a> {
    /// Decode a postcard blob. String fields borrow from `bytes`.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, ConfigError> {
        postcard::from_bytes(bytes).map_err(|_| ConfigError::Decode)
    }

    /// Encode into a postcard blob.
    pub fn to_vec(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Encode)
    }
}

/// Periods of the four scheduled activities.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub display_period_ms: Millis,
    pub storage_check_period_ms: Millis,
    pub log_period_ms: Millis,
    pub upload_period_ms: Millis,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            display_period_ms: 250,
            storage_check_period_ms: 2_000,
            log_period_ms: 60_000,
            upload_period_ms: 20_000,
        }
    }
}

/// Air-signal acquisition, calibration and smoothing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct AirConfig {
    /// Weight of history in the moving average.
    pub smoothing_alpha: f32,
    /// Seed value so the first reading is not a cold-start outlier.
    pub initial_smoothed: f32,
    /// Immediate re-reads averaged per sample.
    pub burst_samples: u8,
    /// Busy-wait between re-reads.
    pub burst_delay_ms: u32,
    /// Calibrated value = `baseline + raw * gain`.
    pub baseline: i32,
    pub gain: i32,
    /// Displayed values below this are "good".
    pub fair_threshold: i32,
    /// Displayed values at or above this are "poor".
    pub poor_threshold: i32,
}

impl Default for AirConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: 0.8,
            initial_smoothed: 135.0,
            burst_samples: 5,
            burst_delay_ms: 2,
            baseline: 135,
            gain: 4,
            fair_threshold: 160,
            poor_threshold: 250,
        }
    }
}

/// Wall-clock bootstrap and synchronization.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig<'a> {
    pub ntp_server: &'a str,
    pub utc_offset_secs: i32,
    pub dst_offset_secs: i32,
    /// A wall clock reading an earlier year is not credible.
    pub plausible_year: u16,
    /// Installed when no credible time is available at boot.
    pub fallback: DateTime,
    /// Minutes past the fallback hour that still look like the fallback clock.
    pub fallback_window_minutes: u8,
    /// How long boot waits for a requested sync to land.
    pub boot_sync_timeout_ms: u32,
    pub boot_poll_step_ms: u32,
}

impl Default for ClockConfig<'_> {
    fn default() -> Self {
        Self {
            ntp_server: "pool.ntp.org",
            utc_offset_secs: 10_800,
            dst_offset_secs: 0,
            plausible_year: 2025,
            fallback: DateTime::new(2026, 1, 19, 12, 0, 0),
            fallback_window_minutes: 5,
            boot_sync_timeout_ms: 1_000,
            boot_poll_step_ms: 50,
        }
    }
}

/// Removable storage medium.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageConfig<'a> {
    /// FAT short (8.3) name of the log file in the root directory.
    pub log_path: &'a str,
    /// Bus clock used when mounting. Kept low to tolerate marginal wiring and cards.
    pub speed_hz: u32,
}

impl Default for StorageConfig<'_> {
    fn default() -> Self {
        Self {
            log_path: "WEATHER.CSV",
            speed_hz: 1_000_000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
    /// Link checks at boot before giving up and running offline.
    pub connect_attempts: u8,
    pub connect_interval_ms: u32,
}

impl Default for InternetConfig<'_> {
    fn default() -> Self {
        Self {
            ssid: "",
            password: "",
            connect_attempts: 20,
            connect_interval_ms: 500,
        }
    }
}
