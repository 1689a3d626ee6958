// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core configuration.
//!
//! One explicit settings value is threaded through the coordinator; there is
//! no process-global state. The partition entropy seed lives here too, so
//! tests can pin assignment behaviour.

use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;

/// Length of the partition entropy seed.
pub const SEED_LEN: usize = 32;

/// Entropy source for partition assignment, fixed per deployment.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PartitionSeed([u8; SEED_LEN]);

impl PartitionSeed {
    pub const fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    /// Decode a seed from its hex representation in configuration files.
    pub fn from_hex(value: &str) -> Result<Self, SettingsError> {
        let bytes = hex::decode(value).map_err(|_| SettingsError::InvalidSeed)?;
        let bytes: [u8; SEED_LEN] = bytes
            .try_into()
            .map_err(|_| SettingsError::InvalidSeed)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for PartitionSeed {
    // Entropy is not for logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PartitionSeed(..)")
    }
}

/// The settings object the core reads. Constructed from host configuration
/// via [`Settings::from_raw`] or directly in tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// IANA zone used when a course omits one.
    pub default_course_timezone: Tz,

    /// CPU budget per custom-grader call, in milliseconds.
    pub sandbox_cpu_ms: u64,

    /// Memory budget per custom-grader call, in bytes.
    pub sandbox_mem_bytes: u64,

    /// Max retries on optimistic-lock conflict in the state store.
    pub write_retry: u32,

    pub partition_seed: PartitionSeed,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_course_timezone: chrono_tz::UTC,
            sandbox_cpu_ms: 100,
            sandbox_mem_bytes: 4 * 1024 * 1024,
            write_retry: 3,
            partition_seed: PartitionSeed::from_bytes([0; SEED_LEN]),
        }
    }
}

/// Settings as they appear in host configuration, before validation.
#[derive(Clone, Debug, Deserialize)]
pub struct RawSettings {
    pub default_course_timezone: String,
    #[serde(default = "defaults::sandbox_cpu_ms")]
    pub sandbox_cpu_ms: u64,
    #[serde(default = "defaults::sandbox_mem_bytes")]
    pub sandbox_mem_bytes: u64,
    #[serde(default = "defaults::write_retry")]
    pub write_retry: u32,
    /// Hex-encoded, 32 bytes.
    pub partition_seed: String,
}

mod defaults {
    pub fn sandbox_cpu_ms() -> u64 {
        100
    }

    pub fn sandbox_mem_bytes() -> u64 {
        4 * 1024 * 1024
    }

    pub fn write_retry() -> u32 {
        3
    }
}

impl Settings {
    pub fn from_raw(raw: RawSettings) -> Result<Self, SettingsError> {
        let default_course_timezone: Tz = raw
            .default_course_timezone
            .parse()
            .map_err(|_| SettingsError::UnknownTimezone(raw.default_course_timezone.clone()))?;

        if raw.sandbox_cpu_ms == 0 || raw.sandbox_mem_bytes == 0 {
            return Err(SettingsError::ZeroBudget);
        }

        Ok(Self {
            default_course_timezone,
            sandbox_cpu_ms: raw.sandbox_cpu_ms,
            sandbox_mem_bytes: raw.sandbox_mem_bytes,
            write_retry: raw.write_retry,
            partition_seed: PartitionSeed::from_hex(&raw.partition_seed)?,
        })
    }

    /// Resolve a course's declared timezone, falling back to the default.
    pub fn course_timezone(&self, declared: Option<&str>) -> Tz {
        declared
            .and_then(|name| name.parse().ok())
            .unwrap_or(self.default_course_timezone)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SettingsError {
    #[error("unknown IANA timezone {0:?}")]
    UnknownTimezone(String),

    #[error("partition seed must be {SEED_LEN} hex-encoded bytes")]
    InvalidSeed,

    #[error("sandbox budgets must be non-zero")]
    ZeroBudget,
}

#[cfg(test)]
mod tests {
    use super::{RawSettings, Settings, SettingsError, SEED_LEN};

    fn raw() -> RawSettings {
        RawSettings {
            default_course_timezone: "Europe/Amsterdam".to_owned(),
            sandbox_cpu_ms: 100,
            sandbox_mem_bytes: 1024 * 1024,
            write_retry: 3,
            partition_seed: "11".repeat(SEED_LEN),
        }
    }

    #[test]
    fn parses_valid_settings() {
        let settings = Settings::from_raw(raw()).unwrap();
        assert_eq!(settings.default_course_timezone, chrono_tz::Europe::Amsterdam);
        assert_eq!(settings.partition_seed.as_bytes()[0], 0x11);
    }

    #[test]
    fn rejects_unknown_timezone() {
        let mut bad = raw();
        bad.default_course_timezone = "Mars/Olympus_Mons".to_owned();
        assert_eq!(
            Settings::from_raw(bad),
            Err(SettingsError::UnknownTimezone("Mars/Olympus_Mons".to_owned()))
        );
    }

    #[test]
    fn rejects_short_seed() {
        let mut bad = raw();
        bad.partition_seed = "1234".to_owned();
        assert_eq!(Settings::from_raw(bad), Err(SettingsError::InvalidSeed));
    }

    #[test]
    fn course_timezone_falls_back_to_default() {
        let settings = Settings::from_raw(raw()).unwrap();
        assert_eq!(
            settings.course_timezone(Some("Asia/Tokyo")),
            chrono_tz::Asia::Tokyo
        );
        assert_eq!(
            settings.course_timezone(None),
            chrono_tz::Europe::Amsterdam
        );
        // Unparseable declarations fall back too rather than failing a view.
        assert_eq!(
            settings.course_timezone(Some("not-a-zone")),
            chrono_tz::Europe::Amsterdam
        );
    }
}
