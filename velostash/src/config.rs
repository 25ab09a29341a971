//! Tunables for cleanup, eviction and compression.
//!
//! The thresholds are product decisions rather than derived limits, so they live here
//! instead of in the passes that use them. Every section has defaults matching the
//! marketplace's historical behaviour and can be overridden from TOML:
//!
//! ```
//! use velostash::GatewayConfig;
//!
//! let config = GatewayConfig::from_toml_str(
//!     r#"
//!     [cleanup]
//!     chat_thread_limit = 100
//!     "#,
//! )?;
//! assert_eq!(config.cleanup.chat_thread_limit, 100);
//! assert_eq!(config.cleanup.seen_notification_limit, 20);
//! # Ok::<(), velostash::ConfigError>(())
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Quota assumed when the platform cannot report one: 5 MiB.
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// Thresholds for [`StorageGateway::cleanup`](crate::StorageGateway::cleanup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupPolicy {
    /// Completed rentals younger than this survive a non-aggressive pass.
    pub completed_rental_grace_days: u32,
    /// Imageless listings older than this are dropped by an aggressive pass.
    pub stale_bike_age_days: u32,
    /// Routes older than this are dropped by an aggressive pass.
    pub route_max_age_days: u32,
    pub chat_thread_limit: usize,
    pub seen_notification_limit: usize,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            completed_rental_grace_days: 7,
            stale_bike_age_days: 365,
            route_max_age_days: 30,
            chat_thread_limit: 50,
            seen_notification_limit: 20,
        }
    }
}

impl CleanupPolicy {
    pub fn completed_rental_grace_millis(&self) -> i64 {
        i64::from(self.completed_rental_grace_days) * DAY_MILLIS
    }

    pub fn stale_bike_age_millis(&self) -> i64 {
        i64::from(self.stale_bike_age_days) * DAY_MILLIS
    }

    pub fn route_max_age_millis(&self) -> i64 {
        i64::from(self.route_max_age_days) * DAY_MILLIS
    }
}

/// Fixed retention sizes for [`StorageGateway::emergency_cleanup`](crate::StorageGateway::emergency_cleanup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyPolicy {
    pub routes_kept: usize,
    pub chat_thread_limit: usize,
    pub seen_notification_limit: usize,
}

impl Default for EmergencyPolicy {
    fn default() -> Self {
        Self {
            routes_kept: 20,
            chat_thread_limit: 20,
            seen_notification_limit: 10,
        }
    }
}

/// Parameters for [`compress_image`](crate::compress_image).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionSettings {
    /// Largest allowed side in pixels; bigger images are scaled down proportionally.
    pub max_dimension: u32,
    /// JPEG quality in `0.0..=1.0`.
    pub quality: f32,
    /// Encoded length above which a second, lower quality pass runs.
    pub size_threshold: usize,
    pub retry_quality_step: f32,
    pub min_quality: f32,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            max_dimension: 800,
            quality: 0.7,
            size_threshold: 500_000,
            retry_quality_step: 0.1,
            min_quality: 0.5,
        }
    }
}

impl CompressionSettings {
    pub fn retry_quality(&self) -> f32 {
        (self.quality - self.retry_quality_step).max(self.min_quality)
    }
}

/// The administrator account synthesized when missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSeed {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Default for AdminSeed {
    fn default() -> Self {
        Self {
            id: 1,
            name: "Admin".to_string(),
            email: "admin@cychris.com".to_string(),
            password: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub cleanup: CleanupPolicy,
    pub emergency: EmergencyPolicy,
    pub compression: CompressionSettings,
    pub default_quota_bytes: u64,
    pub admin: AdminSeed,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            cleanup: CleanupPolicy::default(),
            emergency: EmergencyPolicy::default(),
            compression: CompressionSettings::default(),
            default_quota_bytes: DEFAULT_QUOTA_BYTES,
            admin: AdminSeed::default(),
        }
    }
}

impl GatewayConfig {
    /// Parses a configuration from TOML, filling omitted fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the text is not valid TOML or a value is out of range.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let compression = &self.compression;
        for (name, value) in [
            ("compression.quality", compression.quality),
            ("compression.min_quality", compression.min_quality),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within 0.0..=1.0, got {value}"
                )));
            }
        }
        if compression.max_dimension == 0 {
            return Err(ConfigError::Invalid(
                "compression.max_dimension must be positive".to_string(),
            ));
        }
        if self.admin.email.trim().is_empty() || self.admin.password.is_empty() {
            return Err(ConfigError::Invalid(
                "admin.email and admin.password must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_historical_thresholds() {
        let config = GatewayConfig::default();
        assert_eq!(config.cleanup.completed_rental_grace_millis(), 7 * DAY_MILLIS);
        assert_eq!(config.emergency.routes_kept, 20);
        assert_eq!(config.default_quota_bytes, 5_242_880);
        assert!((config.compression.retry_quality() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_retry_quality_is_floored() {
        let settings = CompressionSettings {
            quality: 0.55,
            ..CompressionSettings::default()
        };
        assert!((settings.retry_quality() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_out_of_range_quality() {
        let result = GatewayConfig::from_toml_str("[compression]\nquality = 1.5\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let result = GatewayConfig::from_toml_str("[cleanup\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
