//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Engine configuration — device and app identity sent with the initialize
/// call, plus the server base URL.
///
/// Built once at startup by the host application; the engine never reads
/// device identity from the environment itself.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Server base URL, e.g. `https://onboarding.example.com`.
    pub base_url: String,
    /// Project API key.
    pub api_key: SecretString,
    /// Stable per-customer device/user identifier.
    pub device_id: String,
    /// OS version string.
    pub device_os: String,
    /// Host app version string.
    pub app_version: String,
    /// Device model name.
    pub device_model: String,
    /// Device locale / region identifier.
    pub device_locale: String,
    /// Storefront country code.
    pub app_store_country: String,
}

impl EngineConfig {
    /// Unwrap a required configuration value, turning absence into a
    /// [`ConfigError::MissingRequired`] carrying the key and an operator hint.
    pub fn required(
        key: &str,
        value: Option<String>,
        hint: &str,
    ) -> Result<String, ConfigError> {
        value.ok_or_else(|| ConfigError::MissingRequired {
            key: key.to_string(),
            hint: hint.to_string(),
        })
    }
}

/// Knobs for the opt-in `retrying` wrapper.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total invocations (initial try included).
    pub max_attempts: usize,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}
