//! Runtime application configuration loaded from the environment.

use super::validation::validate_setting;

pub const DEFAULT_SERVER_PORT: u16 = 3001;
pub const DEFAULT_MAX_LOGO_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_TEMP_RETENTION_HOURS: u64 = 24;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_APP_ENV: &str = "development";

/// Runtime configuration. The data directory is resolved separately
/// (see [`crate::data_dir`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server_port: u16,
    pub max_logo_bytes: usize,
    pub temp_retention_hours: u64,
    pub sweep_interval_secs: u64,
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_SERVER_PORT,
            max_logo_bytes: DEFAULT_MAX_LOGO_BYTES,
            temp_retention_hours: DEFAULT_TEMP_RETENTION_HOURS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            environment: DEFAULT_APP_ENV.into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn load() -> Result<Self, anyhow::Error> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    /// Build a config from any key lookup. Unset keys take their defaults;
    /// values that fail validation are logged and replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let g = |key: &str| -> String {
            let value = lookup(key).unwrap_or_default();
            let value = value.trim();
            if value.is_empty() {
                return String::new();
            }
            match validate_setting(key, value) {
                Ok(()) => value.to_string(),
                Err(e) => {
                    tracing::warn!(key = key, value = value, "Ignoring invalid setting: {e}");
                    String::new()
                }
            }
        };

        Self {
            server_port: parse_u16(&g("SERVER_PORT"), DEFAULT_SERVER_PORT),
            max_logo_bytes: parse_usize(&g("MAX_LOGO_BYTES"), DEFAULT_MAX_LOGO_BYTES),
            temp_retention_hours: parse_u64(&g("TEMP_RETENTION_HOURS"), DEFAULT_TEMP_RETENTION_HOURS),
            sweep_interval_secs: parse_u64(&g("SWEEP_INTERVAL_SECS"), DEFAULT_SWEEP_INTERVAL_SECS),
            environment: {
                let env = g("APP_ENV");
                if env.is_empty() { DEFAULT_APP_ENV.into() } else { env }
            },
        }
    }

    pub fn temp_retention(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.temp_retention_hours * 3600)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}

fn parse_u16(s: &str, default: u16) -> u16 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

fn parse_u64(s: &str, default: u64) -> u64 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

fn parse_usize(s: &str, default: usize) -> usize {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}
