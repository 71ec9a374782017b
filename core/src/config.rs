//! Navigator configuration.
//!
//! Loaded from TOML, then overridden by environment variables:
//!
//! ```toml
//! auto_resume_delay_ms = 650
//! log_level = "warning"
//! restoration_key = "v3"
//! ```
//!
//! | Variable | Field |
//! |---|---|
//! | `NAVSTACK_LOG` | `log_level` |
//! | `NAVSTACK_AUTO_RESUME_MS` | `auto_resume_delay` |
//! | `NAVSTACK_RESTORATION_KEY` | `restoration_key` |

use crate::error::NavigationError;
use crate::log::LogLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_AUTO_RESUME_DELAY: Duration = Duration::from_millis(650);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Delay applied by `ResumeDirective::Auto`.
    #[serde(rename = "auto_resume_delay_ms", with = "duration_ms")]
    pub auto_resume_delay: Duration,
    pub log_level: LogLevel,
    /// Snapshots are neither written nor read without a key.
    pub restoration_key: Option<String>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        NavigatorConfig {
            auto_resume_delay: DEFAULT_AUTO_RESUME_DELAY,
            log_level: LogLevel::Info,
            restoration_key: None,
        }
    }
}

impl NavigatorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, NavigationError> {
        toml::from_str(source).map_err(|e| NavigationError::Config(e.to_string()))
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, NavigationError> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, NavigationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("NAVSTACK_LOG") {
            self.log_level = level.parse().map_err(NavigationError::Config)?;
        }
        if let Some(ms) = lookup("NAVSTACK_AUTO_RESUME_MS") {
            let ms: u64 = ms.trim().parse().map_err(|_| {
                NavigationError::Config(format!("invalid NAVSTACK_AUTO_RESUME_MS `{ms}`"))
            })?;
            self.auto_resume_delay = Duration::from_millis(ms);
        }
        if let Some(key) = lookup("NAVSTACK_RESTORATION_KEY") {
            let key = key.trim().to_string();
            self.restoration_key = if key.is_empty() { None } else { Some(key) };
        }
        Ok(self)
    }

    pub fn with_restoration_key(mut self, key: impl Into<String>) -> Self {
        self.restoration_key = Some(key.into());
        self
    }

    pub fn with_auto_resume_delay(mut self, delay: Duration) -> Self {
        self.auto_resume_delay = delay;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
