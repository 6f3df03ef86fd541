//! slotswap.toml configuration parser.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SlotPair;

/// Errors raised while loading or validating `slotswap.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotswapConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub slots: SlotsConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    pub build: Option<BuildConfig>,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub state: StateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Prefix for unit names (`{name}-a`, `{name}-b`).
    pub name: String,
    /// Host the slot ports are reachable on from this machine.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotsConfig {
    pub a: u16,
    pub b: u16,
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self { a: 3402, b: 3403 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub admin_url: String,
    /// Host part of the upstream dial addresses in the proxy document.
    pub upstream_host: String,
    pub request_timeout: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            admin_url: "http://127.0.0.1:2019".to_string(),
            upstream_host: "localhost".to_string(),
            request_timeout: "5s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_context")]
    pub context: String,
    pub dockerfile: Option<String>,
    /// Image repository; defaults to the service name.
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Port the service listens on inside the unit.
    pub container_port: u16,
    pub stop_grace: String,
    /// Lines of unit output captured when a health gate fails.
    pub log_tail: u32,
    pub env: HashMap<String, String>,
    pub network: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            container_port: 3000,
            stop_grace: "10s".to_string(),
            log_tail: 50,
            env: HashMap::new(),
            network: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub deploy_timeout: String,
    pub rollback_timeout: String,
    pub interval: String,
    /// Timeout for a single probe request.
    pub probe_timeout: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            deploy_timeout: "60s".to_string(),
            rollback_timeout: "30s".to_string(),
            interval: "2s".to_string(),
            probe_timeout: "2s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: ".slotswap/state.redb".to_string(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_context() -> String {
    ".".to_string()
}

impl SlotswapConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SlotswapConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::Invalid("service.name must not be empty".into()));
        }
        if self.slots.a == self.slots.b {
            return Err(ConfigError::Invalid(format!(
                "slots.a and slots.b must differ (both {})",
                self.slots.a
            )));
        }
        if !self.service.health_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "service.health_path must start with '/': {}",
                self.service.health_path
            )));
        }
        let durations = [
            ("proxy.request_timeout", &self.proxy.request_timeout),
            ("runtime.stop_grace", &self.runtime.stop_grace),
            ("health.deploy_timeout", &self.health.deploy_timeout),
            ("health.rollback_timeout", &self.health.rollback_timeout),
            ("health.interval", &self.health.interval),
            ("health.probe_timeout", &self.health.probe_timeout),
        ];
        for (key, value) in durations {
            if parse_duration(value).is_none() {
                return Err(ConfigError::Invalid(format!("{key}: bad duration {value:?}")));
            }
        }
        Ok(())
    }

    pub fn slots(&self) -> SlotPair {
        SlotPair::new(self.slots.a, self.slots.b)
    }

    /// Image repository for built artifacts.
    pub fn image_repository(&self) -> &str {
        self.build
            .as_ref()
            .and_then(|b| b.image.as_deref())
            .unwrap_or(&self.service.name)
    }

    pub fn deploy_timeout(&self) -> Duration {
        parse_duration(&self.health.deploy_timeout).unwrap_or(Duration::from_secs(60))
    }

    pub fn rollback_timeout(&self) -> Duration {
        parse_duration(&self.health.rollback_timeout).unwrap_or(Duration::from_secs(30))
    }

    pub fn probe_interval(&self) -> Duration {
        parse_duration(&self.health.interval).unwrap_or(Duration::from_secs(2))
    }

    pub fn probe_timeout(&self) -> Duration {
        parse_duration(&self.health.probe_timeout).unwrap_or(Duration::from_secs(2))
    }

    pub fn stop_grace(&self) -> Duration {
        parse_duration(&self.runtime.stop_grace).unwrap_or(Duration::from_secs(10))
    }

    pub fn proxy_timeout(&self) -> Duration {
        parse_duration(&self.proxy.request_timeout).unwrap_or(Duration::from_secs(5))
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
