//! Configuration for the monitor, its transport and the remote API
//!
//! Every value defaults to the observed production constants from
//! `quakeguard_core::constants`. A JSON document may override any subset:
//!
//! ```json
//! {
//!   "profiles": [{ "label": "variance_burst", ... }],
//!   "global_cooldown_ms": 30000,
//!   "transport": { "host": "quake.example.net", "port": 8080, "path": "/ws",
//!                  "reconnect": { "max_attempts": 5, "retry_delay_ms": 5000 } },
//!   "api": { "base_url": "https://quake.example.net/api", "bearer_token": "..." }
//! }
//! ```

use std::time::Duration;

use quakeguard_core::{
    constants::{
        buffers::MAX_PROFILES,
        time::{
            API_REQUEST_TIMEOUT_MS, GLOBAL_COOLDOWN_MS, MAX_RECONNECT_ATTEMPTS, PROBE_TIMEOUT_MS,
            RECONNECT_DELAY_MS, SESSION_CONNECT_TIMEOUT_MS,
        },
    },
    DetectionProfile, DetectionResult, Detector, TimeSource,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Fixed-delay bounded retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Failed attempts before giving up for good
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub probe_timeout_ms: u64,
}

impl ReconnectPolicy {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RECONNECT_ATTEMPTS,
            retry_delay_ms: RECONNECT_DELAY_MS,
            probe_timeout_ms: PROBE_TIMEOUT_MS,
        }
    }
}

/// Coordinator endpoint and retry behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_path() -> String {
    String::from("/")
}

fn default_connect_timeout() -> u64 {
    SESSION_CONNECT_TIMEOUT_MS
}

impl TransportConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path: default_path(),
            reconnect: ReconnectPolicy::default(),
            connect_timeout_ms: SESSION_CONNECT_TIMEOUT_MS,
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.reconnect.max_attempts = attempts;
        self
    }

    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.reconnect.retry_delay_ms = ms;
        self
    }

    pub fn probe_timeout_ms(mut self, ms: u64) -> Self {
        self.reconnect.probe_timeout_ms = ms;
        self
    }

    /// `host:port` for the reachability probe
    pub fn probe_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// WebSocket URL of the duplex session
    pub fn session_url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("ws://{}:{}{}", self.host, self.port, path)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("transport host is empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("transport port must be non-zero".into()));
        }
        if self.reconnect.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// Remote event API endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub base_url: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// `(header, value)` pair, used when no bearer token is set
    #[serde(default)]
    pub api_key: Option<(String, String)>,
    #[serde(default = "default_api_timeout")]
    pub timeout_ms: u64,
}

fn default_api_timeout() -> u64 {
    API_REQUEST_TIMEOUT_MS
}

/// Everything the monitor needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Run in order; the first admitted candidate wins a sample
    pub profiles: Vec<DetectionProfile>,
    pub global_cooldown_ms: u64,
    pub transport: Option<TransportConfig>,
    pub api: Option<ApiEndpoint>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            profiles: vec![
                DetectionProfile::variance_burst(),
                DetectionProfile::moving_average(),
            ],
            global_cooldown_ms: GLOBAL_COOLDOWN_MS,
            transport: None,
            api: None,
        }
    }
}

impl MonitorConfig {
    /// Parses and validates a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profiles.is_empty() {
            return Err(ConfigError::Invalid("at least one detection profile is required".into()));
        }
        if self.profiles.len() > MAX_PROFILES {
            return Err(ConfigError::Invalid(format!(
                "at most {MAX_PROFILES} detection profiles are supported"
            )));
        }
        for profile in &self.profiles {
            profile
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("{}: {e}", profile.label.name())))?;
        }
        if let Some(transport) = &self.transport {
            transport.validate()?;
        }
        if let Some(api) = &self.api {
            if !api.base_url.starts_with("http://") && !api.base_url.starts_with("https://") {
                return Err(ConfigError::Invalid(
                    "api base_url must start with http:// or https://".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn build_detector<T: TimeSource>(&self, clock: T) -> DetectionResult<Detector<T>> {
        Detector::with_profiles(clock, &self.profiles, self.global_cooldown_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quakeguard_core::{FixedTime, ProfileLabel};

    #[test]
    fn empty_document_uses_defaults() {
        let config = MonitorConfig::from_json_str("{}").unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.build_detector(FixedTime::new(0)).unwrap().profile_count(), 2);
    }

    #[test]
    fn transport_defaults_fill_in() {
        let config = MonitorConfig::from_json_str(
            r#"{"transport": {"host": "quake.example.net", "port": 8080, "path": "ws"}}"#,
        )
        .unwrap();

        let transport = config.transport.unwrap();
        assert_eq!(transport.reconnect, ReconnectPolicy::default());
        assert_eq!(transport.session_url(), "ws://quake.example.net:8080/ws");
        assert_eq!(transport.probe_address(), "quake.example.net:8080");
    }

    #[test]
    fn custom_profiles_load() {
        let sustained = serde_json::to_value(DetectionProfile::sustained_motion()).unwrap();
        let json = serde_json::json!({ "profiles": [sustained], "global_cooldown_ms": 10000 });

        let config = MonitorConfig::from_json_str(&json.to_string()).unwrap();
        assert_eq!(config.profiles[0].label, ProfileLabel::SustainedMotion);
        assert_eq!(config.global_cooldown_ms, 10_000);
    }

    #[test]
    fn rejects_invalid_documents() {
        assert!(matches!(
            MonitorConfig::from_json_str(r#"{"profiles": []}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MonitorConfig::from_json_str(r#"{"transport": {"host": "", "port": 1}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MonitorConfig::from_json_str("[1, 2"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn builder_overrides_policy() {
        let transport = TransportConfig::new("localhost", 9000)
            .max_attempts(3)
            .retry_delay_ms(250);

        assert_eq!(transport.reconnect.max_attempts, 3);
        assert_eq!(transport.reconnect.retry_delay(), Duration::from_millis(250));
        assert_eq!(transport.reconnect.probe_timeout_ms, PROBE_TIMEOUT_MS);
    }
}
