//! Remote Event API over HTTP/HTTPS
//!
//! ## Overview
//!
//! Every confirmed event is posted once to the coordinator's REST API:
//!
//! ```text
//! POST {base_url}/earthquakes
//! Content-Type: application/json
//!
//! {"magnitude":3.4,"latitude":35.68,"longitude":139.69,"depth":0.0,
//!  "location":"Chiyoda, Tokyo","timestamp":"2024-05-01T10:00:00.000Z",
//!  "confidence":0.62}
//! ```
//!
//! Any 2xx status is success. There is no retry: a failed submission is
//! logged, counted, and reported as `false`.
//!
//! ## Implementation Choices
//!
//! - `ureq` keeps the client small and synchronous; requests run on
//!   tokio's blocking pool so the dispatcher task never blocks a worker
//! - JSON only
//! - Bearer token or API-key header authentication
//!
//! ## Example Usage
//!
//! ```no_run
//! use quakeguard_connectors::http::{HttpConfig, HttpEventApi};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpConfig::new("https://quake.example.net/api")
//!     .bearer_token("your-api-token")
//!     .timeout_secs(10);
//!
//! let api = HttpEventApi::new(config)?;
//! # let _ = api;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, warn};
use parking_lot::Mutex;
use quakeguard_core::{constants::time::API_REQUEST_TIMEOUT_MS, SeismicEvent, Timestamp};
use serde::Serialize;
use thiserror::Error;

use crate::config::ApiEndpoint;
use crate::sinks::EventApi;
use crate::ConnectionStats;

/// Path of the event collection under the base URL
pub const EVENTS_PATH: &str = "/earthquakes";

/// HTTP-specific errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(String),

    /// Server returned a non-2xx status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// HTTP configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Authentication method
    pub auth: AuthMethod,
    /// Custom headers
    pub headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

/// Authentication methods
#[derive(Debug, Clone)]
pub enum AuthMethod {
    None,
    Bearer(String),
    /// API key in a named header
    ApiKey { header: String, value: String },
}

impl HttpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_millis(API_REQUEST_TIMEOUT_MS),
            auth: AuthMethod::None,
            headers: HashMap::new(),
            user_agent: format!("QuakeGuard/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Configuration from the `api` section of a monitor document
    pub fn from_endpoint(endpoint: &ApiEndpoint) -> Self {
        let mut config = Self::new(endpoint.base_url.clone());
        config.timeout = Duration::from_millis(endpoint.timeout_ms);

        if let Some(token) = &endpoint.bearer_token {
            config = config.bearer_token(token.clone());
        } else if let Some((header, value)) = &endpoint.api_key {
            config = config.api_key(header.clone(), value.clone());
        }
        config
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthMethod::Bearer(token.into());
        self
    }

    pub fn api_key(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth = AuthMethod::ApiKey {
            header: header.into(),
            value: value.into(),
        };
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Request body of `POST /earthquakes`; the event id stays local
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPayload {
    pub magnitude: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub depth: f64,
    pub location: String,
    pub timestamp: String,
    pub confidence: f64,
}

impl From<&SeismicEvent> for EventPayload {
    fn from(event: &SeismicEvent) -> Self {
        Self {
            magnitude: event.magnitude(),
            latitude: event.latitude(),
            longitude: event.longitude(),
            depth: event.depth(),
            location: event.location_name().to_string(),
            timestamp: iso_timestamp(event.occurred_at()),
            confidence: event.confidence(),
        }
    }
}

/// `yyyy-MM-ddTHH:mm:ss.SSSZ` in UTC
pub fn iso_timestamp(millis: Timestamp) -> String {
    let instant = i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_default();
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Event API client using the lightweight ureq client
pub struct HttpEventApi {
    config: HttpConfig,
    agent: ureq::Agent,
    stats: Arc<Mutex<ConnectionStats>>,
}

impl HttpEventApi {
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(HttpError::Config(
                "Base URL must start with http:// or https://".into(),
            ));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();

        Ok(Self {
            config,
            agent,
            stats: Arc::new(Mutex::new(ConnectionStats::default())),
        })
    }

    /// Posts one JSON document, returning the status code
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<u16, HttpError> {
        let json =
            serde_json::to_string(body).map_err(|e| HttpError::Serialization(e.to_string()))?;
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let request = self.build_request(self.agent.post(&url));

        let result = tokio::task::spawn_blocking(move || request.send_string(&json))
            .await
            .map_err(|e| HttpError::Request(e.to_string()))?;

        let outcome = match result {
            Ok(response) => Ok(response.status()),
            Err(ureq::Error::Status(status, response)) => Err(HttpError::ServerError {
                status,
                message: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(e)) => Err(HttpError::Request(e.to_string())),
        };

        let mut stats = self.stats.lock();
        match &outcome {
            Ok(_) => stats.messages_sent += 1,
            Err(e) => {
                stats.messages_failed += 1;
                stats.last_error = Some(e.to_string());
            }
        }
        outcome
    }

    pub fn stats(&self) -> ConnectionStats {
        self.stats.lock().clone()
    }

    fn build_request(&self, mut request: ureq::Request) -> ureq::Request {
        match &self.config.auth {
            AuthMethod::None => {}
            AuthMethod::Bearer(token) => {
                request = request.set("Authorization", &format!("Bearer {}", token));
            }
            AuthMethod::ApiKey { header, value } => {
                request = request.set(header, value);
            }
        }

        for (name, value) in &self.config.headers {
            request = request.set(name, value);
        }

        request
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
    }
}

#[async_trait]
impl EventApi for HttpEventApi {
    async fn submit(&self, event: &SeismicEvent) -> bool {
        match self.post(EVENTS_PATH, &EventPayload::from(event)).await {
            Ok(status) => {
                debug!("{} submitted ({})", event.id(), status);
                (200..300).contains(&status)
            }
            Err(e) => {
                warn!("{} not submitted: {}", event.id(), e);
                false
            }
        }
    }
}
