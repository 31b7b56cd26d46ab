//! Resilient transport and collaborator seams for QuakeGuard
//!
//! ## Overview
//!
//! `quakeguard-core` decides *whether* the ground is shaking. This crate
//! moves the result off the sampling path and keeps the device in touch
//! with the coordinator:
//!
//! ```text
//!  SampleSource ──callback──→ Detector ──unbounded mpsc──→ dispatcher task
//!                                                            │ geocode
//!                                                            │ store
//!                                                            │ notify
//!                                                            └ POST /earthquakes
//!
//!  LocationCell ──→ TransportHandle ──commands──→ ConnectionSupervisor
//!                                                   │ TCP probe (5 s)
//!                                                   │ WebSocket session
//!                                                   └ fixed 5 s retry, max 5
//! ```
//!
//! ## Transport Lifecycle
//!
//! The reconnect logic is a pure state machine ([`supervisor::ReconnectMachine`])
//! driven by an async task. Every wait in the task (probe, handshake, retry
//! delay, open session) also watches a stop signal, so a pending reconnect is
//! cancelled promptly and idempotently from any thread.
//!
//! ## Delivery Semantics
//!
//! Messages are sent only while the session is connected. Anything sent
//! while disconnected is dropped and reported as `false` to the caller;
//! nothing is queued for resend.
//!
//! ## Example Usage
//!
//! ```no_run
//! use quakeguard_connectors::{
//!     config::MonitorConfig,
//!     engine::QuakeMonitor,
//!     source::ManualSampleSource,
//! };
//! use quakeguard_core::{LocationFix, SystemTime};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MonitorConfig::from_json_str(r#"{
//!     "transport": { "host": "quake.example.net", "port": 8080, "path": "/ws" }
//! }"#)?;
//!
//! let source = Arc::new(ManualSampleSource::new());
//! let mut monitor = QuakeMonitor::builder(config, SystemTime)
//!     .source(source.clone())
//!     .build()?;
//!
//! monitor.start()?;
//! monitor.update_location(LocationFix::new(35.68, 139.69, 0));
//! // ... platform code feeds samples into `source` ...
//! monitor.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod probe;
pub mod protocol;
pub mod session;
pub mod sinks;
pub mod source;
pub mod supervisor;

#[cfg(feature = "http")]
pub mod http;

// Re-export common types
pub use config::{ConfigError, MonitorConfig, ReconnectPolicy, TransportConfig};
pub use engine::QuakeMonitor;
pub use protocol::{EventNotification, OutboundMessage};
pub use supervisor::{ConnectionState, TransportHandle};

#[cfg(feature = "http")]
pub use http::{HttpConfig, HttpError, HttpEventApi};

use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Not connected")]
    NotConnected,

    #[error("Timeout after {0} ms")]
    Timeout(u64),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session closed: {0}")]
    Closed(String),
}

/// Connection statistics kept by the transport
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Frames handed to an open session
    pub messages_sent: u64,
    /// Frames the open session refused
    pub messages_failed: u64,
    /// Frames received from the coordinator
    pub messages_received: u64,
    /// Outbound messages dropped because no session was open
    pub messages_dropped: u64,
    /// Successful connects after the first one
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}
