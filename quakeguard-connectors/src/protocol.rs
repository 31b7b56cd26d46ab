//! JSON wire protocol of the coordinator channel
//!
//! Every frame is a text frame holding one JSON object with a `type` tag.
//!
//! Outbound:
//! ```json
//! {"type":"location","latitude":35.68,"longitude":139.69}
//! ```
//!
//! Inbound:
//! ```json
//! {"type":"earthquake","data":{"magnitude":4.2,"distance":12,"latitude":35.1,
//!  "longitude":139.2,"location":"Sagami Bay","timestamp":"2024-05-01T10:00:00Z"}}
//! ```
//!
//! Unknown `type` values are ignored. Frames that are not JSON, carry no
//! `type`, or miss required fields are dropped without closing the session.

use quakeguard_core::LocationFix;
use serde::{Deserialize, Serialize};

use crate::ConnectorError;

/// Messages the device sends
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Location { latitude: f64, longitude: f64 },
}

impl OutboundMessage {
    pub fn location(fix: &LocationFix) -> Self {
        OutboundMessage::Location {
            latitude: fix.latitude,
            longitude: fix.longitude,
        }
    }

    /// Text frame payload
    pub fn to_frame(&self) -> Result<String, ConnectorError> {
        serde_json::to_string(self).map_err(|e| ConnectorError::Protocol(e.to_string()))
    }
}

/// Earthquake reported by the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventNotification {
    pub magnitude: f64,
    /// Kilometres from the last position this device reported
    pub distance: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub location: String,
    pub timestamp: String,
}

impl EventNotification {
    /// One-line text for the notification sink
    pub fn summary(&self) -> String {
        format!(
            "Magnitude {:.1} earthquake detected {}km from your location",
            self.magnitude, self.distance
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InboundMessage {
    Earthquake {
        data: EventNotification,
    },
    #[serde(other)]
    Unknown,
}

/// What to do with one inbound text frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Alert(EventNotification),
    /// Well-formed frame of a type this device does not handle
    Ignored,
    /// Not decodable; carries the parser message
    Malformed(String),
}

pub fn decode_inbound(text: &str) -> Inbound {
    match serde_json::from_str::<InboundMessage>(text) {
        Ok(InboundMessage::Earthquake { data }) => Inbound::Alert(data),
        Ok(InboundMessage::Unknown) => Inbound::Ignored,
        Err(e) => Inbound::Malformed(e.to_string()),
    }
}
