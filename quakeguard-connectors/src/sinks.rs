//! Collaborator seams
//!
//! The monitor hands every confirmed event to storage, notification and the
//! remote API, and asks a geocoder for a place name. All of these are
//! external; failures are logged and never stop the monitor.

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use parking_lot::Mutex;
use quakeguard_core::{LocationFix, SeismicEvent};
use thiserror::Error;

use crate::protocol::EventNotification;

pub const LOCATION_UNAVAILABLE: &str = "Location Unavailable";
pub const GEOCODING_ERROR: &str = "Geocoding Error";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink rejected event: {0}")]
    Rejected(String),

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
#[error("Reverse geocoding failed: {0}")]
pub struct GeocodeError(pub String);

/// Local persistence, assumed eventually durable
#[async_trait]
pub trait StorageSink: Send + Sync {
    async fn insert(&self, event: &SeismicEvent) -> Result<(), SinkError>;
}

/// User-facing presentation
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Event detected by this device
    async fn present_detection(&self, event: &SeismicEvent) -> Result<(), SinkError>;

    /// Event reported by the coordinator
    async fn present_remote(&self, alert: &EventNotification) -> Result<(), SinkError>;
}

#[async_trait]
pub trait GeocodingService: Send + Sync {
    /// Place name for a coordinate; `Ok(None)` when the lookup has no answer
    async fn reverse_geocode(&self, latitude: f64, longitude: f64)
        -> Result<Option<String>, GeocodeError>;
}

/// Remote event API; one attempt per event, no retry
#[async_trait]
pub trait EventApi: Send + Sync {
    async fn submit(&self, event: &SeismicEvent) -> bool;
}

/// Picks the label stored with an event
pub async fn resolve_location_name(
    position: Option<LocationFix>,
    geocoder: &dyn GeocodingService,
) -> String {
    let Some(fix) = position else {
        return String::from(LOCATION_UNAVAILABLE);
    };

    match geocoder.reverse_geocode(fix.latitude, fix.longitude).await {
        Ok(Some(name)) if !name.trim().is_empty() => name,
        Ok(_) => format!("Lat: {:.4}, Lon: {:.4}", fix.latitude, fix.longitude),
        Err(e) => {
            log::warn!("{}", e);
            String::from(GEOCODING_ERROR)
        }
    }
}

/// Keeps events in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    events: Arc<Mutex<Vec<SeismicEvent>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SeismicEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl StorageSink for MemoryStorage {
    async fn insert(&self, event: &SeismicEvent) -> Result<(), SinkError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Presents through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn present_detection(&self, event: &SeismicEvent) -> Result<(), SinkError> {
        info!(
            "Earthquake detected: magnitude {:.1} near {} ({})",
            event.magnitude(),
            event.location_name(),
            event.id()
        );
        Ok(())
    }

    async fn present_remote(&self, alert: &EventNotification) -> Result<(), SinkError> {
        info!("{}", alert.summary());
        Ok(())
    }
}

/// Geocoder that never knows a name
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGeocoder;

#[async_trait]
impl GeocodingService for NoGeocoder {
    async fn reverse_geocode(&self, _: f64, _: f64) -> Result<Option<String>, GeocodeError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<Option<String>, ()>);

    #[async_trait]
    impl GeocodingService for Fixed {
        async fn reverse_geocode(&self, _: f64, _: f64) -> Result<Option<String>, GeocodeError> {
            self.0.clone().map_err(|_| GeocodeError("offline".into()))
        }
    }

    const FIX: Option<LocationFix> = Some(LocationFix::new(35.681236, 139.767125, 0));

    #[tokio::test]
    async fn no_position() {
        let name = resolve_location_name(None, &Fixed(Ok(Some("Tokyo".into())))).await;
        assert_eq!(name, LOCATION_UNAVAILABLE);
    }

    #[tokio::test]
    async fn geocoded_name() {
        let name = resolve_location_name(FIX, &Fixed(Ok(Some("Chiyoda, Tokyo".into())))).await;
        assert_eq!(name, "Chiyoda, Tokyo");
    }

    #[tokio::test]
    async fn coordinates_when_no_answer() {
        let name = resolve_location_name(FIX, &Fixed(Ok(None))).await;
        assert_eq!(name, "Lat: 35.6812, Lon: 139.7671");

        let blank = resolve_location_name(FIX, &Fixed(Ok(Some("  ".into())))).await;
        assert_eq!(blank, name);
    }

    #[tokio::test]
    async fn placeholder_on_error() {
        let name = resolve_location_name(FIX, &Fixed(Err(()))).await;
        assert_eq!(name, GEOCODING_ERROR);
    }
}
