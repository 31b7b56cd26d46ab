//! Latest known device position.
//!
//! [`LocationFix`] is a plain `Copy` value usable anywhere. The shared
//! cell (std only) has exactly one writer, [`LocationPublisher`], and any
//! number of readers, [`LocationHandle`]. A write replaces the whole fix
//! under one lock, so readers never see a latitude from one update paired
//! with a longitude from another.

use crate::time::Timestamp;

/// Position in decimal degrees (WGS84)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub updated_at: Timestamp,
}

impl LocationFix {
    pub const fn new(latitude: f64, longitude: f64, updated_at: Timestamp) -> Self {
        Self {
            latitude,
            longitude,
            updated_at,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[cfg(feature = "std")]
pub use cell::{location_cell, LocationHandle, LocationPublisher};

#[cfg(feature = "std")]
mod cell {
    use std::sync::Arc;

    use parking_lot::RwLock;

    use super::LocationFix;

    type Shared = Arc<RwLock<Option<LocationFix>>>;

    /// Creates an empty cell and returns its only writer plus a reader
    pub fn location_cell() -> (LocationPublisher, LocationHandle) {
        let shared: Shared = Arc::new(RwLock::new(None));
        (
            LocationPublisher {
                shared: shared.clone(),
            },
            LocationHandle { shared },
        )
    }

    /// Sole writer of a location cell. Not `Clone`.
    #[derive(Debug)]
    pub struct LocationPublisher {
        shared: Shared,
    }

    impl LocationPublisher {
        /// Replaces the stored fix, returning the previous one
        pub fn publish(&self, fix: LocationFix) -> Option<LocationFix> {
            self.shared.write().replace(fix)
        }

        pub fn handle(&self) -> LocationHandle {
            LocationHandle {
                shared: self.shared.clone(),
            }
        }
    }

    /// Read side of a location cell
    #[derive(Debug, Clone)]
    pub struct LocationHandle {
        shared: Shared,
    }

    impl LocationHandle {
        /// Most recently published fix, if any
        pub fn latest(&self) -> Option<LocationFix> {
            *self.shared.read()
        }

        pub fn is_known(&self) -> bool {
            self.shared.read().is_some()
        }
    }
}
