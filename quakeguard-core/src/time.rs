//! Time sources for the detection engine
//!
//! Cooldowns and event timestamps are read from an injectable clock so the
//! detector can be driven deterministically in tests:
//! - System clock (wall time, requires std)
//! - Fixed clock (owned, advanced by hand)
//! - Manual clock (shared handle, advanced from another owner)

/// Timestamp in milliseconds since epoch (or since boot for monotonic sources)
pub type Timestamp = u64;

/// Source of time for the system
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs monotonic)
    fn is_wall_clock(&self) -> bool;
}

/// Milliseconds elapsed from `earlier` to `now`, zero if the clock stepped back
pub fn elapsed_ms(earlier: Timestamp, now: Timestamp) -> u64 {
    now.saturating_sub(earlier)
}

/// System time source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

#[cfg(feature = "std")]
impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Clock shared between an owner (e.g. a running monitor) and a test driver.
///
/// Clones observe the same counter.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: std::sync::Arc<core::sync::atomic::AtomicU64>,
}

#[cfg(feature = "std")]
impl ManualClock {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            millis: std::sync::Arc::new(core::sync::atomic::AtomicU64::new(timestamp)),
        }
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.millis.store(timestamp, core::sync::atomic::Ordering::Release);
    }

    pub fn advance(&self, ms: u64) {
        self.millis.fetch_add(ms, core::sync::atomic::Ordering::AcqRel);
    }
}

#[cfg(feature = "std")]
impl TimeSource for ManualClock {
    fn now(&self) -> Timestamp {
        self.millis.load(core::sync::atomic::Ordering::Acquire)
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}
