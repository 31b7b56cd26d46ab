//! Time-Related Constants
//!
//! Cooldowns, timeouts and retry intervals for detection and transport.
//! All durations are in milliseconds.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

// ===== DETECTION COOLDOWNS =====

/// Cooldown of the amplitude/variance profile (milliseconds).
///
/// 30 seconds between detections keeps one shaking episode from being
/// reported many times.
pub const VARIANCE_PROFILE_COOLDOWN_MS: u64 = 30 * MS_PER_SECOND;

/// Cooldown of the moving-average profile (milliseconds).
pub const MOVING_AVERAGE_COOLDOWN_MS: u64 = 10 * MS_PER_SECOND;

/// Device-wide cooldown enforced across all profiles (milliseconds).
pub const GLOBAL_COOLDOWN_MS: u64 = VARIANCE_PROFILE_COOLDOWN_MS;

// ===== TRANSPORT =====

/// Bounded wait for the reachability probe's TCP connect (milliseconds).
pub const PROBE_TIMEOUT_MS: u64 = 5 * MS_PER_SECOND;

/// Fixed delay before the next connection attempt (milliseconds).
///
/// Constant, not exponential.
pub const RECONNECT_DELAY_MS: u64 = 5 * MS_PER_SECOND;

/// Failed attempts after which the supervisor gives up.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// WebSocket handshake timeout (milliseconds).
pub const SESSION_CONNECT_TIMEOUT_MS: u64 = 10 * MS_PER_SECOND;

/// Request timeout for the remote event API (milliseconds).
pub const API_REQUEST_TIMEOUT_MS: u64 = 10 * MS_PER_SECOND;

/// Cooldown of the sustained-motion profile (milliseconds).
///
/// A sustained-motion window stays latched for five seconds after it
/// stops matching.
pub const SUSTAINED_PROFILE_COOLDOWN_MS: u64 = 5 * MS_PER_SECOND;
