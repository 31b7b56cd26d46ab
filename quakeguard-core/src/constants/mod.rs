//! Constants for QuakeGuard Core
//!
//! Every observed default of the detection engine and the transport channel
//! lives here, grouped by domain:
//! - **Detection**: thresholds, window sizes, magnitude scaling
//! - **Time**: cooldowns, probe timeouts, reconnect delays
//! - **Buffers**: fixed capacities of the no-alloc data structures
//!
//! ## Usage Guidelines
//!
//! 1. Always use these constants instead of magic numbers
//! 2. Keep the unit in the name (`_MS`, `_MPS2`)
//! 3. Profiles copy these at construction; changing a constant never
//!    changes an already-built profile

/// Classification thresholds and signal-conditioning parameters.
pub mod detection;

/// Cooldowns, timeouts and retry intervals.
pub mod time;

/// Buffer capacities for the fixed-size detection structures.
pub mod buffers;

pub use detection::{
    AMPLITUDE_THRESHOLD_MPS2, VARIANCE_THRESHOLD, REQUIRED_CONSECUTIVE_HITS,
    MIN_REPORTABLE_MAGNITUDE, MAGNITUDE_SCALE, STANDARD_GRAVITY_MPS2,
    LOW_PASS_ALPHA,
};

pub use time::{
    MS_PER_SECOND, VARIANCE_PROFILE_COOLDOWN_MS, MOVING_AVERAGE_COOLDOWN_MS,
    PROBE_TIMEOUT_MS, RECONNECT_DELAY_MS, MAX_RECONNECT_ATTEMPTS,
};

pub use buffers::{MAX_WINDOW_SIZE, MAX_PROFILES};
