//! Buffer Sizes
//!
//! Fixed capacities of the detection structures. Nothing on the sampling
//! path allocates; these bound the stack footprint instead.

/// Largest window any profile may request (readings).
///
/// Covers both observed sizes (10 and 50). Each slot is 24 bytes
/// (`Option<MagnitudeReading>`), so a window costs ~1.5KB.
pub const MAX_WINDOW_SIZE: usize = 64;

/// Profile chains a single detector can run side by side.
pub const MAX_PROFILES: usize = 4;
