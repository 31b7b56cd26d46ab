//! Fixed-Capacity FIFO Window of Magnitude Readings
//!
//! ## Overview
//!
//! Every classification profile looks at the last `W` magnitude readings.
//! `W` is chosen per profile at runtime (10 and 50 are the shipped values),
//! so the window is backed by a fixed array of [`MAX_WINDOW_SIZE`] slots and
//! a runtime capacity no larger than that.
//!
//! ## Invariants
//!
//! - `len <= capacity <= MAX_WINDOW_SIZE`
//! - when full, a push evicts the oldest reading
//! - iteration yields readings oldest to newest (arrival order)
//!
//! ## Memory Layout
//!
//! ```text
//! MagnitudeWindow (capacity = 5, after 7 pushes):
//! ┌─────┬─────┬─────┬─────┬─────┬─────┬ ─ ─ ┐
//! │  r5 │  r6 │  r2 │  r3 │  r4 │ --- │ ... │  ← physical slots
//! └─────┴─────┴─────┴─────┴─────┴─────┴ ─ ─ ┘
//!                ↑
//!           write_pos = 2 (oldest when full)
//!
//! Logical view: [r2, r3, r4, r5, r6]
//! ```
//!
//! All operations are allocation-free; `push` is O(1), iteration O(W).
//!
//! ```rust
//! use quakeguard_core::buffer::MagnitudeWindow;
//! use quakeguard_core::MagnitudeReading;
//!
//! let mut window = MagnitudeWindow::new(3).unwrap();
//! for i in 0..5 {
//!     window.push(MagnitudeReading { value: i as f64, observed_at: i });
//! }
//! let values: Vec<f64> = window.iter().map(|r| r.value).collect();
//! assert_eq!(values, vec![2.0, 3.0, 4.0]);
//! ```

use crate::constants::buffers::MAX_WINDOW_SIZE;
use crate::errors::{DetectionError, DetectionResult};
use crate::sample::MagnitudeReading;

/// Ring buffer holding the most recent `capacity` readings
#[derive(Debug, Clone)]
pub struct MagnitudeWindow {
    /// Storage; `None` marks slots never written
    data: [Option<MagnitudeReading>; MAX_WINDOW_SIZE],

    /// Runtime capacity `W`
    capacity: usize,

    /// Index where the next write will occur, wraps at `capacity`
    write_pos: usize,

    /// Current number of valid readings
    len: usize,
}

impl MagnitudeWindow {
    /// Creates an empty window of capacity `capacity`.
    ///
    /// Fails with `InvalidProfile` for zero or for more than
    /// [`MAX_WINDOW_SIZE`] slots.
    pub fn new(capacity: usize) -> DetectionResult<Self> {
        if capacity == 0 {
            return Err(DetectionError::InvalidProfile {
                reason: "window size must be at least 1",
            });
        }
        if capacity > MAX_WINDOW_SIZE {
            return Err(DetectionError::InvalidProfile {
                reason: "window size exceeds MAX_WINDOW_SIZE",
            });
        }

        Ok(Self {
            data: [None; MAX_WINDOW_SIZE],
            capacity,
            write_pos: 0,
            len: 0,
        })
    }

    /// Adds a reading, evicting the oldest one when full
    pub fn push(&mut self, reading: MagnitudeReading) {
        self.data[self.write_pos] = Some(reading);
        self.write_pos = (self.write_pos + 1) % self.capacity;

        if self.len < self.capacity {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Statistics are only meaningful once this is true
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent reading
    pub fn last(&self) -> Option<&MagnitudeReading> {
        if self.is_empty() {
            return None;
        }

        let idx = if self.write_pos == 0 { self.capacity - 1 } else { self.write_pos - 1 };
        self.data[idx].as_ref()
    }

    /// Iterate over readings from oldest to newest
    pub fn iter(&self) -> MagnitudeWindowIter<'_> {
        MagnitudeWindowIter {
            window: self,
            index: 0,
        }
    }

    /// Iterate over reading values from oldest to newest
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.iter().map(|r| r.value)
    }

    pub fn clear(&mut self) {
        self.data = [None; MAX_WINDOW_SIZE];
        self.write_pos = 0;
        self.len = 0;
    }

    /// Reading at logical index (0 = oldest).
    ///
    /// Until the window fills, logical and physical indices match. Once
    /// full, the oldest reading sits at `write_pos`.
    fn get(&self, index: usize) -> Option<&MagnitudeReading> {
        if index >= self.len {
            return None;
        }

        let actual_index = if self.len < self.capacity {
            index
        } else {
            (self.write_pos + index) % self.capacity
        };

        self.data[actual_index].as_ref()
    }
}

/// Iterator over window contents in arrival order
pub struct MagnitudeWindowIter<'a> {
    window: &'a MagnitudeWindow,
    index: usize,
}

impl<'a> Iterator for MagnitudeWindowIter<'a> {
    type Item = &'a MagnitudeReading;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.window.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.window.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}
