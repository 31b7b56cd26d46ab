//! Device-wide cooldown gate shared by every profile chain.

use crate::constants::time::GLOBAL_COOLDOWN_MS;
use crate::time::{elapsed_ms, Timestamp};

/// Lets at most one detection through per cooldown window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventDeduplicator {
    cooldown_ms: u64,
    last_global_emit: Option<Timestamp>,
}

impl EventDeduplicator {
    pub const fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown_ms,
            last_global_emit: None,
        }
    }

    /// True when nothing was emitted yet or more than the cooldown has passed
    pub fn can_emit(&self, now: Timestamp) -> bool {
        match self.last_global_emit {
            None => true,
            Some(last) => elapsed_ms(last, now) > self.cooldown_ms,
        }
    }

    /// Checks and records in one step. Returns whether `now` was admitted.
    pub fn try_emit(&mut self, now: Timestamp) -> bool {
        if !self.can_emit(now) {
            return false;
        }
        self.last_global_emit = Some(now);
        true
    }

    pub fn last_emit(&self) -> Option<Timestamp> {
        self.last_global_emit
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }
}

impl Default for EventDeduplicator {
    fn default() -> Self {
        Self::new(GLOBAL_COOLDOWN_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_emit_always_passes() {
        let mut dedup = EventDeduplicator::new(30_000);
        assert!(dedup.try_emit(0));
        assert_eq!(dedup.last_emit(), Some(0));
    }

    #[test]
    fn boundary_is_exclusive() {
        let mut dedup = EventDeduplicator::new(30_000);
        assert!(dedup.try_emit(1_000));
        assert!(!dedup.try_emit(31_000));
        assert!(dedup.try_emit(31_001));
    }

    #[test]
    fn rejected_emit_does_not_move_window() {
        let mut dedup = EventDeduplicator::new(10_000);
        dedup.try_emit(0);
        assert!(!dedup.try_emit(5_000));
        assert_eq!(dedup.last_emit(), Some(0));
        assert!(dedup.can_emit(10_001));
    }

    #[test]
    fn clock_stepping_back_blocks() {
        let mut dedup = EventDeduplicator::new(10_000);
        dedup.try_emit(50_000);
        assert!(!dedup.can_emit(1_000));
    }
}
