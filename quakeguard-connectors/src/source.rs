//! Sample source seam
//!
//! Platforms push accelerometer samples at their own rate. The monitor only
//! subscribes and unsubscribes; it never asks for a rate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use quakeguard_core::SensorSample;

/// Invoked once per sample on the producer's thread
pub type SampleCallback = Arc<dyn Fn(SensorSample) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

pub trait SampleSource: Send + Sync {
    fn subscribe(&self, callback: SampleCallback) -> SubscriptionId;

    /// Unknown ids are ignored
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Source driven by explicit [`emit`](ManualSampleSource::emit) calls.
///
/// Bridges push-style platform sensor callbacks, and drives tests.
#[derive(Default)]
pub struct ManualSampleSource {
    subscribers: RwLock<Vec<(SubscriptionId, SampleCallback)>>,
    next_id: AtomicU64,
}

impl ManualSampleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers one sample to every subscriber
    pub fn emit(&self, sample: SensorSample) {
        // Snapshot so a callback may unsubscribe without deadlocking
        let callbacks: Vec<SampleCallback> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        for callback in callbacks {
            callback(sample);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl SampleSource for ManualSampleSource {
    fn subscribe(&self, callback: SampleCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, callback));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.write().retain(|(existing, _)| *existing != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn delivers_until_unsubscribed() {
        let source = ManualSampleSource::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        let id = source.subscribe(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        source.emit(SensorSample::new(0.0, 0.0, 9.8, 0));
        source.unsubscribe(id);
        source.emit(SensorSample::new(0.0, 0.0, 9.8, 1));

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn ids_are_unique() {
        let source = ManualSampleSource::new();
        let a = source.subscribe(Arc::new(|_| {}));
        let b = source.subscribe(Arc::new(|_| {}));
        assert_ne!(a, b);

        source.unsubscribe(SubscriptionId(999));
        assert_eq!(source.subscriber_count(), 2);
    }
}
