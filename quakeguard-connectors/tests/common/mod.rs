//! In-memory collaborators for transport and monitor tests
//!
//! - `ScriptedProbe`: reachability answers from a queue, counts calls
//! - `MemoryConnector`: opens `SessionLink::pair` sessions and hands the
//!   far ends to the test
//! - `RecordingNotifier`: keeps everything it was asked to present

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use quakeguard_connectors::{
    probe::ReachabilityProbe,
    session::{OutboundFrame, SessionConnector, SessionLink},
    sinks::{NotificationSink, SinkError},
    ConnectionState, ConnectorError, EventNotification, TransportHandle,
};
use quakeguard_core::SeismicEvent;
use tokio::sync::mpsc;

pub const ALERT: &str = r#"{"type":"earthquake","data":{"magnitude":5.1,"distance":40,
    "latitude":35.1,"longitude":139.2,"location":"Sagami Bay",
    "timestamp":"2024-05-01T10:00:00Z"}}"#;

/// Answers probes from a script, then repeats `fallback`
pub struct ScriptedProbe {
    script: Mutex<VecDeque<bool>>,
    fallback: bool,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn always(reachable: bool) -> Arc<Self> {
        Self::scripted(Vec::new(), reachable)
    }

    pub fn scripted(script: Vec<bool>, fallback: bool) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReachabilityProbe for ScriptedProbe {
    async fn probe(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script.lock().pop_front().unwrap_or(self.fallback)
    }
}

/// Coordinator side of an in-memory session
pub struct FarEnd {
    pub frames: mpsc::Receiver<OutboundFrame>,
    pub inbound: mpsc::Sender<String>,
}

impl FarEnd {
    pub async fn next_frame(&mut self) -> Option<OutboundFrame> {
        tokio::time::timeout(Duration::from_secs(1), self.frames.recv())
            .await
            .ok()
            .flatten()
    }
}

/// Opens in-memory sessions; the first `refuse` handshakes fail
pub struct MemoryConnector {
    refuse: AtomicUsize,
    opened: AtomicUsize,
    far_ends: mpsc::UnboundedSender<FarEnd>,
}

impl MemoryConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FarEnd>) {
        Self::refusing(0)
    }

    pub fn refusing(refuse: usize) -> (Arc<Self>, mpsc::UnboundedReceiver<FarEnd>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            refuse: AtomicUsize::new(refuse),
            opened: AtomicUsize::new(0),
            far_ends: tx,
        });
        (connector, rx)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionConnector for MemoryConnector {
    async fn open(&self) -> Result<SessionLink, ConnectorError> {
        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(ConnectorError::Closed("handshake refused".into()));
        }

        let (link, frames, inbound) = SessionLink::pair();
        self.opened.fetch_add(1, Ordering::SeqCst);
        let _ = self.far_ends.send(FarEnd { frames, inbound });
        Ok(link)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub detections: Mutex<Vec<SeismicEvent>>,
    pub alerts: Mutex<Vec<EventNotification>>,
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn present_detection(&self, event: &SeismicEvent) -> Result<(), SinkError> {
        self.detections.lock().push(event.clone());
        Ok(())
    }

    async fn present_remote(&self, alert: &EventNotification) -> Result<(), SinkError> {
        self.alerts.lock().push(alert.clone());
        Ok(())
    }
}

/// Waits (in virtual time when paused) until the transport reports `state`
pub async fn wait_for_state(handle: &TransportHandle, state: ConnectionState) {
    let mut status = handle.subscribe();
    tokio::time::timeout(Duration::from_secs(120), status.wait_for(|s| *s == state))
        .await
        .unwrap_or_else(|_| panic!("transport never reached {state:?}"))
        .unwrap_or_else(|_| panic!("supervisor exited before {state:?}"));
}

/// Lets spawned tasks run until they block
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
