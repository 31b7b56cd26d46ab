//! QuakeMonitor: the engine tying sampling, detection and transport together
//!
//! ## Lifecycle
//!
//! ```text
//!          start            suspend
//!  Idle ─────────→ Running ─────────→ Suspended
//!   │                ▲  │  ←─────────     │
//!   │                │  │    resume       │
//!   │          start │  │ stop            │ stop
//!   │                │  ▼                 │
//!   └──────────→  Stopped  ←──────────────┘
//! ```
//!
//! `stop` tears down in a fixed order:
//! 1. detach from the sample source, so no sample is processed after
//!    teardown begins
//! 2. discard in-flight classifier state
//! 3. cancel any pending reconnect and close the transport
//!
//! ## Threads
//!
//! The sample callback runs on the producer's thread and only runs the
//! detector (O(W), no I/O). A confirmed detection is stamped with the
//! latest position and pushed onto an unbounded channel. A single
//! dispatcher task drains it in order: geocode, build the event, store,
//! notify, submit.

use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;
use quakeguard_core::{
    location_cell, Detection, Detector, LocationFix, LocationHandle, LocationPublisher,
    SeismicEventBuilder, TimeSource,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{MonitorConfig, ReconnectPolicy};
use crate::probe::{ReachabilityProbe, TcpProbe};
use crate::session::{SessionConnector, WebSocketConnector};
use crate::sinks::{
    resolve_location_name, EventApi, GeocodingService, LogNotifier, MemoryStorage, NoGeocoder,
    NotificationSink, StorageSink,
};
use crate::source::{SampleCallback, SampleSource, SubscriptionId};
use crate::supervisor::{ConnectionState, ConnectionSupervisor, TransportHandle};
use crate::ConnectorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
    Suspended,
    Stopped,
}

#[derive(Clone)]
struct Collaborators {
    storage: Arc<dyn StorageSink>,
    notifier: Arc<dyn NotificationSink>,
    geocoder: Arc<dyn GeocodingService>,
    api: Option<Arc<dyn EventApi>>,
}

/// Detector plus the subscription generation allowed to feed it.
///
/// Detaching bumps the generation under the lock, so a callback already
/// running on a producer thread cannot ingest once teardown has begun.
struct GatedDetector<T: TimeSource> {
    detector: Detector<T>,
    generation: u64,
}

struct TransportParts {
    policy: ReconnectPolicy,
    probe: Arc<dyn ReachabilityProbe>,
    connector: Arc<dyn SessionConnector>,
}

pub struct QuakeMonitor<T: TimeSource + Send + 'static> {
    detector: Arc<Mutex<GatedDetector<T>>>,
    source: Arc<dyn SampleSource>,
    collaborators: Collaborators,
    transport_parts: Option<TransportParts>,
    location: LocationPublisher,
    transport: Option<TransportHandle>,
    events: Option<mpsc::UnboundedSender<Detection>>,
    dispatcher: Option<JoinHandle<()>>,
    subscription: Option<SubscriptionId>,
    state: MonitorState,
}

impl<T: TimeSource + Send + 'static> QuakeMonitor<T> {
    pub fn builder(config: MonitorConfig, clock: T) -> QuakeMonitorBuilder<T> {
        QuakeMonitorBuilder::new(config, clock)
    }

    /// Subscribes to the source and starts the dispatcher and transport.
    ///
    /// Must be called inside a tokio runtime. No-op while running or
    /// suspended.
    pub fn start(&mut self) -> Result<(), ConnectorError> {
        match self.state {
            MonitorState::Running | MonitorState::Suspended => return Ok(()),
            MonitorState::Idle | MonitorState::Stopped => {}
        }

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(ConnectorError::Config(
                "QuakeMonitor::start requires a tokio runtime".into(),
            ));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.dispatcher = Some(tokio::spawn(dispatch_events(
            events_rx,
            self.collaborators.clone(),
        )));
        self.events = Some(events_tx);

        if let Some(parts) = &self.transport_parts {
            let handle = ConnectionSupervisor::spawn(
                parts.policy,
                parts.probe.clone(),
                parts.connector.clone(),
                self.collaborators.notifier.clone(),
                self.location.handle(),
            );
            handle.start();
            self.transport = Some(handle);
        }

        self.subscribe();
        self.state = MonitorState::Running;
        info!("monitor started");
        Ok(())
    }

    /// Detaches from the source; detector state and transport stay up
    pub fn suspend(&mut self) {
        if self.state != MonitorState::Running {
            return;
        }
        self.unsubscribe();
        self.state = MonitorState::Suspended;
        debug!("monitor suspended");
    }

    pub fn resume(&mut self) {
        if self.state != MonitorState::Suspended {
            return;
        }
        self.subscribe();
        self.state = MonitorState::Running;
        debug!("monitor resumed");
    }

    /// Ordered teardown; waits for queued events to be dispatched.
    /// Idempotent.
    pub async fn stop(&mut self) {
        if matches!(self.state, MonitorState::Idle | MonitorState::Stopped) {
            return;
        }

        self.unsubscribe();
        self.detector.lock().detector.reset();

        if let Some(transport) = self.transport.take() {
            transport.close("monitor stopped");
            transport.join().await;
        }

        // Closing the channel lets the dispatcher drain and exit
        self.events = None;
        if let Some(dispatcher) = self.dispatcher.take() {
            if let Err(e) = dispatcher.await {
                warn!("dispatcher ended abnormally: {}", e);
            }
        }

        self.state = MonitorState::Stopped;
        info!("monitor stopped");
    }

    /// Publishes a new position and pushes it to the coordinator if
    /// connected. Out-of-range fixes are ignored.
    pub fn update_location(&self, fix: LocationFix) -> bool {
        if !fix.is_valid() {
            warn!("ignoring invalid location fix {:?}", fix);
            return false;
        }

        self.location.publish(fix);
        if let Some(transport) = &self.transport {
            transport.push_location();
        }
        true
    }

    /// Leaves `PermanentlyDisconnected` (or any idle transport state)
    pub fn restart_transport(&self) {
        if let Some(transport) = &self.transport {
            transport.start();
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn transport(&self) -> Option<&TransportHandle> {
        self.transport.as_ref()
    }

    pub fn transport_state(&self) -> Option<ConnectionState> {
        self.transport.as_ref().map(TransportHandle::state)
    }

    pub fn location(&self) -> LocationHandle {
        self.location.handle()
    }

    /// Runs `inspect` against the detector while no sample can reach it
    pub fn with_detector<R>(&self, inspect: impl FnOnce(&Detector<T>) -> R) -> R {
        inspect(&self.detector.lock().detector)
    }

    fn subscribe(&mut self) {
        let Some(events) = self.events.clone() else {
            return;
        };
        let detector = self.detector.clone();
        let generation = detector.lock().generation;
        let location = self.location.handle();

        let callback: SampleCallback = Arc::new(move |sample| {
            let mut gated = detector.lock();
            if gated.generation != generation {
                // Detached while this sample was in flight
                return;
            }

            let detection = match gated.detector.ingest(&sample) {
                Ok(Some(detection)) => detection,
                Ok(None) => return,
                Err(e) => {
                    debug!("sample rejected: {}", e);
                    return;
                }
            };

            // Queued under the lock so stop() cannot close the channel first
            let id = detection.id;
            if events.send(detection.with_position(location.latest())).is_err() {
                warn!("{} dropped: dispatcher not running", id);
            }
        });

        self.subscription = Some(self.source.subscribe(callback));
    }

    fn unsubscribe(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.source.unsubscribe(id);
            self.detector.lock().generation += 1;
        }
    }
}

impl<T: TimeSource + Send + 'static> Drop for QuakeMonitor<T> {
    fn drop(&mut self) {
        self.unsubscribe();
        if let Some(transport) = &self.transport {
            transport.close("monitor dropped");
        }
    }
}

async fn dispatch_events(mut events: mpsc::UnboundedReceiver<Detection>, to: Collaborators) {
    while let Some(detection) = events.recv().await {
        let name = resolve_location_name(detection.position, to.geocoder.as_ref()).await;
        let event = SeismicEventBuilder::new(detection).location_name(name).build();

        if let Err(e) = to.storage.insert(&event).await {
            warn!("{} not stored: {}", event.id(), e);
        }
        if let Err(e) = to.notifier.present_detection(&event).await {
            warn!("{} not presented: {}", event.id(), e);
        }
        if let Some(api) = &to.api {
            if !api.submit(&event).await {
                warn!("{} not accepted by remote API", event.id());
            }
        }
    }
    debug!("dispatcher drained");
}

/// Assembles a [`QuakeMonitor`]; only the sample source is required
pub struct QuakeMonitorBuilder<T> {
    config: MonitorConfig,
    clock: T,
    source: Option<Arc<dyn SampleSource>>,
    storage: Option<Arc<dyn StorageSink>>,
    notifier: Option<Arc<dyn NotificationSink>>,
    geocoder: Option<Arc<dyn GeocodingService>>,
    api: Option<Arc<dyn EventApi>>,
    probe: Option<Arc<dyn ReachabilityProbe>>,
    connector: Option<Arc<dyn SessionConnector>>,
}

impl<T: TimeSource + Send + 'static> QuakeMonitorBuilder<T> {
    pub fn new(config: MonitorConfig, clock: T) -> Self {
        Self {
            config,
            clock,
            source: None,
            storage: None,
            notifier: None,
            geocoder: None,
            api: None,
            probe: None,
            connector: None,
        }
    }

    pub fn source(mut self, source: Arc<dyn SampleSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Defaults to [`MemoryStorage`]
    pub fn storage(mut self, storage: Arc<dyn StorageSink>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Defaults to [`LogNotifier`]
    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Defaults to [`NoGeocoder`]
    pub fn geocoder(mut self, geocoder: Arc<dyn GeocodingService>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Overrides the HTTP client built from the `api` section
    pub fn event_api(mut self, api: Arc<dyn EventApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Overrides the TCP probe built from the `transport` section
    pub fn probe(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Overrides the WebSocket connector built from the `transport` section
    pub fn connector(mut self, connector: Arc<dyn SessionConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn build(self) -> Result<QuakeMonitor<T>, ConnectorError> {
        self.config
            .validate()
            .map_err(|e| ConnectorError::Config(e.to_string()))?;

        let source = self
            .source
            .ok_or_else(|| ConnectorError::Config("a sample source is required".into()))?;

        let detector = self
            .config
            .build_detector(self.clock)
            .map_err(|e| ConnectorError::Config(e.to_string()))?;

        let api = match (self.api, &self.config.api) {
            (Some(api), _) => Some(api),
            (None, Some(endpoint)) => default_api(endpoint)?,
            (None, None) => None,
        };

        let transport_parts = match (&self.config.transport, self.probe, self.connector) {
            (Some(transport), probe, connector) => Some(TransportParts {
                policy: transport.reconnect,
                probe: probe.unwrap_or_else(|| {
                    Arc::new(TcpProbe::new(
                        transport.probe_address(),
                        transport.reconnect.probe_timeout(),
                    ))
                }),
                connector: connector.unwrap_or_else(|| {
                    Arc::new(WebSocketConnector::new(
                        transport.session_url(),
                        transport.connect_timeout(),
                    ))
                }),
            }),
            (None, Some(probe), Some(connector)) => Some(TransportParts {
                policy: ReconnectPolicy::default(),
                probe,
                connector,
            }),
            (None, _, _) => None,
        };

        let (location, _) = location_cell();

        Ok(QuakeMonitor {
            detector: Arc::new(Mutex::new(GatedDetector {
                detector,
                generation: 0,
            })),
            source,
            collaborators: Collaborators {
                storage: self
                    .storage
                    .unwrap_or_else(|| Arc::new(MemoryStorage::new())),
                notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
                geocoder: self.geocoder.unwrap_or_else(|| Arc::new(NoGeocoder)),
                api,
            },
            transport_parts,
            location,
            transport: None,
            events: None,
            dispatcher: None,
            subscription: None,
            state: MonitorState::Idle,
        })
    }
}

#[cfg(feature = "http")]
fn default_api(
    endpoint: &crate::config::ApiEndpoint,
) -> Result<Option<Arc<dyn EventApi>>, ConnectorError> {
    use crate::http::{HttpConfig, HttpEventApi};

    let api = HttpEventApi::new(HttpConfig::from_endpoint(endpoint))
        .map_err(|e| ConnectorError::Config(e.to_string()))?;
    Ok(Some(Arc::new(api)))
}

#[cfg(not(feature = "http"))]
fn default_api(
    _endpoint: &crate::config::ApiEndpoint,
) -> Result<Option<Arc<dyn EventApi>>, ConnectorError> {
    warn!("api endpoint configured but the http feature is disabled");
    Ok(None)
}
