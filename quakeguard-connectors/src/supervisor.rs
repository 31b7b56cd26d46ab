//! Connection supervisor
//!
//! ## State Machine
//!
//! ```text
//!                  start
//!  Disconnected ──────────→ Probing ←──────────────── retry after fixed delay
//!       ▲                    │   │                              ▲
//!       │ stop       reachable   unreachable ──attempts < max───┤
//!       │                    │                                  │
//!       │                    ▼                                  │
//!       │               Connecting ──open failed────────────────┤
//!       │                    │                                  │
//!       │               opened (attempts = 0, push location)    │
//!       │                    ▼                                  │
//!       └────────────── Connected ──closed──────────────────────┘
//!
//!  any failure with attempts ≥ max ──→ PermanentlyDisconnected (only an
//!                                      explicit start leaves it)
//! ```
//!
//! [`ReconnectMachine`] holds the transitions and is fully synchronous, so
//! retry counting is tested without sockets or timers.
//! [`ConnectionSupervisor`] performs the actions it asks for on a tokio
//! task; [`TransportHandle`] is the caller's side of that task.
//!
//! ## Single Flight
//!
//! `start` is ignored while a sequence is active (Probing, Connecting or
//! Connected). Only one supervisor task exists per handle, so there is
//! never more than one probe, handshake or retry timer in flight.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;
use quakeguard_core::LocationHandle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::ReconnectPolicy;
use crate::probe::ReachabilityProbe;
use crate::protocol::{decode_inbound, Inbound, OutboundMessage};
use crate::session::{OutboundFrame, SessionConnector, SessionLink};
use crate::sinks::NotificationSink;
use crate::ConnectionStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Probing,
    Connecting,
    Connected,
    PermanentlyDisconnected,
}

impl ConnectionState {
    /// A connect sequence is running
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Probing | ConnectionState::Connecting | ConnectionState::Connected
        )
    }
}

/// Next step requested by the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorAction {
    Probe,
    RetryAfter(Duration),
    OpenSession,
    PushLocation,
    GiveUp,
    None,
}

/// Pure reconnect state machine
#[derive(Debug, Clone)]
pub struct ReconnectMachine {
    state: ConnectionState,
    attempts: u32,
    policy: ReconnectPolicy,
    connects: u32,
}

impl ReconnectMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            policy,
            connects: 0,
        }
    }

    /// Begins a connect sequence unless one is already active
    pub fn start(&mut self) -> SupervisorAction {
        if self.state.is_active() {
            return SupervisorAction::None;
        }
        self.attempts = 0;
        self.state = ConnectionState::Probing;
        SupervisorAction::Probe
    }

    pub fn on_probe_result(&mut self, reachable: bool) -> SupervisorAction {
        if self.state != ConnectionState::Probing {
            return SupervisorAction::None;
        }
        if reachable {
            self.state = ConnectionState::Connecting;
            SupervisorAction::OpenSession
        } else {
            self.fail()
        }
    }

    /// The fixed retry delay has passed
    pub fn on_retry_elapsed(&mut self) -> SupervisorAction {
        if self.state == ConnectionState::Probing {
            SupervisorAction::Probe
        } else {
            SupervisorAction::None
        }
    }

    pub fn on_session_opened(&mut self) -> SupervisorAction {
        if self.state != ConnectionState::Connecting {
            return SupervisorAction::None;
        }
        self.state = ConnectionState::Connected;
        self.attempts = 0;
        self.connects += 1;
        SupervisorAction::PushLocation
    }

    /// Handshake failed, or an open session closed
    pub fn on_session_lost(&mut self) -> SupervisorAction {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => self.fail(),
            _ => SupervisorAction::None,
        }
    }

    /// Explicit stop; cancels whatever was pending
    pub fn stop(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Failed attempts since the last successful open
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Successful opens so far
    pub fn connects(&self) -> u32 {
        self.connects
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    fn fail(&mut self) -> SupervisorAction {
        self.attempts += 1;
        if self.attempts >= self.policy.max_attempts {
            self.state = ConnectionState::PermanentlyDisconnected;
            SupervisorAction::GiveUp
        } else {
            self.state = ConnectionState::Probing;
            SupervisorAction::RetryAfter(self.policy.retry_delay())
        }
    }
}

/// Requests from a [`TransportHandle`]
#[derive(Debug)]
enum Command {
    Start,
    PushLocation,
    Send {
        message: OutboundMessage,
        reply: oneshot::Sender<bool>,
    },
}

/// Async driver of a [`ReconnectMachine`]
pub struct ConnectionSupervisor {
    machine: ReconnectMachine,
    probe: Arc<dyn ReachabilityProbe>,
    connector: Arc<dyn SessionConnector>,
    notifier: Arc<dyn NotificationSink>,
    location: LocationHandle,
    commands: mpsc::UnboundedReceiver<Command>,
    stop: watch::Receiver<Option<String>>,
    status: watch::Sender<ConnectionState>,
    stats: Arc<Mutex<ConnectionStats>>,
}

/// How a phase of the driver ended
enum Step {
    Next(SupervisorAction),
    Exit,
}

impl ConnectionSupervisor {
    /// Spawns the supervisor task on the current tokio runtime.
    ///
    /// The task starts `Disconnected`; call [`TransportHandle::start`].
    pub fn spawn(
        policy: ReconnectPolicy,
        probe: Arc<dyn ReachabilityProbe>,
        connector: Arc<dyn SessionConnector>,
        notifier: Arc<dyn NotificationSink>,
        location: LocationHandle,
    ) -> TransportHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(None);
        let (status_tx, status_rx) = watch::channel(ConnectionState::Disconnected);
        let stats = Arc::new(Mutex::new(ConnectionStats::default()));

        let supervisor = ConnectionSupervisor {
            machine: ReconnectMachine::new(policy),
            probe,
            connector,
            notifier,
            location,
            commands: command_rx,
            stop: stop_rx,
            status: status_tx,
            stats: stats.clone(),
        };

        TransportHandle {
            commands: command_tx,
            stop: stop_tx,
            status: status_rx,
            stats,
            task: Mutex::new(Some(tokio::spawn(supervisor.run()))),
        }
    }

    async fn run(mut self) {
        let mut action = SupervisorAction::None;

        loop {
            let step = match action {
                SupervisorAction::None | SupervisorAction::GiveUp => self.idle().await,
                SupervisorAction::Probe => self.probe().await,
                SupervisorAction::RetryAfter(delay) => self.wait_retry(delay).await,
                SupervisorAction::OpenSession => self.open_session().await,
                // Only produced on entering Connected, handled there
                SupervisorAction::PushLocation => Step::Next(SupervisorAction::None),
            };

            match step {
                Step::Next(next) => {
                    self.publish_state();
                    action = next;
                }
                Step::Exit => break,
            }
        }

        self.machine.stop();
        self.publish_state();
        debug!("supervisor stopped");
    }

    /// Disconnected or PermanentlyDisconnected: wait for an explicit start
    async fn idle(&mut self) -> Step {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Start) => return Step::Next(self.machine.start()),
                    Some(other) => refuse(&self.stats, other),
                    None => return Step::Exit,
                },
                _ = stop_requested(&mut self.stop) => return Step::Exit,
            }
        }
    }

    async fn probe(&mut self) -> Step {
        debug!("probing coordinator (attempt {})", self.machine.attempts() + 1);

        let reachable = {
            let probe = self.probe.probe();
            tokio::pin!(probe);

            loop {
                tokio::select! {
                    reachable = &mut probe => break reachable,
                    command = self.commands.recv() => match command {
                        Some(Command::Start) => debug!("start ignored: connect sequence in flight"),
                        Some(other) => refuse(&self.stats, other),
                        None => return Step::Exit,
                    },
                    _ = stop_requested(&mut self.stop) => return Step::Exit,
                }
            }
        };

        if !reachable {
            self.stats.lock().last_error = Some(String::from("coordinator unreachable"));
        }
        let action = self.machine.on_probe_result(reachable);
        Step::Next(self.log_give_up(action))
    }

    async fn wait_retry(&mut self, delay: Duration) -> Step {
        debug!("retrying in {:?}", delay);

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Step::Next(self.machine.on_retry_elapsed()),
                command = self.commands.recv() => match command {
                    Some(Command::Start) => debug!("start ignored: retry pending"),
                    Some(other) => refuse(&self.stats, other),
                    None => return Step::Exit,
                },
                _ = stop_requested(&mut self.stop) => return Step::Exit,
            }
        }
    }

    async fn open_session(&mut self) -> Step {
        let opened = {
            let open = self.connector.open();
            tokio::pin!(open);

            loop {
                tokio::select! {
                    opened = &mut open => break opened,
                    command = self.commands.recv() => match command {
                        Some(Command::Start) => debug!("start ignored: handshake in flight"),
                        Some(other) => refuse(&self.stats, other),
                        None => return Step::Exit,
                    },
                    _ = stop_requested(&mut self.stop) => return Step::Exit,
                }
            }
        };

        match opened {
            Ok(link) => {
                self.machine.on_session_opened();
                if self.machine.connects() > 1 {
                    self.stats.lock().reconnections += 1;
                }
                info!("connected to coordinator");
                self.publish_state();
                self.connected(link).await
            }
            Err(e) => {
                warn!("session open failed: {}", e);
                self.stats.lock().last_error = Some(e.to_string());
                let action = self.machine.on_session_lost();
                Step::Next(self.log_give_up(action))
            }
        }
    }

    async fn connected(&mut self, mut link: SessionLink) -> Step {
        self.push_location(&link);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::PushLocation) => self.push_location(&link),
                    Some(Command::Send { message, reply }) => {
                        let sent = self.send(&link, &message);
                        let _ = reply.send(sent);
                    }
                    Some(Command::Start) => debug!("start ignored: already connected"),
                    None => {
                        close(&link, "transport dropped");
                        return Step::Exit;
                    }
                },
                text = link.inbound.recv() => match text {
                    Some(text) => self.dispatch(&text),
                    None => break,
                },
                _ = link.outbound.closed() => break,
                reason = stop_requested(&mut self.stop) => {
                    close(&link, &reason);
                    return Step::Exit;
                }
            }
        }

        warn!("session closed by coordinator");
        self.stats.lock().last_error = Some(String::from("session closed"));
        let action = self.machine.on_session_lost();
        Step::Next(self.log_give_up(action))
    }

    fn push_location(&mut self, link: &SessionLink) {
        if let Some(fix) = self.location.latest() {
            self.send(link, &OutboundMessage::location(&fix));
        }
    }

    /// Queues a frame for the writer pump without waiting on it; a full
    /// queue means the socket is stalled and the message is dropped
    fn send(&mut self, link: &SessionLink, message: &OutboundMessage) -> bool {
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("{}", e);
                self.stats.lock().messages_failed += 1;
                return false;
            }
        };

        let result = link.outbound.try_send(OutboundFrame::Text(frame));
        let mut stats = self.stats.lock();
        match result {
            Ok(()) => {
                stats.messages_sent += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                stats.messages_dropped += 1;
                debug!("dropping outbound message: session writer stalled");
                false
            }
            Err(TrySendError::Closed(_)) => {
                stats.messages_failed += 1;
                stats.last_error = Some(String::from("session refused frame"));
                false
            }
        }
    }

    fn dispatch(&self, text: &str) {
        self.stats.lock().messages_received += 1;

        match decode_inbound(text) {
            Inbound::Alert(alert) => {
                let notifier = self.notifier.clone();
                tokio::spawn(async move {
                    if let Err(e) = notifier.present_remote(&alert).await {
                        warn!("alert not presented: {}", e);
                    }
                });
            }
            Inbound::Ignored => debug!("ignoring inbound frame of unknown type"),
            Inbound::Malformed(e) => debug!("dropping malformed inbound frame: {}", e),
        }
    }

    fn log_give_up(&self, action: SupervisorAction) -> SupervisorAction {
        if action == SupervisorAction::GiveUp {
            warn!(
                "giving up after {} failed attempts; explicit start required",
                self.machine.attempts()
            );
        }
        action
    }

    fn publish_state(&self) {
        self.status.send_replace(self.machine.state());
    }
}

/// Resolves once a stop has been requested, with its reason
async fn stop_requested(stop: &mut watch::Receiver<Option<String>>) -> String {
    match stop.wait_for(Option::is_some).await {
        Ok(reason) => reason.clone().unwrap_or_default(),
        // Handle dropped
        Err(_) => String::from("transport dropped"),
    }
}

/// Best effort: a stalled writer gets no close frame, and dropping the
/// link ends it anyway
fn close(link: &SessionLink, reason: &str) {
    if link
        .outbound
        .try_send(OutboundFrame::Close(reason.to_string()))
        .is_err()
    {
        debug!("close frame not queued: session writer stalled or gone");
    }
}

/// Messages cannot be delivered without a session; they are dropped
fn refuse(stats: &Mutex<ConnectionStats>, command: Command) {
    match command {
        Command::Send { reply, .. } => {
            stats.lock().messages_dropped += 1;
            let _ = reply.send(false);
            debug!("dropping outbound message: not connected");
        }
        Command::PushLocation => {
            stats.lock().messages_dropped += 1;
            debug!("dropping location push: not connected");
        }
        Command::Start => {}
    }
}

/// Caller side of a running supervisor
pub struct TransportHandle {
    commands: mpsc::UnboundedSender<Command>,
    stop: watch::Sender<Option<String>>,
    status: watch::Receiver<ConnectionState>,
    stats: Arc<Mutex<ConnectionStats>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TransportHandle {
    /// Starts a connect sequence; ignored while one is active.
    /// Also the only way out of `PermanentlyDisconnected`.
    pub fn start(&self) {
        let _ = self.commands.send(Command::Start);
    }

    /// Sends the latest location if connected, otherwise drops it
    pub fn push_location(&self) {
        let _ = self.commands.send(Command::PushLocation);
    }

    /// True when the message was handed to an open session
    pub async fn send(&self, message: OutboundMessage) -> bool {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::Send { message, reply }).is_err() {
            return false;
        }
        response.await.unwrap_or(false)
    }

    /// Cancels any pending reconnect and closes the session.
    ///
    /// Idempotent and callable from any thread.
    pub fn close(&self, reason: &str) {
        self.stop.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason.to_string());
            true
        });
    }

    /// Waits for the supervisor task to finish after [`close`](Self::close)
    pub async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.status.borrow()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.status.clone()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.stats.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts,
            ..ReconnectPolicy::default()
        }
    }

    #[test]
    fn gives_up_after_max_failed_probes() {
        let mut machine = ReconnectMachine::new(policy(5));
        let mut probes = 0;

        let mut action = machine.start();
        loop {
            action = match action {
                SupervisorAction::Probe => {
                    probes += 1;
                    machine.on_probe_result(false)
                }
                SupervisorAction::RetryAfter(delay) => {
                    assert_eq!(delay, Duration::from_millis(5_000));
                    machine.on_retry_elapsed()
                }
                SupervisorAction::GiveUp => break,
                other => panic!("unexpected {other:?}"),
            };
        }

        assert_eq!(probes, 5);
        assert_eq!(machine.state(), ConnectionState::PermanentlyDisconnected);
        // Terminal: nothing else schedules a probe
        assert_eq!(machine.on_retry_elapsed(), SupervisorAction::None);
        assert_eq!(machine.on_probe_result(false), SupervisorAction::None);
    }

    #[test]
    fn success_resets_attempts() {
        let mut machine = ReconnectMachine::new(policy(5));

        machine.start();
        machine.on_probe_result(false);
        machine.on_retry_elapsed();
        machine.on_probe_result(false);
        assert_eq!(machine.attempts(), 2);

        assert_eq!(machine.on_probe_result(true), SupervisorAction::OpenSession);
        assert_eq!(machine.on_session_opened(), SupervisorAction::PushLocation);
        assert_eq!(machine.attempts(), 0);

        // Four more failures are tolerated after a success
        assert!(matches!(machine.on_session_lost(), SupervisorAction::RetryAfter(_)));
        for _ in 0..3 {
            machine.on_retry_elapsed();
            assert!(matches!(
                machine.on_probe_result(false),
                SupervisorAction::RetryAfter(_)
            ));
        }
        assert_eq!(machine.attempts(), 4);
    }

    #[test]
    fn second_connect_sees_zero_attempts() {
        let mut machine = ReconnectMachine::new(policy(5));

        machine.start();
        machine.on_probe_result(true);
        machine.on_session_opened();
        machine.on_session_lost();
        assert_eq!(machine.attempts(), 1);

        machine.on_retry_elapsed();
        machine.on_probe_result(true);
        machine.on_session_opened();
        assert_eq!(machine.attempts(), 0);
        assert_eq!(machine.connects(), 2);
    }

    #[test]
    fn start_is_single_flight() {
        let mut machine = ReconnectMachine::new(policy(5));
        assert_eq!(machine.start(), SupervisorAction::Probe);
        assert_eq!(machine.start(), SupervisorAction::None);

        machine.on_probe_result(true);
        assert_eq!(machine.start(), SupervisorAction::None);
    }

    #[test]
    fn explicit_start_leaves_terminal_state() {
        let mut machine = ReconnectMachine::new(policy(1));
        machine.start();
        assert_eq!(machine.on_probe_result(false), SupervisorAction::GiveUp);

        assert_eq!(machine.start(), SupervisorAction::Probe);
        assert_eq!(machine.attempts(), 0);
        assert_eq!(machine.state(), ConnectionState::Probing);
    }

    #[test]
    fn failed_handshake_counts() {
        let mut machine = ReconnectMachine::new(policy(2));
        machine.start();
        machine.on_probe_result(true);
        assert!(matches!(machine.on_session_lost(), SupervisorAction::RetryAfter(_)));
        machine.on_retry_elapsed();
        machine.on_probe_result(true);
        assert_eq!(machine.on_session_lost(), SupervisorAction::GiveUp);
    }
}
