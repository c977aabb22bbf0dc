//! The gateway session task.
//!
//! One task owns the socket, the heartbeat, the session identity and the
//! reconnection policy. Everything else talks to it through `Command`s and
//! reads the published `SessionSnapshot`.
//!
//! # Reconnection Policy
//! ```text
//! close 4004            → halt: report Auth, clear session, never reconnect
//! close 1000            → stop: keep session, wait for connect()
//! any other close/error → reconnect once after reconnect_delay
//!                         (resume_url + RESUME if a session id is held,
//!                          last endpoint + IDENTIFY otherwise)
//! op 7 RECONNECT        → close 4000, reconnect immediately
//! op 9 INVALID_SESSION  → clear session, IDENTIFY after invalid_session_delay
//! ```

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, timeout, Instant};
use url::Url;

use crate::config::{ClientProperties, GatewayConfig};
use crate::gateway::close::{self, CloseAction};
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::heartbeat::{Heartbeat, HeartbeatAction};
use crate::gateway::observer::{Dispatch, GatewayObserver};
use crate::gateway::protocol::{
    self, events, ClientState, Frame, Hello, Identify, OpCode, Presence, Ready, Resume,
};
use crate::gateway::state::{SessionIdentity, SessionSnapshot, SessionState};
use crate::gateway::transport::{Connection, Connector, Incoming};
use crate::observability::metrics;

/// Fixed session parameters.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub token: String,
    pub default_url: String,
    pub version: u8,
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
    pub invalid_session_delay: Duration,
    pub capabilities: Option<u64>,
    pub intents: Option<u64>,
    pub properties: ClientProperties,
}

impl SessionSettings {
    pub fn from_config(token: impl Into<String>, config: &GatewayConfig) -> Self {
        Self {
            token: token.into(),
            default_url: config.url.clone(),
            version: config.version,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            invalid_session_delay: Duration::from_millis(config.invalid_session_delay_ms),
            capabilities: config.capabilities,
            intents: config.intents,
            properties: config.properties.clone(),
        }
    }
}

/// Requests from handles to the session task.
pub(crate) enum Command {
    Connect {
        url: Option<String>,
        reply: oneshot::Sender<GatewayResult<()>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    UpdatePresence {
        presence: Presence,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheduled {
    Reconnect,
    Identify,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    at: Instant,
    action: Scheduled,
}

/// How a socket open ended.
enum Opening<T> {
    Finished(Result<GatewayResult<T>, tokio::time::error::Elapsed>),
    Abandoned(Option<oneshot::Sender<()>>),
}

/// Why the task woke up.
enum Wake {
    Command(Option<Command>),
    Incoming(Incoming),
    Heartbeat,
    Scheduled,
}

pub(crate) struct SessionTask<C: Connector> {
    settings: SessionSettings,
    connector: C,
    commands: mpsc::Receiver<Command>,
    observers: Vec<Arc<dyn GatewayObserver>>,
    snapshot: Arc<ArcSwap<SessionSnapshot>>,

    state: SessionState,
    identity: SessionIdentity,
    conn: Option<C::Connection>,
    heartbeat: Option<Heartbeat>,
    heartbeat_interval: Duration,
    pending: Option<Pending>,
    /// Last endpoint used for a fresh (non-resume) connection.
    endpoint: Option<String>,
    /// Callers waiting for READY/RESUMED.
    waiters: Vec<oneshot::Sender<GatewayResult<()>>>,
    halted: bool,
}

impl<C: Connector> SessionTask<C> {
    pub(crate) fn new(
        settings: SessionSettings,
        connector: C,
        commands: mpsc::Receiver<Command>,
        observers: Vec<Arc<dyn GatewayObserver>>,
        snapshot: Arc<ArcSwap<SessionSnapshot>>,
    ) -> Self {
        Self {
            settings,
            connector,
            commands,
            observers,
            snapshot,
            state: SessionState::Disconnected,
            identity: SessionIdentity::default(),
            conn: None,
            heartbeat: None,
            heartbeat_interval: Duration::ZERO,
            pending: None,
            endpoint: None,
            waiters: Vec::new(),
            halted: false,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            let deadline = self.pending.map(|p| p.at);
            let wake = tokio::select! {
                biased;
                command = self.commands.recv() => Wake::Command(command),
                incoming = next_incoming(&mut self.conn) => Wake::Incoming(incoming),
                _ = next_tick(&mut self.heartbeat) => Wake::Heartbeat,
                _ = wait_until(deadline) => Wake::Scheduled,
            };

            match wake {
                Wake::Command(Some(command)) => self.handle_command(command).await,
                Wake::Command(None) => {
                    tracing::debug!("All gateway handles dropped, stopping session");
                    self.disconnect().await;
                    break;
                }
                Wake::Incoming(incoming) => self.handle_incoming(incoming).await,
                Wake::Heartbeat => self.handle_heartbeat().await,
                Wake::Scheduled => self.run_scheduled().await,
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { url, reply } => {
                if self.halted {
                    let _ = reply.send(Err(GatewayError::Auth));
                    return;
                }
                if self.state.is_live() {
                    let _ = reply.send(Err(GatewayError::AlreadyConnected));
                    return;
                }
                // An explicit connect supersedes a scheduled reconnect.
                self.pending = None;
                let url = url.unwrap_or_else(|| self.settings.default_url.clone());
                self.endpoint = Some(url.clone());
                self.waiters.push(reply);
                self.open(url, true).await;
            }
            Command::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            Command::UpdatePresence { presence } => {
                if self.conn.is_none() {
                    tracing::debug!("Presence update dropped, no open connection");
                    return;
                }
                match protocol::encode(OpCode::PresenceUpdate, &presence) {
                    Ok(text) => {
                        self.send(text).await;
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to encode presence update"),
                }
            }
        }
    }

    /// Open a socket to `url`. Failures on a caller's connect are returned
    /// to the caller; failures on a policy reconnect schedule another one.
    /// A `disconnect()` arriving while the socket opens abandons it.
    async fn open(&mut self, url: String, caller: bool) {
        self.set_state(SessionState::Connecting);
        let target = with_query(&url, self.settings.version);
        tracing::info!(url = %target, "Opening gateway connection");

        let opening = {
            let attempt = timeout(self.settings.connect_timeout, self.connector.connect(&target));
            tokio::pin!(attempt);
            loop {
                tokio::select! {
                    biased;
                    command = self.commands.recv() => match command {
                        Some(Command::Disconnect { reply }) => break Opening::Abandoned(Some(reply)),
                        None => break Opening::Abandoned(None),
                        Some(Command::Connect { reply, .. }) => {
                            let _ = reply.send(Err(GatewayError::AlreadyConnected));
                        }
                        Some(Command::UpdatePresence { .. }) => {
                            tracing::debug!("Presence update dropped, connection still opening");
                        }
                    },
                    result = &mut attempt => break Opening::Finished(result),
                }
            }
        };

        let result = match opening {
            Opening::Finished(Ok(result)) => result,
            Opening::Finished(Err(_)) => Err(GatewayError::Transport(format!(
                "connect timed out after {:?}",
                self.settings.connect_timeout
            ))),
            Opening::Abandoned(reply) => {
                tracing::info!(url = %target, "Gateway connection abandoned");
                self.disconnect().await;
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
                return;
            }
        };

        match result {
            Ok(conn) => {
                self.conn = Some(conn);
                self.set_state(SessionState::AwaitingHandshake);
            }
            Err(error) => {
                tracing::warn!(url = %target, error = %error, "Gateway connection failed");
                self.set_state(SessionState::Disconnected);
                self.notify_error(&error);
                if caller {
                    self.resolve_waiters(Err(error));
                } else {
                    self.schedule(Scheduled::Reconnect, self.settings.reconnect_delay);
                }
            }
        }
    }

    async fn handle_incoming(&mut self, incoming: Incoming) {
        match incoming {
            Incoming::Text(text) => match Frame::parse(&text) {
                Ok(frame) => self.handle_frame(frame).await,
                Err(e) => tracing::warn!(error = %e, "Ignoring malformed gateway frame"),
            },
            Incoming::Closed { code, reason } => {
                self.conn = None;
                self.after_close(code, reason);
            }
        }
    }

    async fn handle_frame(&mut self, frame: Frame) {
        self.identity.observe_sequence(frame.sequence);

        match frame.op() {
            Some(OpCode::Hello) => match serde_json::from_value::<Hello>(frame.payload) {
                Ok(hello) if hello.heartbeat_interval > 0 => {
                    let interval = Duration::from_millis(hello.heartbeat_interval);
                    tracing::debug!(interval_ms = hello.heartbeat_interval, "Received HELLO");
                    self.heartbeat_interval = interval;
                    self.heartbeat = Some(Heartbeat::start(interval));
                    self.set_state(SessionState::Authenticating);
                    if self.identity.can_resume() {
                        self.send_resume().await;
                    } else {
                        self.send_identify().await;
                    }
                }
                Ok(_) => {
                    self.reject_hello("zero heartbeat interval".to_string()).await;
                }
                Err(e) => self.reject_hello(e.to_string()).await,
            },
            Some(OpCode::HeartbeatAck) => {
                if let Some(latency) = self.heartbeat.as_mut().and_then(Heartbeat::on_ack) {
                    tracing::trace!(latency_ms = latency.as_millis() as u64, "Heartbeat acknowledged");
                    metrics::record_heartbeat_latency(latency);
                }
            }
            Some(OpCode::Heartbeat) => {
                let requested = self.heartbeat.as_mut().is_some_and(Heartbeat::on_request);
                if requested {
                    self.send_heartbeat().await;
                }
            }
            Some(OpCode::Dispatch) => self.handle_dispatch(frame),
            Some(OpCode::Reconnect) => {
                tracing::info!("Gateway requested reconnect");
                metrics::record_reconnect("requested");
                self.close_connection(close::RESUMABLE).await;
                self.set_state(SessionState::Disconnected);
                self.reconnect().await;
            }
            Some(OpCode::InvalidSession) => {
                tracing::warn!(
                    delay_ms = self.settings.invalid_session_delay.as_millis() as u64,
                    "Session invalidated, identifying again"
                );
                self.identity.session_id = None;
                self.identity.sequence = None;
                if self.conn.is_some() {
                    self.set_state(SessionState::Authenticating);
                }
                self.schedule(Scheduled::Identify, self.settings.invalid_session_delay);
            }
            _ => tracing::debug!(op = frame.opcode, "Ignoring unhandled opcode"),
        }

        self.publish();
    }

    fn handle_dispatch(&mut self, frame: Frame) {
        let name = frame.event_name.unwrap_or_default();

        match name.as_str() {
            events::READY => match serde_json::from_value::<Ready>(frame.payload.clone()) {
                Ok(ready) => {
                    tracing::info!(session_id = %ready.session_id, "Session ready");
                    self.identity.session_id = Some(ready.session_id);
                    self.identity.resume_url = ready.resume_gateway_url;
                    self.set_state(SessionState::Connected);
                    self.resolve_waiters(Ok(()));
                }
                Err(e) => tracing::warn!(error = %e, "READY without a usable session id"),
            },
            events::RESUMED => {
                tracing::info!(sequence = ?self.identity.sequence, "Session resumed");
                self.set_state(SessionState::Connected);
                self.resolve_waiters(Ok(()));
            }
            _ => {}
        }

        let dispatch = Dispatch {
            name,
            sequence: frame.sequence,
            data: frame.payload,
        };
        for observer in &self.observers {
            observer.on_dispatch(&dispatch);
        }
    }

    async fn handle_heartbeat(&mut self) {
        let Some(heartbeat) = self.heartbeat.as_mut() else {
            return;
        };
        match heartbeat.on_tick() {
            HeartbeatAction::Send => self.send_heartbeat().await,
            HeartbeatAction::Zombie => {
                tracing::warn!("Heartbeat not acknowledged, reconnecting");
                self.fail_connection("heartbeat not acknowledged".to_string()).await;
            }
        }
        self.publish();
    }

    async fn run_scheduled(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        match pending.action {
            Scheduled::Reconnect => self.reconnect().await,
            Scheduled::Identify => {
                if self.conn.is_some() {
                    self.send_identify().await;
                }
            }
        }
    }

    /// Reconnect according to what the identity allows.
    async fn reconnect(&mut self) {
        let resume = self.identity.can_resume();
        let url = if resume {
            self.identity.resume_url.clone().or_else(|| self.endpoint.clone())
        } else {
            self.endpoint.clone()
        }
        .unwrap_or_else(|| self.settings.default_url.clone());

        tracing::info!(resume, url = %url, "Reconnecting to gateway");
        self.open(url, false).await;
    }

    async fn disconnect(&mut self) {
        self.pending = None;
        if self.conn.is_some() || self.state != SessionState::Disconnected {
            self.set_state(SessionState::Closing);
        }
        self.close_connection(close::NORMAL).await;
        self.identity.clear();
        self.set_state(SessionState::Disconnected);
        self.resolve_waiters(Err(GatewayError::Closed));
        self.publish();
    }

    /// A HELLO we cannot run a heartbeat from. Waiting callers get the
    /// error; the socket goes through the reconnect policy.
    async fn reject_hello(&mut self, detail: String) {
        let error = GatewayError::Protocol(format!("unusable HELLO: {detail}"));
        tracing::warn!(error = %error, "Dropping gateway connection");
        self.notify_error(&error);
        self.resolve_waiters(Err(error));
        self.fail_connection(detail).await;
    }

    /// Our side gave up on the socket: close it resumably and reconnect.
    async fn fail_connection(&mut self, reason: String) {
        self.close_connection(close::RESUMABLE).await;
        self.after_close(close::RESUMABLE, reason);
    }

    /// Apply the close policy. The socket is already gone.
    fn after_close(&mut self, code: u16, reason: String) {
        self.heartbeat = None;
        self.pending = None;

        match close::classify(code) {
            CloseAction::Halt => {
                tracing::error!(code, "Gateway rejected credentials, not reconnecting");
                self.halted = true;
                self.identity.clear();
                self.set_state(SessionState::Disconnected);
                self.notify_error(&GatewayError::Auth);
                self.resolve_waiters(Err(GatewayError::Auth));
            }
            CloseAction::Stop => {
                tracing::info!(code, reason = %reason, "Gateway closed normally");
                self.set_state(SessionState::Disconnected);
                self.resolve_waiters(Err(GatewayError::Closed));
            }
            CloseAction::Reconnect => {
                tracing::warn!(
                    code,
                    reason = %reason,
                    delay_ms = self.settings.reconnect_delay.as_millis() as u64,
                    "Gateway connection lost, scheduling reconnect"
                );
                metrics::record_reconnect("closed");
                self.set_state(SessionState::Disconnected);
                self.notify_error(&GatewayError::Transport(format!(
                    "connection closed with code {code}: {reason}"
                )));
                self.schedule(Scheduled::Reconnect, self.settings.reconnect_delay);
            }
        }
        self.publish();
    }

    async fn close_connection(&mut self, code: u16) {
        self.heartbeat = None;
        if let Some(mut conn) = self.conn.take() {
            conn.close(code).await;
        }
    }

    async fn send_identify(&mut self) {
        let identify = Identify {
            token: self.settings.token.clone(),
            capabilities: self.settings.capabilities,
            intents: self.settings.intents,
            properties: self.settings.properties.clone(),
            presence: Presence::online(),
            compress: false,
            client_state: ClientState::default(),
        };
        tracing::debug!("Sending IDENTIFY");
        self.send_encoded(OpCode::Identify, &identify).await;
    }

    async fn send_resume(&mut self) {
        let Some(session_id) = self.identity.session_id.clone() else {
            return;
        };
        let resume = Resume {
            token: self.settings.token.clone(),
            session_id,
            seq: self.identity.sequence,
        };
        tracing::debug!(sequence = ?resume.seq, "Sending RESUME");
        self.send_encoded(OpCode::Resume, &resume).await;
    }

    async fn send_heartbeat(&mut self) {
        let sequence = self.identity.sequence;
        self.send_encoded(OpCode::Heartbeat, &sequence).await;
    }

    async fn send_encoded<T: serde::Serialize>(&mut self, op: OpCode, payload: &T) {
        match protocol::encode(op, payload) {
            Ok(text) => {
                self.send(text).await;
            }
            Err(e) => tracing::error!(?op, error = %e, "Failed to encode gateway frame"),
        }
    }

    /// Write one frame. A failed write is treated as a lost connection.
    async fn send(&mut self, text: String) -> bool {
        let Some(conn) = self.conn.as_mut() else {
            return false;
        };
        match conn.send(text).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(error = %error, "Gateway write failed");
                self.fail_connection(error.to_string()).await;
                false
            }
        }
    }

    fn schedule(&mut self, action: Scheduled, delay: Duration) {
        self.pending = Some(Pending {
            at: Instant::now() + delay,
            action,
        });
    }

    fn set_state(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        tracing::debug!(%from, %to, "Gateway state changed");
        metrics::record_gateway_state(to as u8);
        for observer in &self.observers {
            observer.on_state_change(from, to);
        }
        self.publish();
    }

    fn notify_error(&self, error: &GatewayError) {
        for observer in &self.observers {
            observer.on_error(error);
        }
    }

    fn resolve_waiters(&mut self, result: GatewayResult<()>) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(result.clone());
        }
    }

    fn publish(&self) {
        self.snapshot.store(Arc::new(SessionSnapshot {
            state: self.state,
            sequence: self.identity.sequence,
            session_id: self.identity.session_id.clone(),
            resume_url: self.identity.resume_url.clone(),
            heartbeat_interval_ms: self.heartbeat_interval.as_millis() as u64,
            heartbeat_acked: self.heartbeat.as_ref().map_or(true, Heartbeat::acked),
            halted: self.halted,
        }));
    }
}

async fn next_incoming<T: Connection>(conn: &mut Option<T>) -> Incoming {
    match conn {
        Some(conn) => conn.recv().await,
        None => pending().await,
    }
}

async fn next_tick(heartbeat: &mut Option<Heartbeat>) {
    match heartbeat {
        Some(heartbeat) => heartbeat.tick().await,
        None => pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => pending().await,
    }
}

/// Append `v=<version>&encoding=json` unless the URL already has a query.
pub(crate) fn with_query(base: &str, version: u8) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            if url.query().is_none() {
                url.query_pairs_mut()
                    .append_pair("v", &version.to_string())
                    .append_pair("encoding", "json");
            }
            url.to_string()
        }
        Err(_) => format!("{}/?v={version}&encoding=json", base.trim_end_matches('/')),
    }
}
