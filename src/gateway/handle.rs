//! Public handle to a running gateway session.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::{mpsc, oneshot};

use crate::config::GatewayConfig;
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::intents::Intents;
use crate::gateway::observer::GatewayObserver;
use crate::gateway::protocol::{Activity, Presence, Status};
use crate::gateway::session::{Command, SessionSettings, SessionTask};
use crate::gateway::state::{SessionSnapshot, SessionState};
use crate::gateway::transport::{Connector, TungsteniteConnector};

const COMMAND_QUEUE: usize = 32;

/// Cheap, cloneable handle. The session task stops once every handle is
/// dropped.
#[derive(Clone)]
pub struct GatewayHandle {
    commands: mpsc::Sender<Command>,
    snapshot: Arc<ArcSwap<SessionSnapshot>>,
}

impl GatewayHandle {
    /// Spawn a session task on the current runtime.
    pub fn spawn<C: Connector>(
        settings: SessionSettings,
        connector: C,
        observers: Vec<Arc<dyn GatewayObserver>>,
    ) -> Self {
        let (commands, rx) = mpsc::channel(COMMAND_QUEUE);
        let snapshot = Arc::new(ArcSwap::from_pointee(SessionSnapshot::default()));
        let task = SessionTask::new(settings, connector, rx, observers, snapshot.clone());
        tokio::spawn(task.run());
        Self { commands, snapshot }
    }

    /// Open a connection and wait for READY or RESUMED.
    ///
    /// `url` defaults to the configured endpoint. Fails with
    /// `AlreadyConnected` while a connection is live, `Auth` once the
    /// credential has been rejected.
    pub async fn connect(&self, url: Option<String>) -> GatewayResult<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Connect { url, reply })
            .await
            .map_err(|_| GatewayError::Closed)?;
        rx.await.map_err(|_| GatewayError::Closed)?
    }

    /// Close the connection and forget the session. Safe to call any
    /// number of times.
    pub async fn disconnect(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Disconnect { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Send a presence update. Dropped silently when no socket is open.
    pub async fn update_presence(&self, status: Status, activity: Option<Activity>) -> GatewayResult<()> {
        self.commands
            .send(Command::UpdatePresence {
                presence: Presence::update(status, activity),
            })
            .await
            .map_err(|_| GatewayError::Closed)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.load().as_ref().clone()
    }

    pub fn state(&self) -> SessionState {
        self.snapshot.load().state
    }
}

/// Builds a gateway session from configuration.
pub struct GatewayBuilder<C = TungsteniteConnector> {
    settings: SessionSettings,
    connector: C,
    observers: Vec<Arc<dyn GatewayObserver>>,
}

impl GatewayBuilder {
    pub fn new(token: impl Into<String>, config: &GatewayConfig) -> Self {
        Self {
            settings: SessionSettings::from_config(token, config),
            connector: TungsteniteConnector,
            observers: Vec::new(),
        }
    }
}

impl<C: Connector> GatewayBuilder<C> {
    /// Swap the socket implementation.
    pub fn connector<D: Connector>(self, connector: D) -> GatewayBuilder<D> {
        GatewayBuilder {
            settings: self.settings,
            connector,
            observers: self.observers,
        }
    }

    pub fn observer(mut self, observer: impl GatewayObserver) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn shared_observer(mut self, observer: Arc<dyn GatewayObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Send intents instead of the configured bits.
    pub fn intents(mut self, intents: Intents) -> Self {
        self.settings.intents = Some(intents.bits());
        self
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn spawn(self) -> GatewayHandle {
        GatewayHandle::spawn(self.settings, self.connector, self.observers)
    }
}
