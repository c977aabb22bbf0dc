//! Client façade.
//!
//! Wires one `RequestDispatcher` and one gateway session together behind a
//! validated credential.
//!
//! # Startup
//! ```text
//! login()
//!     → api.gateway_url()        (GET /gateway through the budget)
//!     → gateway.connect(url)     (HELLO → IDENTIFY/RESUME → READY)
//! ```

pub mod error;

use std::sync::Arc;

use crate::config::validation::is_bot_token;
use crate::config::ClientConfig;
use crate::gateway::{Activity, GatewayBuilder, GatewayHandle, GatewayObserver, Intents, Status};
use crate::rest::RequestDispatcher;

pub use error::{ClientError, ClientResult};

pub struct Client {
    api: Arc<RequestDispatcher>,
    gateway: GatewayHandle,
}

impl Client {
    /// Build a client with no observers. Must be called inside a Tokio
    /// runtime.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        ClientBuilder::new(config).build()
    }

    pub fn builder(config: &ClientConfig) -> ClientBuilder<'_> {
        ClientBuilder::new(config)
    }

    /// Discover the gateway endpoint and connect to it.
    pub async fn login(&self) -> ClientResult<()> {
        let url = self.api.gateway_url().await?;
        tracing::info!(url = %url, "Discovered gateway endpoint");
        self.gateway.connect(Some(url)).await?;
        Ok(())
    }

    pub async fn set_presence(&self, status: Status, activity: Option<Activity>) -> ClientResult<()> {
        self.gateway.update_presence(status, activity).await?;
        Ok(())
    }

    /// Disconnect the gateway. Outstanding REST calls are left to finish.
    pub async fn destroy(&self) {
        self.gateway.disconnect().await;
    }

    pub fn api(&self) -> &Arc<RequestDispatcher> {
        &self.api
    }

    pub fn gateway(&self) -> &GatewayHandle {
        &self.gateway
    }
}

pub struct ClientBuilder<'a> {
    config: &'a ClientConfig,
    observers: Vec<Arc<dyn GatewayObserver>>,
    intents: Option<Intents>,
}

impl<'a> ClientBuilder<'a> {
    pub fn new(config: &'a ClientConfig) -> Self {
        Self {
            config,
            observers: Vec::new(),
            intents: None,
        }
    }

    pub fn observer(mut self, observer: impl GatewayObserver) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn intents(mut self, intents: Intents) -> Self {
        self.intents = Some(intents);
        self
    }

    pub fn build(self) -> ClientResult<Client> {
        let token = self.config.credentials.token.trim();
        if token.is_empty() {
            return Err(ClientError::EmptyToken);
        }
        if is_bot_token(token) {
            return Err(ClientError::BotToken);
        }

        let api = Arc::new(RequestDispatcher::from_config(self.config)?);

        let mut gateway = GatewayBuilder::new(token, &self.config.gateway);
        if let Some(intents) = self.intents {
            gateway = gateway.intents(intents);
        }
        for observer in self.observers {
            gateway = gateway.shared_observer(observer);
        }

        Ok(Client {
            api,
            gateway: gateway.spawn(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{NoopObserver, SessionState};

    fn config(token: &str) -> ClientConfig {
        let mut config = ClientConfig::default();
        config.credentials.token = token.to_string();
        config
    }

    #[tokio::test]
    async fn test_rejects_missing_token() {
        assert!(matches!(Client::new(&config("")), Err(ClientError::EmptyToken)));
        assert!(matches!(Client::new(&config("   ")), Err(ClientError::EmptyToken)));
    }

    #[tokio::test]
    async fn test_rejects_bot_token() {
        assert!(matches!(Client::new(&config("Bot abc.def")), Err(ClientError::BotToken)));
    }

    #[tokio::test]
    async fn test_builds_disconnected_client() {
        let client = Client::builder(&config("user-token"))
            .observer(NoopObserver)
            .intents(Intents::GUILDS)
            .build()
            .unwrap();
        assert_eq!(client.gateway().state(), SessionState::Disconnected);
        assert_eq!(client.api().gate().max_concurrent(), 5);
        client.destroy().await;
        client.destroy().await;
    }
}
