//! Socket seam for the gateway session.
//!
//! The session speaks text frames and close codes; how bytes reach the
//! platform is the connector's business. Production uses tokio-tungstenite.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::gateway::close;
use crate::gateway::error::{GatewayError, GatewayResult};

/// Something read from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Text(String),
    /// The socket is gone. Errors and EOF arrive as `close::ABNORMAL`.
    Closed { code: u16, reason: String },
}

/// Opens connections.
pub trait Connector: Send + Sync + 'static {
    type Connection: Connection;

    fn connect(&self, url: &str) -> impl Future<Output = GatewayResult<Self::Connection>> + Send;
}

/// One open socket.
pub trait Connection: Send + 'static {
    fn send(&mut self, text: String) -> impl Future<Output = GatewayResult<()>> + Send;

    /// Next text frame or the close. Must be cancel-safe: it is polled
    /// inside `select!`.
    fn recv(&mut self) -> impl Future<Output = Incoming> + Send;

    /// Best-effort close with `code`.
    fn close(&mut self, code: u16) -> impl Future<Output = ()> + Send;
}

/// tokio-tungstenite connector (ws:// and wss://).
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connector for TungsteniteConnector {
    type Connection = WsConnection;

    async fn connect(&self, url: &str) -> GatewayResult<WsConnection> {
        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        tracing::debug!(url = %url, status = %response.status(), "WebSocket connection opened");
        Ok(WsConnection { stream })
    }
}

impl Connection for WsConnection {
    async fn send(&mut self, text: String) -> GatewayResult<()> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Incoming {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Incoming::Text(text.to_string()),
                Some(Ok(Message::Close(frame))) => {
                    return match frame {
                        Some(frame) => Incoming::Closed {
                            code: u16::from(frame.code),
                            reason: frame.reason.to_string(),
                        },
                        None => Incoming::Closed {
                            code: close::ABNORMAL,
                            reason: "close frame without status".to_string(),
                        },
                    };
                }
                // Binary frames are not part of the json encoding; ping/pong
                // is answered by tungstenite itself.
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Incoming::Closed {
                        code: close::ABNORMAL,
                        reason: e.to_string(),
                    }
                }
                None => {
                    return Incoming::Closed {
                        code: close::ABNORMAL,
                        reason: "stream ended".to_string(),
                    }
                }
            }
        }
    }

    async fn close(&mut self, code: u16) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        if let Err(e) = self.stream.close(Some(frame)).await {
            tracing::debug!(error = %e, "Error while closing WebSocket");
        }
    }
}
