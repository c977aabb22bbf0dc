//! Shared utilities for integration tests: a mock HTTP backend and a mock
//! websocket gateway, both on ephemeral local ports.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use gatelink::config::ClientConfig;

pub const WAIT: Duration = Duration::from_secs(5);

/// A request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Response the mock backend sends.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            content_type: "text/plain",
            ..Self::json(status, body)
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

/// Start a programmable mock backend. `respond` gets the zero-based call
/// number and the request; every request is also reported on the channel.
pub async fn start_programmable_backend<F>(
    respond: F,
) -> (SocketAddr, mpsc::UnboundedReceiver<CapturedRequest>)
where
    F: Fn(usize, &CapturedRequest) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let respond = Arc::new(respond);
    let calls = Arc::new(AtomicUsize::new(0));

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let respond = respond.clone();
                    let calls = calls.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let call = calls.fetch_add(1, Ordering::SeqCst);
                        let response = respond(call, &request);
                        let _ = tx.send(request);

                        let _ = socket.write_all(render(&response).as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, rx)
}

fn render(response: &MockResponse) -> String {
    let status_text = match response.status {
        200 => "200 OK",
        204 => "204 No Content",
        400 => "400 Bad Request",
        401 => "401 Unauthorized",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        _ => "200 OK",
    };
    let mut out = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status_text,
        response.content_type,
        response.body.len()
    );
    for (name, value) in &response.headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str("\r\n");
    out.push_str(&response.body);
    out
}

async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..end]).to_string();

    Some(CapturedRequest {
        method,
        path,
        headers,
        body,
    })
}

/// Mock websocket gateway; every accepted connection is handed to the test.
pub struct MockGateway {
    pub addr: SocketAddr,
    connections: mpsc::UnboundedReceiver<GatewayConn>,
}

impl MockGateway {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, connections) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut path = String::new();
                    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                        path = request.uri().to_string();
                        Ok(response)
                    };
                    let accepted = tokio_tungstenite::accept_hdr_async(stream, callback).await;
                    if let Ok(ws) = accepted {
                        let _ = tx.send(GatewayConn { ws, path });
                    }
                });
            }
        });

        Self { addr, connections }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn accept(&mut self) -> GatewayConn {
        tokio::time::timeout(WAIT, self.connections.recv())
            .await
            .expect("no gateway connection")
            .expect("gateway listener stopped")
    }

    /// Wait `window` and report whether any connection arrived.
    pub async fn connection_within(&mut self, window: Duration) -> bool {
        tokio::time::timeout(window, self.connections.recv()).await.is_ok()
    }
}

pub struct GatewayConn {
    ws: WebSocketStream<TcpStream>,
    /// Request URI, including the query.
    pub path: String,
}

/// What the mock gateway read from the client.
#[derive(Debug, PartialEq)]
pub enum FromClient {
    Json(Value),
    Close(Option<u16>),
}

impl GatewayConn {
    pub async fn send_json(&mut self, value: Value) {
        self.ws
            .send(Message::Text(value.to_string().into()))
            .await
            .unwrap();
    }

    pub async fn hello(&mut self, interval_ms: u64) {
        self.send_json(serde_json::json!({"op": 10, "d": {"heartbeat_interval": interval_ms}}))
            .await;
    }

    pub async fn recv(&mut self) -> Option<FromClient> {
        loop {
            let next = tokio::time::timeout(WAIT, self.ws.next()).await.ok()??;
            match next {
                Ok(Message::Text(text)) => {
                    return Some(FromClient::Json(serde_json::from_str(text.as_str()).unwrap()))
                }
                Ok(Message::Close(frame)) => {
                    return Some(FromClient::Close(frame.map(|f| u16::from(f.code))))
                }
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Next JSON frame, whatever its opcode.
    pub async fn next_frame(&mut self) -> Value {
        match self.recv().await {
            Some(FromClient::Json(frame)) => frame,
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    pub async fn expect_op(&mut self, op: u64) -> Value {
        match self.recv().await {
            Some(FromClient::Json(frame)) => {
                assert_eq!(frame["op"], op, "unexpected frame {frame}");
                frame
            }
            other => panic!("expected op {op}, got {other:?}"),
        }
    }

    /// Skip heartbeats until the client closes; returns the close code.
    pub async fn expect_close(&mut self) -> Option<u16> {
        loop {
            match self.recv().await {
                Some(FromClient::Close(code)) => return code,
                Some(FromClient::Json(frame)) if frame["op"] == 1 => continue,
                other => panic!("expected close, got {other:?}"),
            }
        }
    }

    pub async fn close(&mut self, code: u16) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        let _ = self.ws.close(Some(frame)).await;
    }
}

/// Client configuration pointing at the mock servers, with short delays.
pub fn test_config(api: SocketAddr, gateway_url: &str) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.credentials.token = "test-token".into();
    config.api.base_url = format!("http://{api}/api/v9");
    config.gateway.url = gateway_url.to_string();
    config.gateway.reconnect_delay_ms = 200;
    config.gateway.invalid_session_delay_ms = 200;
    config.rate_limit.min_spacing_ms = 0;
    config
}
