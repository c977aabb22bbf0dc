//! gatelink: a client for a chat platform's REST API and realtime gateway.
//!
//! Two halves share one credential:
//! - `rest`: unary HTTP calls behind a shared request budget
//!   (`ratelimit`), retried while the server throttles
//! - `gateway`: one long-lived socket session with heartbeat, resume and
//!   reconnect, delivering dispatch events to observers
//!
//! `client::Client` wires both together; `config`, `observability` and
//! `lifecycle` carry the ambient concerns.

// Core subsystems
pub mod client;
pub mod gateway;
pub mod ratelimit;
pub mod rest;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use client::{Client, ClientError};
pub use config::ClientConfig;
pub use gateway::{GatewayHandle, GatewayObserver};
pub use rest::RequestDispatcher;
