//! Realtime gateway session.
//!
//! # Data Flow
//! ```text
//! GatewayHandle ──Command──▶ SessionTask ──text frames──▶ Connection (socket)
//!       ▲                        │  ▲                          │
//!       │ SessionSnapshot        │  └────── Incoming ──────────┘
//!       └──── (arc-swap) ◀───────┤
//!                                └──▶ GatewayObserver (state, dispatch, error)
//! ```
//!
//! The task owns the heartbeat and the reconnection policy; handles only
//! send commands and read snapshots.

pub mod close;
pub mod error;
pub mod handle;
pub mod heartbeat;
pub mod intents;
pub mod observer;
pub mod protocol;
pub mod session;
pub mod state;
pub mod transport;

pub use error::{GatewayError, GatewayResult};
pub use handle::{GatewayBuilder, GatewayHandle};
pub use intents::Intents;
pub use observer::{ChannelObserver, Dispatch, GatewayEvent, GatewayObserver, NoopObserver};
pub use protocol::{Activity, Status};
pub use session::SessionSettings;
pub use state::{SessionSnapshot, SessionState};
pub use transport::{Connection, Connector, Incoming, TungsteniteConnector};
