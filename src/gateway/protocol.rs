//! Gateway wire protocol: opcodes, frames and control payloads.
//!
//! Every message is a JSON text frame `{ "op", "d", "s", "t" }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ClientProperties;

/// Control and dispatch opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Dispatch = 0,
    Heartbeat = 1,
    Identify = 2,
    PresenceUpdate = 3,
    VoiceStateUpdate = 4,
    Resume = 6,
    Reconnect = 7,
    RequestGuildMembers = 8,
    InvalidSession = 9,
    Hello = 10,
    HeartbeatAck = 11,
}

impl OpCode {
    pub fn from_u8(op: u8) -> Option<Self> {
        Some(match op {
            0 => OpCode::Dispatch,
            1 => OpCode::Heartbeat,
            2 => OpCode::Identify,
            3 => OpCode::PresenceUpdate,
            4 => OpCode::VoiceStateUpdate,
            6 => OpCode::Resume,
            7 => OpCode::Reconnect,
            8 => OpCode::RequestGuildMembers,
            9 => OpCode::InvalidSession,
            10 => OpCode::Hello,
            11 => OpCode::HeartbeatAck,
            _ => return None,
        })
    }
}

/// Dispatch event names the session itself reacts to.
pub mod events {
    pub const READY: &str = "READY";
    pub const RESUMED: &str = "RESUMED";
}

/// One inbound wire message.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Frame {
    #[serde(rename = "op")]
    pub opcode: u8,
    #[serde(rename = "s", default)]
    pub sequence: Option<u64>,
    #[serde(rename = "t", default)]
    pub event_name: Option<String>,
    #[serde(rename = "d", default)]
    pub payload: Value,
}

impl Frame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn op(&self) -> Option<OpCode> {
        OpCode::from_u8(self.opcode)
    }
}

/// HELLO payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Hello {
    /// Milliseconds between heartbeats.
    pub heartbeat_interval: u64,
}

/// The parts of READY the session keeps.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ready {
    pub session_id: String,
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
}

/// Outbound envelope.
#[derive(Debug, Serialize)]
struct Outbound<'a, T: Serialize> {
    op: u8,
    d: &'a T,
}

/// Serialize a control message.
pub fn encode<T: Serialize>(op: OpCode, payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Outbound { op: op as u8, d: payload })
}

/// IDENTIFY payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identify {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intents: Option<u64>,
    pub properties: ClientProperties,
    pub presence: Presence,
    pub compress: bool,
    pub client_state: ClientState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientState {
    pub guild_versions: serde_json::Map<String, Value>,
}

/// RESUME payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resume {
    pub token: String,
    pub session_id: String,
    pub seq: Option<u64>,
}

/// PRESENCE_UPDATE payload, also embedded in IDENTIFY.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presence {
    pub since: Option<u64>,
    pub activities: Vec<Activity>,
    pub status: Status,
    pub afk: bool,
}

impl Presence {
    /// Presence sent with IDENTIFY.
    pub fn online() -> Self {
        Self {
            since: Some(0),
            activities: Vec::new(),
            status: Status::Online,
            afk: false,
        }
    }

    /// Presence sent by `update_presence`.
    pub fn update(status: Status, activity: Option<Activity>) -> Self {
        Self {
            since: None,
            activities: activity.into_iter().collect(),
            status,
            afk: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Idle,
    Dnd,
    Invisible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
}
