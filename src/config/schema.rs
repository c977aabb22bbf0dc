//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Account credential.
    pub credentials: CredentialsConfig,

    /// REST API settings (base URL, headers, timeouts).
    pub api: ApiConfig,

    /// Realtime gateway settings.
    pub gateway: GatewayConfig,

    /// Outbound request budget and concurrency cap.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Credential configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Raw account token, sent verbatim in the `Authorization` header.
    pub token: String,
}

/// REST API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Versioned base URL every request path is appended to.
    pub base_url: String,

    /// `User-Agent` header value.
    pub user_agent: String,

    /// Value of the locale header.
    pub locale: String,

    /// Value of the timezone header.
    pub timezone: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://discord.com/api/v9".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            locale: "en-US".to_string(),
            timezone: "Europe/Warsaw".to_string(),
            request_timeout_secs: 30,
        }
    }
}

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) discord/1.0.9156 Chrome/124.0.6367.243 Electron/30.0.6 Safari/537.36";

/// Gateway (realtime session) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Endpoint used when none is discovered or passed to `connect`.
    pub url: String,

    /// Protocol version appended as `?v=`.
    pub version: u8,

    /// Socket open timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Fixed delay before reconnecting after a transient close.
    pub reconnect_delay_ms: u64,

    /// Fixed delay before re-identifying after INVALID_SESSION.
    pub invalid_session_delay_ms: u64,

    /// Capability bits sent with IDENTIFY (user sessions).
    pub capabilities: Option<u64>,

    /// Intent bits sent with IDENTIFY (bot-style sessions).
    pub intents: Option<u64>,

    /// Client identity block sent with IDENTIFY and as super properties.
    pub properties: ClientProperties,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "wss://gateway.discord.gg".to_string(),
            version: 9,
            connect_timeout_secs: 10,
            reconnect_delay_ms: 5000,
            invalid_session_delay_ms: 5000,
            capabilities: Some(8189),
            intents: None,
            properties: ClientProperties::default(),
        }
    }
}

/// Client identity metadata.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClientProperties {
    pub os: String,
    pub browser: String,
    pub release_channel: String,
    pub client_version: String,
    pub os_version: String,
    pub os_arch: String,
    pub app_arch: String,
    pub system_locale: String,
    pub browser_user_agent: String,
    pub browser_version: String,
    pub client_build_number: u64,
    pub native_build_number: u64,
    pub client_event_source: Option<String>,
}

impl Default for ClientProperties {
    fn default() -> Self {
        Self {
            os: "Windows".to_string(),
            browser: "Discord Client".to_string(),
            release_channel: "stable".to_string(),
            client_version: "1.0.9156".to_string(),
            os_version: "10.0.19045".to_string(),
            os_arch: "x64".to_string(),
            app_arch: "x64".to_string(),
            system_locale: "en-US".to_string(),
            browser_user_agent: DEFAULT_USER_AGENT.to_string(),
            browser_version: "30.0.6".to_string(),
            client_build_number: 314511,
            native_build_number: 49606,
            client_event_source: None,
        }
    }
}

/// Request budget configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum number of admissions the budget can hold.
    pub capacity: u32,

    /// Value the budget is reset to at every refill boundary.
    pub refill_amount: u32,

    /// Refill period in milliseconds.
    pub refill_interval_ms: u64,

    /// Maximum calls in flight at once.
    pub max_concurrent: usize,

    /// Minimum gap between two admitted call starts (0 disables).
    pub min_spacing_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            refill_amount: 50,
            refill_interval_ms: 1000,
            max_concurrent: 5,
            min_spacing_ms: 20,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
