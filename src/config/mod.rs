//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, GATELINK_TOKEN override)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → cloned into the dispatcher, the gateway session and the client
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ApiConfig;
pub use schema::ClientConfig;
pub use schema::ClientProperties;
pub use schema::GatewayConfig;
pub use schema::ObservabilityConfig;
pub use schema::RateLimitConfig;
