//! Configuration validation.
//!
//! Serde handles the syntax; this pass checks values. Every problem is
//! collected so a broken file can be fixed in one go.

use thiserror::Error;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("credentials.token is empty")]
    EmptyToken,

    #[error("credentials.token must be a user token, not a `Bot ` token")]
    BotToken,

    #[error("{field} is not a valid URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("rate_limit.refill_amount ({refill}) exceeds rate_limit.capacity ({capacity})")]
    RefillExceedsCapacity { refill: u32, capacity: u32 },
}

/// Returns true when the token carries a bot prefix.
pub fn is_bot_token(token: &str) -> bool {
    token.starts_with("Bot ") || token.starts_with("bot ")
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let token = config.credentials.token.trim();
    if token.is_empty() {
        errors.push(ValidationError::EmptyToken);
    } else if is_bot_token(token) {
        errors.push(ValidationError::BotToken);
    }

    if let Err(e) = url::Url::parse(&config.api.base_url) {
        errors.push(ValidationError::InvalidUrl {
            field: "api.base_url",
            reason: e.to_string(),
        });
    }
    if let Err(e) = url::Url::parse(&config.gateway.url) {
        errors.push(ValidationError::InvalidUrl {
            field: "gateway.url",
            reason: e.to_string(),
        });
    }

    let limits = &config.rate_limit;
    if limits.capacity == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.capacity" });
    }
    if limits.refill_amount == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.refill_amount" });
    }
    if limits.refill_interval_ms == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.refill_interval_ms" });
    }
    if limits.max_concurrent == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.max_concurrent" });
    }
    if limits.refill_amount > limits.capacity {
        errors.push(ValidationError::RefillExceedsCapacity {
            refill: limits.refill_amount,
            capacity: limits.capacity,
        });
    }

    if config.gateway.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "gateway.connect_timeout_secs" });
    }
    if config.api.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "api.request_timeout_secs" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
