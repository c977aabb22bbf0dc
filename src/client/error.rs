//! Client error definitions.

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::rest::RestError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No token provided")]
    EmptyToken,

    #[error("Bot tokens are not supported, provide a user token")]
    BotToken,

    #[error(transparent)]
    Rest(#[from] RestError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub type ClientResult<T> = Result<T, ClientError>;
