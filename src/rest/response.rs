//! Response classification and decoding.

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::rest::error::{ApiError, HttpError, RestError, RestResult};

/// Delay used when a throttled response carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// What a transport hands back: status, selected headers and the raw body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub retry_after: Option<Duration>,
    pub body: Vec<u8>,
}

/// Decoded success body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            ResponseBody::Text(_) => None,
        }
    }

    /// Deserialize a JSON body into `T`.
    pub fn parse<T: DeserializeOwned>(self) -> RestResult<T> {
        match self {
            ResponseBody::Json(v) => {
                serde_json::from_value(v).map_err(|e| RestError::Decode(e.to_string()))
            }
            ResponseBody::Text(t) => Err(RestError::Decode(format!(
                "expected a JSON body, got text ({} bytes)",
                t.len()
            ))),
        }
    }
}

/// Result of one attempt.
#[derive(Debug)]
pub enum Outcome {
    /// Terminal: hand this to the caller.
    Done(RestResult<ResponseBody>),
    /// 429: sleep for the delay, then queue again.
    Throttled(Duration),
}

/// Map a raw response to a terminal result or a throttling signal.
pub fn classify(raw: RawResponse, method: &Method, path: &str) -> Outcome {
    if raw.status == 429 {
        return Outcome::Throttled(raw.retry_after.unwrap_or(DEFAULT_RETRY_AFTER));
    }

    let is_json = raw
        .content_type
        .as_deref()
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);

    if (200..300).contains(&raw.status) {
        return Outcome::Done(decode_success(raw.body, is_json));
    }

    let parsed: Option<Value> = if is_json {
        serde_json::from_slice(&raw.body).ok()
    } else {
        None
    };

    let code = parsed
        .as_ref()
        .and_then(|v| v.get("code"))
        .and_then(Value::as_u64)
        .filter(|code| *code != 0);

    let err = match code {
        Some(code) => {
            let message = parsed
                .as_ref()
                .and_then(|v| v.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown API Error")
                .to_string();
            RestError::Api(ApiError {
                code,
                status: raw.status,
                method: method.to_string(),
                path: path.to_string(),
                message,
            })
        }
        None => RestError::Http(HttpError {
            status: raw.status,
            method: method.to_string(),
            path: path.to_string(),
        }),
    };
    Outcome::Done(Err(err))
}

fn decode_success(body: Vec<u8>, is_json: bool) -> RestResult<ResponseBody> {
    if is_json {
        if body.is_empty() {
            return Ok(ResponseBody::Json(Value::Null));
        }
        return serde_json::from_slice(&body)
            .map(ResponseBody::Json)
            .map_err(|e| RestError::Decode(e.to_string()));
    }
    String::from_utf8(body)
        .map(ResponseBody::Text)
        .map_err(|e| RestError::Decode(e.to_string()))
}
