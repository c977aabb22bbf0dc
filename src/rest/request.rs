//! Outbound request description.

use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

/// A unary call to the platform API.
///
/// The `id` stays the same across throttling retries so log lines for every
/// attempt can be correlated.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub id: Uuid,
    pub method: Method,
    /// Path relative to the versioned base URL, e.g. `/users/@me`.
    pub path: String,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Attach the `Authorization` header.
    pub auth: bool,
    /// Extra headers, applied after the defaults.
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            body: None,
            auth: true,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Send without the credential.
    pub fn without_auth(mut self) -> Self {
        self.auth = false;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}
