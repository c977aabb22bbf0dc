//! HTTP transport seam.
//!
//! The dispatcher only needs "send this request, give me status, a couple
//! of headers and the body". Production uses reqwest; tests plug in a
//! scripted transport.

use std::future::Future;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::config::{ApiConfig, ClientProperties};
use crate::rest::error::{RestError, RestResult};
use crate::rest::request::ApiRequest;
use crate::rest::response::RawResponse;
use crate::rest::retry::parse_retry_after;

/// Executes a single attempt of a request.
pub trait HttpTransport: Send + Sync + 'static {
    fn execute(&self, request: &ApiRequest)
        -> impl Future<Output = RestResult<RawResponse>> + Send;
}

/// reqwest-backed transport carrying the platform's default headers.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
    locale: String,
    timezone: String,
    super_properties: String,
}

impl ReqwestTransport {
    pub fn new(
        api: &ApiConfig,
        token: impl Into<String>,
        properties: &ClientProperties,
    ) -> RestResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(api.user_agent.clone())
            .timeout(Duration::from_secs(api.request_timeout_secs))
            .build()
            .map_err(|e| RestError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            locale: api.locale.clone(),
            timezone: api.timezone.clone(),
            super_properties: encode_super_properties(properties)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> RestResult<RawResponse> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(CONTENT_TYPE, "application/json")
            .header("X-Super-Properties", self.super_properties.as_str())
            .header("X-Discord-Locale", self.locale.as_str())
            .header("X-Discord-Timezone", self.timezone.as_str());

        if request.auth {
            builder = builder.header(AUTHORIZATION, self.token.as_str());
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RestError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let retry_after = parse_retry_after(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| RestError::Transport(e.to_string()))?
            .to_vec();

        Ok(RawResponse {
            status,
            content_type,
            retry_after,
            body,
        })
    }
}

/// Base64 of the JSON client identity block.
pub fn encode_super_properties(properties: &ClientProperties) -> RestResult<String> {
    let json = serde_json::to_vec(properties).map_err(|e| RestError::Decode(e.to_string()))?;
    Ok(BASE64.encode(json))
}
