//! Request dispatcher.
//!
//! # Responsibilities
//! - Admit calls through the shared `AdmissionGate` (FIFO, cap, budget)
//! - Execute one attempt through the `HttpTransport`
//! - Sleep and re-queue on 429, keeping the request id
//! - Map everything else to a terminal result for the caller
//!
//! # Data Flow
//! ```text
//! submit(request)
//!     → gate.admit()            (queue, slot, budget)
//!     → transport.execute()     (slot held)
//!     → classify()
//!         ├─ Done      → return to caller
//!         └─ Throttled → sleep(retry_after) → back of the queue, attempt+1
//! ```

use std::time::Instant;

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::observability::metrics;
use crate::ratelimit::AdmissionGate;
use crate::rest::error::RestResult;
use crate::rest::request::ApiRequest;
use crate::rest::response::{classify, Outcome, ResponseBody};
use crate::rest::routes;
use crate::rest::transport::{HttpTransport, ReqwestTransport};

/// A request in flight through the dispatcher.
#[derive(Debug)]
struct PendingRequest {
    request: ApiRequest,
    attempt: u32,
}

/// Issues unary calls under a shared budget and concurrency cap.
///
/// Share it behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct RequestDispatcher<T: HttpTransport = ReqwestTransport> {
    transport: T,
    gate: AdmissionGate,
}

impl RequestDispatcher<ReqwestTransport> {
    /// Build the production dispatcher from configuration.
    ///
    /// Must be called from within a Tokio runtime (the budget spawns its
    /// refill timer).
    pub fn from_config(config: &ClientConfig) -> RestResult<Self> {
        let transport = ReqwestTransport::new(
            &config.api,
            config.credentials.token.clone(),
            &config.gateway.properties,
        )?;
        Ok(Self::new(transport, AdmissionGate::from_config(&config.rate_limit)))
    }
}

impl<T: HttpTransport> RequestDispatcher<T> {
    pub fn new(transport: T, gate: AdmissionGate) -> Self {
        Self { transport, gate }
    }

    /// Execute `request`, retrying on throttling until a terminal result.
    ///
    /// Dropping the returned future cancels the request; a call that has not
    /// been admitted yet consumes no budget and holds no slot afterwards.
    pub async fn submit(&self, request: ApiRequest) -> RestResult<ResponseBody> {
        let mut pending = PendingRequest { request, attempt: 1 };

        loop {
            let admission = self.gate.admit().await;
            let start = Instant::now();

            tracing::debug!(
                request_id = %pending.request.id,
                method = %pending.request.method,
                path = %pending.request.path,
                attempt = pending.attempt,
                "Dispatching request"
            );

            let result = self.transport.execute(&pending.request).await;
            drop(admission);

            let raw = match result {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(
                        request_id = %pending.request.id,
                        path = %pending.request.path,
                        error = %e,
                        "Request failed before a response"
                    );
                    return Err(e);
                }
            };

            let method = pending.request.method.as_str();
            metrics::record_request(method, raw.status, start);

            match classify(raw, &pending.request.method, &pending.request.path) {
                Outcome::Done(result) => {
                    if let Err(e) = &result {
                        tracing::debug!(
                            request_id = %pending.request.id,
                            error = %e,
                            "Request rejected"
                        );
                    }
                    return result;
                }
                Outcome::Throttled(delay) => {
                    metrics::record_throttled(method);
                    tracing::warn!(
                        request_id = %pending.request.id,
                        path = %pending.request.path,
                        attempt = pending.attempt,
                        retry_after_ms = delay.as_millis() as u64,
                        "Throttled, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    pending.attempt += 1;
                }
            }
        }
    }

    pub async fn get(&self, path: impl Into<String>) -> RestResult<ResponseBody> {
        self.submit(ApiRequest::get(path)).await
    }

    pub async fn post(&self, path: impl Into<String>, body: Value) -> RestResult<ResponseBody> {
        self.submit(ApiRequest::post(path, body)).await
    }

    pub async fn patch(&self, path: impl Into<String>, body: Value) -> RestResult<ResponseBody> {
        self.submit(ApiRequest::patch(path, body)).await
    }

    pub async fn put(&self, path: impl Into<String>, body: Value) -> RestResult<ResponseBody> {
        self.submit(ApiRequest::put(path, body)).await
    }

    pub async fn delete(&self, path: impl Into<String>) -> RestResult<ResponseBody> {
        self.submit(ApiRequest::delete(path)).await
    }

    /// Discover the realtime gateway endpoint.
    pub async fn gateway_url(&self) -> RestResult<String> {
        #[derive(Deserialize)]
        struct GatewayInfo {
            url: String,
        }

        let info: GatewayInfo = self.get(routes::GATEWAY).await?.parse()?;
        Ok(info.url)
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Shortcut for a raw method/path pair.
    pub async fn request(&self, method: Method, path: impl Into<String>) -> RestResult<ResponseBody> {
        self.submit(ApiRequest::new(method, path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::RateBudget;
    use crate::rest::error::RestError;
    use crate::rest::response::RawResponse;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant as TokioInstant;
    use uuid::Uuid;

    type Responder = dyn Fn(usize) -> RestResult<RawResponse> + Send + Sync;

    /// Transport that answers from a closure and records every call.
    struct ScriptedTransport {
        respond: Box<Responder>,
        latency: Duration,
        calls: Mutex<Vec<(TokioInstant, Uuid)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(
            latency: Duration,
            respond: impl Fn(usize) -> RestResult<RawResponse> + Send + Sync + 'static,
        ) -> Self {
            Self {
                respond: Box::new(respond),
                latency,
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> Vec<(TokioInstant, Uuid)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl HttpTransport for ScriptedTransport {
        async fn execute(&self, request: &ApiRequest) -> RestResult<RawResponse> {
            let call_no = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((TokioInstant::now(), request.id));
                calls.len() - 1
            };
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.latency).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            (self.respond)(call_no)
        }
    }

    fn ok_json() -> RestResult<RawResponse> {
        Ok(RawResponse {
            status: 200,
            content_type: Some("application/json".into()),
            retry_after: None,
            body: br#"{"ok":true}"#.to_vec(),
        })
    }

    fn dispatcher(
        transport: ScriptedTransport,
        capacity: u32,
        max_concurrent: usize,
    ) -> Arc<RequestDispatcher<ScriptedTransport>> {
        let budget = RateBudget::new(capacity, capacity, Duration::from_millis(1000));
        let gate = AdmissionGate::new(budget, max_concurrent, Duration::ZERO);
        Arc::new(RequestDispatcher::new(transport, gate))
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_respects_budget_and_cap() {
        let transport = ScriptedTransport::new(Duration::from_millis(10), |_| ok_json());
        let dispatcher = dispatcher(transport, 50, 5);
        let epoch = dispatcher.gate().budget().epoch();

        let tasks: Vec<_> = (0..200)
            .map(|i| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move { dispatcher.get(format!("/items/{i}")).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        let transport = dispatcher.transport();
        assert!(transport.max_in_flight.load(Ordering::SeqCst) <= 5);

        let mut times: Vec<TokioInstant> = transport.calls().into_iter().map(|(t, _)| t).collect();
        assert_eq!(times.len(), 200);
        times.sort();

        let mut buckets = std::collections::BTreeMap::new();
        for t in &times {
            let bucket = (*t - epoch).as_millis() / 1000;
            *buckets.entry(bucket).or_insert(0usize) += 1;
        }
        assert!(buckets.values().all(|count| *count <= 50), "{buckets:?}");
        assert_eq!(buckets.len(), 4);

        for window in times.windows(51) {
            assert!(window[50] - window[0] >= Duration::from_millis(1000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_request_retries_after_delay() {
        let transport = ScriptedTransport::new(Duration::ZERO, |call| {
            if call == 0 {
                Ok(RawResponse {
                    status: 429,
                    retry_after: Some(Duration::from_secs(2)),
                    ..Default::default()
                })
            } else {
                ok_json()
            }
        });
        let dispatcher = dispatcher(transport, 50, 5);

        let body = dispatcher.get("/users/@me").await.unwrap();
        assert_eq!(body, ResponseBody::Json(json!({"ok": true})));

        let calls = dispatcher.transport().calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].0 - calls[0].0 >= Duration::from_millis(2000));
        assert_eq!(calls[0].1, calls[1].1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_throttling_stops() {
        let transport = ScriptedTransport::new(Duration::ZERO, |call| {
            if call < 3 {
                Ok(RawResponse { status: 429, ..Default::default() })
            } else {
                ok_json()
            }
        });
        let dispatcher = dispatcher(transport, 50, 5);

        assert!(dispatcher.get("/x").await.is_ok());
        assert_eq!(dispatcher.transport().calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_not_retried() {
        let transport = ScriptedTransport::new(Duration::ZERO, |_| {
            Ok(RawResponse {
                status: 500,
                content_type: Some("text/plain".into()),
                body: b"boom".to_vec(),
                ..Default::default()
            })
        });
        let dispatcher = dispatcher(transport, 50, 5);

        let err = dispatcher.get("/x").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(dispatcher.transport().calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_returned() {
        let transport = ScriptedTransport::new(Duration::ZERO, |_| {
            Err(RestError::Transport("connection refused".into()))
        });
        let dispatcher = dispatcher(transport, 50, 5);

        let err = dispatcher.delete("/x").await.unwrap_err();
        assert!(matches!(err, RestError::Transport(_)));
        assert_eq!(dispatcher.gate().in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_submit_frees_slot() {
        let transport = ScriptedTransport::new(Duration::from_secs(10), |_| ok_json());
        let dispatcher = dispatcher(transport, 50, 1);

        let slow = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.get("/slow").await })
        };
        tokio::task::yield_now().await;
        assert_eq!(dispatcher.gate().in_flight(), 1);

        slow.abort();
        let _ = slow.await;
        assert_eq!(dispatcher.gate().in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_url() {
        let transport = ScriptedTransport::new(Duration::ZERO, |_| {
            Ok(RawResponse {
                status: 200,
                content_type: Some("application/json".into()),
                retry_after: None,
                body: br#"{"url":"wss://gateway.example"}"#.to_vec(),
            })
        });
        let dispatcher = dispatcher(transport, 50, 5);
        assert_eq!(dispatcher.gateway_url().await.unwrap(), "wss://gateway.example");
    }
}
