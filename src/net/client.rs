//! Resilient network client.
//!
//! `ApiClient` speaks the onboarding API over a [`Transport`] seam: the real
//! [`HttpTransport`] (reqwest) in production, a [`StubTransport`] serving
//! canned fixtures for tests and the offline execution mode. Call sites look
//! identical either way.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::RetryConfig;
use crate::error::NetworkError;
use crate::model::ErrorDetails;
use crate::net::endpoint::{Endpoint, PreparedRequest, RequestBody};

/// Status and body of a completed exchange, before any decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// The seam between the client and the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, NetworkError>;
}

/// Real transport over reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, NetworkError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| NetworkError::Transport(e.to_string()))?;
        let mut builder = self.client.request(method, &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(bytes) => builder.body(bytes),
            RequestBody::Multipart {
                field_name,
                file_name,
                bytes,
                params,
            } => {
                // reqwest generates a fresh random boundary for every Form.
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("application/octet-stream")
                    .map_err(|e| NetworkError::Transport(e.to_string()))?;
                let mut form = Form::new();
                for (key, value) in params {
                    form = form.text(key, value);
                }
                builder.multipart(form.part(field_name, part))
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?
            .to_vec();
        Ok(RawResponse { status, body })
    }
}

/// Canned-fixture transport. Fixtures are keyed by route path; every request
/// is recorded so tests can assert on headers and bodies.
#[derive(Default)]
pub struct StubTransport {
    fixtures: Mutex<HashMap<String, RawResponse>>,
    recorded: Mutex<Vec<PreparedRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw fixture body for a route path.
    pub fn with_fixture(self, path: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.fixtures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                path.to_string(),
                RawResponse {
                    status,
                    body: body.into(),
                },
            );
        self
    }

    /// Register a literal value as the response for a route path.
    pub fn with_json<T: Serialize>(self, path: &str, status: u16, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        self.with_fixture(path, status, body)
    }

    /// Every request executed so far, in order.
    pub fn recorded(&self) -> Vec<PreparedRequest> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, NetworkError> {
        let fixture = {
            let fixtures = self
                .fixtures
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            fixtures
                .iter()
                .find(|(path, _)| request.url.ends_with(path.as_str()))
                .map(|(_, response)| response.clone())
        };
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        fixture.ok_or_else(|| NetworkError::Transport(format!("no stub fixture for {}", request.url)))
    }
}

/// Typed client over a transport.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// Client over the real HTTP transport.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transport(base_url, Arc::new(HttpTransport::new()))
    }

    /// Client over an arbitrary transport (stub, recording, ...).
    pub fn with_transport(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a JSON request and decode the response as `T`.
    pub async fn send<T, B>(
        &self,
        endpoint: Endpoint,
        body: &B,
        headers: Vec<(String, String)>,
    ) -> Result<T, NetworkError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let request = PreparedRequest::json(&self.base_url, endpoint, body, headers)?;
        self.dispatch(request).await
    }

    /// Issue a multipart/form-data request with a single file field (plus any
    /// parameter fields) and decode the response as `T`.
    pub async fn send_multipart<T>(
        &self,
        endpoint: Endpoint,
        field_name: &str,
        file_name: &str,
        bytes: Vec<u8>,
        params: Vec<(String, String)>,
        headers: Vec<(String, String)>,
    ) -> Result<T, NetworkError>
    where
        T: DeserializeOwned,
    {
        let request = PreparedRequest::multipart(
            &self.base_url,
            endpoint,
            field_name,
            file_name,
            bytes,
            params,
            headers,
        );
        self.dispatch(request).await
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        request: PreparedRequest,
    ) -> Result<T, NetworkError> {
        debug!(curl = %request.to_curl(), "dispatching API request");
        let response = self.transport.execute(request).await?;
        classify(response)
    }
}

/// HTTP error classification: any status in `[400, 600)` is a server error
/// whose body decodes to (possibly empty) structured details; everything else
/// must decode as `T`.
fn classify<T: DeserializeOwned>(response: RawResponse) -> Result<T, NetworkError> {
    if (400..600).contains(&response.status) {
        let details = if response.body.is_empty() {
            ErrorDetails::default()
        } else {
            serde_json::from_slice(&response.body)
                .map_err(|e| NetworkError::Decode(e.to_string()))?
        };
        return Err(NetworkError::Server {
            status: response.status,
            details,
        });
    }
    serde_json::from_slice(&response.body).map_err(|e| NetworkError::Decode(e.to_string()))
}

/// Re-invoke `operation` until it succeeds, waiting `delay` between attempts.
///
/// Exactly `max_attempts` invocations happen in the worst case; the final one
/// is not followed by a wait and its failure is the one surfaced, so the last
/// error observed is representative. Opt-in per call-site — nothing in this
/// crate retries implicitly. Cancelling an in-flight loop is not supported.
pub async fn retrying<T, E, F, Fut>(
    max_attempts: usize,
    delay: Duration,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    for attempt in 1..max_attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                debug!(attempt, max_attempts, error = %err, "operation failed, waiting before retry");
                tokio::time::sleep(delay).await;
            }
        }
    }
    operation().await
}

/// [`retrying`] with knobs taken from a [`RetryConfig`].
pub async fn retrying_with<T, E, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retrying(config.max_attempts, config.delay, operation).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Pong {
        ok: bool,
    }

    fn client_with(stub: Arc<StubTransport>) -> ApiClient {
        ApiClient::with_transport("https://onboarding.test", stub)
    }

    #[tokio::test]
    async fn stubbed_send_decodes_fixture() {
        let stub = Arc::new(StubTransport::new().with_fixture(
            "/sendEvent",
            200,
            r#"{"ok":true}"#,
        ));
        let client = client_with(Arc::clone(&stub));
        let pong: Pong = client
            .send(Endpoint::SendEvent, &serde_json::json!({}), vec![])
            .await
            .unwrap();
        assert!(pong.ok);
        assert_eq!(stub.request_count(), 1);
    }

    #[tokio::test]
    async fn stub_records_headers() {
        let stub = Arc::new(StubTransport::new().with_fixture("/sendEvent", 200, "{}"));
        let client = client_with(Arc::clone(&stub));
        let _: crate::model::EmptyResponse = client
            .send(
                Endpoint::SendEvent,
                &serde_json::json!({}),
                vec![("Authorization".into(), "Bearer tok".into())],
            )
            .await
            .unwrap();
        let recorded = stub.recorded();
        assert!(recorded[0]
            .headers
            .iter()
            .any(|(k, v)| k == "Authorization" && v == "Bearer tok"));
    }

    #[tokio::test]
    async fn status_4xx_with_body_decodes_details() {
        let stub = Arc::new(StubTransport::new().with_fixture(
            "/initializeApp",
            404,
            r#"{"message":"unknown api key"}"#,
        ));
        let client = client_with(stub);
        let err = client
            .send::<Pong, _>(Endpoint::InitializeApp, &serde_json::json!({}), vec![])
            .await
            .unwrap_err();
        match err {
            NetworkError::Server { status, details } => {
                assert_eq!(status, 404);
                assert_eq!(details.message.as_deref(), Some("unknown api key"));
            }
            other => panic!("expected server error, got {other}"),
        }
    }

    #[tokio::test]
    async fn status_401_with_empty_body_yields_default_details() {
        let stub = Arc::new(StubTransport::new().with_fixture("/initializeApp", 401, ""));
        let client = client_with(stub);
        let err = client
            .send::<Pong, _>(Endpoint::InitializeApp, &serde_json::json!({}), vec![])
            .await
            .unwrap_err();
        match err {
            NetworkError::Server { status, details } => {
                assert_eq!(status, 401);
                assert_eq!(details, ErrorDetails::default());
            }
            other => panic!("expected server error, got {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_error_body_is_fatal() {
        let stub = Arc::new(StubTransport::new().with_fixture("/initializeApp", 500, "<html>"));
        let client = client_with(stub);
        let err = client
            .send::<Pong, _>(Endpoint::InitializeApp, &serde_json::json!({}), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::Decode(_)));
    }

    #[tokio::test]
    async fn success_body_that_does_not_match_shape_is_decode_error() {
        let stub = Arc::new(StubTransport::new().with_fixture("/sendEvent", 200, r#"{"nope":1}"#));
        let client = client_with(stub);
        let err = client
            .send::<Pong, _>(Endpoint::SendEvent, &serde_json::json!({}), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::Decode(_)));
    }

    #[tokio::test]
    async fn retrying_returns_success_on_third_attempt() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = retrying(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(format!("boom {n}"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retrying_surfaces_last_failure_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = retrying(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(format!("boom {n}")) }
        })
        .await;
        assert_eq!(result, Err("boom 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_config_drives_attempt_count() {
        let config = RetryConfig {
            delay: Duration::from_millis(1),
            ..RetryConfig::default()
        };
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = retrying_with(&config, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(format!("boom {n}")) }
        })
        .await;
        assert_eq!(result, Err("boom 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), config.max_attempts);
    }

    #[tokio::test]
    async fn retrying_with_single_attempt_never_sleeps() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = retrying(1, Duration::from_secs(3600), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err("boom".to_string()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
