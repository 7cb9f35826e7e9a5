//! Transport abstraction for analysis calls
//!
//! Production code uses `HttpTransport` (one POST per call, no timeout:
//! the call completes or fails per the underlying transport).
//! Tests use `FakeTransport` with scripted replies and delays.

use crate::config::Endpoint;
use async_trait::async_trait;
use medai_shared::ScreeningError;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Header carrying the API key for generative endpoints
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Encoded request body
#[derive(Debug, Clone, PartialEq)]
pub enum WireBody {
    Json(serde_json::Value),
    Multipart {
        field: &'static str,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

/// Issues exactly one outbound call per `post`
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    /// POST `body` to `endpoint` and return the raw success body.
    /// Transport failures and non-2xx statuses are `Network` errors.
    async fn post(&self, endpoint: &Endpoint, body: WireBody) -> Result<Vec<u8>, ScreeningError>;
}

/// Real transport over reqwest
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ScreeningError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("medai/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ScreeningError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AnalysisTransport for HttpTransport {
    async fn post(&self, endpoint: &Endpoint, body: WireBody) -> Result<Vec<u8>, ScreeningError> {
        let mut request = self.client.post(&endpoint.url);

        if let Some(api_key) = &endpoint.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        request = match body {
            WireBody::Json(value) => request.json(&value),
            WireBody::Multipart {
                field,
                file_name,
                mime,
                bytes,
            } => {
                let part = reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&mime)
                    .map_err(|e| ScreeningError::Encode(format!("invalid mime '{}': {}", mime, e)))?;
                request.multipart(reqwest::multipart::Form::new().part(field, part))
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| ScreeningError::Network(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ScreeningError::Network(format!(
                "HTTP {} from {}: {}",
                status,
                endpoint.url,
                text.chars().take(200).collect::<String>()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ScreeningError::Network(format!("Failed to read body: {}", e)))?;
        debug!(url = %endpoint.url, bytes = bytes.len(), "response received");
        Ok(bytes.to_vec())
    }
}

/// One scripted reply
#[derive(Debug, Clone)]
pub struct FakeReply {
    pub delay: Duration,
    pub outcome: Result<Vec<u8>, ScreeningError>,
}

impl FakeReply {
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Ok(value.to_string().into_bytes()),
        }
    }

    pub fn raw(body: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Ok(body.as_bytes().to_vec()),
        }
    }

    pub fn error(error: ScreeningError) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Fake transport for testing
pub struct FakeTransport {
    replies: Mutex<Vec<FakeReply>>,
    requests: Mutex<Vec<(String, WireBody)>>,
}

impl FakeTransport {
    /// Create a fake transport with pre-defined replies, served in order.
    /// The last reply repeats once the others are used up.
    pub fn new(replies: Vec<FakeReply>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: FakeReply) -> Self {
        Self::new(vec![reply])
    }

    /// Get the number of calls made
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests seen so far as (url, body)
    pub fn requests(&self) -> Vec<(String, WireBody)> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Option<FakeReply> {
        let mut replies = self.replies.lock().unwrap();
        match replies.len() {
            0 => None,
            1 => Some(replies[0].clone()),
            _ => Some(replies.remove(0)),
        }
    }
}

#[async_trait]
impl AnalysisTransport for FakeTransport {
    async fn post(&self, endpoint: &Endpoint, body: WireBody) -> Result<Vec<u8>, ScreeningError> {
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.url.clone(), body));

        let reply = self
            .next_reply()
            .ok_or_else(|| ScreeningError::Network("no scripted reply".to_string()))?;

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.outcome
    }
}
