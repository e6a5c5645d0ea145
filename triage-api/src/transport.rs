use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde_json::Value;

use crate::ClientConfig;

/// Statuses that mark a transient upstream condition: rate limited,
/// internal server error, service unavailable.
const RETRYABLE_STATUS_CODES: &[u16] = &[429, 500, 503];

const API_KEY_HEADER: &str = "x-api-key";

#[derive(thiserror::Error, Debug, Clone)]
pub enum TransportError {
    #[error("HTTP status {status}: {}", describe_body(.body))]
    Status { status: u16, body: Option<Value> },
    #[error("Request failed: {0}")]
    Network(String),
    #[error("Could not decode response body: {0}")]
    Decode(String),
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => RETRYABLE_STATUS_CODES.contains(status),
            _ => false,
        }
    }
}

fn describe_body(body: &Option<Value>) -> String {
    match body {
        Some(Value::String(text)) => text.clone(),
        Some(value) => value.to_string(),
        None => "no response body".to_string(),
    }
}

/// JSON-over-HTTP seam used by the fetcher and the submitter.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, path: &str, query: &[(&str, String)])
        -> Result<Value, TransportError>;

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, TransportError>;
}

/// Deliberate waits between requests (backoff and throttling).
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Suspends the current task on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a client that sends the API key on every request.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|err| TransportError::Config(err.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| TransportError::Config(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, TransportError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        parse_response(response).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        parse_response(response).await
    }
}

async fn parse_response(response: Response) -> Result<Value, TransportError> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|err| TransportError::Network(err.to_string()))?;

    if status < 400 {
        return serde_json::from_str(&text).map_err(|err| TransportError::Decode(err.to_string()));
    }

    Err(TransportError::Status {
        status,
        body: error_body(text),
    })
}

/// Keep the upstream error payload, as JSON when it is JSON.
fn error_body(text: String) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}
