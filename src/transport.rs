//! Upstream transport: the collaborator that yields raw vendor events.
//!
//! The pipeline only depends on the [`StreamTransport`] trait; the bundled
//! [`HttpSseTransport`] speaks the OpenAI-compatible HTTP dialect using SSE
//! (`eventsource-stream` handles UTF-8 boundaries, line buffering and event
//! framing). Tests substitute in-memory transports.

use std::pin::Pin;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::Stream;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};

use crate::cancel::{CancelHandle, cancellable_events};
use crate::error::GenError;
use crate::types::ChatRequest;

/// One opaque, vendor-specific event as received off the wire. Ephemeral:
/// validated into a canonical chunk and not retained afterwards.
#[derive(Debug, Clone)]
pub struct RawVendorEvent {
    /// The event payload (the SSE `data:` field).
    pub data: String,
}

impl RawVendorEvent {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }

    /// Decode the payload as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, GenError> {
        serde_json::from_str(&self.data)
            .map_err(|e| GenError::Parse(format!("event is not valid JSON: {e}")))
    }
}

/// Lazy sequence of raw events, terminated by natural close or error.
pub type RawEventStream = Pin<Box<dyn Stream<Item = Result<RawVendorEvent, GenError>> + Send>>;

/// Opens a streaming generation against an upstream provider.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Open the upstream stream for `request`.
    ///
    /// Implementations must honor `cancel` by aborting in-flight I/O rather
    /// than draining the response to completion.
    async fn open(
        &self,
        vendor: &str,
        request: &ChatRequest,
        cancel: &CancelHandle,
    ) -> Result<RawEventStream, GenError>;
}

/// Connection settings for an OpenAI-compatible HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub base_url: String,
    api_key: SecretString,
    pub organization: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl HttpTransportConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: SecretString::from(api_key.into()),
            organization: None,
            headers: Vec::new(),
        }
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// SSE transport over `reqwest` for OpenAI-compatible providers.
pub struct HttpSseTransport {
    config: HttpTransportConfig,
    http_client: reqwest::Client,
}

impl HttpSseTransport {
    pub fn new(config: HttpTransportConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_client(config: HttpTransportConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    fn build_body(request: &ChatRequest) -> Result<serde_json::Value, GenError> {
        let mut body = serde_json::to_value(request)
            .map_err(|e| GenError::Internal(format!("failed to serialize request: {e}")))?;
        // Streaming is what this pipeline exists for; usage is requested so
        // the final chunk carries counters.
        body["stream"] = serde_json::Value::Bool(true);
        body["stream_options"] = serde_json::json!({ "include_usage": true });
        Ok(body)
    }
}

#[async_trait]
impl StreamTransport for HttpSseTransport {
    async fn open(
        &self,
        vendor: &str,
        request: &ChatRequest,
        cancel: &CancelHandle,
    ) -> Result<RawEventStream, GenError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = Self::build_body(request)?;

        let mut builder = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body);
        if let Some(org) = &self.config.organization {
            builder = builder.header("OpenAI-Organization", org);
        }
        for (name, value) in &self.config.headers {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GenError::Http(format!("failed to send request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GenError::Http(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        tracing::debug!(vendor, url = %url, "upstream stream established");

        let mut sse = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| std::io::Error::other(format!("stream error: {e}"))))
            .eventsource();

        let events = async_stream::stream! {
            while let Some(event) = sse.next().await {
                match event {
                    Ok(event) => {
                        let data = event.data.trim();
                        // The stream is terminated by a `data: [DONE]` message.
                        if data == "[DONE]" {
                            break;
                        }
                        if data.is_empty() {
                            continue;
                        }
                        yield Ok(RawVendorEvent::new(event.data));
                    }
                    Err(e) => {
                        yield Err(GenError::Transport(format!("SSE parsing error: {e}")));
                        break;
                    }
                }
            }
        };

        Ok(cancellable_events(Box::pin(events), cancel.clone()))
    }
}
