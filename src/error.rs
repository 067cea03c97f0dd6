//! Error types for the generation pipeline.
//!
//! The taxonomy distinguishes failures that are recovered locally (a single
//! malformed event), failures that end the whole stream (transport), and
//! cancellation, which is never reported as a failure.

use thiserror::Error;

/// Errors produced by the streaming generation pipeline.
#[derive(Debug, Error)]
pub enum GenError {
    /// One upstream event did not match its vendor schema.
    ///
    /// `path` names the offending field (e.g. `choices[0].delta`). Depending
    /// on the orchestrator policy this is either skipped or ends the stream.
    #[error("Schema validation failed at `{path}`: {message}")]
    SchemaValidation { path: String, message: String },

    /// Network or protocol failure from the upstream transport.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status before the stream was established.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Payload could not be decoded as JSON at all.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The caller requested cancellation.
    #[error("Operation cancelled")]
    Cancelled,

    /// The request failed local validation before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or inconsistent pipeline configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invariant violation inside the pipeline itself.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GenError {
    /// Convenience constructor for schema failures.
    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaValidation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True when the error represents a user-requested stop.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True when the error is a per-event schema failure that the
    /// orchestrator may recover from locally.
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::SchemaValidation { .. })
    }
}
