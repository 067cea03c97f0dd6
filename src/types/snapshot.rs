//! The accumulated view of an in-flight assistant message.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::chunk::TokenUsage;

/// A contiguous, typed piece of accumulated message content.
///
/// At most one fragment is "open" (being appended to) at a time: the last
/// element, when its kind matches the incoming delta. Tool-call fragments are
/// an exception in that they stay addressable by call id even after a text
/// fragment opens behind them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentFragment {
    /// Plain assistant text.
    Text { text: String },
    /// A streamed function call; `arguments` grows as fragments arrive and is
    /// not guaranteed to be valid JSON until the stream completes.
    ToolCall {
        id: String,
        /// Position in the wire `tool_calls` array, used to route
        /// continuation chunks that omit the id.
        call_index: Option<u32>,
        name: String,
        arguments: String,
    },
    /// A failure rendered inline so partial content stays visible next to
    /// the explanation rather than being replaced by a silent stop.
    Error { message: String },
}

impl ContentFragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// The always-current accumulated state of one in-flight generation.
///
/// Exactly one snapshot exists per run. It is owned and mutated exclusively
/// by the orchestrator/accumulator pair while streaming; sinks receive it by
/// shared reference and must not retain it past the callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSnapshot {
    /// Ordered content fragments. Append-only: no chunk ever removes or
    /// reorders previously accumulated content.
    pub fragments: Vec<ContentFragment>,
    /// The model that actually produced the content (last write wins); may
    /// differ from the requested model when a router substitutes one.
    pub origin_model: Option<String>,
    /// True while the stream has not reached a terminal event.
    pub pending: bool,
    /// Auxiliary key/value data (usage, timestamps); additive, overwrite
    /// per key.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl MessageSnapshot {
    /// Fresh snapshot for a generation requested from `llm_id`.
    pub fn new(llm_id: impl Into<String>) -> Self {
        let mut metadata = HashMap::new();
        if let Ok(created) = serde_json::to_value(chrono::Utc::now()) {
            metadata.insert("created".to_string(), created);
        }
        Self {
            fragments: Vec::new(),
            origin_model: Some(llm_id.into()),
            pending: true,
            metadata,
        }
    }

    /// Concatenation of all text fragments, in order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for fragment in &self.fragments {
            if let ContentFragment::Text { text } = fragment {
                out.push_str(text);
            }
        }
        out
    }

    /// Usage recorded in metadata, if any chunk carried counters.
    pub fn usage(&self) -> Option<TokenUsage> {
        self.metadata
            .get("usage")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub(crate) fn set_usage(&mut self, usage: TokenUsage) {
        if let Ok(value) = serde_json::to_value(usage) {
            self.metadata.insert("usage".to_string(), value);
        }
    }
}

/// Terminal result of one `run`, created exactly once at stream end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The upstream terminated normally.
    Success,
    /// The caller cancelled; not a failure, and never rendered as one.
    Aborted,
    /// Transport-level failure (or a schema failure under the abort policy).
    Errored { message: String },
}

impl StreamOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Errored { message } => Some(message),
            _ => None,
        }
    }
}

/// What a completed run hands back to the caller: the terminal outcome plus
/// the final snapshot (ownership transfers out of the orchestrator here).
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: StreamOutcome,
    pub snapshot: MessageSnapshot,
}
