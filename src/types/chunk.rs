//! Canonical streaming increment types.
//!
//! A [`CanonicalChunk`] is the vendor-neutral form of one upstream streaming
//! event, produced by a wire validator and consumed by the accumulator. It is
//! immutable after creation.

use serde::{Deserialize, Serialize};

/// Why the model stopped generating.
///
/// Providers are observed to emit undocumented values for this field
/// (OpenRouter relays `stop_sequence`, `eos`, `COMPLETE` and `error` from its
/// upstreams). Unknown strings are preserved as [`FinishReason::Other`]
/// instead of being rejected, because rejecting them breaks multi-vendor
/// compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// Natural completion, or a stop sequence was hit.
    Stop,
    /// `max_tokens` exceeded.
    Length,
    /// The model called one or more tools.
    ToolCalls,
    /// An upstream content filter stopped the generation.
    ContentFilter,
    /// Anthropic-style stop-sequence signal relayed by aggregators.
    StopSequence,
    /// End-of-sequence marker (Phind via OpenRouter).
    Eos,
    /// Command-R style completion marker.
    Complete,
    /// The aggregator reported a network error as a finish reason.
    Error,
    /// Any other value, kept verbatim.
    Other(String),
}

impl FinishReason {
    /// Map a wire finish-reason string to the canonical enum.
    ///
    /// Returns `None` for the "still generating" sentinels: a missing value
    /// or the empty string (LocalAI emits `""` mid-stream).
    pub fn from_wire(raw: Option<&str>) -> Option<Self> {
        match raw {
            None | Some("") => None,
            Some("stop") => Some(Self::Stop),
            Some("length") => Some(Self::Length),
            Some("tool_calls") => Some(Self::ToolCalls),
            Some("content_filter") => Some(Self::ContentFilter),
            Some("stop_sequence") => Some(Self::StopSequence),
            Some("eos") => Some(Self::Eos),
            Some("COMPLETE") => Some(Self::Complete),
            Some("error") => Some(Self::Error),
            Some(other) => Some(Self::Other(other.to_string())),
        }
    }

    /// True when the reason is an extension value outside the documented set.
    pub fn is_extension(&self) -> bool {
        matches!(self, Self::Other(_))
    }
}

/// Token accounting reported by the provider, usually on the final chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One incremental piece of a streamed tool call.
///
/// Only the first chunk of a call carries the id and function name; later
/// chunks identify the call by wire index and append argument text. Both keys
/// are kept so the accumulator can route the fragment either way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Provider-assigned call id, present on the opening chunk.
    pub id: Option<String>,
    /// Position of this call in the chunk's `tool_calls` array.
    pub index: Option<u32>,
    /// Function name fragment.
    pub name: Option<String>,
    /// Argument-string fragment (raw, possibly invalid JSON).
    pub arguments: Option<String>,
}

/// The validated, vendor-neutral representation of one streaming event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalChunk {
    /// Incremental assistant text, if this event carried any.
    pub text: Option<String>,
    /// Incremental tool-call pieces, in wire order.
    pub tool_calls: Vec<ToolCallDelta>,
    /// Terminal signal; `None` while the model is still generating.
    pub finish: Option<FinishReason>,
    /// Usage counters, when the provider attached them.
    pub usage: Option<TokenUsage>,
    /// Identifier of the model that actually produced this event, which may
    /// differ from the requested one (routers substitute models).
    pub model: Option<String>,
}

impl CanonicalChunk {
    /// True when the event carries nothing the accumulator would fold.
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.tool_calls.is_empty()
            && self.finish.is_none()
            && self.usage.is_none()
            && self.model.is_none()
    }
}
