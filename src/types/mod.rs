//! Data model: requests, canonical chunks, and accumulated snapshots.

pub mod chunk;
pub mod request;
pub mod snapshot;

pub use chunk::{CanonicalChunk, FinishReason, TokenUsage, ToolCallDelta};
pub use request::{
    ChatMessage, ChatRequest, CompletedToolCall, ContentPart, FunctionCall, FunctionDefinition,
    ImageDetail, ImageUrl, ToolChoice, ToolDefinition, ToolKind, UserContent,
};
pub use snapshot::{ContentFragment, MessageSnapshot, RunReport, StreamOutcome};
