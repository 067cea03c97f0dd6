//! cheungfun
//!
//! A streaming chat-generation pipeline: opens a request against an
//! LLM provider, normalizes the provider's incremental wire dialect into one
//! canonical update model, and republishes the accumulating message to a
//! subscriber at a bounded, adaptive rate with mid-stream cancellation and
//! partial-failure recovery.
//!
//! The flow, end to end:
//!
//! ```text
//! caller -> StreamOrchestrator -> StreamTransport (SSE)
//!                 |                      |
//!                 |               RawVendorEvent
//!                 |                      v
//!                 |              ChunkValidator (per-vendor dialect)
//!                 |                      v
//!                 +--- accumulator <- CanonicalChunk
//!                 |
//!           UpdatePublisher (decimation)
//!                 |
//!           on_update(&MessageSnapshot, done)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cheungfun::prelude::*;
//!
//! # async fn example() {
//! let transport = Arc::new(HttpSseTransport::new(HttpTransportConfig::new(
//!     "https://api.openai.com/v1",
//!     std::env::var("OPENAI_API_KEY").unwrap_or_default(),
//! )));
//! let orchestrator = StreamOrchestrator::new(transport);
//!
//! let request = ChatRequest::new("gpt-4o-mini", vec![ChatMessage::user("Hello!")]);
//! let cancel = CancelHandle::new();
//!
//! let report = orchestrator
//!     .run("openai:gpt-4o-mini", &request, cancel, |snapshot, done| {
//!         if done {
//!             println!("{}", snapshot.text());
//!         }
//!     })
//!     .await;
//! assert!(report.outcome.is_success());
//! # }
//! ```
#![deny(unsafe_code)]

pub mod accumulator;
pub mod cancel;
pub mod error;
pub mod hooks;
pub mod orchestrator;
pub mod publisher;
pub mod transport;
pub mod types;
pub mod wire;

pub use error::GenError;

/// Commonly used items, re-exported.
pub mod prelude {
    pub use crate::cancel::CancelHandle;
    pub use crate::error::GenError;
    pub use crate::hooks::{CompletionHook, dispatch_completion_hooks};
    pub use crate::orchestrator::{MalformedEventPolicy, RunId, RunSlot, StreamOrchestrator};
    pub use crate::publisher::UpdatePublisher;
    pub use crate::transport::{
        HttpSseTransport, HttpTransportConfig, RawEventStream, RawVendorEvent, StreamTransport,
    };
    pub use crate::types::{
        CanonicalChunk, ChatMessage, ChatRequest, ContentFragment, FinishReason, MessageSnapshot,
        RunReport, StreamOutcome, TokenUsage, ToolCallDelta, ToolChoice, ToolDefinition,
    };
    pub use crate::wire::{ChunkValidator, Dialect, DialectRegistry, OpenAiCompatValidator};
}
