//! Cancellation handles for in-flight generations.
//!
//! A handle is created fresh per run, handed to the caller, and is terminal
//! once signaled. The orchestrator checks it at every event boundary and the
//! transport wraps its stream with it, so dropping the cancelled stream
//! closes the underlying connection and the provider stops generating tokens.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::transport::RawEventStream;

/// A shared, single-shot abort signal.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Terminal: there is no reset.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Wrap a raw event stream so it ends as soon as the handle is signaled.
///
/// The check happens between items, which keeps cancellation cooperative:
/// an event already in flight is delivered, the next poll stops.
pub fn cancellable_events(stream: RawEventStream, handle: CancelHandle) -> RawEventStream {
    let mut inner = stream;
    let wrapped = async_stream::stream! {
        use futures::StreamExt;
        while let Some(item) = inner.next().await {
            if handle.is_cancelled() {
                break;
            }
            yield item;
        }
    };
    Box::pin(wrapped)
}
