//! End-to-end stream orchestration.
//!
//! Drives one generation: open the upstream transport, validate each raw
//! event, fold it into the snapshot, republish through the rate-limited
//! publisher, and produce a terminal [`StreamOutcome`]. Events are processed
//! strictly in arrival order; the sink runs synchronously between events, so
//! a slow sink backpressures the stream instead of reordering updates.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::accumulator;
use crate::cancel::CancelHandle;
use crate::error::GenError;
use crate::publisher::UpdatePublisher;
use crate::transport::StreamTransport;
use crate::types::{ChatRequest, ContentFragment, MessageSnapshot, RunReport, StreamOutcome};
use crate::wire::{DialectRegistry, vendor_of};

use futures_util::StreamExt;

/// What to do with a single event that fails schema validation inside an
/// otherwise healthy stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedEventPolicy {
    /// Skip the event, log it, keep streaming.
    #[default]
    Skip,
    /// End the generation with an errored outcome.
    Abort,
}

/// Lifecycle of one run. `Completed`, `Aborted` and `Errored` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RunState {
    Idle,
    Streaming,
    Completed,
    Aborted,
    Errored(String),
}

/// The streaming chat-generation engine.
///
/// One orchestrator may serve many concurrent runs; each `run` call owns its
/// snapshot and publisher exclusively, and shares nothing with other runs.
pub struct StreamOrchestrator {
    transport: Arc<dyn StreamTransport>,
    registry: Arc<DialectRegistry>,
    malformed_events: MalformedEventPolicy,
    fanout_units: u32,
}

impl StreamOrchestrator {
    /// Orchestrator over `transport` with the builtin dialect table, skip
    /// policy, and baseline publisher cadence.
    pub fn new(transport: Arc<dyn StreamTransport>) -> Self {
        Self {
            transport,
            registry: Arc::new(DialectRegistry::default()),
            malformed_events: MalformedEventPolicy::default(),
            fanout_units: 1,
        }
    }

    pub fn with_registry(mut self, registry: Arc<DialectRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_malformed_event_policy(mut self, policy: MalformedEventPolicy) -> Self {
        self.malformed_events = policy;
        self
    }

    /// Fan-out hint for the publisher: `0` disables throttling, `n > 1`
    /// slows the cadence by `sqrt(n)`.
    pub fn with_fanout_units(mut self, units: u32) -> Self {
        self.fanout_units = units;
        self
    }

    /// Run one generation to completion.
    ///
    /// `on_update` receives the current snapshot by shared reference and must
    /// not retain it past the call; intermediate (`done = false`) updates may
    /// be coalesced by the publisher, the terminal (`done = true`) update is
    /// delivered exactly once, last, and reflects every accumulated chunk.
    pub async fn run<F>(
        &self,
        llm_id: &str,
        request: &ChatRequest,
        cancel: CancelHandle,
        mut on_update: F,
    ) -> RunReport
    where
        F: FnMut(&MessageSnapshot, bool),
    {
        let mut snapshot = MessageSnapshot::new(llm_id);
        let mut publisher = UpdatePublisher::new(self.fanout_units);
        let mut state = RunState::Idle;

        let opened = match request.validate() {
            Ok(()) => match self.registry.resolve(llm_id) {
                Ok(validator) => {
                    match self
                        .transport
                        .open(vendor_of(llm_id), request, &cancel)
                        .await
                    {
                        Ok(events) => Ok((validator, events)),
                        Err(e) => Err(e),
                    }
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match opened {
            Ok((validator, mut events)) => {
                state = RunState::Streaming;
                tracing::debug!(llm_id, "stream opened");

                while let Some(item) = events.next().await {
                    // Cooperative cancellation, checked at each event
                    // boundary: the event is discarded and no further
                    // intermediate updates are delivered.
                    if cancel.is_cancelled() {
                        state = RunState::Aborted;
                        break;
                    }

                    match item {
                        Ok(raw) => {
                            let parsed =
                                raw.to_json().and_then(|json| validator.validate(&json));
                            match parsed {
                                Ok(chunk) => {
                                    accumulator::apply(&mut snapshot, &chunk);
                                    publisher.decimate(|| on_update(&snapshot, false));
                                }
                                Err(err) => match self.malformed_events {
                                    MalformedEventPolicy::Skip => {
                                        tracing::warn!(error = %err, "skipping malformed upstream event");
                                    }
                                    MalformedEventPolicy::Abort => {
                                        state = self.fail(&mut snapshot, err);
                                        break;
                                    }
                                },
                            }
                        }
                        Err(err) if err.is_cancellation() => {
                            state = RunState::Aborted;
                            break;
                        }
                        Err(err) => {
                            state = self.fail(&mut snapshot, err);
                            break;
                        }
                    }
                }

                if state == RunState::Streaming {
                    state = if cancel.is_cancelled() {
                        RunState::Aborted
                    } else {
                        RunState::Completed
                    };
                }
            }
            Err(err) if err.is_cancellation() => state = RunState::Aborted,
            Err(err) => state = self.fail(&mut snapshot, err),
        }

        // The stream is over whichever way it ended; the terminal update
        // must never describe a still-pending message.
        snapshot.pending = false;
        publisher.finalize(|| on_update(&snapshot, true));

        let outcome = match state {
            RunState::Completed => StreamOutcome::Success,
            RunState::Aborted => StreamOutcome::Aborted,
            RunState::Errored(message) => StreamOutcome::Errored { message },
            RunState::Idle | RunState::Streaming => StreamOutcome::Errored {
                message: "stream ended in a non-terminal state".to_string(),
            },
        };
        tracing::debug!(llm_id, ?outcome, "run finished");

        RunReport { outcome, snapshot }
    }

    /// Record a stream-level failure: the error becomes an inline content
    /// fragment so partial output stays visible next to the explanation.
    fn fail(&self, snapshot: &mut MessageSnapshot, err: GenError) -> RunState {
        tracing::error!(error = %err, "stream failed");
        let message = err.to_string();
        snapshot
            .fragments
            .push(ContentFragment::error(format!("Issue: {message}")));
        RunState::Errored(message)
    }

    /// Run one generation under a caller-owned [`RunSlot`] guard.
    ///
    /// The slot is installed with a run-scoped token before streaming starts
    /// and released with that same token afterwards, so a stale run that
    /// finishes late can never clear the handle of a newer one.
    pub async fn run_in_slot<F>(
        &self,
        slot: &RunSlot,
        llm_id: &str,
        request: &ChatRequest,
        cancel: CancelHandle,
        on_update: F,
    ) -> RunReport
    where
        F: FnMut(&MessageSnapshot, bool),
    {
        let token = slot.install(cancel.clone());
        let report = self.run(llm_id, request, cancel, on_update).await;
        slot.release(token);
        report
    }
}

/// Opaque token identifying one installed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunId(Uuid);

struct ActiveRun {
    id: RunId,
    cancel: CancelHandle,
}

/// Caller-owned slot tracking the cancel handle of the run in flight.
///
/// Replaces the process-wide abort-controller table of older designs: each
/// conversation (or whatever caller context) owns its slot, and release is
/// token-guarded.
#[derive(Default)]
pub struct RunSlot {
    active: Mutex<Option<ActiveRun>>,
}

impl RunSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ActiveRun>> {
        // A poisoned slot only means a panic elsewhere; the Option inside is
        // still coherent.
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Install a handle for a new run, displacing any stale one. Returns the
    /// token that must be presented to release it.
    pub fn install(&self, cancel: CancelHandle) -> RunId {
        let id = RunId(Uuid::new_v4());
        *self.lock() = Some(ActiveRun { id, cancel });
        id
    }

    /// Clear the slot, but only if it still holds the run identified by
    /// `token`. Returns whether anything was cleared.
    pub fn release(&self, token: RunId) -> bool {
        let mut active = self.lock();
        match active.as_ref() {
            Some(run) if run.id == token => {
                *active = None;
                true
            }
            _ => false,
        }
    }

    /// Signal cancellation of the run currently in flight, if any.
    pub fn cancel_active(&self) {
        if let Some(run) = self.lock().as_ref() {
            run.cancel.cancel();
        }
    }

    /// Whether a run is currently installed.
    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }
}
