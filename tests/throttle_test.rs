//! Decimation behavior of the rate-limited publisher, standalone and inside
//! a full pipeline run.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use cheungfun::cancel::cancellable_events;
use cheungfun::prelude::*;

#[test]
fn finalize_after_an_emitting_decimate_still_emits() {
    let mut publisher = UpdatePublisher::new(1);
    let mut emissions = 0;

    // decimate emits (first call), finalize must emit again regardless.
    assert!(publisher.decimate(|| emissions += 1));
    publisher.finalize(|| emissions += 1);
    assert_eq!(emissions, 2);
}

#[test]
fn finalize_after_a_dropped_decimate_emits_exactly_once() {
    let mut publisher = UpdatePublisher::new(1);
    let mut emissions = 0;

    publisher.decimate(|| emissions += 1);
    // Inside the throttle window: dropped.
    assert!(!publisher.decimate(|| emissions += 1));
    publisher.finalize(|| emissions += 1);
    assert_eq!(emissions, 2);
}

#[test]
fn sustained_emission_rate_respects_the_interval() {
    // A short interval keeps the test quick while still exercising the
    // elapsed-time branch.
    let interval = Duration::from_millis(20);
    let mut publisher = UpdatePublisher::new(0);
    // Unthrottled baseline sanity first.
    assert!(publisher.decimate(|| ()));
    assert!(publisher.decimate(|| ()));

    let mut publisher = UpdatePublisher::new(2);
    assert_eq!(UpdatePublisher::interval_for(2), Duration::from_millis(118));

    let mut timestamps: Vec<Instant> = Vec::new();
    let started = Instant::now();
    while started.elapsed() < Duration::from_millis(300) {
        publisher.decimate(|| timestamps.push(Instant::now()));
        std::thread::sleep(interval / 4);
    }

    // Every pair of consecutive emissions is separated by at least the
    // computed interval (scheduling can only widen the gap).
    for pair in timestamps.windows(2) {
        assert!(
            pair[1].duration_since(pair[0]) >= Duration::from_millis(118),
            "emissions closer than the throttle interval"
        );
    }
    assert!(!timestamps.is_empty());
}

/// Transport replaying many rapid chunks to drive pipeline-level decimation.
struct RapidTransport {
    chunks: usize,
}

#[async_trait]
impl StreamTransport for RapidTransport {
    async fn open(
        &self,
        _vendor: &str,
        _request: &ChatRequest,
        cancel: &CancelHandle,
    ) -> Result<RawEventStream, GenError> {
        let events: Vec<Result<RawVendorEvent, GenError>> = (0..self.chunks)
            .map(|i| {
                Ok(RawVendorEvent::new(format!(
                    r#"{{"object":"chat.completion.chunk","id":"c1","model":"m","created":1,"choices":[{{"delta":{{"content":"tok{i} "}},"finish_reason":null}}]}}"#
                )))
            })
            .collect();
        Ok(cancellable_events(
            Box::pin(futures::stream::iter(events)),
            cancel.clone(),
        ))
    }
}

#[tokio::test]
async fn pipeline_drops_intermediate_updates_but_loses_no_content() {
    let chunks = 200;
    let orchestrator =
        StreamOrchestrator::new(Arc::new(RapidTransport { chunks })).with_fanout_units(4);

    let intermediate = Arc::new(Mutex::new(0usize));
    let seen = intermediate.clone();
    let report = orchestrator
        .run(
            "openai:gpt-4o-mini",
            &ChatRequest::new("m", vec![ChatMessage::user("go")]),
            CancelHandle::new(),
            move |_, done| {
                if !done {
                    *seen.lock().unwrap() += 1;
                }
            },
        )
        .await;

    // Chunks arrive far faster than the 167ms cadence for 4 panes, so almost
    // every notification is decimated away...
    assert!(*intermediate.lock().unwrap() < chunks);
    // ...while the terminal snapshot still reflects every chunk.
    assert_eq!(report.outcome, StreamOutcome::Success);
    assert!(report.snapshot.text().contains("tok0 "));
    assert!(report.snapshot.text().contains(&format!("tok{} ", chunks - 1)));
}
