//! Post-completion hooks.
//!
//! Side effects that follow a finished generation (auto-titling, suggestion
//! generation, speech) belong to the caller, not the orchestrator. Callers
//! register hooks and dispatch them with the final report once `run` returns;
//! the orchestrator never knows they exist.

use async_trait::async_trait;

use crate::types::RunReport;

/// A side effect to run after a generation reaches its terminal state.
#[async_trait]
pub trait CompletionHook: Send + Sync {
    /// Inspect the final outcome and snapshot. Hooks must not fail the
    /// pipeline; errors are theirs to swallow or log.
    async fn on_complete(&self, report: &RunReport);
}

/// Dispatch `hooks` sequentially with the final report.
pub async fn dispatch_completion_hooks(hooks: &[Box<dyn CompletionHook>], report: &RunReport) {
    for hook in hooks {
        hook.on_complete(report).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MessageSnapshot, StreamOutcome};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHook {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CompletionHook for CountingHook {
        async fn on_complete(&self, report: &RunReport) {
            if report.outcome.is_success() {
                self.seen.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn hooks_all_see_the_final_report() {
        let seen = Arc::new(AtomicUsize::new(0));
        let hooks: Vec<Box<dyn CompletionHook>> = vec![
            Box::new(CountingHook { seen: seen.clone() }),
            Box::new(CountingHook { seen: seen.clone() }),
        ];
        let report = RunReport {
            outcome: StreamOutcome::Success,
            snapshot: MessageSnapshot::new("openai:gpt-4o"),
        };

        dispatch_completion_hooks(&hooks, &report).await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
