//! Rate-limited republication of snapshot updates.
//!
//! Downstream rendering cost is proportional to update frequency times the
//! number of visible panes, so intermediate notifications are decimated to a
//! target cadence while the terminal update is always delivered. 12 updates
//! per second works well for 60 Hz displays in a single pane; with `n`
//! concurrent panes the interval grows by the square root of `n`.

use std::time::{Duration, Instant};

/// Baseline cadence: 12 updates per second.
const BASE_INTERVAL_MS: f64 = 1000.0 / 12.0;

/// Wraps a downstream sink with an adaptive decimation policy.
///
/// Timing state is private and reset by [`UpdatePublisher::finalize`], so one
/// publisher can be reused across runs.
#[derive(Debug)]
pub struct UpdatePublisher {
    min_interval: Duration,
    last_emit: Option<Instant>,
}

impl UpdatePublisher {
    /// Build a publisher for `fanout_units` concurrent viewers: `0` disables
    /// throttling, `1` uses the baseline cadence, `n > 1` scales the interval
    /// by `sqrt(n)`.
    pub fn new(fanout_units: u32) -> Self {
        Self {
            min_interval: Self::interval_for(fanout_units),
            last_emit: None,
        }
    }

    /// The minimum inter-emission interval for a fan-out hint.
    pub fn interval_for(fanout_units: u32) -> Duration {
        match fanout_units {
            0 => Duration::ZERO,
            1 => Duration::from_millis(BASE_INTERVAL_MS.round() as u64),
            n => Duration::from_millis((BASE_INTERVAL_MS * f64::from(n).sqrt()).round() as u64),
        }
    }

    /// Forward one intermediate update, or silently drop it.
    ///
    /// Emits when throttling is disabled, on the first call, or when at least
    /// the throttle interval has elapsed since the last actual emission.
    /// Returns whether `emit` ran; a dropped notification loses nothing,
    /// since the snapshot itself still reflects the update.
    pub fn decimate<F: FnOnce()>(&mut self, emit: F) -> bool {
        let now = Instant::now();
        let due = self.min_interval.is_zero()
            || match self.last_emit {
                None => true,
                Some(last) => now.duration_since(last) >= self.min_interval,
            };
        if due {
            emit();
            self.last_emit = Some(now);
        }
        due
    }

    /// Unconditionally emit the terminal update and reset timing state.
    ///
    /// Always runs `emit` exactly once, even when the immediately preceding
    /// [`UpdatePublisher::decimate`] call also emitted.
    pub fn finalize<F: FnOnce()>(&mut self, emit: F) {
        emit();
        self.last_emit = None;
    }
}
