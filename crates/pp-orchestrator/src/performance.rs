//! The `performance` leg of the health rollup (§4.8): "p95 response time <
//! 2s, error rate < 10%, memory bound". Samples are recorded by whatever
//! sits in front of the tool layer (a CLI command handler, an embedder's own
//! request loop); this module only keeps the rolling window and answers the
//! health question.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

const WINDOW_SIZE: usize = 256;
const P95_BOUND: Duration = Duration::from_secs(2);
const ERROR_RATE_BOUND: f64 = 0.10;

struct Sample {
    duration: Duration,
    failed: bool,
}

/// A bounded ring of recent call outcomes plus the thresholds §4.8 names.
pub struct PerformanceTracker {
    samples: Mutex<VecDeque<Sample>>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(WINDOW_SIZE)),
        }
    }

    /// Records one completed call. Called once per tool invocation by the
    /// orchestrator's dispatch wrapper.
    pub fn record(&self, duration: Duration, failed: bool) {
        let mut samples = self.samples.lock().unwrap();
        if samples.len() == WINDOW_SIZE {
            samples.pop_front();
        }
        samples.push_back(Sample { duration, failed });
    }

    /// The 95th-percentile latency over the current window, or `None` if no
    /// samples have been recorded yet (an empty window can't fail the bound
    /// it has no evidence against).
    pub fn p95(&self) -> Option<Duration> {
        let samples = self.samples.lock().unwrap();
        if samples.is_empty() {
            return None;
        }
        let mut durations: Vec<Duration> = samples.iter().map(|s| s.duration).collect();
        durations.sort_unstable();
        let index = ((durations.len() as f64) * 0.95).ceil() as usize;
        let index = index.saturating_sub(1).min(durations.len() - 1);
        Some(durations[index])
    }

    pub fn error_rate(&self) -> f64 {
        let samples = self.samples.lock().unwrap();
        if samples.is_empty() {
            return 0.0;
        }
        let failed = samples.iter().filter(|s| s.failed).count();
        failed as f64 / samples.len() as f64
    }

    /// Whether the tracked window satisfies §4.8's performance bounds. An
    /// empty window (nothing served yet) counts as healthy.
    pub fn is_healthy(&self) -> bool {
        let p95_ok = self.p95().is_none_or_under(P95_BOUND);
        p95_ok && self.error_rate() < ERROR_RATE_BOUND
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

trait OptionDurationExt {
    fn is_none_or_under(&self, bound: Duration) -> bool;
}

impl OptionDurationExt for Option<Duration> {
    fn is_none_or_under(&self, bound: Duration) -> bool {
        match self {
            Some(d) => *d < bound,
            None => true,
        }
    }
}
