//! Sliding-window block-production rate tracking.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Trailing window over which the rate is estimated.
pub const MONITOR_WINDOW: Duration = Duration::from_secs(7);

/// One height observation from a status poll.
#[derive(Debug, Clone, Copy)]
pub struct HeightSample {
    pub timestamp: Instant,
    pub height: u64,
}

/// Two-point sliding-window estimator of blocks per second.
///
/// Keeps the most recent samples inside a fixed trailing window, never
/// fewer than two once two have ever arrived, and estimates the rate
/// from the two retained extremes. O(1) per sample; the scenarios only
/// need a threshold check, not precision.
#[derive(Debug)]
pub struct ThroughputMonitor {
    window: Duration,
    samples: VecDeque<HeightSample>,
}

impl Default for ThroughputMonitor {
    fn default() -> Self {
        Self::new(MONITOR_WINDOW)
    }
}

impl ThroughputMonitor {
    pub fn new(window: Duration) -> Self {
        ThroughputMonitor {
            window,
            samples: VecDeque::new(),
        }
    }

    /// Record a sample, then drop leading samples that fell out of the
    /// window. Pruning stops at two samples so a rate stays computable
    /// even when both survivors are stale.
    pub fn observe(&mut self, sample: HeightSample) {
        let cutoff = sample.timestamp.checked_sub(self.window);
        self.samples.push_back(sample);

        if let Some(cutoff) = cutoff {
            while self.samples.len() > 2 {
                match self.samples.front() {
                    Some(front) if front.timestamp <= cutoff => {
                        self.samples.pop_front();
                    }
                    _ => break,
                }
            }
        }
    }

    /// Blocks per second over the retained extremes.
    ///
    /// `None` until two samples are retained: a cold start must never
    /// be misread as a liveness failure.
    pub fn current_rate(&self) -> Option<f64> {
        let oldest = self.samples.front()?;
        let newest = self.samples.back()?;
        if self.samples.len() < 2 {
            return None;
        }

        let dt = newest.timestamp.saturating_duration_since(oldest.timestamp);
        if dt.is_zero() {
            return None;
        }
        Some((newest.height as f64 - oldest.height as f64) / dt.as_secs_f64())
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
