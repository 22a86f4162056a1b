//! Log-based renderer
//!
//! Stands in for the chart: pulls every channel from the store each tick
//! and reports what a plot would show.

use std::fmt;

use tracing::{debug, info};
use voltscope_core::prelude::*;

/// What one channel's trace looks like this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceSummary {
    pub min: Sample,
    pub max: Sample,
    pub mean: f64,
    /// Every sample is zero (communication error or idle input)
    pub flat: bool,
}

impl TraceSummary {
    pub fn of(window: &SampleWindow) -> Self {
        let min = window.iter().copied().min().unwrap_or(0);
        let max = window.iter().copied().max().unwrap_or(0);
        let mean = if window.is_empty() {
            0.0
        } else {
            window.iter().map(|s| *s as f64).sum::<f64>() / window.len() as f64
        };
        Self {
            min,
            max,
            mean,
            flat: window.is_zeroed(),
        }
    }
}

impl fmt::Display for TraceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.flat {
            write!(f, "flat")
        } else {
            write!(f, "{}..{} (mean {:.1})", self.min, self.max, self.mean)
        }
    }
}

/// Owns the per-channel "chart" state; fed only through the store handle
pub struct LogRenderer {
    store: StoreHandle,
    traces: [Option<TraceSummary>; 5],
    frames_drawn: u64,
    status_every: u64,
}

impl LogRenderer {
    /// `status_every`: emit an info status line every this many draws
    pub fn new(store: StoreHandle, status_every: u64) -> Self {
        Self {
            store,
            traces: [None; 5],
            frames_drawn: 0,
            status_every: status_every.max(1),
        }
    }

    /// Pull the latest windows and redraw
    pub fn draw(&mut self) {
        for (slot, channel) in Channel::ALL.into_iter().enumerate() {
            let summary = TraceSummary::of(&self.store.next(channel));
            debug!("{:>11}: {}", channel, summary);
            self.traces[slot] = Some(summary);
        }
        self.frames_drawn += 1;

        if self.frames_drawn % self.status_every == 0 {
            info!("{}", self.status_line());
        }
    }

    /// Latest summary of a channel, if drawn at least once
    pub fn trace(&self, channel: Channel) -> Option<TraceSummary> {
        Channel::ALL
            .iter()
            .position(|c| *c == channel)
            .and_then(|slot| self.traces[slot])
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    fn status_line(&self) -> String {
        Channel::ALL
            .iter()
            .zip(self.traces.iter())
            .map(|(channel, trace)| match trace {
                Some(t) => format!("{}={}", channel, t),
                None => format!("{}=-", channel),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
