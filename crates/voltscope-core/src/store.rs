//! Channel store
//!
//! Holds the current sample window of every acquired channel. A record that
//! failed to parse, or that carries the wrong number of samples, replaces
//! its channel's window with zeros for that cycle: the chart shows a flat
//! line instead of freezing on stale data.

use thiserror::Error;
use tracing::{debug, warn};

use crate::channel::{Channel, SampleWindow};
use crate::derived;
use crate::protocol::{ParsedFrame, RecordError};

/// Why a channel was zeroed during an update
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FallbackCause {
    /// The channel's own record was unusable
    #[error("{0}")]
    Record(#[from] RecordError),
    /// The whole frame was unusable (decode failure, timeout, oversize)
    #[error("{0}")]
    Frame(String),
}

/// Outcome of applying one frame to the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Channels whose window was replaced with fresh samples
    pub accepted: Vec<Channel>,
    /// Channels replaced with zeros, and why
    pub fallbacks: Vec<(Channel, FallbackCause)>,
}

impl UpdateReport {
    /// True if every acquired channel received fresh samples
    pub fn is_clean(&self) -> bool {
        self.fallbacks.is_empty()
    }

    /// Whether a channel fell back to zeros
    pub fn fell_back(&self, channel: Channel) -> bool {
        self.fallbacks.iter().any(|(c, _)| *c == channel)
    }
}

/// Latest window per acquired channel
#[derive(Debug, Clone)]
pub struct ChannelStore {
    window_len: usize,
    /// Indexed by record order (see `Channel::ACQUIRED`)
    windows: [SampleWindow; 4],
    zeroes: SampleWindow,
}

impl ChannelStore {
    /// Create a store whose windows all start as zeros
    pub fn new(window_len: usize) -> Self {
        let zeroes = SampleWindow::zeroed(window_len);
        Self {
            window_len,
            windows: std::array::from_fn(|_| zeroes.clone()),
            zeroes,
        }
    }

    /// Samples per window
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Apply a parsed frame
    pub fn update(&mut self, frame: &ParsedFrame) -> UpdateReport {
        let mut report = UpdateReport::default();

        for (channel, result) in frame.iter() {
            let Some(slot) = channel.record_index() else {
                continue;
            };
            let checked = result.clone().and_then(|samples| {
                if samples.len() == self.window_len {
                    Ok(samples)
                } else {
                    Err(RecordError::LengthMismatch {
                        expected: self.window_len,
                        actual: samples.len(),
                    })
                }
            });

            match checked {
                Ok(samples) => {
                    self.windows[slot] = SampleWindow::from(samples);
                    report.accepted.push(channel);
                }
                Err(e) => {
                    warn!("Communication error on {} channel: {}", channel, e);
                    self.windows[slot] = self.zeroes.clone();
                    report.fallbacks.push((channel, FallbackCause::Record(e)));
                }
            }
        }

        debug!(
            "Store updated: {} accepted, {} zeroed",
            report.accepted.len(),
            report.fallbacks.len()
        );
        report
    }

    /// Zero every acquired channel after a frame-level failure
    pub fn invalidate(&mut self, reason: impl ToString) -> UpdateReport {
        let reason = reason.to_string();
        warn!("Communication error: {}; all channels zeroed", reason);

        let mut report = UpdateReport::default();
        for channel in Channel::ACQUIRED {
            if let Some(slot) = channel.record_index() {
                self.windows[slot] = self.zeroes.clone();
                report
                    .fallbacks
                    .push((channel, FallbackCause::Frame(reason.clone())));
            }
        }
        report
    }

    /// Current window of any channel; derived channels are computed on demand
    pub fn current(&self, channel: Channel) -> SampleWindow {
        match channel.record_index() {
            Some(slot) => self.windows[slot].clone(),
            None => self.derive_power(),
        }
    }

    /// Power window from the current voltage and current windows
    pub fn derive_power(&self) -> SampleWindow {
        derived::derive_power(
            &self.current(Channel::Voltage),
            &self.current(Channel::Current),
        )
    }
}
