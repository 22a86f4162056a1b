//! Measurement channels and sample windows

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A single ADC reading (or a value derived from readings)
pub type Sample = i64;

/// Measurement channel shown by the scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Line voltage (acquired, tag `V`)
    Voltage,
    /// Line current (acquired, tag `I`)
    Current,
    /// Temperature sensor (acquired, tag `T`)
    Temperature,
    /// Light sensor (acquired, tag `L`)
    Light,
    /// Instantaneous power, voltage × current (derived)
    Power,
}

impl Channel {
    /// Acquired channels in the order their records appear in a frame
    pub const ACQUIRED: [Channel; 4] = [
        Channel::Voltage,
        Channel::Current,
        Channel::Temperature,
        Channel::Light,
    ];

    /// Every channel a renderer can display
    pub const ALL: [Channel; 5] = [
        Channel::Voltage,
        Channel::Current,
        Channel::Temperature,
        Channel::Light,
        Channel::Power,
    ];

    /// Record identifier on the wire, `None` for derived channels
    pub fn tag(self) -> Option<char> {
        match self {
            Channel::Voltage => Some('V'),
            Channel::Current => Some('I'),
            Channel::Temperature => Some('T'),
            Channel::Light => Some('L'),
            Channel::Power => None,
        }
    }

    /// Position of the channel's record within a frame
    pub fn record_index(self) -> Option<usize> {
        Self::ACQUIRED.iter().position(|c| *c == self)
    }

    /// Whether the channel is computed rather than read from the device
    pub fn is_derived(self) -> bool {
        self.tag().is_none()
    }

    /// Human-readable name
    pub fn label(self) -> &'static str {
        match self {
            Channel::Voltage => "voltage",
            Channel::Current => "current",
            Channel::Temperature => "temperature",
            Channel::Light => "light",
            Channel::Power => "power",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Fixed-length run of samples for one channel, index = time step
///
/// Windows are immutable and share their storage, so handing one to a
/// renderer is a reference-count bump. The store swaps whole windows; a
/// reader never observes a half-written one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleWindow {
    samples: Arc<[Sample]>,
}

impl SampleWindow {
    /// All-zero window of `len` samples
    pub fn zeroed(len: usize) -> Self {
        Self {
            samples: vec![0; len].into(),
        }
    }

    /// Samples as a slice
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    /// True when every sample is zero
    pub fn is_zeroed(&self) -> bool {
        self.samples.iter().all(|s| *s == 0)
    }

    /// (x-index, y-value) pairs for plotting
    pub fn points(&self) -> Vec<(usize, Sample)> {
        self.samples.iter().copied().enumerate().collect()
    }

    /// Copy of the samples
    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.to_vec()
    }
}

impl From<Vec<Sample>> for SampleWindow {
    fn from(samples: Vec<Sample>) -> Self {
        Self {
            samples: samples.into(),
        }
    }
}

impl Deref for SampleWindow {
    type Target = [Sample];

    fn deref(&self) -> &[Sample] {
        &self.samples
    }
}
