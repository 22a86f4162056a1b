//! Derived channels
//!
//! Element-wise combinations of acquired windows. Nothing here is cached;
//! every call recomputes from the windows it is given.

use crate::channel::{Sample, SampleWindow};

/// Element-wise product of two windows
///
/// The result is as long as the shorter input (store windows always share
/// one length). Products saturate at the `Sample` bounds.
pub fn product(a: &SampleWindow, b: &SampleWindow) -> SampleWindow {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.saturating_mul(*y))
        .collect::<Vec<Sample>>()
        .into()
}

/// Instantaneous power: voltage × current, no scaling
pub fn derive_power(voltage: &SampleWindow, current: &SampleWindow) -> SampleWindow {
    product(voltage, current)
}
