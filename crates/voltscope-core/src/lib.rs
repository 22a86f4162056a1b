//! # VoltScope Core Library
//!
//! Acquisition and framing pipeline for the VoltScope serial oscilloscope.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Serial port discovery and configuration
//! - A frame reader for the board's `>`-terminated ASCII frames
//! - Per-channel record parsing with isolated failures
//! - A channel store that zeroes a channel on communication errors
//! - Derived channels (instantaneous power)
//! - A pull-based sink for renderers, plus a threaded acquisition loop
//! - A simulated board for running without hardware
//!
//! ## Channels
//!
//! - Voltage (`V`), current (`I`), temperature (`T`), light (`L`): acquired
//! - Power: voltage × current, derived
//!
//! ## Example
//!
//! ```rust,ignore
//! use voltscope_core::prelude::*;
//!
//! let port = open_port("/dev/ttyS5", Some(115200))?;
//! let mut sink = SampleSink::new(FrameReader::new(port), 400);
//!
//! // Once per render interval
//! sink.tick()?;
//! let power = sink.next(Channel::Power);
//! ```

pub mod channel;
pub mod config;
pub mod demo;
pub mod derived;
pub mod protocol;
pub mod sink;
pub mod store;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::channel::{Channel, Sample, SampleWindow};
    pub use crate::config::{ConfigError, MonitorConfig};
    pub use crate::demo::DemoDevice;
    pub use crate::derived::derive_power;
    pub use crate::protocol::{
        list_ports, open_port, parse_frame, AcquisitionError, FrameReader, ParsedFrame, RawFrame,
    };
    pub use crate::sink::{AcquisitionLoop, SampleSink, StoreHandle, TickReport};
    pub use crate::store::{ChannelStore, FallbackCause, UpdateReport};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
