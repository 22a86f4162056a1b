//! Serial Wire Protocol
//!
//! The device streams ASCII frames, one per acquisition cycle:
//!
//! ```text
//! V|512|530|...|\n
//! I|200|210|...|\n
//! T|300|301|...|\n
//! L|700|702|...|\n
//! >
//! ```
//!
//! Records are separated by newlines, fields by `|`, and each frame ends
//! with the `>` terminator.

mod error;
pub mod frame;
pub mod reader;
pub mod serial;

pub use error::{AcquisitionError, FrameError, RecordError};
pub use frame::{format_record, parse_frame, parse_record, ParsedFrame, RawFrame, RecordResult};
pub use reader::FrameReader;
pub use serial::{configure_port, list_ports, open_port, PortInfo};

/// Byte that ends every frame
pub const FRAME_TERMINATOR: u8 = b'>';

/// Separator between channel records within a frame
pub const RECORD_SEPARATOR: char = '\n';

/// Separator between fields within a record
pub const FIELD_SEPARATOR: char = '|';

/// Default baud rate of the acquisition firmware
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default time allowed for one frame to arrive, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Default number of samples per channel window
pub const DEFAULT_WINDOW_LEN: usize = 400;

/// Largest frame accepted before the reader gives up on finding a terminator
pub const MAX_FRAME_SIZE: usize = 64 * 1024;
