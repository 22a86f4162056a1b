//! Frame parsing
//!
//! Splits a raw frame into its channel records and extracts the samples of
//! each one. Records are independent: a corrupted light record does not
//! stop the voltage record from parsing.

use tracing::debug;

use super::{FrameError, RecordError, FIELD_SEPARATOR, RECORD_SEPARATOR};
use crate::channel::{Channel, Sample};

/// Bytes received between two frame terminators, terminator excluded
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawFrame(Vec<u8>);

impl RawFrame {
    /// Wrap received bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the frame
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if nothing arrived before the terminator
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for RawFrame {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for RawFrame {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

/// Per-channel outcome of parsing one frame
pub type RecordResult = Result<Vec<Sample>, RecordError>;

/// Parse result for the four acquired channels of one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrame {
    records: [RecordResult; 4],
}

impl ParsedFrame {
    /// Build from results in record order (voltage, current, temperature, light)
    pub fn from_records(records: [RecordResult; 4]) -> Self {
        Self { records }
    }

    /// Result for an acquired channel; `None` for derived channels
    pub fn get(&self, channel: Channel) -> Option<&RecordResult> {
        channel.record_index().map(|i| &self.records[i])
    }

    /// Iterate results paired with their channel, in record order
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &RecordResult)> {
        Channel::ACQUIRED.into_iter().zip(self.records.iter())
    }

    /// True if every record parsed
    pub fn is_complete(&self) -> bool {
        self.records.iter().all(Result::is_ok)
    }
}

/// Parse a frame into per-channel sample lists
///
/// Only a decode failure rejects the whole frame. Missing or broken
/// records are reported per channel.
pub fn parse_frame(frame: &RawFrame) -> Result<ParsedFrame, FrameError> {
    let text = std::str::from_utf8(frame.as_bytes()).map_err(|e| FrameError::Decode {
        offset: e.valid_up_to(),
    })?;

    let lines: Vec<&str> = text
        .split(RECORD_SEPARATOR)
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() > Channel::ACQUIRED.len() {
        debug!(
            "Ignoring {} extra record(s) in frame",
            lines.len() - Channel::ACQUIRED.len()
        );
    }

    let records = std::array::from_fn(|i| {
        let channel = Channel::ACQUIRED[i];
        match (lines.get(i), channel.tag()) {
            (Some(line), Some(tag)) => parse_record(line, tag),
            _ => Err(RecordError::MissingRecord),
        }
    });

    Ok(ParsedFrame { records })
}

/// Parse one `<tag>|<int>|...|<int>|` record
///
/// The tag is matched ignoring ASCII case. A single trailing empty field
/// (from the terminal separator) is dropped; any other field must be a
/// decimal integer.
pub fn parse_record(line: &str, tag: char) -> RecordResult {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.is_empty() {
        return Err(RecordError::EmptyRecord);
    }

    let mut fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();

    let found = fields[0];
    let mut chars = found.chars();
    let tag_matches = matches!(
        (chars.next(), chars.next()),
        (Some(c), None) if c.eq_ignore_ascii_case(&tag)
    );
    if !tag_matches {
        return Err(RecordError::WrongTag {
            expected: tag,
            found: found.to_string(),
        });
    }

    if fields.len() > 1 && fields.last() == Some(&"") {
        fields.pop();
    }

    fields[1..]
        .iter()
        .enumerate()
        .map(|(index, field)| {
            field.parse::<Sample>().map_err(|_| RecordError::NonNumeric {
                index,
                field: field.to_string(),
            })
        })
        .collect()
}

/// Serialize samples as a record, including the trailing separator
pub fn format_record(tag: char, samples: &[Sample]) -> String {
    let mut record = String::with_capacity(2 + samples.len() * 5);
    record.push(tag);
    record.push(FIELD_SEPARATOR);
    for sample in samples {
        record.push_str(&sample.to_string());
        record.push(FIELD_SEPARATOR);
    }
    record
}
