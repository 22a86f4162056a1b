//! Frame reader
//!
//! Pulls bytes from the transport until the frame terminator arrives.

use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{AcquisitionError, RawFrame, DEFAULT_TIMEOUT_MS, FRAME_TERMINATOR, MAX_FRAME_SIZE};

/// Pause before polling a non-blocking transport that had nothing to give
const WOULD_BLOCK_BACKOFF: Duration = Duration::from_millis(5);

/// Reads terminator-delimited frames from a byte transport
///
/// Bytes received before a timeout are kept, so a frame that straddles a
/// stall is completed by the next call instead of being split in two.
pub struct FrameReader<R: Read> {
    inner: BufReader<R>,
    /// Bytes of the frame currently being received
    pending: Vec<u8>,
    timeout: Duration,
    max_frame_len: usize,
}

impl<R: Read> FrameReader<R> {
    /// Create a reader with the default timeout and frame size limit
    pub fn new(transport: R) -> Self {
        Self {
            inner: BufReader::new(transport),
            pending: Vec::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_frame_len: MAX_FRAME_SIZE,
        }
    }

    /// Set the time allowed for one frame to arrive
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the largest frame accepted before giving up on a terminator
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Frame timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Bytes received so far for the next frame
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Borrow the underlying transport
    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }

    /// Read the next frame, terminator excluded
    ///
    /// Blocks until the terminator arrives or the timeout elapses. There is
    /// no internal retry; callers decide whether to call again.
    pub fn read_frame(&mut self) -> Result<RawFrame, AcquisitionError> {
        let deadline = Instant::now() + self.timeout;

        loop {
            let (consumed, complete) = match self.inner.fill_buf() {
                Ok([]) => return Err(AcquisitionError::Disconnected),
                Ok(available) => match available.iter().position(|b| *b == FRAME_TERMINATOR) {
                    Some(pos) => {
                        self.pending.extend_from_slice(&available[..pos]);
                        (pos + 1, true)
                    }
                    None => {
                        self.pending.extend_from_slice(available);
                        (available.len(), false)
                    }
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return self.timed_out();
                    }
                    if e.kind() == ErrorKind::WouldBlock {
                        thread::sleep(WOULD_BLOCK_BACKOFF.min(deadline - now));
                    }
                    continue;
                }
                Err(e) => return Err(AcquisitionError::Io(e)),
            };
            self.inner.consume(consumed);

            if self.pending.len() > self.max_frame_len {
                // The store logs the resulting fallback
                debug!(
                    "Discarding {} bytes received without a frame terminator",
                    self.pending.len()
                );
                self.pending.clear();
                return Err(AcquisitionError::FrameTooLong {
                    limit: self.max_frame_len,
                });
            }

            if complete {
                let frame = RawFrame::new(std::mem::take(&mut self.pending));
                debug!("Received frame of {} bytes", frame.len());
                return Ok(frame);
            }

            if Instant::now() >= deadline {
                return self.timed_out();
            }
        }
    }

    fn timed_out(&self) -> Result<RawFrame, AcquisitionError> {
        debug!(
            "Timed out after {:?} waiting for frame terminator ({} bytes pending)",
            self.timeout,
            self.pending.len()
        );
        Err(AcquisitionError::Timeout)
    }
}
