//! Sample sink
//!
//! The surface a renderer talks to. Acquisition is an explicit [`SampleSink::tick`]
//! (one read, parse and store update); [`SampleSink::next`] and
//! [`StoreHandle::next`] only read the store, whichever channel is asked for.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::channel::{Channel, Sample, SampleWindow};
use crate::protocol::{parse_frame, AcquisitionError, FrameReader};
use crate::store::{ChannelStore, UpdateReport};

/// Shared, thread-safe view of the channel store
///
/// The acquisition side is the only writer. Windows are swapped whole, so a
/// reader sees either the previous or the new window of a channel.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    inner: Arc<RwLock<ChannelStore>>,
}

impl StoreHandle {
    /// Wrap a fresh zeroed store
    pub fn new(window_len: usize) -> Self {
        Self::from_store(ChannelStore::new(window_len))
    }

    /// Wrap an existing store
    pub fn from_store(store: ChannelStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Latest window of a channel; never blocks on acquisition
    pub fn next(&self, channel: Channel) -> SampleWindow {
        self.read().current(channel)
    }

    /// Latest window of a channel as (x-index, y-value) pairs
    pub fn points(&self, channel: Channel) -> Vec<(usize, Sample)> {
        self.next(channel).points()
    }

    /// Samples per window
    pub fn window_len(&self) -> usize {
        self.read().window_len()
    }

    fn read(&self) -> RwLockReadGuard<'_, ChannelStore> {
        // A panicking writer cannot leave a half-swapped window behind
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ChannelStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What one acquisition tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Size of the frame read, 0 if no complete frame arrived
    pub frame_bytes: usize,
    /// How the store changed
    pub update: UpdateReport,
}

/// Frame reader, parser and store wired together
pub struct SampleSink<R: Read> {
    reader: FrameReader<R>,
    store: StoreHandle,
    ticks: u64,
}

impl<R: Read> SampleSink<R> {
    /// Create a sink with a fresh store of `window_len` samples per channel
    pub fn new(reader: FrameReader<R>, window_len: usize) -> Self {
        Self::with_store(reader, StoreHandle::new(window_len))
    }

    /// Create a sink writing into an existing store
    pub fn with_store(reader: FrameReader<R>, store: StoreHandle) -> Self {
        Self {
            reader,
            store,
            ticks: 0,
        }
    }

    /// Run one acquisition cycle: read a frame, parse it, update the store
    ///
    /// Timeouts, oversize frames and undecodable frames zero every channel
    /// and still return `Ok`. Only transport failures return `Err`.
    pub fn tick(&mut self) -> Result<TickReport, AcquisitionError> {
        self.ticks += 1;

        let frame = match self.reader.read_frame() {
            Ok(frame) => frame,
            Err(e) if !e.is_fatal() => {
                let update = self.store.write().invalidate(&e);
                return Ok(TickReport {
                    frame_bytes: 0,
                    update,
                });
            }
            Err(e) => return Err(e),
        };

        let update = match parse_frame(&frame) {
            Ok(parsed) => self.store.write().update(&parsed),
            Err(e) => self.store.write().invalidate(e),
        };

        Ok(TickReport {
            frame_bytes: frame.len(),
            update,
        })
    }

    /// Latest window of a channel; does not acquire
    pub fn next(&self, channel: Channel) -> SampleWindow {
        self.store.next(channel)
    }

    /// Latest window of a channel as (x-index, y-value) pairs
    pub fn points(&self, channel: Channel) -> Vec<(usize, Sample)> {
        self.store.points(channel)
    }

    /// Handle for readers on other threads
    pub fn handle(&self) -> StoreHandle {
        self.store.clone()
    }

    /// Number of ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Acquisition running on its own thread
///
/// Ticks back to back (the frame reader blocks until the device sends)
/// until a transport error or [`AcquisitionLoop::stop`].
pub struct AcquisitionLoop {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Result<u64, AcquisitionError>>,
}

impl AcquisitionLoop {
    /// Start ticking `sink` on a dedicated thread
    pub fn spawn<R: Read + Send + 'static>(mut sink: SampleSink<R>) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("acquisition".to_string())
            .spawn(move || {
                info!("Acquisition started");
                while !stop_flag.load(Ordering::Relaxed) {
                    match sink.tick() {
                        Ok(report) if !report.update.is_clean() => {
                            debug!("Tick {} degraded: {:?}", sink.ticks(), report.update.fallbacks);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("Acquisition stopped after {} ticks: {}", sink.ticks(), e);
                            return Err(e);
                        }
                    }
                }
                info!("Acquisition stopped after {} ticks", sink.ticks());
                Ok(sink.ticks())
            })?;

        Ok(Self { stop, handle })
    }

    /// Ask the loop to exit after the current tick
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// True once the thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the loop to exit; returns the number of ticks run
    pub fn join(self) -> Result<u64, AcquisitionError> {
        self.handle.join().unwrap_or_else(|_| {
            Err(AcquisitionError::Io(io::Error::new(
                io::ErrorKind::Other,
                "acquisition thread panicked",
            )))
        })
    }
}
