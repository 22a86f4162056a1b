use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

use voltscope_core::prelude::*;
use voltscope_core::protocol::format_record;

/// Collects formatted log output so tests can look for warnings
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs.contents())
}

fn sink_over(bytes: &[u8], window_len: usize) -> SampleSink<Cursor<Vec<u8>>> {
    SampleSink::new(FrameReader::new(Cursor::new(bytes.to_vec())), window_len)
}

/// Serial port stand-in: hands out one chunk per read; a `None` chunk
/// blocks for `stall` and then times out, like a quiet port does
struct StallingPort {
    chunks: VecDeque<Option<Vec<u8>>>,
    stall: Duration,
}

impl StallingPort {
    fn new(chunks: Vec<Option<Vec<u8>>>, stall: Duration) -> Self {
        Self {
            chunks: chunks.into(),
            stall,
        }
    }
}

impl Read for StallingPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.chunks.pop_front() {
            Some(Some(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(None) => {
                std::thread::sleep(self.stall);
                Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
            }
            None => Ok(0),
        }
    }
}

fn warn_lines(logs: &str) -> usize {
    logs.lines().filter(|line| line.contains("WARN")).count()
}

fn frame_bytes(records: &[(char, Vec<i64>)]) -> Vec<u8> {
    let mut text = String::new();
    for (tag, samples) in records {
        text.push_str(&format_record(*tag, samples));
        text.push('\n');
    }
    text.push('>');
    text.into_bytes()
}

#[test]
fn test_single_voltage_record_fills_window() {
    let mut sink = sink_over(b"V|1|2|>", 2);
    sink.tick().unwrap();
    assert_eq!(sink.next(Channel::Voltage).to_vec(), vec![1, 2]);
}

#[test]
fn test_short_record_zeroes_with_warning() {
    let mut sink = sink_over(b"V|1|>", 2);
    let (report, logs) = with_captured_logs(|| sink.tick().unwrap());

    assert!(report.update.fell_back(Channel::Voltage));
    assert_eq!(sink.next(Channel::Voltage).to_vec(), vec![0, 0]);
    assert!(logs.contains("WARN"), "expected a warning, got: {logs}");
    assert!(logs.contains("Communication error on voltage channel"));
}

#[test]
fn test_valid_frames_fill_windows_in_tag_order() {
    let bytes = frame_bytes(&[
        ('V', vec![10, 11, 12]),
        ('I', vec![20, 21, 22]),
        ('T', vec![30, 31, 32]),
        ('L', vec![40, 41, 42]),
    ]);
    let mut sink = sink_over(&bytes, 3);
    let report = sink.tick().unwrap();

    assert!(report.update.is_clean());
    assert_eq!(report.frame_bytes, bytes.len() - 1);
    assert_eq!(sink.next(Channel::Voltage).to_vec(), vec![10, 11, 12]);
    assert_eq!(sink.next(Channel::Current).to_vec(), vec![20, 21, 22]);
    assert_eq!(sink.next(Channel::Temperature).to_vec(), vec![30, 31, 32]);
    assert_eq!(sink.next(Channel::Light).to_vec(), vec![40, 41, 42]);
    assert_eq!(sink.next(Channel::Power).to_vec(), vec![200, 231, 264]);
}

#[test]
fn test_bad_channel_does_not_disturb_others() {
    let mut bytes = frame_bytes(&[
        ('V', vec![1, 1]),
        ('I', vec![2, 2]),
        ('T', vec![3, 3]),
        ('L', vec![4, 4]),
    ]);
    bytes.extend(frame_bytes(&[
        ('V', vec![5, 5]),
        ('I', vec![6, 6, 6]),
        ('T', vec![7, 7]),
        ('L', vec![8, 8]),
    ]));
    let mut sink = sink_over(&bytes, 2);
    sink.tick().unwrap();
    let report = sink.tick().unwrap();

    assert_eq!(report.update.fallbacks.len(), 1);
    assert_eq!(sink.next(Channel::Current).to_vec(), vec![0, 0]);
    assert_eq!(sink.next(Channel::Voltage).to_vec(), vec![5, 5]);
    assert_eq!(sink.next(Channel::Temperature).to_vec(), vec![7, 7]);
    assert_eq!(sink.next(Channel::Light).to_vec(), vec![8, 8]);
}

#[test]
fn test_missing_records_zero_their_channels() {
    let bytes = frame_bytes(&[('V', vec![1, 2]), ('I', vec![3, 4])]);
    let mut sink = sink_over(&bytes, 2);
    let report = sink.tick().unwrap();

    assert_eq!(report.update.accepted, vec![Channel::Voltage, Channel::Current]);
    assert!(sink.next(Channel::Temperature).is_zeroed());
    assert!(sink.next(Channel::Light).is_zeroed());
    assert_eq!(sink.next(Channel::Power).to_vec(), vec![3, 8]);
}

#[test]
fn test_recovers_after_garbage() {
    let mut bytes = vec![0xFE, 0xFF, b'>'];
    bytes.extend(frame_bytes(&[
        ('V', vec![9]),
        ('I', vec![9]),
        ('T', vec![9]),
        ('L', vec![9]),
    ]));
    let mut sink = sink_over(&bytes, 1);

    let (report, logs) = with_captured_logs(|| sink.tick().unwrap());
    assert_eq!(report.update.fallbacks.len(), 4);
    assert!(logs.contains("all channels zeroed"));

    let report = sink.tick().unwrap();
    assert!(report.update.is_clean());
    assert_eq!(sink.next(Channel::Power).to_vec(), vec![81]);
}

#[test]
fn test_windows_always_have_configured_length() {
    let mut sink = SampleSink::new(
        FrameReader::new(DemoDevice::seeded(64, 11).with_corruption(0.5)),
        64,
    );
    for _ in 0..25 {
        sink.tick().unwrap();
        for channel in Channel::ALL {
            assert_eq!(sink.next(channel).len(), 64);
        }
    }
}

#[test]
fn test_renderer_thread_reads_while_acquiring() {
    let device = DemoDevice::seeded(32, 5)
        .with_corruption(0.2)
        .paced(Duration::from_millis(1));
    let sink = SampleSink::new(FrameReader::new(device), 32);
    let store = sink.handle();
    let acquisition = AcquisitionLoop::spawn(sink).unwrap();

    for _ in 0..50 {
        for channel in Channel::ALL {
            assert_eq!(store.next(channel).len(), 32);
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    acquisition.stop();
    let ticks = acquisition.join().unwrap();
    assert!(ticks > 0);
}

#[test]
fn test_timeout_zeroes_all_channels_and_continues() {
    let good = frame_bytes(&[
        ('V', vec![1]),
        ('I', vec![1]),
        ('T', vec![1]),
        ('L', vec![1]),
    ]);
    let port = StallingPort::new(
        vec![
            Some(good),
            Some(b"V|2|".to_vec()),
            None,
            Some(b"\nI|3|\nT|4|\nL|5|\n>".to_vec()),
        ],
        Duration::from_millis(100),
    );
    let reader = FrameReader::new(port).with_timeout(Duration::from_millis(50));
    let mut sink = SampleSink::new(reader, 1);

    assert!(sink.tick().unwrap().update.is_clean());
    assert_eq!(sink.next(Channel::Power).to_vec(), vec![1]);

    let (report, logs) = with_captured_logs(|| sink.tick().unwrap());
    assert_eq!(report.frame_bytes, 0);
    assert_eq!(report.update.fallbacks.len(), 4);
    for channel in Channel::ALL {
        assert!(sink.next(channel).is_zeroed(), "{channel} not zeroed");
    }
    assert_eq!(warn_lines(&logs), 1, "one warning per timeout, got: {logs}");

    // Bytes received before the stall belong to the next frame
    let report = sink.tick().unwrap();
    assert!(report.update.is_clean());
    assert_eq!(sink.next(Channel::Voltage).to_vec(), vec![2]);
    assert_eq!(sink.next(Channel::Power).to_vec(), vec![6]);
}

#[test]
fn test_oversize_frame_zeroes_all_channels_and_continues() {
    let first = frame_bytes(&[
        ('V', vec![1]),
        ('I', vec![2]),
        ('T', vec![3]),
        ('L', vec![4]),
    ]);
    let second = frame_bytes(&[
        ('V', vec![5]),
        ('I', vec![6]),
        ('T', vec![7]),
        ('L', vec![8]),
    ]);
    let port = StallingPort::new(
        vec![Some(first), Some(b"V|1|".repeat(16)), Some(second)],
        Duration::ZERO,
    );
    let reader = FrameReader::new(port).with_max_frame_len(32);
    let mut sink = SampleSink::new(reader, 1);

    assert!(sink.tick().unwrap().update.is_clean());

    let (report, logs) = with_captured_logs(|| sink.tick().unwrap());
    assert_eq!(report.update.fallbacks.len(), 4);
    for channel in Channel::ALL {
        assert!(sink.next(channel).is_zeroed(), "{channel} not zeroed");
    }
    assert_eq!(warn_lines(&logs), 1, "one warning per oversize frame, got: {logs}");

    assert!(sink.tick().unwrap().update.is_clean());
    assert_eq!(sink.next(Channel::Light).to_vec(), vec![8]);
    assert_eq!(sink.next(Channel::Power).to_vec(), vec![30]);
}
