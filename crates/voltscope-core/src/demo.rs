//! Demo Mode - Simulated acquisition board
//!
//! Produces the same byte stream as the real firmware so the whole pipeline
//! can run without hardware. Voltage and current are phase-shifted sine
//! waves; temperature and light drift slowly. All values are 10-bit ADC
//! readings.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::io::{self, Read};
use std::thread;
use std::time::Duration;

use crate::channel::{Channel, Sample};
use crate::protocol::{format_record, FRAME_TERMINATOR, RECORD_SEPARATOR};

/// Largest value the 10-bit ADC can report
const ADC_MAX: Sample = 1023;

/// Mains cycles per window
const CYCLES_PER_WINDOW: f64 = 4.0;

/// Simulated device implementing `Read`
pub struct DemoDevice {
    window_len: usize,
    /// Bytes of the frame being handed out
    buffer: Vec<u8>,
    position: usize,
    frames_sent: u64,
    temperature: f64,
    light: f64,
    corruption_rate: f64,
    frame_interval: Option<Duration>,
    rng: StdRng,
}

impl DemoDevice {
    /// Device sending `window_len` samples per channel, seeded from entropy
    pub fn new(window_len: usize) -> Self {
        Self::with_rng(window_len, StdRng::from_entropy())
    }

    /// Deterministic device for tests
    pub fn seeded(window_len: usize, seed: u64) -> Self {
        Self::with_rng(window_len, StdRng::seed_from_u64(seed))
    }

    fn with_rng(window_len: usize, rng: StdRng) -> Self {
        Self {
            window_len,
            buffer: Vec::new(),
            position: 0,
            frames_sent: 0,
            temperature: 300.0,
            light: 700.0,
            corruption_rate: 0.0,
            frame_interval: None,
            rng,
        }
    }

    /// Corrupt one record in roughly this fraction of frames (0.0 - 1.0)
    pub fn with_corruption(mut self, rate: f64) -> Self {
        self.corruption_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Wait this long before starting each frame, like the real board
    pub fn paced(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    /// Frames generated so far
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Generate the samples of one frame in record order
    pub fn next_samples(&mut self) -> [Vec<Sample>; 4] {
        let n = self.window_len;
        let phase = self.frames_sent as f64 * 0.3;

        self.temperature = (self.temperature + self.rng.gen_range(-2.0..2.0)).clamp(250.0, 450.0);
        self.light = (self.light + self.rng.gen_range(-5.0..5.0)).clamp(100.0, 1000.0);

        let mut voltage = Vec::with_capacity(n);
        let mut current = Vec::with_capacity(n);
        let mut temperature = Vec::with_capacity(n);
        let mut light = Vec::with_capacity(n);

        for k in 0..n {
            let angle = 2.0 * PI * CYCLES_PER_WINDOW * k as f64 / n as f64 + phase;
            voltage.push(self.adc(512.0 + 450.0 * angle.sin(), 4.0));
            current.push(self.adc(512.0 + 300.0 * (angle - PI / 6.0).sin(), 6.0));
            temperature.push(self.adc(self.temperature, 1.0));
            light.push(self.adc(self.light, 3.0));
        }

        self.frames_sent += 1;
        [voltage, current, temperature, light]
    }

    /// Quantize to the ADC range with a little noise
    fn adc(&mut self, value: f64, noise: f64) -> Sample {
        let noisy = value + self.rng.gen_range(-noise..=noise);
        (noisy.round() as Sample).clamp(0, ADC_MAX)
    }

    /// Encode the next frame, terminator included
    fn next_frame(&mut self) -> Vec<u8> {
        let samples = self.next_samples();
        let mut records: Vec<String> = Channel::ACQUIRED
            .iter()
            .zip(samples.iter())
            .filter_map(|(channel, samples)| {
                channel.tag().map(|tag| format_record(tag, samples))
            })
            .collect();

        if self.corruption_rate > 0.0 && self.rng.gen_bool(self.corruption_rate) {
            let victim = self.rng.gen_range(0..records.len());
            self.corrupt(&mut records[victim]);
        }

        let mut frame = String::new();
        for record in records {
            frame.push_str(&record);
            frame.push(RECORD_SEPARATOR);
        }
        let mut bytes = frame.into_bytes();
        bytes.push(FRAME_TERMINATOR);
        bytes
    }

    /// Damage a record the way a noisy line does: a garbled field or a lost sample
    fn corrupt(&mut self, record: &mut String) {
        if self.rng.gen_bool(0.5) {
            if let Some(pos) = record.rfind(|c: char| c.is_ascii_digit()) {
                record.replace_range(pos..=pos, "#");
            }
        } else if let Some(pos) = record.find('|') {
            // Drop the first sample
            if let Some(next) = record[pos + 1..].find('|') {
                record.replace_range(pos + 1..=pos + 1 + next, "");
            }
        }
    }
}

impl Read for DemoDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position >= self.buffer.len() {
            if let Some(interval) = self.frame_interval {
                thread::sleep(interval);
            }
            self.buffer = self.next_frame();
            self.position = 0;
        }

        let remaining = &self.buffer[self.position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}
