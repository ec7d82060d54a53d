use rtrb::Producer;

use super::CaptureBackend;
use crate::error::AudioError;

/// Deterministic in-process backend used for tests and the `simulate` command.
///
/// Samples pushed while the backend is not running are held and delivered on
/// the next start, so a test can prime the device before initialization.
pub struct SyntheticBackend {
    sample_rate: u32,
    producer: Option<Producer<f32>>,
    pending: Vec<f32>,
    device_present: bool,
    start_count: usize,
}

impl SyntheticBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            producer: None,
            pending: Vec::new(),
            device_present: true,
            start_count: 0,
        }
    }

    /// Backend that behaves like a machine with no microphone
    pub fn with_no_device(mut self) -> Self {
        self.device_present = false;
        self
    }

    /// Deliver samples to the capture ring (or hold them until started)
    ///
    /// Returns the number of samples written to the ring now. Samples that do
    /// not fit in a full ring are dropped.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        match self.producer.as_mut() {
            Some(producer) => samples
                .iter()
                .take_while(|&&s| producer.push(s).is_ok())
                .count(),
            None => {
                self.pending.extend_from_slice(samples);
                0
            }
        }
    }

    /// Simulate the device silently going away
    pub fn disconnect(&mut self) {
        self.producer = None;
    }

    /// Simulate the device being removed: the stream stops and restarts fail
    pub fn unplug(&mut self) {
        self.device_present = false;
        self.producer = None;
    }

    /// Make the device available again; the next start succeeds
    pub fn plug_in(&mut self) {
        self.device_present = true;
    }

    /// Number of successful starts (initial open plus restarts)
    pub fn start_count(&self) -> usize {
        self.start_count
    }
}

impl CaptureBackend for SyntheticBackend {
    fn start(&mut self, producer: Producer<f32>) -> Result<u32, AudioError> {
        if !self.device_present {
            return Err(AudioError::DeviceUnavailable);
        }

        self.producer = Some(producer);
        self.start_count += 1;

        let pending = std::mem::take(&mut self.pending);
        self.push(&pending);

        Ok(self.sample_rate)
    }

    fn is_active(&self) -> bool {
        self.producer.is_some()
    }

    fn stop(&mut self) {
        self.producer = None;
    }

    fn name(&self) -> String {
        format!("synthetic@{}Hz", self.sample_rate)
    }
}
