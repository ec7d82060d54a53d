// CalibrationRecorder - fixed-duration feature sampling
//
// Idle → Recording on start_recording(); each update() while recording
// samples the feature once and accumulates sum, running max and count.
// Reaching the duration does not stop the session: the owner observes
// is_complete() and calls stop_recording() itself.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// Source of the live feature value (loudness or pitch)
pub trait FeatureProvider {
    fn sample(&mut self) -> f32;
}

impl<F: FnMut() -> f32> FeatureProvider for F {
    fn sample(&mut self) -> f32 {
        self()
    }
}

/// Lock-free cell the host publishes the current feature value into
///
/// Clones share the same cell, so the frame loop can publish while the
/// recorder reads without either side owning the other.
#[derive(Debug, Clone, Default)]
pub struct FeatureTap {
    bits: Arc<AtomicU32>,
}

impl FeatureTap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl FeatureProvider for FeatureTap {
    fn sample(&mut self) -> f32 {
        self.get()
    }
}

/// Aggregate of one recording session
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordingResult {
    /// sum / count (0 when nothing was sampled)
    pub average: f32,
    pub max: f32,
    pub sample_count: usize,
    /// Seconds recorded
    pub elapsed: f32,
    /// Elapsed time reached the requested duration
    pub completed: bool,
}

#[derive(Default)]
pub struct CalibrationRecorder {
    provider: Option<Box<dyn FeatureProvider>>,
    duration: f32,
    elapsed: f32,
    sum: f32,
    max: f32,
    sample_count: usize,
}

impl CalibrationRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a session sampling `provider` for `duration` seconds
    ///
    /// # Errors
    /// `AlreadyRecording` if a session is active; the active session is left untouched.
    pub fn start_recording<F>(&mut self, provider: F, duration: f32) -> Result<(), CalibrationError>
    where
        F: FeatureProvider + 'static,
    {
        if self.is_recording() {
            return Err(CalibrationError::AlreadyRecording);
        }

        self.provider = Some(Box::new(provider));
        self.duration = duration.max(0.0);
        self.elapsed = 0.0;
        self.sum = 0.0;
        self.max = 0.0;
        self.sample_count = 0;
        log::debug!("[CalibrationRecorder] Recording for {:.2}s", self.duration);
        Ok(())
    }

    /// Advance the session by `delta_time` seconds and take one sample
    pub fn update(&mut self, delta_time: f32) {
        let Some(provider) = self.provider.as_mut() else {
            return;
        };

        let value = provider.sample();
        self.elapsed += delta_time.max(0.0);
        self.sum += value;
        self.max = if self.sample_count == 0 {
            value
        } else {
            self.max.max(value)
        };
        self.sample_count += 1;
    }

    /// Return to Idle; aggregates stay readable until the next start
    pub fn stop_recording(&mut self) {
        if self.provider.take().is_some() {
            log::debug!(
                "[CalibrationRecorder] Stopped after {:.2}s ({} samples)",
                self.elapsed,
                self.sample_count
            );
        }
    }

    pub fn is_recording(&self) -> bool {
        self.provider.is_some()
    }

    /// Recording and the requested duration has elapsed
    pub fn is_complete(&self) -> bool {
        self.is_recording() && self.reached_duration()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Fraction of the duration recorded, in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.duration > 0.0 {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn result(&self) -> RecordingResult {
        RecordingResult {
            average: if self.sample_count > 0 {
                self.sum / self.sample_count as f32
            } else {
                0.0
            },
            max: self.max,
            sample_count: self.sample_count,
            elapsed: self.elapsed,
            completed: self.reached_duration(),
        }
    }

    fn reached_duration(&self) -> bool {
        self.sample_count > 0 && self.elapsed >= self.duration
    }
}

impl std::fmt::Debug for CalibrationRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibrationRecorder")
            .field("recording", &self.is_recording())
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .field("sample_count", &self.sample_count)
            .finish()
    }
}
