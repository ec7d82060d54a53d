//! Per-frame voice control pipeline
//!
//! Order within one `update()`:
//! 1. capture update (restart stalled device, drain samples)
//! 2. loudness read
//! 3. pitch detection, gated on loudness (no full window yet = no estimate);
//!    skipped entirely when loudness drives control and nobody observes pitch
//! 4. jitter filtering
//! 5. feature publication to the tap (read by the calibration recorder)
//! 6. control mapping

use crate::analysis::{JitterFilter, PitchDetector};
use crate::audio::{AudioInputSource, CaptureBackend};
use crate::calibration::{CalibrationData, CalibrationPersistence, FeatureTap};
use crate::config::AppConfig;
use crate::control::{ControlMapper, ControlSignal, FeatureKind};
use crate::error::{log_calibration_error, AudioError};

/// Feature values produced by the last frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameFeatures {
    pub loudness: f32,
    /// Raw detector output (0 = no pitch)
    pub raw_pitch: f32,
    /// Jitter-filtered pitch (0 = nothing accepted yet)
    pub pitch: f32,
}

pub struct VoicePipeline<B: CaptureBackend> {
    input: AudioInputSource<B>,
    detector: PitchDetector,
    jitter: JitterFilter,
    mapper: ControlMapper,
    tap: FeatureTap,
    feature: FeatureKind,
    loudness_gate: f32,
    /// Run pitch detection even when loudness drives the mapper
    pitch_observed: bool,
    window: Vec<f32>,
    features: FrameFeatures,
}

impl<B: CaptureBackend> VoicePipeline<B> {
    pub fn new(backend: B, config: &AppConfig) -> Self {
        Self {
            input: AudioInputSource::new(backend, config.audio.clone()),
            detector: PitchDetector::new(&config.pitch),
            jitter: JitterFilter::new(&config.jitter),
            mapper: ControlMapper::new(&config.control),
            tap: FeatureTap::new(),
            feature: config.control.feature,
            loudness_gate: config.pitch.loudness_gate,
            pitch_observed: false,
            window: vec![0.0; config.audio.pitch_window.max(1)],
            features: FrameFeatures::default(),
        }
    }

    /// Open the capture device
    ///
    /// # Errors
    /// `DeviceUnavailable` / `DeviceNotReady` from the input source
    pub fn initialize(&mut self) -> Result<(), AudioError> {
        self.input.initialize()
    }

    /// Apply the saved calibration, or defaults when none is stored
    pub fn load_calibration<P: CalibrationPersistence>(&mut self, persistence: &P) -> CalibrationData {
        let data = match persistence.load() {
            Ok(Some(saved)) => saved.repaired(),
            Ok(None) => {
                log::info!("[Pipeline] No saved calibration, using defaults");
                CalibrationData::default()
            }
            Err(err) => {
                log_calibration_error(&err, "load_calibration");
                CalibrationData::default()
            }
        };
        self.mapper.apply_calibration(&data);
        data
    }

    /// Run one frame and return the control signal
    pub fn update(&mut self, delta_time: f32) -> ControlSignal {
        self.input.update();
        let loudness = self.input.loudness();

        let mut raw_pitch = 0.0;
        let mut pitch = 0.0;
        if self.tracks_pitch() {
            if loudness > self.loudness_gate && self.input.copy_window(&mut self.window).is_ok() {
                raw_pitch = self
                    .detector
                    .detect_pitch(&self.window, self.input.sample_rate());
            }
            self.jitter.add_sample(raw_pitch);
            pitch = self.jitter.filtered_pitch();
        }
        tracing::trace!(loudness, raw_pitch, pitch, "[Pipeline] frame features");

        self.features = FrameFeatures {
            loudness,
            raw_pitch,
            pitch,
        };

        let value = match self.feature {
            FeatureKind::Loudness => loudness,
            FeatureKind::Pitch => pitch,
        };
        self.tap.publish(value);

        self.mapper.update(value, delta_time)
    }

    /// Keep pitch up to date for a caller that reads `features()` while
    /// loudness drives control
    pub fn observe_pitch(&mut self, observed: bool) {
        self.pitch_observed = observed;
        if !self.tracks_pitch() {
            self.jitter.reset();
        }
    }

    /// Whether pitch detection runs each frame
    pub fn tracks_pitch(&self) -> bool {
        self.feature == FeatureKind::Pitch || self.pitch_observed
    }

    /// Shared cell carrying the selected feature, for the calibration wizard
    pub fn feature_tap(&self) -> FeatureTap {
        self.tap.clone()
    }

    pub fn features(&self) -> FrameFeatures {
        self.features
    }

    pub fn mapper(&self) -> &ControlMapper {
        &self.mapper
    }

    pub fn mapper_mut(&mut self) -> &mut ControlMapper {
        &mut self.mapper
    }

    pub fn input(&self) -> &AudioInputSource<B> {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut AudioInputSource<B> {
        &mut self.input
    }

    pub fn shutdown(&mut self) {
        self.input.shutdown();
    }
}
