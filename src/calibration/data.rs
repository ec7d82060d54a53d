// CalibrationData - persisted control thresholds
//
// Invariant after sanitize(): 0 ≤ background < low < high, speed > 0.
// Live recordings are frequently degenerate (identical quiet/loud levels in
// a silent room), so sanitize() raises them into a monotonic triple instead
// of rejecting them; validate() is the strict check used before persisting.

use serde::{Deserialize, Serialize};

use super::recorder::RecordingResult;
use super::CalibrationStep;
use crate::error::CalibrationError;

/// Fallback silence baseline
pub const DEFAULT_BACKGROUND: f32 = 0.005;
/// Fallback quiet-sound level
pub const DEFAULT_LOW: f32 = 0.05;
/// Fallback loud-sound level
pub const DEFAULT_HIGH: f32 = 0.2;
/// Fallback control gain
pub const DEFAULT_SPEED: f32 = 2.0;

/// Each level must be at least this multiple of the one below it
const LEVEL_RATIO: f32 = 1.5;
/// Absolute minimum gap between adjacent levels
const MIN_SEPARATION: f32 = 1e-4;

/// Calibration record
///
/// Serialized keys (`background`, `low`, `high`, `speed`) are part of the
/// stored format and must not be renamed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationData {
    /// Silence baseline; features below it are treated as no input
    pub background: f32,
    /// Quiet-sound statistic
    pub low: f32,
    /// Loud-sound statistic
    pub high: f32,
    /// Control gain used by position mode
    pub speed: f32,
}

impl Default for CalibrationData {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
            low: DEFAULT_LOW,
            high: DEFAULT_HIGH,
            speed: DEFAULT_SPEED,
        }
    }
}

impl CalibrationData {
    pub fn new(background: f32, low: f32, high: f32, speed: f32) -> Self {
        Self {
            background,
            low,
            high,
            speed,
        }
    }

    /// Reset every field to the fallback constants
    pub fn apply_defaults(&mut self) {
        *self = Self::default();
    }

    /// Store the statistic a recording step is responsible for
    ///
    /// Silence keeps its peak scaled by `safety_margin`; quiet and loud keep
    /// their averages. Non-recording steps are ignored.
    pub fn record(&mut self, step: CalibrationStep, result: &RecordingResult, safety_margin: f32) {
        match step {
            CalibrationStep::RecordSilence => self.background = result.max * safety_margin,
            CalibrationStep::RecordQuiet => self.low = result.average,
            CalibrationStep::RecordLoud => self.high = result.average,
            CalibrationStep::Welcome | CalibrationStep::Complete => {}
        }
    }

    /// Repair the record into a strictly increasing triple
    ///
    /// - non-finite fields fall back to their defaults
    /// - background is clamped to ≥ 0
    /// - low ≥ background × 1.5, high ≥ low × 1.5 (with a minimum gap)
    /// - a non-positive speed falls back to the default
    pub fn sanitize(&mut self) {
        let finite_or = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };

        self.background = finite_or(self.background, DEFAULT_BACKGROUND).max(0.0);
        self.low = finite_or(self.low, DEFAULT_LOW)
            .max(self.background * LEVEL_RATIO)
            .max(self.background + MIN_SEPARATION);
        self.high = finite_or(self.high, DEFAULT_HIGH)
            .max(self.low * LEVEL_RATIO)
            .max(self.low + MIN_SEPARATION);

        if !self.speed.is_finite() || self.speed <= 0.0 {
            self.speed = DEFAULT_SPEED;
        }
    }

    /// Strict invariant check
    ///
    /// # Errors
    /// `InvalidCalibrationData` naming the first violated rule
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let invalid = |reason: String| Err(CalibrationError::InvalidCalibrationData { reason });

        let fields = [
            ("background", self.background),
            ("low", self.low),
            ("high", self.high),
            ("speed", self.speed),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return invalid(format!("{} is not finite ({})", name, value));
        }
        if self.background < 0.0 {
            return invalid(format!("background {} is negative", self.background));
        }
        if self.background >= self.low {
            return invalid(format!(
                "background {} must be below low {}",
                self.background, self.low
            ));
        }
        if self.low >= self.high {
            return invalid(format!("low {} must be below high {}", self.low, self.high));
        }
        if self.speed <= 0.0 {
            return invalid(format!("speed {} must be positive", self.speed));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Sanitize, then fall back to defaults if the result is still invalid
    pub fn repaired(mut self) -> Self {
        self.sanitize();
        if let Err(err) = self.validate() {
            log::warn!("[CalibrationData] Falling back to defaults: {}", err);
            self.apply_defaults();
        }
        self
    }
}
