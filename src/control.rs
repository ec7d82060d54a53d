//! Control mapping - feature value to paddle control signal
//!
//! Every mode shares the same threshold lookup (`Thresholds`):
//!
//! ```text
//!   v < background          → stationary / 0
//!   background ≤ v < low    → left,  intensity inverseLerp(background, low, v)
//!   v ≥ low                 → right, intensity inverseLerp(low, high, v) clamped
//! ```
//!
//! Direction mode reports the ternary direction; velocity mode smooths the
//! signed intensity between frames; position mode integrates that velocity
//! into a clamped travel range; tracking mode maps the feature value directly
//! onto the travel range (absolute pitch-to-position).

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationData;
use crate::config::ControlConfig;

/// How the feature value is turned into a control signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    Direction,
    Velocity,
    Position,
    Tracking,
}

/// Which live feature drives the mapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Loudness,
    Pitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Stationary,
}

/// Per-frame mapper output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ControlSignal {
    Direction(Direction),
    /// Signed velocity in [-1, 1]
    Velocity(f32),
    /// Position inside the travel range
    Position(f32),
}

/// `(v - a) / (b - a)` clamped to [0, 1]; 0 for an empty range
pub fn inverse_lerp(a: f32, b: f32, v: f32) -> f32 {
    let span = b - a;
    if span.abs() <= f32::EPSILON {
        return 0.0;
    }
    ((v - a) / span).clamp(0.0, 1.0)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Threshold core shared by every mapping mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub background: f32,
    pub low: f32,
    pub high: f32,
    pub speed: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from(&CalibrationData::default())
    }
}

impl From<&CalibrationData> for Thresholds {
    fn from(data: &CalibrationData) -> Self {
        Self {
            background: data.background,
            low: data.low,
            high: data.high,
            speed: data.speed,
        }
    }
}

impl Thresholds {
    pub fn direction(&self, value: f32) -> Direction {
        if value < self.background {
            Direction::Stationary
        } else if value < self.low {
            Direction::Left
        } else {
            Direction::Right
        }
    }

    /// Signed intensity in [-1, 1]; negative is left
    pub fn intensity(&self, value: f32) -> f32 {
        match self.direction(value) {
            Direction::Stationary => 0.0,
            Direction::Left => -inverse_lerp(self.background, self.low, value),
            Direction::Right => inverse_lerp(self.low, self.high, value),
        }
    }
}

/// Stateful mapper from feature value to `ControlSignal`
#[derive(Debug, Clone)]
pub struct ControlMapper {
    mode: ControlMode,
    feature: FeatureKind,
    thresholds: Thresholds,
    smoothing: f32,
    deadzone: f32,
    travel_min: f32,
    travel_max: f32,
    velocity: f32,
    position: f32,
}

impl ControlMapper {
    pub fn new(config: &ControlConfig) -> Self {
        let (travel_min, travel_max) = if config.travel_min <= config.travel_max {
            (config.travel_min, config.travel_max)
        } else {
            (config.travel_max, config.travel_min)
        };

        let mut mapper = Self {
            mode: config.mode,
            feature: config.feature,
            thresholds: Thresholds::default(),
            smoothing: config.smoothing.clamp(0.0, 1.0),
            deadzone: config.deadzone.max(0.0),
            travel_min,
            travel_max,
            velocity: 0.0,
            position: 0.0,
        };
        mapper.reset();
        mapper
    }

    pub fn set_thresholds(&mut self, background: f32, low: f32, high: f32, speed: Option<f32>) {
        self.thresholds = Thresholds {
            background,
            low,
            high,
            speed: speed.unwrap_or(self.thresholds.speed),
        };
    }

    /// Install calibration outputs
    pub fn apply_calibration(&mut self, data: &CalibrationData) {
        self.thresholds = Thresholds::from(data);
        log::info!(
            "[ControlMapper] Calibration applied: background={:.4} low={:.4} high={:.4} speed={:.2}",
            data.background,
            data.low,
            data.high,
            data.speed
        );
    }

    /// Zero the velocity and recentre the position
    pub fn reset(&mut self) {
        self.velocity = 0.0;
        self.position = (self.travel_min + self.travel_max) * 0.5;
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ControlMode) {
        self.mode = mode;
    }

    pub fn feature(&self) -> FeatureKind {
        self.feature
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    /// Map this frame's feature value
    pub fn update(&mut self, value: f32, delta_time: f32) -> ControlSignal {
        match self.mode {
            ControlMode::Direction => ControlSignal::Direction(self.thresholds.direction(value)),
            ControlMode::Velocity => {
                self.smooth_velocity(value);
                ControlSignal::Velocity(self.velocity)
            }
            ControlMode::Position => {
                self.smooth_velocity(value);
                self.position = (self.position
                    + self.velocity * self.thresholds.speed * delta_time.max(0.0))
                .clamp(self.travel_min, self.travel_max);
                ControlSignal::Position(self.position)
            }
            ControlMode::Tracking => {
                if value >= self.thresholds.background {
                    let t = inverse_lerp(self.thresholds.low, self.thresholds.high, value);
                    let target = lerp(self.travel_min, self.travel_max, t);
                    if (target - self.position).abs() > self.deadzone {
                        self.position = lerp(self.position, target, self.smoothing);
                    }
                }
                ControlSignal::Position(self.position)
            }
        }
    }

    fn smooth_velocity(&mut self, value: f32) {
        let target = self.thresholds.intensity(value);
        self.velocity = lerp(self.velocity, target, self.smoothing).clamp(-1.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(mode: ControlMode) -> ControlMapper {
        let mut mapper = ControlMapper::new(&ControlConfig {
            mode,
            ..ControlConfig::default()
        });
        mapper.set_thresholds(0.01, 0.05, 0.25, Some(2.0));
        mapper
    }

    #[test]
    fn test_inverse_lerp() {
        assert_eq!(inverse_lerp(0.0, 2.0, 1.0), 0.5);
        assert_eq!(inverse_lerp(0.0, 2.0, 5.0), 1.0);
        assert_eq!(inverse_lerp(0.0, 2.0, -1.0), 0.0);
        assert_eq!(inverse_lerp(1.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn test_direction_bands() {
        let mut mapper = mapper(ControlMode::Direction);

        assert_eq!(
            mapper.update(0.005, 0.016),
            ControlSignal::Direction(Direction::Stationary)
        );
        assert_eq!(
            mapper.update(0.03, 0.016),
            ControlSignal::Direction(Direction::Left)
        );
        assert_eq!(
            mapper.update(0.05, 0.016),
            ControlSignal::Direction(Direction::Right)
        );
        assert_eq!(
            mapper.update(1.0, 0.016),
            ControlSignal::Direction(Direction::Right)
        );
    }

    #[test]
    fn test_intensity_signs_and_clamp() {
        let thresholds = Thresholds {
            background: 0.01,
            low: 0.05,
            high: 0.25,
            speed: 1.0,
        };

        assert_eq!(thresholds.intensity(0.0), 0.0);
        assert!((thresholds.intensity(0.03) + 0.5).abs() < 1e-6);
        assert!((thresholds.intensity(0.15) - 0.5).abs() < 1e-6);
        assert_eq!(thresholds.intensity(10.0), 1.0);
    }

    #[test]
    fn test_velocity_is_smoothed() {
        let mut mapper = mapper(ControlMode::Velocity);

        let first = match mapper.update(0.25, 0.016) {
            ControlSignal::Velocity(v) => v,
            other => panic!("unexpected {:?}", other),
        };
        assert!((first - 0.3).abs() < 1e-6);

        let mut last = first;
        for _ in 0..50 {
            if let ControlSignal::Velocity(v) = mapper.update(0.25, 0.016) {
                assert!(v >= last);
                last = v;
            }
        }
        assert!((last - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_position_integrates_and_clamps() {
        let mut mapper = mapper(ControlMode::Position);
        assert_eq!(mapper.position(), 0.5);

        for _ in 0..200 {
            mapper.update(0.25, 0.05);
        }
        assert_eq!(mapper.position(), 1.0);

        for _ in 0..400 {
            mapper.update(0.049, 0.05);
        }
        assert_eq!(mapper.position(), 0.0);
    }

    #[test]
    fn test_position_holds_during_silence() {
        let mut mapper = mapper(ControlMode::Position);
        for _ in 0..10 {
            mapper.update(0.0, 0.05);
        }
        assert_eq!(mapper.position(), 0.5);
        assert_eq!(mapper.velocity(), 0.0);
    }

    #[test]
    fn test_tracking_moves_toward_target() {
        let mut mapper = mapper(ControlMode::Tracking);

        for _ in 0..100 {
            mapper.update(0.25, 0.016);
        }
        assert!(mapper.position() > 0.97);

        // below background the paddle holds its place
        let held = mapper.position();
        mapper.update(0.0, 0.016);
        assert_eq!(mapper.position(), held);
    }

    #[test]
    fn test_tracking_deadzone() {
        let mut mapper = mapper(ControlMode::Tracking);
        // target 0.51 is inside the 0.02 deadzone around 0.5
        mapper.update(0.05 + 0.2 * 0.51, 0.016);
        assert_eq!(mapper.position(), 0.5);
    }

    #[test]
    fn test_apply_calibration_and_reset() {
        let mut mapper = mapper(ControlMode::Position);
        mapper.apply_calibration(&CalibrationData::new(0.001, 0.002, 0.003, 4.0));
        assert_eq!(mapper.thresholds().speed, 4.0);

        mapper.update(0.003, 0.5);
        assert_ne!(mapper.position(), 0.5);

        mapper.reset();
        assert_eq!(mapper.position(), 0.5);
        assert_eq!(mapper.velocity(), 0.0);
    }

    #[test]
    fn test_mode_parses_lowercase() {
        let mode: ControlMode = serde_json::from_str("\"tracking\"").unwrap();
        assert_eq!(mode, ControlMode::Tracking);
    }
}
