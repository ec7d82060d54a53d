//! Configuration management for dynamic parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration without recompilation. Capture windows, pitch
//! detection limits, jitter filtering, control mapping and calibration
//! timing can all be adjusted via the config file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::control::{ControlMode, FeatureKind};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub pitch: PitchConfig,
    pub jitter: JitterConfig,
    pub control: ControlConfig,
    pub calibration: CalibrationConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name (None = host default device)
    pub device_name: Option<String>,
    /// Window size in samples for the loudness estimate
    pub loudness_window: usize,
    /// Window size in samples handed to the pitch detector
    pub pitch_window: usize,
    /// Capacity of the capture ring between the device callback and the frame loop
    pub ring_capacity: usize,
    /// Maximum time to wait for the first sample after opening the device
    pub ready_timeout_ms: u64,
    /// Poll interval while waiting for the first sample
    pub ready_poll_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            loudness_window: 256,
            pitch_window: 2048,
            ring_capacity: 16384,
            ready_timeout_ms: 500,
            ready_poll_ms: 2,
        }
    }
}

impl AudioConfig {
    /// Sample history length kept by the input source
    ///
    /// Must cover the largest consumer window.
    pub fn history_capacity(&self) -> usize {
        self.loudness_window.max(self.pitch_window).max(1)
    }
}

/// Autocorrelation pitch detector parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    /// Lowest frequency searched (Hz)
    pub min_frequency: f32,
    /// Highest frequency searched (Hz)
    pub max_frequency: f32,
    /// Minimum normalized correlation for a confident estimate
    pub confidence_threshold: f32,
    /// Pitch is only estimated while loudness exceeds this gate
    pub loudness_gate: f32,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            min_frequency: 70.0,
            max_frequency: 800.0,
            confidence_threshold: 0.6,
            loudness_gate: 0.005,
        }
    }
}

/// Jitter filter parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    /// Number of recent accepted samples in the median window
    pub median_filter_size: usize,
    /// Larger frame-to-frame jumps (Hz) are discarded as outliers
    pub max_change_per_frame: f32,
    /// Forget the filter state after this many consecutive frames without
    /// an estimate, so a new phrase is not judged against the last one (0 = never)
    pub reset_after_silent_frames: usize,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            median_filter_size: 5,
            max_change_per_frame: 50.0,
            reset_after_silent_frames: 30,
        }
    }
}

/// Control mapping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub mode: ControlMode,
    pub feature: FeatureKind,
    /// Lerp factor applied between frames in velocity/position/tracking modes
    pub smoothing: f32,
    /// Tracking mode ignores target changes smaller than this
    pub deadzone: f32,
    pub travel_min: f32,
    pub travel_max: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            mode: ControlMode::Direction,
            feature: FeatureKind::Loudness,
            smoothing: 0.3,
            deadzone: 0.02,
            travel_min: 0.0,
            travel_max: 1.0,
        }
    }
}

/// Calibration wizard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Length of each recording step in seconds
    pub recording_duration_secs: f32,
    /// Multiplier applied to the peak silence level
    pub safety_margin: f32,
    /// Advance automatically this long after a recording completes
    pub auto_advance_secs: Option<f32>,
    /// Calibration store location
    pub store_path: PathBuf,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            recording_duration_secs: 2.0,
            safety_margin: 1.5,
            auto_advance_secs: None,
            store_path: PathBuf::from("calibration.json"),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file doesn't exist or
    /// the JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.audio.loudness_window, 256);
        assert_eq!(config.audio.pitch_window, 2048);
        assert_eq!(config.pitch.confidence_threshold, 0.6);
        assert_eq!(config.jitter.median_filter_size, 5);
        assert_eq!(config.jitter.reset_after_silent_frames, 30);
        assert_eq!(config.control.mode, ControlMode::Direction);
        assert_eq!(config.calibration.recording_duration_secs, 2.0);
        assert_eq!(config.calibration.safety_margin, 1.5);
    }

    #[test]
    fn test_history_capacity_covers_largest_window() {
        let mut audio = AudioConfig::default();
        assert_eq!(audio.history_capacity(), 2048);
        audio.loudness_window = 4096;
        assert_eq!(audio.history_capacity(), 4096);
    }

    #[test]
    fn test_partial_json_uses_section_defaults() {
        let json = r#"{ "control": { "mode": "velocity", "feature": "pitch" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.control.mode, ControlMode::Velocity);
        assert_eq!(config.control.feature, FeatureKind::Pitch);
        assert_eq!(config.control.smoothing, 0.3);
        assert_eq!(config.audio.loudness_window, 256);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/voice_paddle/config.json");
        assert_eq!(config.pitch.min_frequency, 70.0);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.jitter.max_change_per_frame, config.jitter.max_change_per_frame);
        assert_eq!(parsed.calibration.store_path, config.calibration.store_path);
    }
}
