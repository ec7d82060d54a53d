// Voice Paddle Core - voice-driven game control
// Microphone capture, pitch/loudness features and guided calibration

// Module declarations
pub mod analysis;
pub mod audio;
pub mod calibration;
pub mod config;
pub mod control;
pub mod error;
pub mod fixtures;
pub mod pipeline;

// Re-exports for convenience
pub use analysis::{JitterFilter, PitchDetector};
pub use audio::{AudioInputSource, CaptureBackend, CpalBackend, SyntheticBackend};
pub use calibration::{
    CalibrationData, CalibrationPersistence, CalibrationStep, CalibrationWizard, FeatureTap,
    JsonFileStore, MemoryStore, WizardEvent,
};
pub use config::AppConfig;
pub use control::{ControlMapper, ControlMode, ControlSignal, Direction, FeatureKind};
pub use error::{AudioError, CalibrationError, ErrorCode};
pub use pipeline::VoicePipeline;
