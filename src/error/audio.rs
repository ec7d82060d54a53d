// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Single source of truth for the numeric codes reported by [`AudioError`].
///
/// Error code range: 1001-1006
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// No capture device present at initialization
    pub const DEVICE_UNAVAILABLE: i32 = 1001;

    /// Device opened but produced no samples before the ready deadline
    pub const DEVICE_NOT_READY: i32 = 1002;

    /// Capture position has not advanced far enough for the requested window
    pub const INSUFFICIENT_SAMPLES: i32 = 1003;

    /// Failed to open audio stream
    pub const STREAM_OPEN_FAILED: i32 = 1004;

    /// Hardware error occurred
    pub const HARDWARE_ERROR: i32 = 1005;

    /// Audio file could not be decoded
    pub const INVALID_AUDIO_FILE: i32 = 1006;
}

/// Log an audio error with structured context
///
/// This function logs audio errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioInput, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover capture device access and sample window reads.
/// `InsufficientSamples` is transient and expected every frame until the
/// history fills; callers treat it as "no estimate this frame".
///
/// Error code range: 1001-1006
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No capture device present
    DeviceUnavailable,

    /// Device produced no samples within the ready timeout
    DeviceNotReady { waited_ms: u64 },

    /// Not enough captured samples for the requested window
    InsufficientSamples { required: usize, available: usize },

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Hardware error occurred
    HardwareError { details: String },

    /// Audio file could not be read or decoded
    InvalidAudioFile { reason: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::DeviceUnavailable => AudioErrorCodes::DEVICE_UNAVAILABLE,
            AudioError::DeviceNotReady { .. } => AudioErrorCodes::DEVICE_NOT_READY,
            AudioError::InsufficientSamples { .. } => AudioErrorCodes::INSUFFICIENT_SAMPLES,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::InvalidAudioFile { .. } => AudioErrorCodes::INVALID_AUDIO_FILE,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::DeviceUnavailable => "No audio capture device available".to_string(),
            AudioError::DeviceNotReady { waited_ms } => {
                format!("Capture device produced no samples after {} ms", waited_ms)
            }
            AudioError::InsufficientSamples {
                required,
                available,
            } => {
                format!(
                    "Insufficient samples: need {}, captured {}",
                    required, available
                )
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::InvalidAudioFile { reason } => {
                format!("Invalid audio file: {}", reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}
