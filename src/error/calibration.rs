// Calibration error types and constants

use crate::calibration::CalibrationStep;
use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 2001-2005
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Recorder started while a session is already active
    pub const ALREADY_RECORDING: i32 = 2001;

    /// Back navigation requested with an empty history
    pub const NO_HISTORY: i32 = 2002;

    /// Transition not permitted by the linear step table
    pub const INVALID_TRANSITION: i32 = 2003;

    /// Calibration record violates the threshold ordering
    pub const INVALID_CALIBRATION_DATA: i32 = 2004;

    /// Persistence store could not be read or written
    pub const PERSISTENCE: i32 = 2005;
}

/// Log a calibration error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationWizard, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// `AlreadyRecording`, `NoHistory` and `InvalidTransition` indicate a defect
/// in the calling sequence. `InvalidCalibrationData` is always recovered by
/// sanitize-then-default and never reaches the user.
///
/// Error code range: 2001-2005
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Recorder already has an active session
    AlreadyRecording,

    /// No step to go back to
    NoHistory,

    /// Requested step change is not in the transition table
    InvalidTransition {
        from: CalibrationStep,
        to: CalibrationStep,
    },

    /// Calibration record failed validation
    InvalidCalibrationData { reason: String },

    /// Persistence store failure
    Persistence { reason: String },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::AlreadyRecording => CalibrationErrorCodes::ALREADY_RECORDING,
            CalibrationError::NoHistory => CalibrationErrorCodes::NO_HISTORY,
            CalibrationError::InvalidTransition { .. } => {
                CalibrationErrorCodes::INVALID_TRANSITION
            }
            CalibrationError::InvalidCalibrationData { .. } => {
                CalibrationErrorCodes::INVALID_CALIBRATION_DATA
            }
            CalibrationError::Persistence { .. } => CalibrationErrorCodes::PERSISTENCE,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::AlreadyRecording => "Recorder is already recording".to_string(),
            CalibrationError::NoHistory => "Cannot go back: no step history".to_string(),
            CalibrationError::InvalidTransition { from, to } => {
                format!("Invalid transition: {:?} -> {:?}", from, to)
            }
            CalibrationError::InvalidCalibrationData { reason } => {
                format!("Invalid calibration data: {}", reason)
            }
            CalibrationError::Persistence { reason } => {
                format!("Calibration persistence failed: {}", reason)
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_error_codes() {
        assert_eq!(
            CalibrationError::AlreadyRecording.code(),
            CalibrationErrorCodes::ALREADY_RECORDING
        );
        assert_eq!(
            CalibrationError::NoHistory.code(),
            CalibrationErrorCodes::NO_HISTORY
        );
        assert_eq!(
            CalibrationError::InvalidTransition {
                from: CalibrationStep::Welcome,
                to: CalibrationStep::Complete
            }
            .code(),
            CalibrationErrorCodes::INVALID_TRANSITION
        );
        assert_eq!(
            CalibrationError::InvalidCalibrationData {
                reason: "test".to_string()
            }
            .code(),
            CalibrationErrorCodes::INVALID_CALIBRATION_DATA
        );
        assert_eq!(
            CalibrationError::Persistence {
                reason: "test".to_string()
            }
            .code(),
            CalibrationErrorCodes::PERSISTENCE
        );
    }

    #[test]
    fn test_calibration_error_messages() {
        let err = CalibrationError::InvalidTransition {
            from: CalibrationStep::Welcome,
            to: CalibrationStep::Complete,
        };
        assert_eq!(err.message(), "Invalid transition: Welcome -> Complete");

        let err = CalibrationError::NoHistory;
        assert!(err.message().contains("no step history"));

        let err = CalibrationError::AlreadyRecording;
        assert!(err.message().contains("already recording"));
    }

    #[test]
    fn test_calibration_error_display() {
        let err = CalibrationError::NoHistory;
        let display = format!("{}", err);
        assert!(display.contains("CalibrationError"));
        assert!(display.contains(&err.code().to_string()));
    }
}
