// Calibration module - guided threshold calibration
//
// Components:
// 1. CalibrationRecorder: samples a feature for a fixed duration (average/max)
// 2. CalibrationData: persisted thresholds with sanitize-then-validate rules
// 3. CalibrationStateMachine: linear step table with back-navigation history
// 4. Step handlers + CalibrationWizard: drive the recording steps, persist
//    the result and announce completion
//
// The calibration workflow:
// 1. Welcome
// 2. Record silence (peak level × safety margin → background)
// 3. Record a quiet sound (average → low)
// 4. Record a loud sound (average → high)
// 5. Complete: sanitize, validate, persist, apply

pub mod data;
pub mod persistence;
pub mod recorder;
pub mod state_machine;
pub mod steps;
pub mod ui;
pub mod wizard;

pub use data::CalibrationData;
pub use persistence::{CalibrationPersistence, JsonFileStore, MemoryStore};
pub use recorder::{CalibrationRecorder, FeatureProvider, FeatureTap, RecordingResult};
pub use state_machine::{CalibrationStateMachine, StepChange};
pub use ui::{CalibrationUi, NullUi, UiSnapshot};
pub use wizard::{CalibrationWizard, WizardEvent};

use serde::{Deserialize, Serialize};

/// Wizard step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalibrationStep {
    Welcome,
    RecordSilence,
    RecordQuiet,
    RecordLoud,
    Complete,
}

impl CalibrationStep {
    /// Next step in the linear sequence
    ///
    /// # Returns
    /// * `Some(CalibrationStep)` - Forward successor
    /// * `None` - `Complete` is terminal
    pub fn next(&self) -> Option<CalibrationStep> {
        match self {
            CalibrationStep::Welcome => Some(CalibrationStep::RecordSilence),
            CalibrationStep::RecordSilence => Some(CalibrationStep::RecordQuiet),
            CalibrationStep::RecordQuiet => Some(CalibrationStep::RecordLoud),
            CalibrationStep::RecordLoud => Some(CalibrationStep::Complete),
            CalibrationStep::Complete => None,
        }
    }

    /// Whether this step records a feature statistic
    pub fn is_recording(&self) -> bool {
        matches!(
            self,
            CalibrationStep::RecordSilence
                | CalibrationStep::RecordQuiet
                | CalibrationStep::RecordLoud
        )
    }

    /// Get human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            CalibrationStep::Welcome => "WELCOME",
            CalibrationStep::RecordSilence => "SILENCE",
            CalibrationStep::RecordQuiet => "QUIET",
            CalibrationStep::RecordLoud => "LOUD",
            CalibrationStep::Complete => "COMPLETE",
        }
    }
}
