// CalibrationStateMachine - step table and back-navigation history
//
// Forward transitions follow the linear table
// Welcome → RecordSilence → RecordQuiet → RecordLoud → Complete.
// Every successful change pushes the previous step, so go_back() always
// returns to the step immediately before the current one.

use super::CalibrationStep;
use crate::error::CalibrationError;

/// A successful step change, reported so handlers can exit/enter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepChange {
    pub from: CalibrationStep,
    pub to: CalibrationStep,
}

#[derive(Debug, Clone)]
pub struct CalibrationStateMachine {
    current: CalibrationStep,
    history: Vec<CalibrationStep>,
}

impl Default for CalibrationStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationStateMachine {
    pub fn new() -> Self {
        Self::with_initial(CalibrationStep::Welcome)
    }

    pub fn with_initial(step: CalibrationStep) -> Self {
        Self {
            current: step,
            history: Vec::new(),
        }
    }

    pub fn current_step(&self) -> CalibrationStep {
        self.current
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn history(&self) -> &[CalibrationStep] {
        &self.history
    }

    pub fn is_in_recording_step(&self) -> bool {
        self.current.is_recording()
    }

    /// Forward successor of the current step (`Complete` stays `Complete`)
    pub fn next_step(&self) -> CalibrationStep {
        self.current.next().unwrap_or(CalibrationStep::Complete)
    }

    /// Move forward along the step table
    ///
    /// # Errors
    /// `InvalidTransition` unless `to` is the direct successor of the current step
    pub fn transition_to(&mut self, to: CalibrationStep) -> Result<StepChange, CalibrationError> {
        if self.current.next() != Some(to) {
            return Err(CalibrationError::InvalidTransition {
                from: self.current,
                to,
            });
        }
        Ok(self.push_and_move(to))
    }

    /// Jump straight to `Complete` (skip); allowed from every other step
    pub fn skip_to_complete(&mut self) -> Result<StepChange, CalibrationError> {
        if self.current == CalibrationStep::Complete {
            return Err(CalibrationError::InvalidTransition {
                from: self.current,
                to: CalibrationStep::Complete,
            });
        }
        Ok(self.push_and_move(CalibrationStep::Complete))
    }

    /// Return to the previous step
    ///
    /// # Errors
    /// `NoHistory` when no step has been left yet
    pub fn go_back(&mut self) -> Result<StepChange, CalibrationError> {
        let previous = self.history.pop().ok_or(CalibrationError::NoHistory)?;
        let change = StepChange {
            from: self.current,
            to: previous,
        };
        self.current = previous;
        Ok(change)
    }

    /// Clear history and return to `Welcome`
    pub fn reset(&mut self) {
        self.history.clear();
        self.current = CalibrationStep::Welcome;
    }

    fn push_and_move(&mut self, to: CalibrationStep) -> StepChange {
        let change = StepChange {
            from: self.current,
            to,
        };
        self.history.push(self.current);
        self.current = to;
        log::debug!("[StateMachine] {:?} -> {:?}", change.from, change.to);
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationStep::*;

    #[test]
    fn test_direct_jump_to_complete_fails() {
        let mut machine = CalibrationStateMachine::new();

        assert_eq!(
            machine.transition_to(Complete),
            Err(CalibrationError::InvalidTransition {
                from: Welcome,
                to: Complete
            })
        );
        assert_eq!(machine.current_step(), Welcome);
        assert!(!machine.can_go_back());
    }

    #[test]
    fn test_forward_chain_succeeds() {
        let mut machine = CalibrationStateMachine::new();

        for to in [RecordSilence, RecordQuiet, RecordLoud, Complete] {
            let from = machine.current_step();
            assert_eq!(machine.transition_to(to), Ok(StepChange { from, to }));
        }
        assert_eq!(machine.current_step(), Complete);
        assert_eq!(machine.history().len(), 4);
    }

    #[test]
    fn test_backward_and_repeat_transitions_fail() {
        let mut machine = CalibrationStateMachine::with_initial(RecordQuiet);

        assert!(machine.transition_to(RecordSilence).is_err());
        assert!(machine.transition_to(RecordQuiet).is_err());
        assert!(machine.transition_to(RecordLoud).is_ok());
    }

    #[test]
    fn test_go_back_returns_to_immediately_prior_step() {
        let mut machine = CalibrationStateMachine::new();
        machine.transition_to(RecordSilence).unwrap();
        machine.transition_to(RecordQuiet).unwrap();

        let change = machine.go_back().unwrap();
        assert_eq!(
            change,
            StepChange {
                from: RecordQuiet,
                to: RecordSilence
            }
        );
        assert_eq!(machine.current_step(), RecordSilence);

        machine.go_back().unwrap();
        assert_eq!(machine.current_step(), Welcome);
    }

    #[test]
    fn test_go_back_without_history() {
        let mut machine = CalibrationStateMachine::new();
        assert_eq!(machine.go_back(), Err(CalibrationError::NoHistory));
    }

    #[test]
    fn test_skip_to_complete_records_history() {
        let mut machine = CalibrationStateMachine::new();
        machine.transition_to(RecordSilence).unwrap();

        let change = machine.skip_to_complete().unwrap();
        assert_eq!(change.to, Complete);
        assert!(machine.skip_to_complete().is_err());

        machine.go_back().unwrap();
        assert_eq!(machine.current_step(), RecordSilence);
    }

    #[test]
    fn test_next_step_and_reset() {
        let mut machine = CalibrationStateMachine::with_initial(RecordLoud);
        assert_eq!(machine.next_step(), Complete);
        assert!(machine.is_in_recording_step());

        machine.transition_to(Complete).unwrap();
        assert_eq!(machine.next_step(), Complete);

        machine.reset();
        assert_eq!(machine.current_step(), Welcome);
        assert!(!machine.can_go_back());
    }
}
