// CalibrationWizard - host-facing driver for the calibration steps
//
// Frame-driven: the host calls update(dt) once per frame after publishing the
// current feature value into the wizard's FeatureTap, and forwards button
// clicks. Outbound events go to broadcast subscribers.

use serde::Serialize;
use tokio::sync::broadcast;

use super::persistence::CalibrationPersistence;
use super::recorder::{CalibrationRecorder, FeatureTap, RecordingResult};
use super::state_machine::{CalibrationStateMachine, StepChange};
use super::steps::{StepCommand, StepHandler, StepSession};
use super::ui::CalibrationUi;
use super::{CalibrationData, CalibrationStep};
use crate::config::CalibrationConfig;
use crate::error::{log_calibration_error, CalibrationError};

/// Broadcast channel capacity for wizard events
const EVENT_BUFFER: usize = 32;

/// Events announced to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum WizardEvent {
    StepChanged {
        from: CalibrationStep,
        to: CalibrationStep,
    },
    RecordingFinished {
        step: CalibrationStep,
        result: RecordingResult,
    },
    /// Final (sanitized, persisted) record; apply it to the control mapper
    CalibrationComplete(CalibrationData),
    TransitionToGame,
}

pub struct CalibrationWizard<P, U> {
    machine: CalibrationStateMachine,
    handler: StepHandler,
    session: StepSession<P, U>,
    started: bool,
    finished: bool,
}

impl<P: CalibrationPersistence, U: CalibrationUi> CalibrationWizard<P, U> {
    /// Create a wizard reading the live feature from `tap`
    pub fn new(persistence: P, ui: U, tap: FeatureTap, config: CalibrationConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            machine: CalibrationStateMachine::new(),
            handler: StepHandler::for_step(CalibrationStep::Welcome),
            session: StepSession {
                recorder: CalibrationRecorder::new(),
                data: CalibrationData::default(),
                persistence,
                ui,
                tap,
                config,
                events,
            },
            started: false,
            finished: false,
        }
    }

    /// Open the wizard at `Welcome`, seeding the working record from the store
    pub fn start(&mut self) {
        self.session.load_saved_or_defaults();

        self.handler.on_exit(&mut self.session);
        self.machine.reset();
        self.handler = StepHandler::for_step(CalibrationStep::Welcome);
        self.handler.on_enter(&mut self.session);
        self.refresh_navigation();

        self.started = true;
        self.finished = false;
        log::info!("[Wizard] Calibration started");
    }

    /// Per-frame tick for the active step
    pub fn update(&mut self, delta_time: f32) {
        if !self.is_active() {
            return;
        }

        let command = self.handler.on_update(&mut self.session, delta_time);
        if let Err(err) = self.apply(command) {
            log_calibration_error(&err, "update");
        }
    }

    /// # Errors
    /// `AlreadyRecording` if clicked while the step is still recording
    pub fn next_clicked(&mut self) -> Result<(), CalibrationError> {
        if !self.is_active() {
            return Ok(());
        }

        let command = self
            .handler
            .on_next_clicked(&mut self.session)
            .inspect_err(|err| log_calibration_error(err, "next_clicked"))?;
        self.apply(command)
    }

    /// Jump to `Complete` with the saved calibration (or defaults)
    pub fn skip_clicked(&mut self) -> Result<(), CalibrationError> {
        if !self.is_active() {
            return Ok(());
        }

        let command = self.handler.on_skip_clicked(&mut self.session);
        self.apply(command)
    }

    /// # Errors
    /// `NoHistory` on the first step
    pub fn back_clicked(&mut self) -> Result<(), CalibrationError> {
        if !self.is_active() {
            return Ok(());
        }

        let change = self
            .machine
            .go_back()
            .inspect_err(|err| log_calibration_error(err, "back_clicked"))?;
        self.step_changed(change);
        Ok(())
    }

    pub fn current_step(&self) -> CalibrationStep {
        self.machine.current_step()
    }

    /// Working calibration record
    pub fn data(&self) -> &CalibrationData {
        &self.session.data
    }

    /// The host has been told to move on to the game
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WizardEvent> {
        self.session.events.subscribe()
    }

    pub fn can_go_back(&self) -> bool {
        self.machine.can_go_back()
    }

    pub fn recorder(&self) -> &CalibrationRecorder {
        &self.session.recorder
    }

    pub fn feature_tap(&self) -> &FeatureTap {
        &self.session.tap
    }

    pub fn persistence(&self) -> &P {
        &self.session.persistence
    }

    pub fn ui(&self) -> &U {
        &self.session.ui
    }

    fn is_active(&self) -> bool {
        self.started && !self.finished
    }

    fn apply(&mut self, command: StepCommand) -> Result<(), CalibrationError> {
        let change = match command {
            StepCommand::Stay => return Ok(()),
            StepCommand::Finish => {
                self.finished = true;
                log::info!("[Wizard] Transition to game");
                return Ok(());
            }
            StepCommand::Advance(to) => self.machine.transition_to(to)?,
            StepCommand::SkipToComplete => self.machine.skip_to_complete()?,
        };
        self.step_changed(change);
        Ok(())
    }

    fn step_changed(&mut self, change: StepChange) {
        self.handler.on_exit(&mut self.session);
        self.handler = StepHandler::for_step(change.to);
        self.refresh_navigation();

        log::debug!("[Wizard] Step {:?} -> {:?}", change.from, change.to);
        self.session.emit(WizardEvent::StepChanged {
            from: change.from,
            to: change.to,
        });
        self.handler.on_enter(&mut self.session);
    }

    fn refresh_navigation(&mut self) {
        let can_go_back = self.machine.can_go_back();
        let can_skip = self.handler.can_skip();
        self.session.ui.set_back_visible(can_go_back);
        self.session.ui.set_skip_visible(can_skip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::persistence::MemoryStore;
    use crate::calibration::ui::UiSnapshot;

    fn wizard() -> CalibrationWizard<MemoryStore, UiSnapshot> {
        let config = CalibrationConfig {
            recording_duration_secs: 0.5,
            ..CalibrationConfig::default()
        };
        let mut wizard =
            CalibrationWizard::new(MemoryStore::new(), UiSnapshot::default(), FeatureTap::new(), config);
        wizard.start();
        wizard
    }

    fn record(wizard: &mut CalibrationWizard<MemoryStore, UiSnapshot>, value: f32) {
        wizard.next_clicked().unwrap();
        wizard.feature_tap().publish(value);
        while wizard.recorder().is_recording() {
            wizard.update(0.1);
        }
    }

    #[test]
    fn test_start_shows_welcome() {
        let wizard = wizard();
        assert_eq!(wizard.current_step(), CalibrationStep::Welcome);
        assert_eq!(wizard.ui().button, "Begin");
        assert!(!wizard.ui().skip_visible);
        assert!(!wizard.ui().back_visible);
    }

    #[test]
    fn test_full_flow_persists() {
        let mut wizard = wizard();
        wizard.next_clicked().unwrap();
        assert_eq!(wizard.current_step(), CalibrationStep::RecordSilence);
        assert!(wizard.ui().skip_visible);
        assert!(wizard.ui().back_visible);

        record(&mut wizard, 0.002);
        wizard.next_clicked().unwrap();
        record(&mut wizard, 0.04);
        wizard.next_clicked().unwrap();
        record(&mut wizard, 0.4);
        wizard.next_clicked().unwrap();

        assert_eq!(wizard.current_step(), CalibrationStep::Complete);
        let saved = wizard.persistence().saved().unwrap();
        assert!((saved.background - 0.003).abs() < 1e-6);
        assert!((saved.low - 0.04).abs() < 1e-6);
        assert!((saved.high - 0.4).abs() < 1e-6);

        wizard.next_clicked().unwrap();
        assert!(wizard.is_finished());
    }

    #[test]
    fn test_next_while_recording_fails() {
        let mut wizard = wizard();
        wizard.next_clicked().unwrap();
        wizard.next_clicked().unwrap();

        assert_eq!(wizard.next_clicked(), Err(CalibrationError::AlreadyRecording));
        assert_eq!(wizard.current_step(), CalibrationStep::RecordSilence);
    }

    #[test]
    fn test_back_stops_recording() {
        let mut wizard = wizard();
        wizard.next_clicked().unwrap();
        wizard.next_clicked().unwrap();
        wizard.update(0.1);
        assert!(wizard.recorder().is_recording());

        wizard.back_clicked().unwrap();

        assert_eq!(wizard.current_step(), CalibrationStep::Welcome);
        assert!(!wizard.recorder().is_recording());
        assert_eq!(wizard.back_clicked(), Err(CalibrationError::NoHistory));
    }

    #[test]
    fn test_skip_from_welcome_reaches_complete() {
        let mut wizard = wizard();
        let mut rx = wizard.subscribe();

        wizard.skip_clicked().unwrap();

        assert_eq!(wizard.current_step(), CalibrationStep::Complete);
        assert_eq!(wizard.persistence().save_count(), 1);
        assert_eq!(
            rx.try_recv(),
            Ok(WizardEvent::StepChanged {
                from: CalibrationStep::Welcome,
                to: CalibrationStep::Complete
            })
        );
        assert!(matches!(
            rx.try_recv(),
            Ok(WizardEvent::CalibrationComplete(data)) if data == CalibrationData::default()
        ));

        // skip on Complete is a no-op
        wizard.skip_clicked().unwrap();
        assert_eq!(wizard.persistence().save_count(), 1);
    }

    #[test]
    fn test_clicks_before_start_are_ignored() {
        let mut wizard = CalibrationWizard::new(
            MemoryStore::new(),
            UiSnapshot::default(),
            FeatureTap::new(),
            CalibrationConfig::default(),
        );

        assert!(wizard.next_clicked().is_ok());
        assert!(wizard.back_clicked().is_ok());
        assert_eq!(wizard.current_step(), CalibrationStep::Welcome);
    }
}
