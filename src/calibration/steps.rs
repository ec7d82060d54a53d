// Step handlers for the calibration wizard
//
// One handler per step, dispatched by match. The three recording steps share
// `RecordingHandler`, parameterized by the step (which selects the field the
// result is written into). Handlers never change the step themselves; they
// return a `StepCommand` and the wizard applies it to the state machine.

use tokio::sync::broadcast;

use super::persistence::CalibrationPersistence;
use super::recorder::{CalibrationRecorder, FeatureTap};
use super::ui::CalibrationUi;
use super::wizard::WizardEvent;
use super::{CalibrationData, CalibrationStep};
use crate::config::CalibrationConfig;
use crate::error::{log_calibration_error, CalibrationError};

/// Static presentation of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepConfig {
    pub step: CalibrationStep,
    pub instruction: &'static str,
    pub button: &'static str,
    pub show_meter: bool,
}

const WELCOME: StepConfig = StepConfig {
    step: CalibrationStep::Welcome,
    instruction: "Let's calibrate your voice controls.\n\n\
                  Silent: paddle stays still\n\
                  Quiet: paddle moves left\n\
                  Loud: paddle moves right",
    button: "Begin",
    show_meter: false,
};

const RECORD_SILENCE: StepConfig = StepConfig {
    step: CalibrationStep::RecordSilence,
    instruction: "Stay completely silent.\n\nWe'll measure your background noise.",
    button: "Record",
    show_meter: true,
};

const RECORD_QUIET: StepConfig = StepConfig {
    step: CalibrationStep::RecordQuiet,
    instruction: "Make a quiet sound.\n\nTry a whisper or soft hum.",
    button: "Record",
    show_meter: true,
};

const RECORD_LOUD: StepConfig = StepConfig {
    step: CalibrationStep::RecordLoud,
    instruction: "Make a loud sound.\n\nTry shouting or singing.",
    button: "Record",
    show_meter: true,
};

const COMPLETE: StepConfig = StepConfig {
    step: CalibrationStep::Complete,
    instruction: "Calibration complete. Ready to play?",
    button: "Play",
    show_meter: false,
};

pub fn step_config(step: CalibrationStep) -> &'static StepConfig {
    match step {
        CalibrationStep::Welcome => &WELCOME,
        CalibrationStep::RecordSilence => &RECORD_SILENCE,
        CalibrationStep::RecordQuiet => &RECORD_QUIET,
        CalibrationStep::RecordLoud => &RECORD_LOUD,
        CalibrationStep::Complete => &COMPLETE,
    }
}

/// Whether the skip button is offered on `step`
pub fn can_skip(step: CalibrationStep) -> bool {
    step.is_recording()
}

/// What the wizard should do after a handler ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCommand {
    Stay,
    Advance(CalibrationStep),
    SkipToComplete,
    Finish,
}

/// Everything a handler may touch while a wizard session runs
pub struct StepSession<P, U> {
    pub recorder: CalibrationRecorder,
    pub data: CalibrationData,
    pub persistence: P,
    pub ui: U,
    pub tap: FeatureTap,
    pub config: CalibrationConfig,
    pub events: broadcast::Sender<WizardEvent>,
}

impl<P: CalibrationPersistence, U: CalibrationUi> StepSession<P, U> {
    /// Broadcast to subscribers; having none is fine
    pub fn emit(&self, event: WizardEvent) {
        let _ = self.events.send(event);
    }

    /// Replace the working record with the saved one (or defaults)
    pub fn load_saved_or_defaults(&mut self) {
        self.data = match self.persistence.load() {
            Ok(Some(saved)) => saved.repaired(),
            Ok(None) => CalibrationData::default(),
            Err(err) => {
                log_calibration_error(&err, "load_saved_or_defaults");
                CalibrationData::default()
            }
        };
    }

    fn show_config(&mut self, config: &StepConfig) {
        self.ui.set_instruction_text(config.instruction);
        self.ui.set_button_text(config.button);
        self.ui.show_meter(config.show_meter);
        self.ui.set_button_enabled(true);
    }
}

/// Per-step state of a shared recording handler
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingHandler {
    step: CalibrationStep,
    step_complete: bool,
    /// Seconds left before auto-advance (set once the recording completes)
    advance_timer: Option<f32>,
}

impl RecordingHandler {
    fn new(step: CalibrationStep) -> Self {
        Self {
            step,
            step_complete: false,
            advance_timer: None,
        }
    }

    fn on_enter<P, U>(&mut self, session: &mut StepSession<P, U>)
    where
        P: CalibrationPersistence,
        U: CalibrationUi,
    {
        self.step_complete = false;
        self.advance_timer = None;
        session.show_config(step_config(self.step));
    }

    fn on_update<P, U>(&mut self, session: &mut StepSession<P, U>, delta_time: f32) -> StepCommand
    where
        P: CalibrationPersistence,
        U: CalibrationUi,
    {
        if let Some(timer) = self.advance_timer.as_mut() {
            *timer -= delta_time;
            if *timer <= 0.0 {
                self.advance_timer = None;
                return StepCommand::Advance(self.next_step());
            }
        }

        session.recorder.update(delta_time);

        let current = session.tap.get();
        session.ui.update_meter(current);

        if !session.recorder.is_recording() {
            return StepCommand::Stay;
        }

        let remaining = (session.recorder.duration() - session.recorder.elapsed()).max(0.0);
        session.ui.set_instruction_text(&format!(
            "Recording: {:.1}s left\n\nCurrent: {:.4}",
            remaining, current
        ));

        if session.recorder.is_complete() {
            session.recorder.stop_recording();
            let result = session.recorder.result();
            let margin = session.config.safety_margin;
            session.data.record(self.step, &result, margin);

            let stored = match self.step {
                CalibrationStep::RecordSilence => session.data.background,
                CalibrationStep::RecordQuiet => session.data.low,
                _ => session.data.high,
            };
            log::info!(
                "[Wizard] {} recorded: avg={:.4} max={:.4} samples={} -> {:.4}",
                self.step.display_name(),
                result.average,
                result.max,
                result.sample_count,
                stored
            );

            session
                .ui
                .set_instruction_text(&format!("Your level is {:.4}\n\n", stored));
            session.ui.set_button_text("Next");
            session.ui.set_button_enabled(true);
            self.step_complete = true;
            self.advance_timer = session.config.auto_advance_secs;

            session.emit(WizardEvent::RecordingFinished {
                step: self.step,
                result,
            });
        }

        StepCommand::Stay
    }

    fn on_exit<P, U>(&mut self, session: &mut StepSession<P, U>) {
        self.step_complete = false;
        self.advance_timer = None;
        if session.recorder.is_recording() {
            log::debug!(
                "[Wizard] Leaving {} mid-recording, discarding partial result",
                self.step.display_name()
            );
            session.recorder.stop_recording();
        }
    }

    fn on_next_clicked<P, U>(
        &mut self,
        session: &mut StepSession<P, U>,
    ) -> Result<StepCommand, CalibrationError>
    where
        P: CalibrationPersistence,
        U: CalibrationUi,
    {
        if self.step_complete {
            return Ok(StepCommand::Advance(self.next_step()));
        }

        let duration = session.config.recording_duration_secs;
        session
            .recorder
            .start_recording(session.tap.clone(), duration)?;
        session.ui.set_button_enabled(false);
        log::info!(
            "[Wizard] Recording {} for {:.1}s",
            self.step.display_name(),
            duration
        );
        Ok(StepCommand::Stay)
    }

    fn next_step(&self) -> CalibrationStep {
        self.step.next().unwrap_or(CalibrationStep::Complete)
    }
}

/// Handler for the current step
#[derive(Debug, Clone, PartialEq)]
pub enum StepHandler {
    Welcome,
    Recording(RecordingHandler),
    Complete,
}

impl StepHandler {
    pub fn for_step(step: CalibrationStep) -> Self {
        match step {
            CalibrationStep::Welcome => StepHandler::Welcome,
            CalibrationStep::RecordSilence
            | CalibrationStep::RecordQuiet
            | CalibrationStep::RecordLoud => StepHandler::Recording(RecordingHandler::new(step)),
            CalibrationStep::Complete => StepHandler::Complete,
        }
    }

    pub fn step(&self) -> CalibrationStep {
        match self {
            StepHandler::Welcome => CalibrationStep::Welcome,
            StepHandler::Recording(handler) => handler.step,
            StepHandler::Complete => CalibrationStep::Complete,
        }
    }

    pub fn can_skip(&self) -> bool {
        can_skip(self.step())
    }

    pub fn on_enter<P, U>(&mut self, session: &mut StepSession<P, U>)
    where
        P: CalibrationPersistence,
        U: CalibrationUi,
    {
        match self {
            StepHandler::Welcome => session.show_config(&WELCOME),
            StepHandler::Recording(handler) => handler.on_enter(session),
            StepHandler::Complete => {
                session.data = session.data.repaired();
                if let Err(err) = session.persistence.save(&session.data) {
                    log_calibration_error(&err, "complete");
                }
                log::info!(
                    "[Wizard] Calibration complete: background={:.4} low={:.4} high={:.4}",
                    session.data.background,
                    session.data.low,
                    session.data.high
                );
                session.emit(WizardEvent::CalibrationComplete(session.data));
                session.show_config(&COMPLETE);
            }
        }
    }

    pub fn on_update<P, U>(&mut self, session: &mut StepSession<P, U>, delta_time: f32) -> StepCommand
    where
        P: CalibrationPersistence,
        U: CalibrationUi,
    {
        match self {
            StepHandler::Recording(handler) => handler.on_update(session, delta_time),
            StepHandler::Welcome | StepHandler::Complete => StepCommand::Stay,
        }
    }

    pub fn on_exit<P, U>(&mut self, session: &mut StepSession<P, U>) {
        if let StepHandler::Recording(handler) = self {
            handler.on_exit(session);
        }
    }

    pub fn on_next_clicked<P, U>(
        &mut self,
        session: &mut StepSession<P, U>,
    ) -> Result<StepCommand, CalibrationError>
    where
        P: CalibrationPersistence,
        U: CalibrationUi,
    {
        match self {
            StepHandler::Welcome => Ok(StepCommand::Advance(CalibrationStep::RecordSilence)),
            StepHandler::Recording(handler) => handler.on_next_clicked(session),
            StepHandler::Complete => {
                session.emit(WizardEvent::TransitionToGame);
                Ok(StepCommand::Finish)
            }
        }
    }

    /// Load the saved calibration (or defaults) and jump to `Complete`
    pub fn on_skip_clicked<P, U>(&mut self, session: &mut StepSession<P, U>) -> StepCommand
    where
        P: CalibrationPersistence,
        U: CalibrationUi,
    {
        match self {
            StepHandler::Complete => StepCommand::Stay,
            StepHandler::Welcome | StepHandler::Recording(_) => {
                session.load_saved_or_defaults();
                StepCommand::SkipToComplete
            }
        }
    }
}
