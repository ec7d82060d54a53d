// UI port driven by the calibration wizard
//
// The wizard only writes to the UI; clicks come back in through
// `CalibrationWizard::{next,skip,back}_clicked`.

pub trait CalibrationUi {
    fn set_instruction_text(&mut self, text: &str);
    fn set_button_text(&mut self, text: &str);
    fn set_button_enabled(&mut self, enabled: bool);
    fn show_meter(&mut self, visible: bool);
    fn update_meter(&mut self, value: f32);
    fn set_skip_visible(&mut self, _visible: bool) {}
    fn set_back_visible(&mut self, _visible: bool) {}
}

/// UI that discards every update (headless runs)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullUi;

impl CalibrationUi for NullUi {
    fn set_instruction_text(&mut self, _text: &str) {}
    fn set_button_text(&mut self, _text: &str) {}
    fn set_button_enabled(&mut self, _enabled: bool) {}
    fn show_meter(&mut self, _visible: bool) {}
    fn update_meter(&mut self, _value: f32) {}
}

/// UI that remembers the last value of every widget
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiSnapshot {
    pub instruction: String,
    pub button: String,
    pub button_enabled: bool,
    pub meter_visible: bool,
    pub meter: f32,
    pub skip_visible: bool,
    pub back_visible: bool,
}

impl CalibrationUi for UiSnapshot {
    fn set_instruction_text(&mut self, text: &str) {
        self.instruction = text.to_string();
    }

    fn set_button_text(&mut self, text: &str) {
        self.button = text.to_string();
    }

    fn set_button_enabled(&mut self, enabled: bool) {
        self.button_enabled = enabled;
    }

    fn show_meter(&mut self, visible: bool) {
        self.meter_visible = visible;
    }

    fn update_meter(&mut self, value: f32) {
        self.meter = value;
    }

    fn set_skip_visible(&mut self, visible: bool) {
        self.skip_visible = visible;
    }

    fn set_back_visible(&mut self, visible: bool) {
        self.back_visible = visible;
    }
}
