// Analysis module - per-frame feature extraction
//
// Pipeline: sample window → PitchDetector → JitterFilter → ControlMapper.
// Loudness comes straight from the input source; only pitch needs the
// heavier autocorrelation pass and outlier rejection.

pub mod jitter;
pub mod pitch;

pub use jitter::JitterFilter;
pub use pitch::PitchDetector;
