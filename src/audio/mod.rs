// Audio module - microphone capture and rolling sample history

pub mod backend;
pub mod history;
pub mod input;

// Re-export commonly used types for convenience
pub use backend::{CaptureBackend, CpalBackend, SyntheticBackend};
pub use history::SampleHistory;
pub use input::AudioInputSource;
