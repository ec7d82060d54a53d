//! Capture backend abstractions for the audio input source.

use rtrb::Producer;

use crate::error::AudioError;

/// Trait implemented by capture backends.
///
/// A backend owns the device stream and pushes mono `f32` samples into the
/// producer half of the capture ring. The input source owns the consumer
/// half and drains it once per frame.
pub trait CaptureBackend {
    /// Open the device and begin looping capture into `producer`.
    ///
    /// Returns the device sample rate in Hz. Fails with
    /// [`AudioError::DeviceUnavailable`] when no device is present.
    fn start(&mut self, producer: Producer<f32>) -> Result<u32, AudioError>;

    /// Whether the stream is still delivering samples.
    ///
    /// Returns false after a device disconnect or stream error so the
    /// caller can restart it.
    fn is_active(&self) -> bool;

    /// Close the stream. Safe to call when not started.
    fn stop(&mut self);

    /// Human-readable device/backend name for logs.
    fn name(&self) -> String;
}

mod cpal;
pub use self::cpal::CpalBackend;

mod synthetic;
pub use synthetic::SyntheticBackend;
