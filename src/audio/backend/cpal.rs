//! CPAL-based capture backend for desktop platforms (Linux, macOS, Windows)

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::Producer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::CaptureBackend;
use crate::error::AudioError;

/// Microphone capture through the default CPAL host
pub struct CpalBackend {
    /// Requested device (None = host default)
    device_name: Option<String>,
    /// Live input stream
    stream: Option<cpal::Stream>,
    /// Set by the stream error callback; cleared on start
    failed: Arc<AtomicBool>,
    /// Name of the device actually opened
    opened_name: Option<String>,
}

impl CpalBackend {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            stream: None,
            failed: Arc::new(AtomicBool::new(false)),
            opened_name: None,
        }
    }

    /// Names of all input devices on the default host
    pub fn list_devices() -> Vec<String> {
        let host = cpal::default_host();
        host.input_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }

    fn find_device(&self) -> Result<cpal::Device, AudioError> {
        let host = cpal::default_host();
        let device = match &self.device_name {
            Some(wanted) => host
                .input_devices()
                .map_err(|e| AudioError::StreamOpenFailed {
                    reason: format!("Failed to enumerate input devices: {}", e),
                })?
                .find(|d| d.name().map(|n| &n == wanted).unwrap_or(false)),
            None => host.default_input_device(),
        };
        device.ok_or(AudioError::DeviceUnavailable)
    }
}

/// Down-mix interleaved frames to mono (first channel) and push into the ring.
///
/// Samples are dropped when the ring is full; the frame loop only ever
/// needs the most recent window.
fn push_mono<T: Copy>(
    producer: &mut Producer<f32>,
    data: &[T],
    channels: usize,
    convert: impl Fn(T) -> f32,
) {
    for frame in data.chunks(channels.max(1)) {
        let _ = producer.push(convert(frame[0]));
    }
}

impl CaptureBackend for CpalBackend {
    fn start(&mut self, producer: Producer<f32>) -> Result<u32, AudioError> {
        self.stop();

        let device = self.find_device()?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("[CpalBackend] Using input device: {}", device_name);

        let config = device
            .default_input_config()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to get default input config: {:?}", e),
            })?;
        log::debug!("[CpalBackend] Input config: {:?}", config);

        let sample_rate = config.sample_rate().0;
        let stream_config: cpal::StreamConfig = config.clone().into();
        let channels = stream_config.channels as usize;

        self.failed.store(false, Ordering::Relaxed);
        let failed = Arc::clone(&self.failed);
        let err_fn = move |err: cpal::StreamError| {
            log::error!("[CpalBackend] Input stream error: {}", err);
            failed.store(true, Ordering::Relaxed);
        };

        let mut producer = producer;
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    push_mono(&mut producer, data, channels, |s| s);
                },
                err_fn,
                None,
            ),
            cpal::SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    push_mono(&mut producer, data, channels, |s| s as f32 / 32768.0);
                },
                err_fn,
                None,
            ),
            format => {
                return Err(AudioError::StreamOpenFailed {
                    reason: format!("Unsupported input sample format: {:?}", format),
                })
            }
        }
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;

        stream.play().map_err(|e| AudioError::HardwareError {
            details: format!("Input start failed: {}", e),
        })?;

        self.stream = Some(stream);
        self.opened_name = Some(device_name);
        Ok(sample_rate)
    }

    fn is_active(&self) -> bool {
        self.stream.is_some() && !self.failed.load(Ordering::Relaxed)
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
    }

    fn name(&self) -> String {
        self.opened_name
            .clone()
            .or_else(|| self.device_name.clone())
            .unwrap_or_else(|| "default input".to_string())
    }
}
