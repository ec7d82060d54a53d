//! Audio input capture
//!
//! `AudioInputSource` owns a capture backend and a rolling sample history.
//! The host calls `update()` once per frame before reading loudness or a
//! sample window; a stalled device is restarted transparently from there.

use rtrb::{Consumer, RingBuffer};
use std::time::{Duration, Instant};

use super::backend::CaptureBackend;
use super::history::SampleHistory;
use crate::config::AudioConfig;
use crate::error::{log_audio_error, AudioError, ErrorCode};

/// Frame-driven microphone reader
pub struct AudioInputSource<B: CaptureBackend> {
    backend: B,
    config: AudioConfig,
    /// Consumer half of the capture ring (None until the stream is open)
    consumer: Option<Consumer<f32>>,
    history: SampleHistory,
    sample_rate: u32,
    /// Loudness computed during the last `update()`
    loudness: f32,
    initialized: bool,
    restart_count: u64,
}

impl<B: CaptureBackend> AudioInputSource<B> {
    pub fn new(backend: B, config: AudioConfig) -> Self {
        let history = SampleHistory::new(config.history_capacity());
        Self {
            backend,
            config,
            consumer: None,
            history,
            sample_rate: 0,
            loudness: 0.0,
            initialized: false,
            restart_count: 0,
        }
    }

    /// Open the capture device and wait (bounded) for the first sample
    ///
    /// # Errors
    /// - `DeviceUnavailable` if no capture device is present
    /// - `DeviceNotReady` if no sample arrives within `ready_timeout_ms`
    pub fn initialize(&mut self) -> Result<(), AudioError> {
        self.open_stream().inspect_err(|err| {
            log_audio_error(err, "initialize");
        })?;

        let timeout = Duration::from_millis(self.config.ready_timeout_ms);
        let poll = Duration::from_millis(self.config.ready_poll_ms.max(1));
        let started = Instant::now();

        loop {
            self.drain();
            if !self.history.is_empty() {
                break;
            }
            if started.elapsed() >= timeout {
                self.backend.stop();
                self.consumer = None;
                let err = AudioError::DeviceNotReady {
                    waited_ms: started.elapsed().as_millis() as u64,
                };
                log_audio_error(&err, "initialize");
                return Err(err);
            }
            std::thread::sleep(poll);
        }

        self.initialized = true;
        log::info!(
            "[AudioInput] Capture started on {} at {} Hz",
            self.backend.name(),
            self.sample_rate
        );
        Ok(())
    }

    /// Per-frame tick: restart a stalled device, drain new samples, refresh loudness
    ///
    /// Restart failures are logged and retried on the next call; they are never fatal.
    pub fn update(&mut self) {
        if !self.initialized {
            return;
        }

        if !self.backend.is_active() {
            // Stale samples must not outlive the stream that produced them
            if self.consumer.take().is_some() {
                self.history.clear();
                self.loudness = 0.0;
                log::warn!("[AudioInput] Capture on {} stopped", self.backend.name());
            }

            self.restart_count += 1;
            match self.open_stream() {
                Ok(()) => log::info!(
                    "[AudioInput] Capture restarted on {} (restart #{})",
                    self.backend.name(),
                    self.restart_count
                ),
                Err(err) => {
                    log::warn!(
                        "[AudioInput] Capture restart #{} failed: {}",
                        self.restart_count,
                        err.message()
                    );
                    return;
                }
            }
        }

        self.drain();
        self.loudness = self
            .history
            .mean_abs_latest(self.config.loudness_window)
            .unwrap_or(0.0);
    }

    /// Mean absolute amplitude over the most recent loudness window
    ///
    /// Returns 0 until a full window has been captured since start.
    pub fn loudness(&self) -> f32 {
        self.loudness
    }

    /// The most recent `n` samples, oldest first
    pub fn sample_window(&self, n: usize) -> Result<Vec<f32>, AudioError> {
        let mut window = vec![0.0; n];
        self.copy_window(&mut window)?;
        Ok(window)
    }

    /// Allocation-free variant of [`sample_window`](Self::sample_window)
    pub fn copy_window(&self, out: &mut [f32]) -> Result<(), AudioError> {
        let result = self.history.copy_latest(out);
        if let Err(err) = &result {
            log::trace!("[AudioInput] No window this frame: {}", err.message());
        }
        result
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples captured since the stream was (re)opened
    pub fn captured_samples(&self) -> u64 {
        self.history.captured()
    }

    pub fn restart_count(&self) -> u64 {
        self.restart_count
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Stop capture; a later `initialize()` reopens the device
    pub fn shutdown(&mut self) {
        self.backend.stop();
        self.consumer = None;
        self.initialized = false;
        log::info!("[AudioInput] Capture stopped");
    }

    fn open_stream(&mut self) -> Result<(), AudioError> {
        let (producer, consumer) = RingBuffer::new(self.config.ring_capacity.max(1));
        self.sample_rate = self.backend.start(producer)?;
        self.consumer = Some(consumer);
        self.history.clear();
        self.loudness = 0.0;
        Ok(())
    }

    fn drain(&mut self) {
        let Some(consumer) = self.consumer.as_mut() else {
            return;
        };

        let available = consumer.slots();
        if available == 0 {
            return;
        }
        if let Ok(chunk) = consumer.read_chunk(available) {
            let (first, second) = chunk.as_slices();
            self.history.extend_from_slice(first);
            self.history.extend_from_slice(second);
            chunk.commit_all();
        }
    }
}

impl<B: CaptureBackend> Drop for AudioInputSource<B> {
    fn drop(&mut self) {
        self.backend.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::SyntheticBackend;

    fn test_config() -> AudioConfig {
        AudioConfig {
            loudness_window: 8,
            pitch_window: 16,
            ring_capacity: 64,
            ready_timeout_ms: 20,
            ready_poll_ms: 1,
            ..AudioConfig::default()
        }
    }

    fn primed_source(samples: &[f32]) -> AudioInputSource<SyntheticBackend> {
        let mut backend = SyntheticBackend::new(8000);
        backend.push(samples);
        let mut source = AudioInputSource::new(backend, test_config());
        source.initialize().expect("initialize should succeed");
        source
    }

    #[test]
    fn test_initialize_without_device_fails() {
        let backend = SyntheticBackend::new(8000).with_no_device();
        let mut source = AudioInputSource::new(backend, test_config());

        assert_eq!(source.initialize(), Err(AudioError::DeviceUnavailable));
        assert!(!source.is_initialized());
    }

    #[test]
    fn test_initialize_times_out_without_samples() {
        let backend = SyntheticBackend::new(8000);
        let mut source = AudioInputSource::new(backend, test_config());

        match source.initialize() {
            Err(AudioError::DeviceNotReady { .. }) => {}
            other => panic!("Expected DeviceNotReady, got {:?}", other),
        }
        assert!(!source.backend().is_active());
    }

    #[test]
    fn test_constant_window_loudness() {
        let mut source = primed_source(&[-0.25; 8]);
        source.update();

        assert!((source.loudness() - 0.25).abs() < 1e-6);
        assert_eq!(source.sample_rate(), 8000);
    }

    #[test]
    fn test_loudness_zero_before_full_window() {
        let mut source = primed_source(&[0.5; 3]);
        source.update();

        assert_eq!(source.loudness(), 0.0);
    }

    #[test]
    fn test_sample_window_insufficient_then_available() {
        let mut source = primed_source(&[0.1; 4]);
        source.update();

        assert!(matches!(
            source.sample_window(16),
            Err(AudioError::InsufficientSamples {
                required: 16,
                available: 4
            })
        ));

        let ramp: Vec<f32> = (0..12).map(|i| i as f32).collect();
        source.backend_mut().push(&ramp);
        source.update();

        let window = source.sample_window(16).unwrap();
        assert_eq!(window.len(), 16);
        assert_eq!(window[15], 11.0);
        assert_eq!(window[3], 0.1);
    }

    #[test]
    fn test_restart_after_disconnect() {
        let mut source = primed_source(&[0.2; 8]);
        source.update();
        assert!(source.loudness() > 0.0);

        source.backend_mut().disconnect();
        source.update();

        assert_eq!(source.restart_count(), 1);
        assert_eq!(source.backend().start_count(), 2);
        assert_eq!(source.captured_samples(), 0);
        assert_eq!(source.loudness(), 0.0);

        source.backend_mut().push(&[0.4; 8]);
        source.update();
        assert!((source.loudness() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_failed_restart_drops_stale_audio() {
        let mut source = primed_source(&[0.3; 8]);
        source.update();
        assert!((source.loudness() - 0.3).abs() < 1e-6);

        source.backend_mut().unplug();
        for _ in 0..3 {
            source.update();
        }

        assert_eq!(source.restart_count(), 3);
        assert_eq!(source.loudness(), 0.0);
        assert_eq!(source.captured_samples(), 0);
        assert!(matches!(
            source.sample_window(4),
            Err(AudioError::InsufficientSamples { available: 0, .. })
        ));

        // retried on the next update once the device is back
        source.backend_mut().plug_in();
        source.backend_mut().push(&[0.1; 8]);
        source.update();

        assert_eq!(source.restart_count(), 4);
        assert_eq!(source.backend().start_count(), 2);
        assert!((source.loudness() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_update_before_initialize_is_noop() {
        let mut source = AudioInputSource::new(SyntheticBackend::new(8000), test_config());
        source.update();

        assert_eq!(source.restart_count(), 0);
        assert_eq!(source.loudness(), 0.0);
    }
}
