//! Deterministic signal fixtures.
//!
//! Synthetic PCM generators used by unit tests, the integration suite and the
//! `simulate` command, plus a WAV loader for offline analysis. Nothing here
//! touches live audio hardware.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f32::consts::PI;
use std::path::Path;

use crate::error::AudioError;

/// Sample rate used by the synthetic backend in simulations.
pub const SIMULATION_SAMPLE_RATE: u32 = 48_000;

/// Pure sine tone starting at phase zero.
pub fn sine(frequency_hz: f32, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
    let step = 2.0 * PI * frequency_hz / sample_rate as f32;
    (0..len)
        .map(|i| amplitude * (step * i as f32).sin())
        .collect()
}

/// Constant-value signal.
pub fn constant(value: f32, len: usize) -> Vec<f32> {
    vec![value; len]
}

/// Uniform white noise in `[-amplitude, amplitude)`, reproducible per seed.
pub fn white_noise(seed: u64, len: usize, amplitude: f32) -> Vec<f32> {
    if amplitude <= 0.0 {
        return vec![0.0; len];
    }

    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| rng.gen_range(-amplitude..amplitude))
        .collect()
}

/// Load a WAV file as mono `f32` samples (first channel of multi-channel files).
///
/// # Returns
/// `(samples, sample_rate)`
///
/// # Errors
/// `InvalidAudioFile` if the file cannot be opened or decoded, or uses an
/// unsupported bit depth.
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32), AudioError> {
    let invalid = |reason: String| AudioError::InvalidAudioFile { reason };

    let mut reader = hound::WavReader::open(path)
        .map_err(|err| invalid(format!("opening {}: {}", path.display(), err)))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()
            .map_err(|err| invalid(err.to_string()))?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            match spec.bits_per_sample {
                16 => reader
                    .samples::<i16>()
                    .map(|sample| sample.map(|value| value as f32 / max))
                    .collect::<Result<Vec<f32>, _>>()
                    .map_err(|err| invalid(err.to_string()))?,
                24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / max))
                    .collect::<Result<Vec<f32>, _>>()
                    .map_err(|err| invalid(err.to_string()))?,
                other => {
                    return Err(invalid(format!(
                        "Unsupported bits per sample {} in {}",
                        other,
                        path.display()
                    )))
                }
            }
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved.chunks(channels).map(|frame| frame[0]).collect()
    };

    Ok((samples, spec.sample_rate))
}
