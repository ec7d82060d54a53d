// Pitch module - fundamental frequency estimation
//
// Normalized autocorrelation over the candidate lag range derived from the
// configured frequency limits:
//
//   corr(L) = Σ x[i]·x[i+L] / (0.5 · Σ (x[i]² + x[i+L]²))
//
// The measure is amplitude independent and equals 1.0 for a signal that
// repeats exactly every L samples. Estimates below the confidence threshold
// are reported as 0 Hz ("no pitch").
//
// Octave errors: a periodic signal correlates almost as well at 2T, 3T...
// as at its period T, so the smallest lag whose peak is within
// OCTAVE_TOLERANCE of the global maximum is taken as the period. Parabolic
// interpolation around that peak gives sub-sample lag accuracy.

use crate::config::PitchConfig;

/// Fraction of the best correlation a shorter-lag peak must reach to win
const OCTAVE_TOLERANCE: f32 = 0.9;

/// Autocorrelation pitch detector
#[derive(Debug, Clone)]
pub struct PitchDetector {
    min_frequency: f32,
    max_frequency: f32,
    confidence_threshold: f32,
    /// Correlation per candidate lag, reused between calls
    correlations: Vec<f32>,
    last_confidence: f32,
}

impl PitchDetector {
    /// Create a detector searching `[min_frequency, max_frequency]` Hz
    pub fn new(config: &PitchConfig) -> Self {
        Self {
            min_frequency: config.min_frequency,
            max_frequency: config.max_frequency,
            confidence_threshold: config.confidence_threshold,
            correlations: Vec::new(),
            last_confidence: 0.0,
        }
    }

    /// Best normalized correlation seen by the last `detect_pitch` call
    pub fn last_confidence(&self) -> f32 {
        self.last_confidence
    }

    /// Estimate the fundamental frequency of `samples`
    ///
    /// # Returns
    /// Frequency in Hz inside `[min_frequency, max_frequency]`, or 0.0 when
    /// the estimate is not confident or no candidate lag fits the window.
    pub fn detect_pitch(&mut self, samples: &[f32], sample_rate: u32) -> f32 {
        self.last_confidence = 0.0;

        let Some((min_lag, max_lag)) = self.lag_range(samples.len(), sample_rate) else {
            return 0.0;
        };

        self.correlations.clear();
        self.correlations.extend(
            (min_lag..=max_lag).map(|lag| normalized_autocorrelation(samples, lag)),
        );

        let best = self
            .correlations
            .iter()
            .copied()
            .fold(0.0_f32, f32::max);
        self.last_confidence = best;

        if best < self.confidence_threshold {
            tracing::trace!(
                "[PitchDetector] No confident pitch (best correlation {:.3})",
                best
            );
            return 0.0;
        }

        let Some(index) = self.first_strong_peak(best) else {
            return 0.0;
        };
        let lag = min_lag + index;
        let refined = refine_lag(samples, lag);

        let frequency = sample_rate as f32 / refined;
        frequency.clamp(self.min_frequency, self.max_frequency)
    }

    /// Candidate lags: ceil(sr / max_f) ..= floor(sr / min_f), capped at n - 1
    fn lag_range(&self, window: usize, sample_rate: u32) -> Option<(usize, usize)> {
        if window < 2 || sample_rate == 0 || self.min_frequency <= 0.0 {
            return None;
        }

        let sr = sample_rate as f32;
        let min_lag = (sr / self.max_frequency).ceil().max(1.0) as usize;
        let max_lag = ((sr / self.min_frequency).floor() as usize).min(window - 1);

        if min_lag > max_lag {
            None
        } else {
            Some((min_lag, max_lag))
        }
    }

    /// Index of the shortest-lag local peak within tolerance of `best`
    fn first_strong_peak(&self, best: f32) -> Option<usize> {
        let corr = &self.correlations;
        let floor = best * OCTAVE_TOLERANCE;

        (0..corr.len()).find(|&i| {
            let c = corr[i];
            let left_ok = i == 0 || c >= corr[i - 1];
            let right_ok = i + 1 == corr.len() || c >= corr[i + 1];
            c >= floor && left_ok && right_ok
        })
    }
}

/// Normalized autocorrelation at `lag` over the valid overlap region
pub fn normalized_autocorrelation(samples: &[f32], lag: usize) -> f32 {
    if lag >= samples.len() {
        return 0.0;
    }

    let mut correlation = 0.0_f32;
    let mut energy = 0.0_f32;
    for (a, b) in samples.iter().zip(&samples[lag..]) {
        correlation += a * b;
        energy += a * a + b * b;
    }

    if energy > f32::EPSILON {
        correlation / (0.5 * energy)
    } else {
        0.0
    }
}

/// Parabolic interpolation of the correlation peak around `lag`
fn refine_lag(samples: &[f32], lag: usize) -> f32 {
    if lag < 2 || lag + 1 >= samples.len() {
        return lag as f32;
    }

    let y0 = normalized_autocorrelation(samples, lag - 1);
    let y1 = normalized_autocorrelation(samples, lag);
    let y2 = normalized_autocorrelation(samples, lag + 1);

    let denom = y0 - 2.0 * y1 + y2;
    if denom.abs() <= f32::EPSILON {
        return lag as f32;
    }

    let delta = (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5);
    lag as f32 + delta
}
