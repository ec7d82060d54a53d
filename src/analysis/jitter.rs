// JitterFilter - two-stage smoothing for pitch estimates
//
// Stage 1 rate-limits: a sample that jumps more than `max_change_per_frame`
// away from the last accepted value is dropped (octave jumps, spikes).
// Stage 2 takes the median over a bounded FIFO of accepted samples.
// Rate limiting runs first; a median alone cannot reject a sustained burst.
//
// A run of `reset_after_silent_frames` consecutive frames without an estimate
// ends the phrase: history and the rate-limit reference are dropped.

use std::collections::VecDeque;

use crate::config::JitterConfig;

#[derive(Debug, Clone)]
pub struct JitterFilter {
    history: VecDeque<f32>,
    capacity: usize,
    max_change_per_frame: f32,
    last_valid: Option<f32>,
    /// Consecutive calls without an estimate
    silent_frames: usize,
    reset_after_silent_frames: usize,
    /// Scratch buffer for the median sort
    scratch: Vec<f32>,
}

impl JitterFilter {
    pub fn new(config: &JitterConfig) -> Self {
        let capacity = config.median_filter_size.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            max_change_per_frame: config.max_change_per_frame,
            last_valid: None,
            silent_frames: 0,
            reset_after_silent_frames: config.reset_after_silent_frames,
            scratch: Vec::with_capacity(capacity),
        }
    }

    /// Offer a raw estimate to the filter
    ///
    /// Zero, negative and non-finite values mean "no estimate" and are
    /// ignored; a long enough run of them resets the filter. Returns whether
    /// the sample was accepted.
    pub fn add_sample(&mut self, pitch: f32) -> bool {
        if !pitch.is_finite() || pitch <= 0.0 {
            self.silent_frames = self.silent_frames.saturating_add(1);
            if self.reset_after_silent_frames > 0
                && self.silent_frames == self.reset_after_silent_frames
                && self.last_valid.is_some()
            {
                tracing::trace!(
                    "[JitterFilter] No estimate for {} frames, resetting",
                    self.silent_frames
                );
                self.reset();
            }
            return false;
        }
        self.silent_frames = 0;

        if let Some(last) = self.last_valid {
            if (pitch - last).abs() > self.max_change_per_frame {
                tracing::trace!(
                    "[JitterFilter] Rejected outlier {:.1} (last {:.1})",
                    pitch,
                    last
                );
                return false;
            }
        }

        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(pitch);
        self.last_valid = Some(pitch);
        true
    }

    /// Median of the accepted samples, or 0 when nothing has been accepted
    pub fn filtered_pitch(&mut self) -> f32 {
        if self.history.is_empty() {
            return 0.0;
        }

        self.scratch.clear();
        self.scratch.extend(self.history.iter().copied());
        self.scratch.sort_by(|a, b| a.total_cmp(b));

        let mid = self.scratch.len() / 2;
        if self.scratch.len() % 2 == 0 {
            (self.scratch[mid - 1] + self.scratch[mid]) * 0.5
        } else {
            self.scratch[mid]
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last_valid = None;
        self.silent_frames = 0;
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
