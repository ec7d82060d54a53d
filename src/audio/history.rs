// SampleHistory - fixed-capacity rolling window of captured samples
//
// The input source drains the capture ring into this history once per frame.
// Only the most recent `capacity` samples are retained; older samples are
// overwritten in place so the frame loop never allocates.

use crate::error::AudioError;

/// Circular sample store, most-recent-last when read back
#[derive(Debug, Clone)]
pub struct SampleHistory {
    buffer: Vec<f32>,
    write_pos: usize,
    captured: u64,
}

impl SampleHistory {
    /// Create a history holding at most `capacity` samples
    ///
    /// # Panics
    /// Panics if capacity is 0
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be greater than 0");
        Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
            captured: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Total samples captured since the last clear
    pub fn captured(&self) -> u64 {
        self.captured
    }

    /// Number of samples currently readable
    pub fn len(&self) -> usize {
        (self.captured.min(self.buffer.len() as u64)) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.captured == 0
    }

    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        self.captured += 1;
    }

    pub fn extend_from_slice(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.push(sample);
        }
    }

    /// Forget all samples (capture position restarts from zero)
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
        self.captured = 0;
    }

    /// Copy the most recent `out.len()` samples into `out`, oldest first
    pub fn copy_latest(&self, out: &mut [f32]) -> Result<(), AudioError> {
        let n = out.len();
        let available = self.len();
        if n > available {
            return Err(AudioError::InsufficientSamples {
                required: n,
                available,
            });
        }

        let capacity = self.buffer.len();
        let start = (self.write_pos + capacity - n) % capacity;
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.buffer[(start + i) % capacity];
        }
        Ok(())
    }

    /// Mean absolute amplitude over the most recent `window` samples
    ///
    /// Returns `None` until `window` samples have been captured.
    pub fn mean_abs_latest(&self, window: usize) -> Option<f32> {
        if window == 0 || window > self.len() {
            return None;
        }

        let capacity = self.buffer.len();
        let start = (self.write_pos + capacity - window) % capacity;
        let sum: f32 = (0..window)
            .map(|i| self.buffer[(start + i) % capacity].abs())
            .sum();
        Some(sum / window as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_latest_is_oldest_first() {
        let mut history = SampleHistory::new(4);
        history.extend_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let mut out = [0.0; 3];
        history.copy_latest(&mut out).unwrap();
        assert_eq!(out, [4.0, 5.0, 6.0]);

        let mut all = [0.0; 4];
        history.copy_latest(&mut all).unwrap();
        assert_eq!(all, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_copy_latest_insufficient() {
        let mut history = SampleHistory::new(8);
        history.extend_from_slice(&[0.1, 0.2]);

        let mut out = [0.0; 3];
        match history.copy_latest(&mut out) {
            Err(AudioError::InsufficientSamples {
                required: 3,
                available: 2,
            }) => {}
            other => panic!("Expected InsufficientSamples, got {:?}", other),
        }
    }

    #[test]
    fn test_window_larger_than_capacity_is_insufficient() {
        let mut history = SampleHistory::new(4);
        history.extend_from_slice(&[0.5; 10]);

        let mut out = [0.0; 5];
        assert!(history.copy_latest(&mut out).is_err());
        assert_eq!(history.len(), 4);
        assert_eq!(history.captured(), 10);
    }

    #[test]
    fn test_mean_abs_latest() {
        let mut history = SampleHistory::new(4);
        assert_eq!(history.mean_abs_latest(2), None);

        history.extend_from_slice(&[10.0, -0.5, 0.5, -1.0, 1.0]);
        assert_eq!(history.mean_abs_latest(4), Some(0.75));
        assert_eq!(history.mean_abs_latest(2), Some(1.0));
    }

    #[test]
    fn test_clear_resets_position() {
        let mut history = SampleHistory::new(4);
        history.extend_from_slice(&[1.0, 2.0]);
        history.clear();

        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
        assert_eq!(history.mean_abs_latest(1), None);
    }

    #[test]
    #[should_panic(expected = "history capacity must be greater than 0")]
    fn test_zero_capacity_panics() {
        SampleHistory::new(0);
    }
}
