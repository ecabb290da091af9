//! Fixed-capacity amplitude buffer backing the live waveform display

use super::{Waveform, MAX_POINTS};
use std::collections::VecDeque;

/// Insertion-ordered amplitudes, oldest evicted first once full
#[derive(Clone, Debug)]
pub struct WaveformBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl WaveformBuffer {
    /// Create a buffer holding at most `MAX_POINTS` samples
    pub fn new() -> Self {
        Self::with_capacity(MAX_POINTS)
    }

    /// Create a buffer with a custom bound (at least one sample)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a sample, dropping from the front while over capacity
    pub fn append(&mut self, sample: f32) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Copy of the current contents, oldest first
    pub fn snapshot(&self) -> Waveform {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for WaveformBuffer {
    fn default() -> Self {
        Self::new()
    }
}
