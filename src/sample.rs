//! Decoded sample buffers shared between the store and the mixer.

use std::sync::Arc;

/// An immutable, decoded audio sample.
///
/// Samples are mono, normalized to [-1.0, 1.0], and stored behind an
/// [`Arc`] so that clones handed to in-flight mixes are cheap and the
/// backing data outlives registry eviction until the last clone drops.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Arc<[f32]>,
    sample_rate_hz: u32,
}

impl SampleBuffer {
    /// Creates a sample buffer from decoded mono samples.
    pub fn new(samples: Vec<f32>, sample_rate_hz: u32) -> Self {
        Self {
            samples: Arc::from(samples.into_boxed_slice()),
            sample_rate_hz,
        }
    }

    /// The normalized sample data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of sample frames in the buffer.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer contains no frames.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The sample rate the buffer was decoded to.
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Playback duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate_hz as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_data() {
        let buffer = SampleBuffer::new(vec![0.1, -0.2, 0.3], 44_100);
        let clone = buffer.clone();

        assert!(Arc::ptr_eq(&buffer.samples, &clone.samples));
        assert_eq!(clone.samples(), &[0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_duration() {
        let buffer = SampleBuffer::new(vec![0.0; 22_050], 44_100);
        assert!((buffer.duration_secs() - 0.5).abs() < 1e-6);

        let empty = SampleBuffer::new(Vec::new(), 44_100);
        assert!(empty.is_empty());
        assert_eq!(empty.duration_secs(), 0.0);
    }
}
