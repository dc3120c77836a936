//! Mono sample buffer passed between pipeline stages

use crate::error::{Result, VocoderError};

/// Single-channel linear PCM audio, nominally in [-1.0, 1.0]
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(VocoderError::config("sample rate must be positive"));
        }
        Ok(Self { samples, sample_rate })
    }

    /// Build a buffer at the same sample rate with new contents.
    pub fn with_samples(&self, samples: Vec<f32>) -> Self {
        Self { samples, sample_rate: self.sample_rate }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value (0.0 for an empty buffer)
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    /// Root-mean-square level (0.0 for an empty buffer)
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum / self.samples.len() as f64).sqrt() as f32
    }

    /// Index of the first NaN or infinite sample, if any
    pub fn first_non_finite(&self) -> Option<usize> {
        self.samples.iter().position(|s| !s.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_sample_rate() {
        assert!(matches!(
            AudioBuffer::new(vec![0.0; 4], 0),
            Err(VocoderError::Configuration(_))
        ));
    }

    #[test]
    fn test_duration_and_levels() {
        let buffer = AudioBuffer::new(vec![0.5, -1.0, 0.5, 0.0], 4).unwrap();
        assert_eq!(buffer.len(), 4);
        assert!((buffer.duration_seconds() - 1.0).abs() < f64::EPSILON);
        assert_eq!(buffer.peak(), 1.0);
        let expected_rms = ((0.25 + 1.0 + 0.25) / 4.0f32).sqrt();
        assert!((buffer.rms() - expected_rms).abs() < 1e-6);
    }

    #[test]
    fn test_first_non_finite() {
        let buffer = AudioBuffer::new(vec![0.0, 1.0, f32::NAN, f32::INFINITY], 8000).unwrap();
        assert_eq!(buffer.first_non_finite(), Some(2));
        let clean = buffer.with_samples(vec![0.1, 0.2]);
        assert_eq!(clean.first_non_finite(), None);
        assert_eq!(clean.sample_rate(), 8000);
    }
}
