//! FFT convolution and the impulse-response reverb built on it

use rustfft::{num_complex::Complex64, FftPlanner};
use tracing::debug;
use vocoder_core::{AudioBuffer, Result, VocoderError};

use super::{AudioEffect, EffectParam};

/// Full linear convolution of `signal` with `ir`.
///
/// Length is `signal.len() + ir.len() - 1`, or zero when either input is empty.
pub fn convolve(signal: &[f32], ir: &[f32]) -> Vec<f32> {
    if signal.is_empty() || ir.is_empty() {
        return Vec::new();
    }
    let out_len = signal.len() + ir.len() - 1;
    let fft_len = out_len.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);

    let spectrum = |samples: &[f32]| {
        let mut buf = vec![Complex64::new(0.0, 0.0); fft_len];
        for (dst, &s) in buf.iter_mut().zip(samples) {
            dst.re = s as f64;
        }
        fft.process(&mut buf);
        buf
    };
    let mut product = spectrum(signal);
    for (a, b) in product.iter_mut().zip(spectrum(ir)) {
        *a *= b;
    }
    ifft.process(&mut product);

    let scale = 1.0 / fft_len as f64;
    product[..out_len].iter().map(|c| (c.re * scale) as f32).collect()
}

/// Time-domain reference for [`convolve`]
pub fn convolve_direct(signal: &[f32], ir: &[f32]) -> Vec<f32> {
    if signal.is_empty() || ir.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0f64; signal.len() + ir.len() - 1];
    for (i, &s) in signal.iter().enumerate() {
        for (j, &h) in ir.iter().enumerate() {
            out[i + j] += s as f64 * h as f64;
        }
    }
    out.into_iter().map(|v| v as f32).collect()
}

/// Convolution reverb with an in-memory impulse response.
/// The output grows by `ir.len() - 1` samples of tail.
#[derive(Debug)]
pub struct ConvolutionReverbEffect {
    impulse_response: Vec<f32>,
    mix: f32,
}

impl ConvolutionReverbEffect {
    pub fn new(impulse_response: Vec<f32>, mix: f32) -> Self {
        Self { impulse_response, mix }
    }
}

impl AudioEffect for ConvolutionReverbEffect {
    fn name(&self) -> &str { "Convolution Reverb" }

    fn validate(&self, _sample_rate: u32) -> Result<()> {
        if self.impulse_response.is_empty() {
            return Err(VocoderError::config("impulse response is empty"));
        }
        if !(0.0..=1.0).contains(&self.mix) {
            return Err(VocoderError::config(format!(
                "reverb mix must be within 0..=1, got {}",
                self.mix
            )));
        }
        Ok(())
    }

    fn process(&mut self, buffer: AudioBuffer) -> Result<AudioBuffer> {
        let wet = convolve(buffer.samples(), &self.impulse_response);
        debug!(ir_len = self.impulse_response.len(), wet_len = wet.len(), "Convolved");

        let mix = self.mix;
        let dry = buffer.samples();
        let output = wet
            .iter()
            .enumerate()
            .map(|(i, &w)| (1.0 - mix) * dry.get(i).copied().unwrap_or(0.0) + mix * w)
            .collect();
        Ok(buffer.with_samples(output))
    }

    fn get_params(&self) -> Vec<EffectParam> {
        vec![
            EffectParam::new("mix", self.mix, 0.0, 1.0, ""),
            EffectParam::new(
                "ir_length",
                self.impulse_response.len() as f32,
                1.0,
                f32::MAX,
                "samples",
            ),
        ]
    }
}
