//! Duration-preserving pitch shift.
//!
//! The signal is time-stretched with a phase vocoder by `1 / ratio`, then
//! resampled by the same factor so the sample count comes back to the
//! original while every frequency is scaled by `ratio`.

use std::f64::consts::{PI, TAU};

use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use tracing::debug;
use vocoder_core::{AudioBuffer, PitchShiftParams, Result, VocoderError};

use super::{AudioEffect, EffectParam};
use crate::audio_io::resample_by_ratio;

const FFT_SIZE: usize = 2048;
const HOP: usize = FFT_SIZE / 4;
const N_BINS: usize = FFT_SIZE / 2 + 1;

/// Periodic Hann window
fn hann(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| 0.5 - 0.5 * (TAU * i as f64 / len as f64).cos())
        .collect()
}

/// Centred short-time Fourier transform (zero padded by half a frame on each side)
fn stft(samples: &[f32], window: &[f64], fft: &dyn Fft<f64>) -> Vec<Vec<Complex64>> {
    let pad = FFT_SIZE / 2;
    let mut padded = vec![0.0f64; samples.len() + 2 * pad];
    for (dst, &s) in padded[pad..].iter_mut().zip(samples) {
        *dst = s as f64;
    }

    let n_frames = 1 + (padded.len() - FFT_SIZE) / HOP;
    (0..n_frames)
        .map(|f| {
            let start = f * HOP;
            let mut frame: Vec<Complex64> = padded[start..start + FFT_SIZE]
                .iter()
                .zip(window)
                .map(|(&x, &w)| Complex64::new(x * w, 0.0))
                .collect();
            fft.process(&mut frame);
            frame.truncate(N_BINS);
            frame
        })
        .collect()
}

/// Resample frames along the time axis, keeping per-bin phase advance coherent
fn phase_vocoder(frames: &[Vec<Complex64>], rate: f64) -> Vec<Vec<Complex64>> {
    let silent = vec![Complex64::new(0.0, 0.0); N_BINS];
    let frame_at = |i: usize| frames.get(i).unwrap_or(&silent);

    // expected phase advance per hop for each bin centre
    let advance: Vec<f64> = (0..N_BINS)
        .map(|k| PI * HOP as f64 * k as f64 / (N_BINS - 1) as f64)
        .collect();
    let mut phase: Vec<f64> = frame_at(0).iter().map(|c| c.arg()).collect();

    let mut out = Vec::with_capacity((frames.len() as f64 / rate).ceil() as usize);
    for t in 0.. {
        let step = t as f64 * rate;
        if step >= frames.len() as f64 {
            break;
        }
        let idx = step.floor() as usize;
        let alpha = step - idx as f64;
        let (current, next) = (frame_at(idx), frame_at(idx + 1));

        out.push(
            (0..N_BINS)
                .map(|k| {
                    let mag = (1.0 - alpha) * current[k].norm() + alpha * next[k].norm();
                    Complex64::from_polar(mag, phase[k])
                })
                .collect(),
        );

        for k in 0..N_BINS {
            let mut deviation = next[k].arg() - current[k].arg() - advance[k];
            deviation -= TAU * (deviation / TAU).round();
            phase[k] += advance[k] + deviation;
        }
    }
    out
}

/// Weighted overlap-add resynthesis, trimmed to `length` samples
fn istft(
    frames: &[Vec<Complex64>],
    window: &[f64],
    ifft: &dyn Fft<f64>,
    length: usize,
) -> Vec<f32> {
    let total = FFT_SIZE + HOP * frames.len().saturating_sub(1);
    let mut acc = vec![0.0f64; total];
    let mut window_sum = vec![0.0f64; total];
    let mut spectrum = vec![Complex64::new(0.0, 0.0); FFT_SIZE];

    for (f, frame) in frames.iter().enumerate() {
        for (k, bin) in spectrum.iter_mut().enumerate() {
            *bin = if k < N_BINS { frame[k] } else { frame[FFT_SIZE - k].conj() };
        }
        spectrum[0].im = 0.0;
        spectrum[FFT_SIZE / 2].im = 0.0;
        ifft.process(&mut spectrum);

        let start = f * HOP;
        for (n, (&w, bin)) in window.iter().zip(&spectrum).enumerate() {
            acc[start + n] += bin.re / FFT_SIZE as f64 * w;
            window_sum[start + n] += w * w;
        }
    }

    let pad = FFT_SIZE / 2;
    (0..length)
        .map(|i| match (acc.get(i + pad), window_sum.get(i + pad)) {
            (Some(&v), Some(&w)) if w > 1e-10 => (v / w) as f32,
            (Some(&v), _) => v as f32,
            _ => 0.0,
        })
        .collect()
}

/// Change duration by `1 / rate` without changing pitch.
/// Output length is `round(len / rate)`.
pub fn time_stretch(samples: &[f32], rate: f64) -> Result<Vec<f32>> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(VocoderError::config(format!(
            "time stretch rate must be positive, got {rate}"
        )));
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(FFT_SIZE);
    let ifft = planner.plan_fft_inverse(FFT_SIZE);
    let window = hann(FFT_SIZE);

    let frames = stft(samples, &window, fft.as_ref());
    let stretched = phase_vocoder(&frames, rate);
    let length = (samples.len() as f64 / rate).round() as usize;
    debug!(
        rate,
        in_frames = frames.len(),
        out_frames = stretched.len(),
        length,
        "Phase vocoder stretch"
    );
    Ok(istft(&stretched, &window, ifft.as_ref(), length))
}

/// Shift pitch by `n_semitones`, returning exactly `samples.len()` samples
pub fn pitch_shift(samples: &[f32], n_semitones: f32) -> Result<Vec<f32>> {
    if n_semitones == 0.0 || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    let ratio = PitchShiftParams { n_semitones }.ratio();
    let rate = 1.0 / ratio;

    let stretched = time_stretch(samples, rate)?;
    if stretched.is_empty() {
        return Ok(vec![0.0; samples.len()]);
    }
    resample_by_ratio(&stretched, rate, samples.len())
}

#[derive(Debug)]
pub struct PitchShiftEffect {
    params: PitchShiftParams,
}

impl PitchShiftEffect {
    pub fn new(params: PitchShiftParams) -> Self {
        Self { params }
    }
}

impl AudioEffect for PitchShiftEffect {
    fn name(&self) -> &str { "Pitch Shift" }

    fn validate(&self, _sample_rate: u32) -> Result<()> {
        self.params.validate()
    }

    fn process(&mut self, buffer: AudioBuffer) -> Result<AudioBuffer> {
        if self.params.n_semitones == 0.0 {
            return Ok(buffer);
        }
        let shifted = pitch_shift(buffer.samples(), self.params.n_semitones)?;
        Ok(buffer.with_samples(shifted))
    }

    fn get_params(&self) -> Vec<EffectParam> {
        vec![EffectParam::new("semitones", self.params.n_semitones, -48.0, 48.0, "st")]
    }
}
