//! Butterworth bandpass design and IIR application

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;
use tracing::debug;
use vocoder_core::{AudioBuffer, BandpassParams, Result, VocoderError};

use super::{AudioEffect, EffectParam};

/// Poles closer than this to the real axis are treated as real
const REAL_POLE_EPS: f64 = 1e-12;

/// Second-order section `(b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    /// `a[0]` is always 1
    pub a: [f64; 3],
}

impl Biquad {
    /// Both poles strictly inside the unit circle (stability triangle)
    pub fn is_stable(&self) -> bool {
        let (a1, a2) = (self.a[1], self.a[2]);
        a2.abs() < 1.0 && a1.abs() < 1.0 + a2
    }

    fn response(&self, z_inv: Complex64) -> Complex64 {
        let eval = |c: &[f64; 3]| c[0] + z_inv * (c[1] + z_inv * c[2]);
        eval(&self.b) / eval(&self.a)
    }
}

/// Transfer function `b(z) / a(z)`, with `feedback[0] == 1`.
///
/// `feedforward`/`feedback` are the expanded polynomials; filtering runs
/// on `sections`, whose product they are.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCoefficients {
    pub feedforward: Vec<f64>,
    pub feedback: Vec<f64>,
    pub sections: Vec<Biquad>,
}

fn poly_mul(lhs: &[f64], rhs: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; lhs.len() + rhs.len() - 1];
    for (i, &l) in lhs.iter().enumerate() {
        for (j, &r) in rhs.iter().enumerate() {
            out[i + j] += l * r;
        }
    }
    out
}

impl FilterCoefficients {
    pub fn from_sections(sections: Vec<Biquad>) -> Self {
        let (feedforward, feedback) = sections.iter().fold(
            (vec![1.0], vec![1.0]),
            |(b, a), s| (poly_mul(&b, &s.b), poly_mul(&a, &s.a)),
        );
        Self { feedforward, feedback, sections }
    }

    /// Magnitude response at `omega` radians per sample
    pub fn magnitude_at(&self, omega: f64) -> f64 {
        let z_inv = Complex64::from_polar(1.0, -omega);
        self.sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.response(z_inv))
            .norm()
    }

    /// Cascade of direct-form II transposed biquads, single forward pass.
    /// Returns the index of the first non-finite output on failure.
    pub fn filter(&self, input: &[f32]) -> std::result::Result<Vec<f32>, usize> {
        let mut state = vec![[0.0f64; 2]; self.sections.len()];
        let mut output = Vec::with_capacity(input.len());
        for (n, &sample) in input.iter().enumerate() {
            let mut x = sample as f64;
            for (s, z) in self.sections.iter().zip(state.iter_mut()) {
                let y = s.b[0] * x + z[0];
                z[0] = s.b[1] * x - s.a[1] * y + z[1];
                z[1] = s.b[2] * x - s.a[2] * y;
                x = y;
            }
            let out = x as f32;
            if !out.is_finite() {
                return Err(n);
            }
            output.push(out);
        }
        Ok(output)
    }
}

/// Group conjugate pairs (and leftover real poles) into denominator sections
fn pole_sections(poles: &[Complex64]) -> Vec<[f64; 3]> {
    let mut sections = Vec::with_capacity(poles.len() / 2);
    let mut real = Vec::new();
    for p in poles {
        if p.im > REAL_POLE_EPS {
            sections.push([1.0, -2.0 * p.re, p.norm_sqr()]);
        } else if p.im.abs() <= REAL_POLE_EPS {
            real.push(p.re);
        }
    }
    real.sort_by(f64::total_cmp);
    for pair in real.chunks(2) {
        let (p0, p1) = (pair[0], pair.get(1).copied().unwrap_or(0.0));
        sections.push([1.0, -(p0 + p1), p0 * p1]);
    }
    sections
}

/// Digital Butterworth bandpass of the given prototype order.
///
/// The result has `order` second-order sections and `2 * order + 1`
/// coefficients per expanded polynomial.
pub fn design_bandpass(
    low_cut_hz: f32,
    high_cut_hz: f32,
    sample_rate: u32,
    order: u32,
) -> Result<FilterCoefficients> {
    BandpassParams { low_cut_hz, high_cut_hz, order }.validate_for_rate(sample_rate)?;

    let nyquist = sample_rate as f64 / 2.0;
    let low = low_cut_hz as f64 / nyquist;
    let high = high_cut_hz as f64 / nyquist;

    // Pre-warp band edges for a bilinear transform at fs = 2
    let fs = 2.0;
    let fs2 = 2.0 * fs;
    let warp = |w: f64| fs2 * (PI * w / fs).tan();
    let (wl, wh) = (warp(low), warp(high));
    let bandwidth = wh - wl;
    let centre = (wl * wh).sqrt();

    // Analog lowpass prototype: poles evenly spaced on the left half of the unit circle
    let n = order as usize;
    let prototype: Vec<Complex64> = (0..n)
        .map(|k| {
            let m = 2.0 * k as f64 - (n as f64 - 1.0);
            -Complex64::from_polar(1.0, PI * m / (2.0 * n as f64))
        })
        .collect();

    // Lowpass -> bandpass: every pole splits in two, N zeros land at the origin
    let mut analog_poles = Vec::with_capacity(2 * n);
    for &p in &prototype {
        let scaled = p * (bandwidth / 2.0);
        let offset = (scaled * scaled - centre * centre).sqrt();
        analog_poles.push(scaled + offset);
        analog_poles.push(scaled - offset);
    }
    let analog_gain = bandwidth.powi(n as i32);

    // Bilinear transform: origin zeros map to z = 1, the excess degree to z = -1
    let digital_poles: Vec<Complex64> = analog_poles
        .iter()
        .map(|&p| (fs2 + p) / (fs2 - p))
        .collect();
    let denominator = analog_poles
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
    let gain = analog_gain * (Complex64::new(fs2.powi(n as i32), 0.0) / denominator).re;

    // One zero at z = 1 and one at z = -1 per section; gain spread evenly
    let denominators = pole_sections(&digital_poles);
    let section_gain = gain.abs().powf(1.0 / n as f64);
    let sections: Vec<Biquad> = denominators
        .into_iter()
        .enumerate()
        .map(|(i, a)| {
            let g = if i == 0 { section_gain.copysign(gain) } else { section_gain };
            Biquad { b: [g, 0.0, -g], a }
        })
        .collect();

    let unstable = sections.len() != n
        || sections
            .iter()
            .any(|s| !s.is_stable() || s.b.iter().chain(&s.a).any(|c| !c.is_finite()));
    if unstable {
        return Err(VocoderError::NumericInstability {
            stage: "Bandpass design".into(),
            index: 0,
        });
    }

    let coefficients = FilterCoefficients::from_sections(sections);
    debug!(
        order,
        low_cut_hz,
        high_cut_hz,
        sample_rate,
        gain,
        sections = ?coefficients.sections,
        "Designed bandpass"
    );
    Ok(coefficients)
}

/// Butterworth bandpass stage.
///
/// Applied as a single causal forward pass, so the output carries the
/// filter's phase distortion (no forward-backward zero-phase filtering).
#[derive(Debug)]
pub struct BandpassEffect {
    params: BandpassParams,
}

impl BandpassEffect {
    pub fn new(params: BandpassParams) -> Self {
        Self { params }
    }
}

impl AudioEffect for BandpassEffect {
    fn name(&self) -> &str { "Bandpass" }

    fn validate(&self, sample_rate: u32) -> Result<()> {
        self.params.validate_for_rate(sample_rate)
    }

    fn process(&mut self, buffer: AudioBuffer) -> Result<AudioBuffer> {
        let p = self.params;
        let coefficients =
            design_bandpass(p.low_cut_hz, p.high_cut_hz, buffer.sample_rate(), p.order)?;
        let filtered = coefficients.filter(buffer.samples()).map_err(|index| {
            VocoderError::NumericInstability { stage: self.name().to_string(), index }
        })?;
        Ok(buffer.with_samples(filtered))
    }

    fn get_params(&self) -> Vec<EffectParam> {
        vec![
            EffectParam::new("low_cut", self.params.low_cut_hz, 1.0, 20000.0, "Hz"),
            EffectParam::new("high_cut", self.params.high_cut_hz, 1.0, 20000.0, "Hz"),
            EffectParam::new("order", self.params.order as f32, 1.0, 8.0, ""),
        ]
    }
}
