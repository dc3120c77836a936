//! Phaser: LFO-swept cascade of first-order all-pass filters

use std::f64::consts::{PI, TAU};

use vocoder_core::{AudioBuffer, PhaserParams, Result, VocoderError};

use super::{AudioEffect, EffectParam};

const NUM_STAGES: usize = 6;
const MIN_SWEEP_HZ: f64 = 20.0;
const MAX_SWEEP_HZ: f64 = 20000.0;

/// Maps between Hz and a 0..1 position on a log scale spanning the sweep range
#[derive(Debug, Clone, Copy)]
struct LogSweep {
    min_hz: f64,
    max_hz: f64,
}

impl LogSweep {
    fn for_rate(sample_rate: f64) -> Self {
        let max_hz = MAX_SWEEP_HZ.min(0.49 * sample_rate);
        Self { min_hz: MIN_SWEEP_HZ.min(max_hz * 0.5), max_hz }
    }

    fn to_norm(self, hz: f64) -> f64 {
        let hz = hz.clamp(self.min_hz, self.max_hz);
        (hz / self.min_hz).ln() / (self.max_hz / self.min_hz).ln()
    }

    fn to_hz(self, norm: f64) -> f64 {
        self.min_hz * (self.max_hz / self.min_hz).powf(norm.clamp(0.0, 1.0))
    }
}

#[derive(Debug)]
pub struct PhaserEffect {
    params: PhaserParams,
}

impl PhaserEffect {
    pub fn new(params: PhaserParams) -> Self {
        Self { params }
    }
}

impl AudioEffect for PhaserEffect {
    fn name(&self) -> &str { "Phaser" }

    /// The centre must sit inside the sweep range, which tops out just below Nyquist
    fn validate(&self, sample_rate: u32) -> Result<()> {
        self.params.validate()?;
        let sweep = LogSweep::for_rate(sample_rate as f64);
        let centre = self.params.centre_hz as f64;
        if !(sweep.min_hz..=sweep.max_hz).contains(&centre) {
            return Err(VocoderError::config(format!(
                "phaser centre_hz must be within {}..={} Hz at {sample_rate} Hz, got {centre}",
                sweep.min_hz, sweep.max_hz
            )));
        }
        Ok(())
    }

    fn process(&mut self, buffer: AudioBuffer) -> Result<AudioBuffer> {
        let p = self.params;
        let sample_rate = buffer.sample_rate() as f64;
        let sweep = LogSweep::for_rate(sample_rate);
        let centre = sweep.to_norm(p.centre_hz as f64);
        let excursion = p.depth as f64 * 0.5;
        let feedback = p.feedback as f64;
        let mix = p.mix as f64;
        let lfo_step = TAU * p.rate_hz as f64 / sample_rate;

        let mut state = [0.0f64; NUM_STAGES];
        let mut last_wet = 0.0f64;

        let output = buffer
            .samples()
            .iter()
            .enumerate()
            .map(|(i, &sample)| {
                let dry = sample as f64;
                let lfo = (lfo_step * i as f64).sin();
                let break_hz = sweep.to_hz(centre + excursion * lfo);
                let t = (PI * break_hz / sample_rate).tan();
                let a = (t - 1.0) / (t + 1.0);

                let mut x = dry + feedback * last_wet;
                for z in state.iter_mut() {
                    let y = a * x + *z;
                    *z = x - a * y;
                    x = y;
                }
                last_wet = x;
                ((1.0 - mix) * dry + mix * x) as f32
            })
            .collect();

        Ok(buffer.with_samples(output))
    }

    fn get_params(&self) -> Vec<EffectParam> {
        vec![
            EffectParam::new("rate", self.params.rate_hz, 0.0, 10.0, "Hz"),
            EffectParam::new("depth", self.params.depth, 0.0, 1.0, ""),
            EffectParam::new("mix", self.params.mix, 0.0, 1.0, ""),
            EffectParam::new("centre", self.params.centre_hz, 20.0, 20000.0, "Hz"),
            EffectParam::new("feedback", self.params.feedback, -0.95, 0.95, ""),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: u32, len: usize) -> AudioBuffer {
        let samples = (0..len)
            .map(|i| (TAU * freq * i as f64 / sample_rate as f64).sin() as f32)
            .collect();
        AudioBuffer::new(samples, sample_rate).unwrap()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_log_sweep_round_trip() {
        let sweep = LogSweep::for_rate(44100.0);
        assert!((sweep.to_hz(sweep.to_norm(1300.0)) - 1300.0).abs() < 1e-6);
        assert_eq!(sweep.to_hz(0.0), 20.0);
        assert!((sweep.to_hz(1.0) - 20000.0).abs() < 1e-6);
        // top of the range follows Nyquist at low sample rates
        assert!((LogSweep::for_rate(8000.0).to_hz(1.0) - 3920.0).abs() < 1e-6);
    }

    #[test]
    fn test_stationary_notch_at_centre() {
        // six stages shift the centre frequency by 3π, cancelling against the dry path
        let fx_params = PhaserParams {
            rate_hz: 0.0,
            depth: 0.0,
            mix: 0.5,
            centre_hz: 1000.0,
            feedback: 0.0,
        };
        let out = PhaserEffect::new(fx_params).process(sine(1000.0, 44100, 22050)).unwrap();
        assert!(rms(&out.samples()[4410..]) < 0.01);

        // far from the notch the tone passes
        let out = PhaserEffect::new(fx_params).process(sine(100.0, 44100, 22050)).unwrap();
        assert!(rms(&out.samples()[4410..]) > 0.3);
    }

    #[test]
    fn test_dry_mix_is_identity() {
        let input = sine(440.0, 44100, 4410);
        let out = PhaserEffect::new(PhaserParams { mix: 0.0, ..Default::default() })
            .process(input.clone())
            .unwrap();
        assert_eq!(out.len(), input.len());
        for (a, b) in out.samples().iter().zip(input.samples()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_sweep_keeps_level_bounded() {
        let input = sine(440.0, 44100, 44100);
        let out = PhaserEffect::new(PhaserParams::default()).process(input.clone()).unwrap();
        assert_eq!(out.len(), input.len());
        assert!(out.peak() <= 1.1);
        assert!(out.rms() > 0.05);
    }

    #[test]
    fn test_centre_outside_sweep_range_is_rejected() {
        let with_centre =
            |centre_hz| PhaserEffect::new(PhaserParams { centre_hz, ..Default::default() });
        assert!(with_centre(1300.0).validate(44100).is_ok());
        assert!(with_centre(20.0).validate(44100).is_ok());

        let out_of_range = [(100000.0, 44100), (21700.0, 44100), (10.0, 44100), (4000.0, 8000)];
        for (centre_hz, sample_rate) in out_of_range {
            let result = with_centre(centre_hz).validate(sample_rate);
            assert!(
                matches!(result, Err(VocoderError::Configuration(_))),
                "{centre_hz} Hz at {sample_rate}"
            );
        }
    }
}
