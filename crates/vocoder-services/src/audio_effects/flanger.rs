//! Flanger: LFO-swept short delay line with feedback

use std::f64::consts::TAU;

use tracing::debug;
use vocoder_core::{AudioBuffer, FlangerParams, Result};

use super::{AudioEffect, EffectParam};

#[derive(Debug)]
pub struct FlangerEffect {
    params: FlangerParams,
}

impl FlangerEffect {
    pub fn new(params: FlangerParams) -> Self {
        Self { params }
    }
}

impl AudioEffect for FlangerEffect {
    fn name(&self) -> &str { "Flanger" }

    fn validate(&self, _sample_rate: u32) -> Result<()> {
        self.params.validate()
    }

    fn process(&mut self, buffer: AudioBuffer) -> Result<AudioBuffer> {
        let p = self.params;
        let sample_rate = buffer.sample_rate() as f64;
        let depth = p.depth as f64;
        let feedback = p.feedback as f64;
        let mix = p.mix as f64;

        let centre = p.centre_delay_ms as f64 / 1000.0 * sample_rate;
        let max_delay = centre * (1.0 + depth);
        let buf_size = max_delay.ceil() as usize + 2;
        debug!(centre_samples = centre, max_delay, buf_size, "Flanger delay line");

        let mut line = vec![0.0f64; buf_size];
        let mut write_pos = 0usize;
        let mut last_delayed = 0.0f64;
        let lfo_step = TAU * p.rate_hz as f64 / sample_rate;

        let output = buffer
            .samples()
            .iter()
            .enumerate()
            .map(|(i, &sample)| {
                let dry = sample as f64;
                line[write_pos] = dry + feedback * last_delayed;

                let delay = centre * (1.0 + depth * (lfo_step * i as f64).sin());
                let mut read_pos = write_pos as f64 - delay;
                if read_pos < 0.0 {
                    read_pos += buf_size as f64;
                }
                let idx = read_pos.floor() as usize;
                let frac = read_pos - idx as f64;
                let delayed =
                    line[idx % buf_size] * (1.0 - frac) + line[(idx + 1) % buf_size] * frac;

                last_delayed = delayed;
                write_pos = (write_pos + 1) % buf_size;
                ((1.0 - mix) * dry + mix * delayed) as f32
            })
            .collect();

        Ok(buffer.with_samples(output))
    }

    fn get_params(&self) -> Vec<EffectParam> {
        vec![
            EffectParam::new("rate", self.params.rate_hz, 0.1, 5.0, "Hz"),
            EffectParam::new("depth", self.params.depth, 0.0, 1.0, ""),
            EffectParam::new("centre_delay", self.params.centre_delay_ms, 0.1, 20.0, "ms"),
            EffectParam::new("feedback", self.params.feedback, -0.95, 0.95, ""),
            EffectParam::new("mix", self.params.mix, 0.0, 1.0, ""),
        ]
    }
}
