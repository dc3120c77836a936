//! Ring modulation by a pure-tone carrier

use std::f64::consts::TAU;

use vocoder_core::{AudioBuffer, Result, RingModulationParams};

use super::{AudioEffect, EffectParam};

/// Multiplies the signal by `sin(2π f t)`, zero initial phase, `t = i / sample_rate`.
/// Produces sum and difference components; there is no dry path.
#[derive(Debug)]
pub struct RingModulationEffect {
    params: RingModulationParams,
}

impl RingModulationEffect {
    pub fn new(params: RingModulationParams) -> Self {
        Self { params }
    }
}

impl AudioEffect for RingModulationEffect {
    fn name(&self) -> &str { "Ring Modulation" }

    fn validate(&self, _sample_rate: u32) -> Result<()> {
        self.params.validate()
    }

    fn process(&mut self, mut buffer: AudioBuffer) -> Result<AudioBuffer> {
        let step = TAU * self.params.carrier_hz as f64 / buffer.sample_rate() as f64;
        for (i, sample) in buffer.samples_mut().iter_mut().enumerate() {
            *sample *= (step * i as f64).sin() as f32;
        }
        Ok(buffer)
    }

    fn get_params(&self) -> Vec<EffectParam> {
        vec![EffectParam::new("carrier", self.params.carrier_hz, 1.0, 20000.0, "Hz")]
    }
}
