//! Audio effects chain and built-in effects

mod convolution;
mod filter;
mod flanger;
mod phaser;
mod pitch_shift;
mod ring_mod;

pub use convolution::{convolve, convolve_direct, ConvolutionReverbEffect};
pub use filter::{design_bandpass, BandpassEffect, Biquad, FilterCoefficients};
pub use flanger::FlangerEffect;
pub use phaser::PhaserEffect;
pub use pitch_shift::{pitch_shift, time_stretch, PitchShiftEffect};
pub use ring_mod::RingModulationEffect;

use std::fmt::Debug;

use tracing::{debug, info};
use vocoder_core::{AudioBuffer, EffectDescriptor, EffectParams, Result, VocoderError};

/// Offline effect stage: consumes the whole buffer and returns the processed one
pub trait AudioEffect: Send + Debug {
    fn name(&self) -> &str;
    /// Checks that depend on the signal, run before any stage of the chain starts
    fn validate(&self, _sample_rate: u32) -> Result<()> { Ok(()) }
    fn process(&mut self, buffer: AudioBuffer) -> Result<AudioBuffer>;
    fn get_params(&self) -> Vec<EffectParam>;
}

#[derive(Debug, Clone)]
pub struct EffectParam {
    pub name: String,
    pub value: f32,
    pub min: f32,
    pub max: f32,
    pub unit: String,
}

impl EffectParam {
    pub fn new(name: &str, value: f32, min: f32, max: f32, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            value,
            min,
            max,
            unit: unit.to_string(),
        }
    }
}

/// Instantiate the stage described by `params`
pub fn build_effect(params: &EffectParams) -> Box<dyn AudioEffect> {
    match *params {
        EffectParams::PitchShift(p) => Box::new(PitchShiftEffect::new(p)),
        EffectParams::RingModulation(p) => Box::new(RingModulationEffect::new(p)),
        EffectParams::Bandpass(p) => Box::new(BandpassEffect::new(p)),
        EffectParams::Flanger(p) => Box::new(FlangerEffect::new(p)),
        EffectParams::Phaser(p) => Box::new(PhaserEffect::new(p)),
    }
}

/// Where a chain is in its single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainState {
    #[default]
    Idle,
    Running { stage: usize },
    Complete,
    Failed { stage: usize },
}

/// Chain of audio effects processed in order
#[derive(Debug, Default)]
pub struct EffectChain {
    effects: Vec<Box<dyn AudioEffect>>,
    state: ChainState,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build stages for the enabled descriptors, in the order given.
    /// Disabled descriptors get no stage at all.
    pub fn from_descriptors(descriptors: &[EffectDescriptor]) -> Result<Self> {
        let mut chain = Self::new();
        for descriptor in descriptors {
            if !descriptor.enabled {
                info!(effect = descriptor.kind().name(), "Skipping disabled effect");
                continue;
            }
            descriptor.params.validate()?;
            chain.add(build_effect(&descriptor.params));
        }
        Ok(chain)
    }

    pub fn add(&mut self, effect: Box<dyn AudioEffect>) {
        self.effects.push(effect);
    }

    /// Run every stage over `buffer`, threading the output of each into the next.
    /// Any failure aborts the remaining stages.
    pub fn process(&mut self, buffer: AudioBuffer) -> Result<AudioBuffer> {
        let sample_rate = buffer.sample_rate();
        for effect in &self.effects {
            effect.validate(sample_rate)?;
        }

        let mut current = buffer;
        for (index, effect) in self.effects.iter_mut().enumerate() {
            self.state = ChainState::Running { stage: index };
            info!(
                effect = effect.name(),
                samples = current.len(),
                sample_rate,
                "Applying effect"
            );
            for param in effect.get_params() {
                debug!(
                    effect = effect.name(),
                    param = %param.name,
                    value = param.value,
                    unit = %param.unit,
                    "Effect parameter"
                );
            }

            let result = effect.process(current).and_then(|out| match out.first_non_finite() {
                Some(index) => Err(VocoderError::NumericInstability {
                    stage: effect.name().to_string(),
                    index,
                }),
                None => Ok(out),
            });
            match result {
                Ok(out) => current = out,
                Err(e) => {
                    self.state = ChainState::Failed { stage: index };
                    return Err(e);
                }
            }
        }

        self.state = ChainState::Complete;
        Ok(current)
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    pub fn effects(&self) -> &[Box<dyn AudioEffect>] {
        &self.effects
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
