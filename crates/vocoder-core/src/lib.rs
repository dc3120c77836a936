//! vocoder-core: Domain types for the vocoder effects pipeline

mod buffer;
pub mod config;
mod effect;
mod error;

pub use buffer::AudioBuffer;
pub use config::{EffectConfig, EffectSection, OutputConfig, OutputSampleFormat, ReverbSection};
pub use effect::{
    BandpassParams, EffectDescriptor, EffectKind, EffectParams, FlangerParams, PhaserParams,
    PitchShiftParams, RingModulationParams, MAX_FILTER_ORDER,
};
pub use error::{Result, VocoderError};
