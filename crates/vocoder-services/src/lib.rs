//! vocoder-services: Offline effects pipeline, audio file I/O and the effect chain
//!
//! A run loads one audio file as mono, threads it through the enabled
//! effect stages in order and writes the result as WAV:
//!
//! ```no_run
//! use std::path::Path;
//! use vocoder_core::EffectConfig;
//! use vocoder_services::Vocoder;
//!
//! let report = Vocoder::new(EffectConfig::default())?
//!     .process(Path::new("voice.mp3"), Path::new("voice-fx.wav"))?;
//! println!("{} samples at {} Hz", report.output_samples, report.sample_rate);
//! # Ok::<(), vocoder_core::VocoderError>(())
//! ```

pub mod audio_effects;
pub mod audio_io;
mod processor;

pub use audio_effects::{AudioEffect, ChainState, EffectChain, EffectParam};
pub use audio_effects::{
    BandpassEffect, ConvolutionReverbEffect, FlangerEffect, PhaserEffect, PitchShiftEffect,
    RingModulationEffect,
};
pub use audio_io::{load_mono, write_wav};
pub use processor::{process, ProcessReport, Vocoder};
