//! One-shot pipeline run: load, apply the configured chain, write

use std::path::Path;
use std::time::Instant;

use tracing::info;
use vocoder_core::{AudioBuffer, EffectConfig, Result, VocoderError};

use crate::audio_effects::{ConvolutionReverbEffect, EffectChain};
use crate::audio_io::{load_mono, resample, write_wav};

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReport {
    pub sample_rate: u32,
    pub input_samples: usize,
    pub output_samples: usize,
    /// Names of the stages that ran, in order
    pub stages: Vec<String>,
    pub input_rms: f32,
    pub output_rms: f32,
}

impl ProcessReport {
    pub fn output_seconds(&self) -> f64 {
        self.output_samples as f64 / self.sample_rate as f64
    }
}

/// Effects pipeline bound to a validated configuration
#[derive(Debug, Clone)]
pub struct Vocoder {
    config: EffectConfig,
}

impl Vocoder {
    pub fn new(config: EffectConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EffectConfig {
        &self.config
    }

    /// Stages for a signal at `sample_rate`, reverb last when enabled
    pub fn build_chain(&self, sample_rate: u32) -> Result<EffectChain> {
        let mut chain = EffectChain::from_descriptors(&self.config.descriptors())?;

        let reverb = &self.config.reverb;
        if reverb.enabled {
            let path = reverb
                .impulse_response
                .as_deref()
                .ok_or_else(|| {
                    VocoderError::config("reverb: enabled without an impulse_response path")
                })?;
            let ir = load_mono(path)?;
            let samples = resample(ir.samples(), ir.sample_rate(), sample_rate)?;
            info!(
                path = %path.display(),
                ir_rate = ir.sample_rate(),
                sample_rate,
                ir_samples = samples.len(),
                "Loaded impulse response"
            );
            chain.add(Box::new(ConvolutionReverbEffect::new(samples, reverb.mix)));
        }
        Ok(chain)
    }

    fn run(&self, buffer: AudioBuffer) -> Result<(AudioBuffer, Vec<String>)> {
        let mut chain = self.build_chain(buffer.sample_rate())?;
        let stages = chain.effects().iter().map(|e| e.name().to_string()).collect();
        let output = chain.process(buffer)?;
        Ok((output, stages))
    }

    /// Apply the chain to an in-memory buffer
    pub fn process_buffer(&self, buffer: AudioBuffer) -> Result<AudioBuffer> {
        self.run(buffer).map(|(output, _)| output)
    }

    /// Process `input` into the WAV file `output`.
    /// Nothing is written unless every stage succeeds.
    pub fn process(&self, input: &Path, output: &Path) -> Result<ProcessReport> {
        let started = Instant::now();
        let buffer = load_mono(input)?;
        let sample_rate = buffer.sample_rate();
        let input_samples = buffer.len();
        let input_rms = buffer.rms();

        let (processed, stages) = self.run(buffer)?;
        write_wav(output, &processed, self.config.output.sample_format)?;

        let report = ProcessReport {
            sample_rate,
            input_samples,
            output_samples: processed.len(),
            stages,
            input_rms,
            output_rms: processed.rms(),
        };
        info!(
            input = %input.display(),
            output = %output.display(),
            stages = report.stages.len(),
            samples = report.output_samples,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Processing complete"
        );
        Ok(report)
    }
}

/// Run the default effect configuration over `input`, writing `output`
pub fn process(input: &Path, output: &Path) -> Result<ProcessReport> {
    Vocoder::new(EffectConfig::default())?.process(input, output)
}
