//! Static effect configuration, loadable from TOML
//!
//! Each effect lives in its own table. A table that is present but omits
//! `enabled` turns the effect on; a missing table keeps the default.
//!
//! ```toml
//! [bandpass]
//! low_cut_hz = 300.0
//! high_cut_hz = 5000.0
//!
//! [phaser]
//! enabled = false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::effect::{
    BandpassParams, EffectDescriptor, EffectKind, EffectParams, FlangerParams, PhaserParams,
    PitchShiftParams, RingModulationParams,
};
use crate::error::{Result, VocoderError};

fn enabled_when_present() -> bool {
    true
}

fn full_wet() -> f32 {
    1.0
}

/// Enabled flag plus the parameters of one effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSection<P> {
    #[serde(default = "enabled_when_present")]
    pub enabled: bool,
    #[serde(flatten)]
    pub params: P,
}

impl<P> EffectSection<P> {
    pub fn on(params: P) -> Self {
        Self { enabled: true, params }
    }

    pub fn off(params: P) -> Self {
        Self { enabled: false, params }
    }
}

/// Opt-in convolution reverb applied after the fixed chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverbSection {
    #[serde(default = "enabled_when_present")]
    pub enabled: bool,
    /// Audio file holding the impulse response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impulse_response: Option<PathBuf>,
    /// 0 = dry only, 1 = convolution output only
    #[serde(default = "full_wet")]
    pub mix: f32,
}

impl Default for ReverbSection {
    fn default() -> Self {
        Self { enabled: false, impulse_response: None, mix: full_wet() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputSampleFormat {
    #[default]
    Float32,
    Pcm16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub sample_format: OutputSampleFormat,
}

/// Immutable description of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    pub pitch_shift: EffectSection<PitchShiftParams>,
    pub ring_modulation: EffectSection<RingModulationParams>,
    pub bandpass: EffectSection<BandpassParams>,
    pub flanger: EffectSection<FlangerParams>,
    pub phaser: EffectSection<PhaserParams>,
    pub reverb: ReverbSection,
    pub output: OutputConfig,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            pitch_shift: EffectSection::off(PitchShiftParams::default()),
            ring_modulation: EffectSection::off(RingModulationParams::default()),
            bandpass: EffectSection::off(BandpassParams::default()),
            flanger: EffectSection::on(FlangerParams::default()),
            phaser: EffectSection::on(PhaserParams::default()),
            reverb: ReverbSection::default(),
            output: OutputConfig::default(),
        }
    }
}

impl EffectConfig {
    /// Every effect present with default parameters, none enabled
    pub fn all_disabled() -> Self {
        let mut config = Self::default();
        for kind in EffectKind::ORDER {
            config.set_enabled(kind, false);
        }
        config
    }

    pub fn set_enabled(&mut self, kind: EffectKind, enabled: bool) {
        match kind {
            EffectKind::PitchShift => self.pitch_shift.enabled = enabled,
            EffectKind::RingModulation => self.ring_modulation.enabled = enabled,
            EffectKind::Bandpass => self.bandpass.enabled = enabled,
            EffectKind::Flanger => self.flanger.enabled = enabled,
            EffectKind::Phaser => self.phaser.enabled = enabled,
        }
    }

    /// Descriptors in the fixed chain order
    pub fn descriptors(&self) -> Vec<EffectDescriptor> {
        vec![
            EffectDescriptor {
                enabled: self.pitch_shift.enabled,
                params: EffectParams::PitchShift(self.pitch_shift.params),
            },
            EffectDescriptor {
                enabled: self.ring_modulation.enabled,
                params: EffectParams::RingModulation(self.ring_modulation.params),
            },
            EffectDescriptor {
                enabled: self.bandpass.enabled,
                params: EffectParams::Bandpass(self.bandpass.params),
            },
            EffectDescriptor {
                enabled: self.flanger.enabled,
                params: EffectParams::Flanger(self.flanger.params),
            },
            EffectDescriptor {
                enabled: self.phaser.enabled,
                params: EffectParams::Phaser(self.phaser.params),
            },
        ]
    }

    /// Sample-rate independent checks of every enabled section
    pub fn validate(&self) -> Result<()> {
        for descriptor in self.descriptors().iter().filter(|d| d.enabled) {
            descriptor.params.validate()?;
        }
        if self.reverb.enabled {
            if self.reverb.impulse_response.is_none() {
                return Err(VocoderError::config(
                    "reverb: enabled without an impulse_response path",
                ));
            }
            if !(0.0..=1.0).contains(&self.reverb.mix) {
                return Err(VocoderError::config(format!(
                    "reverb: mix must be within [0, 1], got {}",
                    self.reverb.mix
                )));
            }
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| VocoderError::config(format!("invalid config: {e}")))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| VocoderError::config(format!("failed to serialize config: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
