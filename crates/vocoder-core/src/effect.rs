//! Effect descriptors and their parameter records

use serde::{Deserialize, Serialize};

use crate::error::{Result, VocoderError};

/// Highest Butterworth order accepted by the bandpass designer.
/// Transfer-function coefficients lose precision past this point.
pub const MAX_FILTER_ORDER: u32 = 8;

/// The effects the pipeline knows how to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    PitchShift,
    RingModulation,
    Bandpass,
    Flanger,
    Phaser,
}

impl EffectKind {
    /// Fixed application order of the default chain
    pub const ORDER: [EffectKind; 5] = [
        EffectKind::PitchShift,
        EffectKind::RingModulation,
        EffectKind::Bandpass,
        EffectKind::Flanger,
        EffectKind::Phaser,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PitchShift => "Pitch Shift",
            Self::RingModulation => "Ring Modulation",
            Self::Bandpass => "Bandpass",
            Self::Flanger => "Flanger",
            Self::Phaser => "Phaser",
        }
    }
}

fn ensure_finite(effect: &str, name: &str, value: f32) -> Result<()> {
    if value.is_finite() {
        return Ok(());
    }
    Err(VocoderError::config(format!("{effect}: {name} must be finite, got {value}")))
}

fn ensure_range(effect: &str, name: &str, value: f32, min: f32, max: f32) -> Result<()> {
    ensure_finite(effect, name, value)?;
    if value < min || value > max {
        return Err(VocoderError::config(format!(
            "{effect}: {name} must be within [{min}, {max}], got {value}"
        )));
    }
    Ok(())
}

fn ensure_positive(effect: &str, name: &str, value: f32) -> Result<()> {
    ensure_finite(effect, name, value)?;
    if value <= 0.0 {
        return Err(VocoderError::config(format!("{effect}: {name} must be positive, got {value}")));
    }
    Ok(())
}

fn ensure_feedback(effect: &str, value: f32) -> Result<()> {
    ensure_finite(effect, "feedback", value)?;
    if value.abs() >= 1.0 {
        return Err(VocoderError::config(format!(
            "{effect}: feedback magnitude must be below 1, got {value}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchShiftParams {
    /// Signed shift in semitones, fractions allowed
    pub n_semitones: f32,
}

impl Default for PitchShiftParams {
    fn default() -> Self {
        Self { n_semitones: -3.0 }
    }
}

impl PitchShiftParams {
    pub fn validate(&self) -> Result<()> {
        ensure_range("pitch shift", "n_semitones", self.n_semitones, -48.0, 48.0)
    }

    /// Frequency ratio applied to the signal
    pub fn ratio(&self) -> f64 {
        2f64.powf(self.n_semitones as f64 / 12.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingModulationParams {
    pub carrier_hz: f32,
}

impl Default for RingModulationParams {
    fn default() -> Self {
        Self { carrier_hz: 400.0 }
    }
}

impl RingModulationParams {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("ring modulation", "carrier_hz", self.carrier_hz)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandpassParams {
    pub low_cut_hz: f32,
    pub high_cut_hz: f32,
    pub order: u32,
}

impl Default for BandpassParams {
    fn default() -> Self {
        Self { low_cut_hz: 300.0, high_cut_hz: 5000.0, order: 4 }
    }
}

impl BandpassParams {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("bandpass", "low_cut_hz", self.low_cut_hz)?;
        ensure_positive("bandpass", "high_cut_hz", self.high_cut_hz)?;
        if self.low_cut_hz >= self.high_cut_hz {
            return Err(VocoderError::config(format!(
                "bandpass: low_cut_hz ({}) must be below high_cut_hz ({})",
                self.low_cut_hz, self.high_cut_hz
            )));
        }
        if self.order == 0 || self.order > MAX_FILTER_ORDER {
            return Err(VocoderError::config(format!(
                "bandpass: order must be within [1, {MAX_FILTER_ORDER}], got {}",
                self.order
            )));
        }
        Ok(())
    }

    /// Checks that also depend on the signal's sample rate
    pub fn validate_for_rate(&self, sample_rate: u32) -> Result<()> {
        self.validate()?;
        let nyquist = sample_rate as f32 / 2.0;
        if self.high_cut_hz >= nyquist {
            return Err(VocoderError::config(format!(
                "bandpass: high_cut_hz ({}) must be below Nyquist ({nyquist}) at {sample_rate} Hz",
                self.high_cut_hz
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlangerParams {
    pub rate_hz: f32,
    pub depth: f32,
    pub centre_delay_ms: f32,
    pub feedback: f32,
    pub mix: f32,
}

impl Default for FlangerParams {
    fn default() -> Self {
        Self {
            rate_hz: 1.0,
            depth: 0.8,
            centre_delay_ms: 3.0,
            feedback: 0.5,
            mix: 0.2,
        }
    }
}

impl FlangerParams {
    pub fn validate(&self) -> Result<()> {
        ensure_range("flanger", "rate_hz", self.rate_hz, 0.0, 100.0)?;
        ensure_range("flanger", "depth", self.depth, 0.0, 1.0)?;
        ensure_range("flanger", "centre_delay_ms", self.centre_delay_ms, 0.01, 100.0)?;
        ensure_feedback("flanger", self.feedback)?;
        ensure_range("flanger", "mix", self.mix, 0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaserParams {
    pub rate_hz: f32,
    pub depth: f32,
    pub mix: f32,
    pub centre_hz: f32,
    pub feedback: f32,
}

impl Default for PhaserParams {
    fn default() -> Self {
        Self {
            rate_hz: 1.5,
            depth: 0.7,
            mix: 0.5,
            centre_hz: 1300.0,
            feedback: 0.0,
        }
    }
}

impl PhaserParams {
    pub fn validate(&self) -> Result<()> {
        ensure_range("phaser", "rate_hz", self.rate_hz, 0.0, 100.0)?;
        ensure_range("phaser", "depth", self.depth, 0.0, 1.0)?;
        ensure_range("phaser", "mix", self.mix, 0.0, 1.0)?;
        ensure_positive("phaser", "centre_hz", self.centre_hz)?;
        ensure_feedback("phaser", self.feedback)
    }
}

/// Kind-specific parameters of an effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectParams {
    PitchShift(PitchShiftParams),
    RingModulation(RingModulationParams),
    Bandpass(BandpassParams),
    Flanger(FlangerParams),
    Phaser(PhaserParams),
}

impl EffectParams {
    pub fn kind(&self) -> EffectKind {
        match self {
            Self::PitchShift(_) => EffectKind::PitchShift,
            Self::RingModulation(_) => EffectKind::RingModulation,
            Self::Bandpass(_) => EffectKind::Bandpass,
            Self::Flanger(_) => EffectKind::Flanger,
            Self::Phaser(_) => EffectKind::Phaser,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::PitchShift(p) => p.validate(),
            Self::RingModulation(p) => p.validate(),
            Self::Bandpass(p) => p.validate(),
            Self::Flanger(p) => p.validate(),
            Self::Phaser(p) => p.validate(),
        }
    }
}

/// One configured stage: enabled flag plus its parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectDescriptor {
    pub enabled: bool,
    pub params: EffectParams,
}

impl EffectDescriptor {
    pub fn enabled(params: EffectParams) -> Self {
        Self { enabled: true, params }
    }

    pub fn disabled(params: EffectParams) -> Self {
        Self { enabled: false, params }
    }

    pub fn kind(&self) -> EffectKind {
        self.params.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(PitchShiftParams::default().validate().is_ok());
        assert!(RingModulationParams::default().validate().is_ok());
        assert!(BandpassParams::default().validate_for_rate(44100).is_ok());
        assert!(FlangerParams::default().validate().is_ok());
        assert!(PhaserParams::default().validate().is_ok());
    }

    #[test]
    fn test_bandpass_bounds() {
        let inverted = BandpassParams { low_cut_hz: 5000.0, high_cut_hz: 300.0, order: 4 };
        assert!(matches!(inverted.validate(), Err(VocoderError::Configuration(_))));

        let above_nyquist = BandpassParams { low_cut_hz: 300.0, high_cut_hz: 5000.0, order: 4 };
        assert!(above_nyquist.validate_for_rate(8000).is_err());
        assert!(above_nyquist.validate_for_rate(10000).is_err()); // exactly Nyquist
        assert!(above_nyquist.validate_for_rate(10002).is_ok());

        let too_steep = BandpassParams { order: MAX_FILTER_ORDER + 1, ..Default::default() };
        assert!(too_steep.validate().is_err());
    }

    #[test]
    fn test_feedback_must_stay_below_one() {
        let flanger = FlangerParams { feedback: 1.0, ..Default::default() };
        assert!(matches!(flanger.validate(), Err(VocoderError::Configuration(_))));
        let flanger = FlangerParams { feedback: -1.2, ..Default::default() };
        assert!(flanger.validate().is_err());
        let phaser = PhaserParams { feedback: 0.99, ..Default::default() };
        assert!(phaser.validate().is_ok());
    }

    #[test]
    fn test_pitch_ratio() {
        let octave_up = PitchShiftParams { n_semitones: 12.0 };
        assert!((octave_up.ratio() - 2.0).abs() < 1e-12);
        let unison = PitchShiftParams { n_semitones: 0.0 };
        assert_eq!(unison.ratio(), 1.0);
    }

    #[test]
    fn test_descriptor_kind() {
        let d = EffectDescriptor::disabled(EffectParams::Phaser(PhaserParams::default()));
        assert_eq!(d.kind(), EffectKind::Phaser);
        assert!(!d.enabled);
        assert_eq!(EffectKind::ORDER[0].name(), "Pitch Shift");
    }
}
