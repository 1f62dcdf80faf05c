//! Configuration schema definitions

use crate::synth::{ControlParameters, ParameterId, Shape};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Main configuration for Warpdrive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarpConfig {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Source wavetable
    #[serde(default)]
    pub wavetable: WavetableConfig,

    /// Master settings (volume, glide)
    #[serde(default)]
    pub master: MasterConfig,

    /// Oscillator voices, mixed together
    pub voices: Vec<VoiceConfig>,

    /// Parameter sweeps applied across a render
    #[serde(default)]
    pub sweeps: Vec<SweepConfig>,
}

impl WarpConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate audio settings
        if self.audio.sample_rate < 8000 || self.audio.sample_rate > 192000 {
            bail!("Sample rate must be between 8000 and 192000");
        }
        if self.audio.buffer_size < 64 || self.audio.buffer_size > 8192 {
            bail!("Buffer size must be between 64 and 8192");
        }

        // Validate wavetable settings
        if self.wavetable.file.is_none()
            && (self.wavetable.size < 2 || self.wavetable.size > 1_048_576)
        {
            bail!("Wavetable size must be between 2 and 1048576");
        }

        // Validate master settings
        if !(0.0..=1.0).contains(&self.master.volume) {
            bail!("Master volume must be between 0.0 and 1.0");
        }
        if !(0.0..=10.0).contains(&self.master.ramp_duration) {
            bail!("Ramp duration must be between 0 and 10 seconds");
        }

        // Validate voices
        if self.voices.is_empty() {
            bail!("At least one voice is required");
        }
        let mut names = HashSet::new();
        for voice in &self.voices {
            if !names.insert(voice.name.as_str()) {
                bail!("Duplicate voice name '{}'", voice.name);
            }
            if !(0.0..=1.0).contains(&voice.volume) {
                bail!("Voice '{}' volume must be between 0.0 and 1.0", voice.name);
            }
            for id in ParameterId::ALL {
                let value = voice.parameters.get(id);
                if !value.is_finite() {
                    bail!("Voice '{}' {} must be a finite number", voice.name, id);
                }
                if id.clamp(value) != value {
                    log::warn!(
                        "voice '{}': {} {} is out of range and will be clamped to {}",
                        voice.name,
                        id,
                        value,
                        id.clamp(value)
                    );
                }
            }
        }

        // Validate sweeps
        for sweep in &self.sweeps {
            if !sweep.from.is_finite() || !sweep.to.is_finite() {
                bail!("Sweep of {} must have finite endpoints", sweep.parameter);
            }
        }

        Ok(())
    }
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Render block size in samples (default: 512)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Output device name (None = default device)
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            device: None,
        }
    }
}

fn default_sample_rate() -> u32 { 44100 }
fn default_buffer_size() -> usize { 512 }

/// Wavetable source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WavetableConfig {
    /// Built-in shape (default: sine)
    #[serde(default)]
    pub shape: Shape,

    /// Table length for built-in shapes (default: 4096)
    #[serde(default = "default_table_size")]
    pub size: usize,

    /// Single-cycle WAV file; overrides `shape` when set
    pub file: Option<PathBuf>,
}

impl Default for WavetableConfig {
    fn default() -> Self {
        Self {
            shape: Shape::default(),
            size: default_table_size(),
            file: None,
        }
    }
}

fn default_table_size() -> usize { 4096 }

/// Master settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Master volume 0.0-1.0 (default: 0.7)
    #[serde(default = "default_volume")]
    pub volume: f64,

    /// Glide time in seconds for parameter changes (default: 0.02)
    #[serde(default = "default_ramp_duration")]
    pub ramp_duration: f64,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            ramp_duration: default_ramp_duration(),
        }
    }
}

fn default_volume() -> f64 { 0.7 }
fn default_ramp_duration() -> f64 { 0.02 }

/// One oscillator voice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Unique name for this voice
    pub name: String,

    /// Control values; missing ones take their defaults
    #[serde(flatten)]
    pub parameters: ControlParameters,

    /// Voice volume 0.0-1.0 (default: 1.0)
    #[serde(default = "default_voice_volume")]
    pub volume: f64,
}

fn default_voice_volume() -> f64 { 1.0 }

/// A control swept across a render
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Control to sweep
    pub parameter: ParameterId,

    /// Value at the start of the render
    pub from: f64,

    /// Value at the end of the render
    pub to: f64,

    /// Curve shape
    #[serde(default)]
    pub kind: CurveKind,
}

/// Sweep curve shapes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    /// Straight line (default)
    #[default]
    Linear,
    /// Slow start, fast finish
    Exponential,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> WarpConfig {
        WarpConfig {
            audio: AudioConfig::default(),
            wavetable: WavetableConfig::default(),
            master: MasterConfig::default(),
            voices: vec![VoiceConfig {
                name: "lead".to_string(),
                parameters: ControlParameters::default(),
                volume: 1.0,
            }],
            sweeps: vec![],
        }
    }

    #[test]
    fn test_default_audio_config() {
        let yaml = "sample_rate: 48000";
        let config: AudioConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_size, 512); // default
    }

    #[test]
    fn test_voice_config_defaults() {
        let yaml = r#"
name: lead
frequency: 220
phase_distortion: -0.25
"#;
        let config: VoiceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "lead");
        assert_eq!(config.parameters.frequency, 220.0);
        assert_eq!(config.parameters.phase_distortion, -0.25);
        assert_eq!(config.parameters.amplitude, 1.0);
        assert_eq!(config.parameters.detuning_multiplier, 1.0);
        assert_eq!(config.volume, 1.0);
    }

    #[test]
    fn test_sweep_config() {
        let yaml = r#"
parameter: phase_distortion
from: -1
to: 1
kind: exponential
"#;
        let config: SweepConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.parameter, ParameterId::PhaseDistortion);
        assert_eq!(config.kind, CurveKind::Exponential);
    }

    #[test]
    fn test_unknown_sweep_parameter() {
        let yaml = "parameter: cutoff\nfrom: 0\nto: 1";
        assert!(serde_yaml::from_str::<SweepConfig>(yaml).is_err());
    }

    #[test]
    fn test_wavetable_config() {
        let yaml = "shape: saw\nsize: 1024";
        let config: WavetableConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.shape, Shape::Saw);
        assert_eq!(config.size, 1024);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_no_voices() {
        let mut config = test_config();
        config.voices.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_voice_names() {
        let mut config = test_config();
        config.voices.push(config.voices[0].clone());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_master_volume() {
        let mut config = test_config();
        config.master.volume = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_table_size() {
        let mut config = test_config();
        config.wavetable.size = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_parameter_is_not_an_error() {
        let mut config = test_config();
        config.voices[0].parameters.frequency = 50_000.0;
        assert!(config.validate().is_ok());
    }
}
