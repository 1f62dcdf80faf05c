//! Control parameters and their metadata
//!
//! Every control exposed by the oscillator has a fixed address, range, default
//! and unit. Values outside the range are clamped, never rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifies one of the oscillator's controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterId {
    Frequency,
    Amplitude,
    PhaseDistortion,
    DetuningOffset,
    DetuningMultiplier,
}

/// Static description of a control
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterDef {
    pub id: ParameterId,
    pub name: &'static str,
    pub address: u64,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub unit: &'static str,
}

/// All controls, ordered by address
pub const PARAMETERS: [ParameterDef; 5] = [
    ParameterDef {
        id: ParameterId::Frequency,
        name: "frequency",
        address: 0,
        min: 0.0,
        max: 20_000.0,
        default: 440.0,
        unit: "Hz",
    },
    ParameterDef {
        id: ParameterId::Amplitude,
        name: "amplitude",
        address: 1,
        min: 0.0,
        max: 10.0,
        default: 1.0,
        unit: "",
    },
    ParameterDef {
        id: ParameterId::PhaseDistortion,
        name: "phase_distortion",
        address: 2,
        min: -1.0,
        max: 1.0,
        default: 0.0,
        unit: "",
    },
    ParameterDef {
        id: ParameterId::DetuningOffset,
        name: "detuning_offset",
        address: 3,
        min: -1000.0,
        max: 1000.0,
        default: 0.0,
        unit: "Hz",
    },
    ParameterDef {
        id: ParameterId::DetuningMultiplier,
        name: "detuning_multiplier",
        address: 4,
        min: 0.9,
        max: 1.11,
        default: 1.0,
        unit: "ratio",
    },
];

impl ParameterId {
    /// All identifiers in address order
    pub const ALL: [ParameterId; 5] = [
        ParameterId::Frequency,
        ParameterId::Amplitude,
        ParameterId::PhaseDistortion,
        ParameterId::DetuningOffset,
        ParameterId::DetuningMultiplier,
    ];

    /// Metadata for this control
    pub fn def(self) -> &'static ParameterDef {
        &PARAMETERS[self as usize]
    }

    /// Canonical snake_case name
    pub fn name(self) -> &'static str {
        self.def().name
    }

    /// Clamp a raw value into this control's range. NaN maps to the default.
    pub fn clamp(self, value: f64) -> f64 {
        let def = self.def();
        if value.is_nan() {
            return def.default;
        }
        let clamped = value.clamp(def.min, def.max);
        if clamped != value {
            log::trace!("{} {} clamped to {}", def.name, value, clamped);
        }
        clamped
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a parameter name is not recognised
#[derive(Debug, Error, PartialEq)]
#[error("unknown parameter '{0}'")]
pub struct UnknownParameter(pub String);

impl FromStr for ParameterId {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = match s.trim().to_ascii_lowercase().as_str() {
            "frequency" | "freq" => ParameterId::Frequency,
            "amplitude" | "amp" => ParameterId::Amplitude,
            "phase_distortion" | "phasedistortion" | "distortion" => ParameterId::PhaseDistortion,
            "detuning_offset" | "detuningoffset" => ParameterId::DetuningOffset,
            "detuning_multiplier" | "detuningmultiplier" => ParameterId::DetuningMultiplier,
            _ => return Err(UnknownParameter(s.to_string())),
        };
        Ok(id)
    }
}

/// A complete set of control values, handed between threads as one unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlParameters {
    pub frequency: f64,
    pub amplitude: f64,
    pub phase_distortion: f64,
    pub detuning_offset: f64,
    pub detuning_multiplier: f64,
}

impl ControlParameters {
    /// Build a parameter set, clamping every value into range
    pub fn new(
        frequency: f64,
        amplitude: f64,
        phase_distortion: f64,
        detuning_offset: f64,
        detuning_multiplier: f64,
    ) -> Self {
        Self {
            frequency: ParameterId::Frequency.clamp(frequency),
            amplitude: ParameterId::Amplitude.clamp(amplitude),
            phase_distortion: ParameterId::PhaseDistortion.clamp(phase_distortion),
            detuning_offset: ParameterId::DetuningOffset.clamp(detuning_offset),
            detuning_multiplier: ParameterId::DetuningMultiplier.clamp(detuning_multiplier),
        }
    }

    /// Re-clamp every field (for values that bypassed `new`, e.g. deserialized ones)
    pub fn clamped(self) -> Self {
        Self::new(
            self.frequency,
            self.amplitude,
            self.phase_distortion,
            self.detuning_offset,
            self.detuning_multiplier,
        )
    }

    /// Read a single value
    pub fn get(&self, id: ParameterId) -> f64 {
        match id {
            ParameterId::Frequency => self.frequency,
            ParameterId::Amplitude => self.amplitude,
            ParameterId::PhaseDistortion => self.phase_distortion,
            ParameterId::DetuningOffset => self.detuning_offset,
            ParameterId::DetuningMultiplier => self.detuning_multiplier,
        }
    }

    /// Set a single value (clamped)
    pub fn set(&mut self, id: ParameterId, value: f64) {
        let value = id.clamp(value);
        match id {
            ParameterId::Frequency => self.frequency = value,
            ParameterId::Amplitude => self.amplitude = value,
            ParameterId::PhaseDistortion => self.phase_distortion = value,
            ParameterId::DetuningOffset => self.detuning_offset = value,
            ParameterId::DetuningMultiplier => self.detuning_multiplier = value,
        }
    }

    /// Builder-style single value update
    pub fn with(mut self, id: ParameterId, value: f64) -> Self {
        self.set(id, value);
        self
    }

    /// Frequency after detuning, never negative
    pub fn effective_frequency(&self) -> f64 {
        (self.frequency * self.detuning_multiplier + self.detuning_offset).max(0.0)
    }

    /// Linear blend towards `target` (`t` in 0..=1)
    pub(crate) fn lerp(&self, target: &Self, t: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self {
            frequency: mix(self.frequency, target.frequency),
            amplitude: mix(self.amplitude, target.amplitude),
            phase_distortion: mix(self.phase_distortion, target.phase_distortion),
            detuning_offset: mix(self.detuning_offset, target.detuning_offset),
            detuning_multiplier: mix(self.detuning_multiplier, target.detuning_multiplier),
        }
    }
}

impl Default for ControlParameters {
    fn default() -> Self {
        Self {
            frequency: ParameterId::Frequency.def().default,
            amplitude: ParameterId::Amplitude.def().default,
            phase_distortion: ParameterId::PhaseDistortion.def().default,
            detuning_offset: ParameterId::DetuningOffset.def().default,
            detuning_multiplier: ParameterId::DetuningMultiplier.def().default,
        }
    }
}
