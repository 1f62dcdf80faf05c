//! A sweep of one control across a render

use super::{ExponentialMapper, LinearMapper, Mapper};
use crate::config::{CurveKind, SweepConfig};
use crate::synth::ParameterId;

/// Moves one control along a curve as render progress goes from 0 to 1
pub struct Sweep {
    parameter: ParameterId,
    curve: Box<dyn Mapper>,
}

impl Sweep {
    pub fn new(parameter: ParameterId, curve: impl Mapper + 'static) -> Self {
        Self {
            parameter,
            curve: Box::new(curve),
        }
    }

    pub fn linear(parameter: ParameterId, from: f64, to: f64) -> Self {
        Self::new(parameter, LinearMapper::new(from, to))
    }

    pub fn exponential(parameter: ParameterId, from: f64, to: f64) -> Self {
        Self::new(parameter, ExponentialMapper::new(from, to))
    }

    /// Build a sweep from its configuration entry
    pub fn from_config(config: &SweepConfig) -> Self {
        match config.kind {
            CurveKind::Linear => Self::linear(config.parameter, config.from, config.to),
            CurveKind::Exponential => Self::exponential(config.parameter, config.from, config.to),
        }
    }

    pub fn parameter(&self) -> ParameterId {
        self.parameter
    }

    /// Value of the swept control at `progress`, clamped into its range
    pub fn value_at(&self, progress: f64) -> f64 {
        self.parameter.clamp(self.curve.map(progress))
    }
}
