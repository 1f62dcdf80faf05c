//! Phase-distortion wavetable oscillator
//!
//! The table is read at two different rates, split at a pivot point `d`. The
//! first half of the table is played over the part of the cycle before the
//! pivot and the second half over the rest, which bends the waveform while
//! keeping its period.
//!
//! ```text
//! p < d   ->  p' = (p / d) * 0.5
//! p >= d  ->  p' = 0.5 + ((p - d) / (1 - d)) * 0.5
//! ```
//!
//! With no distortion `d = 0.5` and `p' = p`.

use super::params::{ControlParameters, ParameterId};
use super::wavetable::Wavetable;
use std::sync::Arc;
use thiserror::Error;

/// Closest the pivot may get to either end of the cycle
pub const PIVOT_EPSILON: f64 = 1e-3;

/// Errors raised while configuring an oscillator
#[derive(Debug, Error, PartialEq)]
pub enum OscillatorError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Map a distortion amount in [-1, 1] to a pivot in [ε, 1-ε].
///
/// Linear and strictly increasing; 0 maps to 0.5.
#[inline]
pub fn pivot(phase_distortion: f64) -> f64 {
    let amount = phase_distortion.clamp(-1.0, 1.0);
    0.5 + 0.5 * amount * (1.0 - 2.0 * PIVOT_EPSILON)
}

/// Warp a raw phase in [0, 1) around `pivot`
#[inline]
pub fn warp_phase(phase: f64, pivot: f64) -> f64 {
    if phase < pivot {
        (phase / pivot) * 0.5
    } else {
        0.5 + ((phase - pivot) / (1.0 - pivot)) * 0.5
    }
}

/// A wavetable oscillator with a movable pivot point
pub struct PhaseDistortionOscillator {
    table: Arc<Wavetable>,
    sample_rate: f64,
    /// Current phase of the oscillator (0.0 to 1.0)
    phase: f64,
    /// Values as last set (the glide destination)
    target: ControlParameters,
    /// Values in use this sample
    current: ControlParameters,
    ramp_start: ControlParameters,
    /// Glide length in samples (0 = apply immediately)
    ramp_samples: u32,
    /// Glide length in seconds, when set that way
    ramp_seconds: Option<f64>,
    /// Length of the glide in progress
    ramp_len: u32,
    ramp_remaining: u32,
}

impl PhaseDistortionOscillator {
    /// Create an oscillator bound to `table` at `sample_rate`
    pub fn new(table: impl Into<Arc<Wavetable>>, sample_rate: f64) -> Result<Self, OscillatorError> {
        let table = table.into();
        check_configuration(&table, sample_rate)?;

        Ok(Self {
            table,
            sample_rate,
            phase: 0.0,
            target: ControlParameters::default(),
            current: ControlParameters::default(),
            ramp_start: ControlParameters::default(),
            ramp_samples: 0,
            ramp_seconds: None,
            ramp_len: 0,
            ramp_remaining: 0,
        })
    }

    /// Bind a new wavetable and sample rate.
    ///
    /// Resets the phase and finishes any glide in progress. A glide set in
    /// seconds keeps its duration at the new rate. On error the oscillator
    /// keeps its previous configuration.
    pub fn configure(
        &mut self,
        table: impl Into<Arc<Wavetable>>,
        sample_rate: f64,
    ) -> Result<(), OscillatorError> {
        let table = table.into();
        check_configuration(&table, sample_rate)?;

        log::debug!(
            "oscillator configured: {} table entries at {} Hz",
            table.len(),
            sample_rate
        );

        self.table = table;
        self.sample_rate = sample_rate;
        self.phase = 0.0;
        self.current = self.target;
        self.ramp_remaining = 0;
        if let Some(seconds) = self.ramp_seconds {
            self.ramp_samples = seconds_to_samples(seconds, sample_rate);
        }
        Ok(())
    }

    /// Set all five controls. Each value is clamped into its range.
    pub fn set_parameters(
        &mut self,
        frequency: f64,
        amplitude: f64,
        phase_distortion: f64,
        detuning_offset: f64,
        detuning_multiplier: f64,
    ) {
        self.apply(ControlParameters::new(
            frequency,
            amplitude,
            phase_distortion,
            detuning_offset,
            detuning_multiplier,
        ));
    }

    /// Set a single control, leaving the others as they are
    pub fn set_parameter(&mut self, id: ParameterId, value: f64) {
        self.apply(self.target.with(id, value));
    }

    /// Apply a full parameter set, gliding to it if a ramp is configured
    pub fn apply(&mut self, params: ControlParameters) {
        let params = params.clamped();
        if params == self.target {
            return;
        }
        self.target = params;

        if self.ramp_samples == 0 {
            self.current = params;
            self.ramp_remaining = 0;
        } else {
            self.ramp_start = self.current;
            self.ramp_len = self.ramp_samples;
            self.ramp_remaining = self.ramp_samples;
        }
    }

    /// Apply a full parameter set with no glide
    pub fn apply_immediately(&mut self, params: ControlParameters) {
        self.target = params.clamped();
        self.current = self.target;
        self.ramp_remaining = 0;
    }

    /// Glide length in samples for subsequent parameter changes.
    ///
    /// A glide already in progress keeps its own length; a length of 0
    /// finishes it.
    pub fn set_ramp_samples(&mut self, samples: u32) {
        self.ramp_seconds = None;
        self.store_ramp_samples(samples);
    }

    /// Glide length in seconds for subsequent parameter changes
    pub fn set_ramp_duration(&mut self, seconds: f64) {
        let seconds = seconds.max(0.0);
        self.store_ramp_samples(seconds_to_samples(seconds, self.sample_rate));
        self.ramp_seconds = Some(seconds);
    }

    pub fn ramp_samples(&self) -> u32 {
        self.ramp_samples
    }

    /// The last values set (after clamping)
    pub fn parameters(&self) -> ControlParameters {
        self.target
    }

    /// The values currently in effect, part way through a glide
    pub fn current_parameters(&self) -> ControlParameters {
        self.current
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn wavetable(&self) -> &Wavetable {
        &self.table
    }

    /// Pivot point in effect for the next sample
    pub fn pivot(&self) -> f64 {
        pivot(self.current.phase_distortion)
    }

    /// Reset the phase to the start of the cycle
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Generate the next sample
    #[inline]
    pub fn generate(&mut self) -> f64 {
        self.step_ramp();
        let params = self.current;

        let warped = warp_phase(self.phase, pivot(params.phase_distortion));
        let sample = self.table.lookup_phase(warped) * params.amplitude;

        let increment = params.effective_frequency() / self.sample_rate;
        self.phase = (self.phase + increment).fract();

        sample
    }

    /// Fill `buffer` with consecutive samples. Does not allocate.
    pub fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.generate() as f32;
        }
    }

    /// Render exactly `sample_count` samples
    pub fn render_block(&mut self, sample_count: usize) -> Vec<f32> {
        if sample_count == 0 {
            return Vec::new();
        }
        let mut block = vec![0.0; sample_count];
        self.process(&mut block);
        block
    }

    fn store_ramp_samples(&mut self, samples: u32) {
        self.ramp_samples = samples;
        if samples == 0 {
            self.current = self.target;
            self.ramp_remaining = 0;
        }
    }

    #[inline]
    fn step_ramp(&mut self) {
        if self.ramp_remaining == 0 {
            return;
        }
        self.ramp_remaining -= 1;
        if self.ramp_remaining == 0 {
            self.current = self.target;
        } else {
            let t = 1.0 - self.ramp_remaining as f64 / self.ramp_len as f64;
            self.current = self.ramp_start.lerp(&self.target, t);
        }
    }
}

fn seconds_to_samples(seconds: f64, sample_rate: f64) -> u32 {
    (seconds * sample_rate).round().min(u32::MAX as f64) as u32
}

fn check_configuration(table: &Wavetable, sample_rate: f64) -> Result<(), OscillatorError> {
    if table.is_empty() {
        return Err(OscillatorError::InvalidConfiguration(
            "wavetable is empty".to_string(),
        ));
    }
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(OscillatorError::InvalidConfiguration(format!(
            "sample rate must be positive, got {}",
            sample_rate
        )));
    }
    Ok(())
}
