//! Warpdrive - wavetable phase-distortion oscillator
//!
//! A single-cycle wavetable is read through a warped phase: a pivot point
//! set by the phase-distortion control squeezes one half of the cycle and
//! stretches the other. Controls can be changed from another thread without
//! locks while audio renders.

pub mod config;
pub mod mapping;
pub mod synth;
pub mod engine;

pub use config::WarpConfig;
pub use engine::Engine;
pub use synth::{ControlParameters, ParameterId, PhaseDistortionOscillator, Wavetable};
