//! Synthesis core
//!
//! The phase-distortion oscillator, its wavetables and control parameters,
//! and the lock-free hand-off that feeds it from a control thread.

mod handoff;
mod oscillator;
mod params;
mod wavetable;

pub use handoff::{
    parameter_channel, ParameterReceiver, ParameterSender, RealtimeOscillator,
    DEFAULT_QUEUE_CAPACITY,
};
pub use oscillator::{pivot, warp_phase, OscillatorError, PhaseDistortionOscillator, PIVOT_EPSILON};
pub use params::{ControlParameters, ParameterDef, ParameterId, UnknownParameter, PARAMETERS};
pub use wavetable::{Shape, Wavetable};
