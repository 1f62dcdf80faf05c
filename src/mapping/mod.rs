//! Parameter sweeps
//!
//! A sweep moves one control from a start value to an end value over the
//! course of a render, following a linear or exponential curve.

mod exponential;
mod linear;
mod mapper;
mod sweep;

pub use exponential::ExponentialMapper;
pub use linear::LinearMapper;
pub use mapper::Mapper;
pub use sweep::Sweep;
