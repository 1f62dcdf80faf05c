//! Linear mapper implementation

use super::Mapper;

/// Straight-line interpolation between two values
pub struct LinearMapper {
    from: f64,
    to: f64,
}

impl LinearMapper {
    /// Create a new linear mapper
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }
}

impl Mapper for LinearMapper {
    fn map(&self, progress: f64) -> f64 {
        let t = progress.clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }
}
