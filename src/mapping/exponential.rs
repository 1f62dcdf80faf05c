//! Exponential mapper implementation
//!
//! Moves slowly at first and quickly at the end, which sounds even for
//! frequency sweeps.

use super::Mapper;

/// Exponential curve between two values
///
/// For progress t in [0, 1]:
///   output = from + (to - from) * (exp(k*t) - 1) / (exp(k) - 1)
///
/// where k controls the curve steepness (default: ln(|to| / |from|), at least 1)
pub struct ExponentialMapper {
    from: f64,
    to: f64,
    curve_factor: f64,
}

impl ExponentialMapper {
    /// Create a new exponential mapper
    pub fn new(from: f64, to: f64) -> Self {
        let from_safe = from.abs().max(0.001);
        let to_safe = to.abs().max(0.001);
        let curve_factor = (to_safe / from_safe).ln().abs().max(1.0);

        Self {
            from,
            to,
            curve_factor,
        }
    }

    /// Create with a custom curve factor
    ///
    /// Typical values: 2.0 (mild) to 10.0 (steep)
    pub fn with_curve_factor(mut self, factor: f64) -> Self {
        self.curve_factor = factor.max(0.001);
        self
    }

    pub fn curve_factor(&self) -> f64 {
        self.curve_factor
    }
}

impl Mapper for ExponentialMapper {
    fn map(&self, progress: f64) -> f64 {
        let t = progress.clamp(0.0, 1.0);
        let k = self.curve_factor;
        let scaled = ((k * t).exp() - 1.0) / (k.exp() - 1.0);
        self.from + (self.to - self.from) * scaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exponential_endpoints() {
        let mapper = ExponentialMapper::new(100.0, 2000.0);
        assert_relative_eq!(mapper.start(), 100.0);
        assert_relative_eq!(mapper.end(), 2000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_exponential_curve_shape() {
        // slow start: the midpoint is below the linear midpoint
        let mapper = ExponentialMapper::new(0.0, 1000.0).with_curve_factor(3.0);
        let at_half = mapper.map(0.5);
        assert!(at_half < 500.0, "Expected < 500, got {}", at_half);
        assert_relative_eq!(at_half, 1000.0 * (1.5f64.exp() - 1.0) / (3.0f64.exp() - 1.0));
    }

    #[test]
    fn test_exponential_default_factor() {
        let mapper = ExponentialMapper::new(100.0, 100.0 * std::f64::consts::E.powi(3));
        assert_relative_eq!(mapper.curve_factor(), 3.0, epsilon = 1e-9);

        // symmetric ranges fall back to the minimum steepness
        let mapper = ExponentialMapper::new(-1.0, 1.0);
        assert_eq!(mapper.curve_factor(), 1.0);
    }

    #[test]
    fn test_exponential_downward() {
        let mapper = ExponentialMapper::new(1000.0, 100.0);
        assert_relative_eq!(mapper.start(), 1000.0);
        assert_relative_eq!(mapper.end(), 100.0, epsilon = 1e-9);
        assert!(mapper.map(0.5) > 550.0);
    }

    #[test]
    fn test_exponential_monotonic() {
        let mapper = ExponentialMapper::new(-1.0, 1.0);
        let mut last = mapper.start();
        for i in 1..=100 {
            let value = mapper.map(i as f64 / 100.0);
            assert!(value > last);
            last = value;
        }
    }
}
