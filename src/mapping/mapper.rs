//! Mapper trait

/// Maps render progress (0.0 at the start, 1.0 at the end) to a value
pub trait Mapper: Send + Sync {
    /// Map a progress value to an output value
    fn map(&self, progress: f64) -> f64;

    /// Value at the start of the sweep
    fn start(&self) -> f64 {
        self.map(0.0)
    }

    /// Value at the end of the sweep
    fn end(&self) -> f64 {
        self.map(1.0)
    }
}
