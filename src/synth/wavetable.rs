//! Single-cycle wavetables
//!
//! A `Wavetable` holds one period of a waveform. It is immutable once built;
//! oscillators share it through an `Arc`.

use super::OscillatorError;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;

/// Built-in table shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    #[default]
    Sine,
    Triangle,
    Saw,
    Square,
}

/// One period of a waveform, sampled at a fixed number of points
#[derive(Debug, Clone, PartialEq)]
pub struct Wavetable {
    samples: Box<[f64]>,
}

impl Wavetable {
    /// Create a wavetable from raw samples.
    ///
    /// Fails if `samples` is empty or holds a non-finite value.
    pub fn from_samples(samples: Vec<f64>) -> Result<Self, OscillatorError> {
        if samples.is_empty() {
            return Err(OscillatorError::InvalidConfiguration(
                "wavetable must contain at least one sample".to_string(),
            ));
        }
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(OscillatorError::InvalidConfiguration(format!(
                "wavetable sample {} is not finite",
                index
            )));
        }
        Ok(Self {
            samples: samples.into_boxed_slice(),
        })
    }

    /// Sample a function of phase (0.0..1.0) at `size` evenly spaced points
    pub fn from_function<F>(size: usize, f: F) -> Result<Self, OscillatorError>
    where
        F: Fn(f64) -> f64,
    {
        let samples = (0..size).map(|i| f(i as f64 / size as f64)).collect();
        Self::from_samples(samples)
    }

    /// Build one of the built-in shapes
    pub fn from_shape(shape: Shape, size: usize) -> Result<Self, OscillatorError> {
        match shape {
            Shape::Sine => Self::sine(size),
            Shape::Triangle => Self::triangle(size),
            Shape::Saw => Self::saw(size),
            Shape::Square => Self::square(size),
        }
    }

    pub fn sine(size: usize) -> Result<Self, OscillatorError> {
        Self::from_function(size, |phase| (phase * 2.0 * PI).sin())
    }

    /// Triangle starting at zero and rising, in phase with `sine`
    pub fn triangle(size: usize) -> Result<Self, OscillatorError> {
        Self::from_function(size, |p| {
            if p < 0.25 {
                4.0 * p
            } else if p < 0.75 {
                2.0 - 4.0 * p
            } else {
                4.0 * p - 4.0
            }
        })
    }

    pub fn saw(size: usize) -> Result<Self, OscillatorError> {
        Self::from_function(size, |phase| 2.0 * phase - 1.0)
    }

    pub fn square(size: usize) -> Result<Self, OscillatorError> {
        Self::from_function(size, |phase| if phase < 0.5 { 1.0 } else { -1.0 })
    }

    /// Load a wavetable from the first channel of a WAV file.
    ///
    /// Integer formats are normalised to [-1.0, 1.0]. The whole file becomes
    /// the table, so single-cycle files are expected.
    pub fn from_wav_file(path: &Path) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("failed to open WAV file: {:?}", path))?;
        let spec = reader.spec();

        let interleaved: Vec<f64> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| s.map(f64::from))
                .collect::<Result<Vec<f64>, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1u64 << (spec.bits_per_sample - 1)) as f64;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f64 / scale))
                    .collect::<Result<Vec<f64>, _>>()?
            }
        };

        let samples: Vec<f64> = interleaved
            .into_iter()
            .step_by(spec.channels.max(1) as usize)
            .collect();

        if samples.is_empty() {
            bail!("WAV file {:?} contains no samples", path);
        }

        log::debug!(
            "loaded {} wavetable samples from {:?} ({} ch, {} bit)",
            samples.len(),
            path,
            spec.channels,
            spec.bits_per_sample
        );

        Ok(Self::from_samples(samples)?)
    }

    /// Number of entries in the table
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Read the table at a fractional index with linear interpolation.
    ///
    /// The index wraps, so the entry after the last one is the first.
    #[inline]
    pub fn lookup(&self, position: f64) -> f64 {
        let len = self.samples.len();
        let position = position.rem_euclid(len as f64);
        let index0 = (position.floor() as usize) % len;
        let index1 = (index0 + 1) % len;
        let frac = position - position.floor();

        let sample0 = self.samples[index0];
        let sample1 = self.samples[index1];

        sample0 + frac * (sample1 - sample0)
    }

    /// Read the table at a normalised phase in [0, 1)
    #[inline]
    pub fn lookup_phase(&self, phase: f64) -> f64 {
        self.lookup(phase * self.samples.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_table_rejected() {
        let err = Wavetable::from_samples(vec![]).unwrap_err();
        assert!(matches!(err, OscillatorError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(Wavetable::from_samples(vec![0.0, f64::NAN]).is_err());
        assert!(Wavetable::from_samples(vec![f64::INFINITY]).is_err());
    }

    #[test]
    fn test_zero_size_shape_rejected() {
        assert!(Wavetable::sine(0).is_err());
    }

    #[test]
    fn test_lookup_exact_indices() {
        let table = Wavetable::from_samples(vec![0.0, 1.0, 0.0, -1.0]).unwrap();
        assert_eq!(table.lookup(0.0), 0.0);
        assert_eq!(table.lookup(1.0), 1.0);
        assert_eq!(table.lookup(2.0), 0.0);
        assert_eq!(table.lookup(3.0), -1.0);
    }

    #[test]
    fn test_lookup_interpolates() {
        let table = Wavetable::from_samples(vec![0.0, 1.0, 0.0, -1.0]).unwrap();
        assert_relative_eq!(table.lookup(0.5), 0.5);
        assert_relative_eq!(table.lookup(2.25), -0.25);
    }

    #[test]
    fn test_lookup_wraps_last_to_first() {
        let table = Wavetable::from_samples(vec![0.0, 1.0, 0.0, -1.0]).unwrap();
        assert_relative_eq!(table.lookup(3.5), -0.5);
        assert_relative_eq!(table.lookup(4.0), 0.0);
        assert_relative_eq!(table.lookup(5.0), 1.0);
    }

    #[test]
    fn test_single_sample_table() {
        let table = Wavetable::from_samples(vec![0.25]).unwrap();
        assert_eq!(table.lookup(0.0), 0.25);
        assert_eq!(table.lookup_phase(0.7), 0.25);
    }

    #[test]
    fn test_sine_shape() {
        let table = Wavetable::sine(4).unwrap();
        assert_relative_eq!(table.samples()[0], 0.0);
        assert_relative_eq!(table.samples()[1], 1.0);
        assert_relative_eq!(table.samples()[3], -1.0);
    }

    #[test]
    fn test_shapes_in_range() {
        for shape in [Shape::Sine, Shape::Triangle, Shape::Saw, Shape::Square] {
            let table = Wavetable::from_shape(shape, 256).unwrap();
            assert_eq!(table.len(), 256);
            assert!(table.samples().iter().all(|s| (-1.0..=1.0).contains(s)));
        }
    }

    #[test]
    fn test_from_wav_file_first_channel() {
        let file = NamedTempFile::new().unwrap();
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        {
            let mut writer = hound::WavWriter::create(file.path(), spec).unwrap();
            for (left, right) in [(0i16, 100i16), (16384, 100), (0, 100), (-16384, 100)] {
                writer.write_sample(left).unwrap();
                writer.write_sample(right).unwrap();
            }
            writer.finalize().unwrap();
        }

        let table = Wavetable::from_wav_file(file.path()).unwrap();
        assert_eq!(table.len(), 4);
        assert_relative_eq!(table.samples()[1], 0.5);
        assert_relative_eq!(table.samples()[3], -0.5);
    }

    #[test]
    fn test_from_wav_file_empty() {
        let file = NamedTempFile::new().unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        hound::WavWriter::create(file.path(), spec)
            .unwrap()
            .finalize()
            .unwrap();

        assert!(Wavetable::from_wav_file(file.path()).is_err());
    }
}
