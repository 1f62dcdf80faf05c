//! WAV file recorder
//!
//! Writes mono 32-bit float WAV files and keeps track of the peak level.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// WAV file recorder
pub struct Recorder {
    writer: WavWriter<BufWriter<File>>,
    sample_rate: u32,
    samples_written: u64,
    peak: f32,
    clipped: u64,
}

impl Recorder {
    /// Create a new recorder writing to `path`
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("failed to create WAV file: {:?}", path))?;

        log::debug!("recording to {:?} at {} Hz", path, sample_rate);
        Ok(Self {
            writer,
            sample_rate,
            samples_written: 0,
            peak: 0.0,
            clipped: 0,
        })
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of samples written
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Get the duration recorded in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples_written as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value written so far
    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Number of samples written outside [-1, 1]
    pub fn clipped_samples(&self) -> u64 {
        self.clipped
    }

    /// Write a block of samples
    pub fn write_block(&mut self, block: &[f32]) -> Result<()> {
        for &sample in block {
            self.writer
                .write_sample(sample)
                .context("failed to write sample")?;

            let level = sample.abs();
            self.peak = self.peak.max(level);
            if level > 1.0 {
                self.clipped += 1;
            }
        }
        self.samples_written += block.len() as u64;
        Ok(())
    }

    /// Finalize the WAV file
    ///
    /// This must be called to properly close the file and write the header.
    pub fn finalize(self) -> Result<()> {
        if self.clipped > 0 {
            log::warn!(
                "{} samples exceed full scale (peak {:.3}); lower the voice or master volume",
                self.clipped,
                self.peak
            );
        }
        log::info!(
            "wrote {} samples ({:.2}s), peak {:.3}",
            self.samples_written,
            self.duration_secs(),
            self.peak
        );
        self.writer.finalize().context("failed to finalize WAV file")
    }
}
