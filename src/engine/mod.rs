//! Audio engine for Warpdrive
//!
//! Mixes one or more phase-distortion voices that share a wavetable, applies
//! sweeps at block granularity, and can be split into a control half and a
//! real-time render half.

mod player;
mod recorder;

pub use player::{default_device_name, list_output_devices, Player};
pub use recorder::Recorder;

use crate::config::WarpConfig;
use crate::mapping::Sweep;
use crate::synth::{
    parameter_channel, ControlParameters, ParameterId, ParameterReceiver, ParameterSender,
    PhaseDistortionOscillator, Wavetable,
};
use anyhow::{bail, Context, Result};
use std::sync::Arc;

/// One oscillator and its mix level
struct Voice {
    name: String,
    oscillator: PhaseDistortionOscillator,
    volume: f64,
}

/// The main audio engine
pub struct Engine {
    table: Arc<Wavetable>,
    voices: Vec<Voice>,
    sample_rate: f64,
    master_volume: f64,
    ramp_duration: f64,
}

impl Engine {
    /// Create a new engine with the given configuration
    pub fn new(config: &WarpConfig) -> Result<Self> {
        Self::with_sample_rate(config, config.audio.sample_rate as f64)
    }

    /// Create an engine from `config` but running at `sample_rate`
    /// (e.g. the rate an output device actually opened at)
    pub fn with_sample_rate(config: &WarpConfig, sample_rate: f64) -> Result<Self> {
        let table = build_wavetable(config)?;
        let mut engine = Self::from_wavetable(table, sample_rate)?;
        engine.master_volume = config.master.volume.clamp(0.0, 1.0);
        engine.ramp_duration = config.master.ramp_duration.max(0.0);

        for voice in &config.voices {
            engine.add_voice(&voice.name, voice.parameters, voice.volume)?;
        }

        log::info!(
            "engine ready: {} voices, {} table entries, {} Hz",
            engine.voices.len(),
            engine.table.len(),
            sample_rate
        );
        Ok(engine)
    }

    /// Create an empty engine around an existing wavetable
    pub fn from_wavetable(table: impl Into<Arc<Wavetable>>, sample_rate: f64) -> Result<Self> {
        let table = table.into();
        // surface a bad sample rate here rather than on the first add_voice
        PhaseDistortionOscillator::new(table.clone(), sample_rate)?;

        Ok(Self {
            table,
            voices: Vec::new(),
            sample_rate,
            master_volume: 1.0,
            ramp_duration: 0.0,
        })
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    pub fn set_master_volume(&mut self, volume: f64) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    /// Glide time for parameter changes on every voice
    pub fn set_ramp_duration(&mut self, seconds: f64) {
        self.ramp_duration = seconds.max(0.0);
        for voice in &mut self.voices {
            voice.oscillator.set_ramp_duration(self.ramp_duration);
        }
    }

    /// Add a voice; returns its index
    pub fn add_voice(
        &mut self,
        name: &str,
        parameters: ControlParameters,
        volume: f64,
    ) -> Result<usize> {
        if self.voice_index(name).is_some() {
            bail!("voice '{}' already exists", name);
        }

        let mut oscillator = PhaseDistortionOscillator::new(self.table.clone(), self.sample_rate)?;
        oscillator.apply(parameters);
        oscillator.set_ramp_duration(self.ramp_duration);

        log::debug!("added voice '{}': {:?}", name, oscillator.parameters());
        self.voices.push(Voice {
            name: name.to_string(),
            oscillator,
            volume: volume.clamp(0.0, 1.0),
        });
        Ok(self.voices.len() - 1)
    }

    /// Get the number of voices
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn voice_index(&self, name: &str) -> Option<usize> {
        self.voices.iter().position(|v| v.name == name)
    }

    pub fn voice_names(&self) -> Vec<String> {
        self.voices.iter().map(|v| v.name.clone()).collect()
    }

    /// Last parameters set on a voice
    pub fn voice_parameters(&self, voice_index: usize) -> Option<ControlParameters> {
        self.voices.get(voice_index).map(|v| v.oscillator.parameters())
    }

    /// Replace all parameters of a voice
    pub fn set_voice_parameters(&mut self, voice_index: usize, parameters: ControlParameters) {
        if let Some(voice) = self.voices.get_mut(voice_index) {
            voice.oscillator.apply(parameters);
        }
    }

    /// Set a parameter on a voice
    pub fn set_voice_parameter(&mut self, voice_index: usize, id: ParameterId, value: f64) {
        if let Some(voice) = self.voices.get_mut(voice_index) {
            voice.oscillator.set_parameter(id, value);
        }
    }

    /// Set a parameter on every voice
    pub fn set_parameter(&mut self, id: ParameterId, value: f64) {
        for voice in &mut self.voices {
            voice.oscillator.set_parameter(id, value);
        }
    }

    /// Generate the next sample (mix of all voices)
    #[inline]
    pub fn process(&mut self) -> f64 {
        let mut output = 0.0;

        for voice in &mut self.voices {
            output += voice.oscillator.generate() * voice.volume;
        }

        // Apply master volume
        output * self.master_volume
    }

    /// Fill a buffer with samples. Does not allocate.
    pub fn fill_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process() as f32;
        }
    }

    /// Render exactly `sample_count` samples
    pub fn render(&mut self, sample_count: usize) -> Vec<f32> {
        let mut buffer = vec![0.0f32; sample_count];
        self.fill_buffer(&mut buffer);
        buffer
    }

    /// Render `total_samples` in blocks of `block_size`, moving every swept
    /// control along its curve and handing each block to `sink`.
    ///
    /// Sweeps start at their `from` value and reach `to` with the last block.
    /// Between blocks the voices glide using the configured ramp.
    pub fn render_with_sweeps<F>(
        &mut self,
        total_samples: usize,
        block_size: usize,
        sweeps: &[Sweep],
        mut sink: F,
    ) -> Result<()>
    where
        F: FnMut(&[f32]) -> Result<()>,
    {
        let block_size = block_size.max(1);
        let mut block = vec![0.0f32; block_size.min(total_samples)];

        if total_samples > 0 {
            self.jump_sweeps(sweeps);
        }

        let mut rendered = 0;
        while rendered < total_samples {
            let len = block_size.min(total_samples - rendered);
            let block = &mut block[..len];
            self.fill_swept_block(block, rendered, total_samples, sweeps);
            sink(&block[..]).context("failed to consume rendered block")?;
            rendered += len;
        }

        Ok(())
    }

    /// Collect a swept render into memory
    pub fn render_sweep(&mut self, total_samples: usize, block_size: usize, sweeps: &[Sweep]) -> Vec<f32> {
        let mut output = vec![0.0f32; total_samples];
        if total_samples > 0 {
            self.jump_sweeps(sweeps);
        }

        let mut rendered = 0;
        for block in output.chunks_mut(block_size.max(1)) {
            let len = block.len();
            self.fill_swept_block(block, rendered, total_samples, sweeps);
            rendered += len;
        }
        output
    }

    /// Split into a control handle and a render-thread half
    pub fn split(self, queue_capacity: usize) -> (EngineControl, EngineRenderer) {
        let mut senders = Vec::with_capacity(self.voices.len());
        let mut receivers = Vec::with_capacity(self.voices.len());
        let names = self.voice_names();

        for voice in &self.voices {
            let (tx, rx) = parameter_channel(queue_capacity, voice.oscillator.parameters());
            senders.push(tx);
            receivers.push(rx);
        }

        (
            EngineControl { names, senders },
            EngineRenderer {
                engine: self,
                receivers,
            },
        )
    }

    /// Move the sweeps to where `block` ends, then render it
    fn fill_swept_block(
        &mut self,
        block: &mut [f32],
        rendered: usize,
        total_samples: usize,
        sweeps: &[Sweep],
    ) {
        let progress = (rendered + block.len()) as f64 / total_samples as f64;
        for sweep in sweeps {
            self.set_parameter(sweep.parameter(), sweep.value_at(progress));
        }
        self.fill_buffer(block);
    }

    /// Set the sweeps' start values with no glide
    fn jump_sweeps(&mut self, sweeps: &[Sweep]) {
        for voice in &mut self.voices {
            let mut params = voice.oscillator.parameters();
            for sweep in sweeps {
                params.set(sweep.parameter(), sweep.value_at(0.0));
            }
            voice.oscillator.apply_immediately(params);
        }
    }
}

/// Build the wavetable described by the configuration
pub fn build_wavetable(config: &WarpConfig) -> Result<Wavetable> {
    match &config.wavetable.file {
        Some(path) => Wavetable::from_wav_file(path),
        None => Ok(Wavetable::from_shape(config.wavetable.shape, config.wavetable.size)?),
    }
}

/// Control-thread handle to a split engine
pub struct EngineControl {
    names: Vec<String>,
    senders: Vec<ParameterSender>,
}

impl EngineControl {
    pub fn voice_count(&self) -> usize {
        self.senders.len()
    }

    pub fn voice_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Last parameters sent to a voice
    pub fn voice_parameters(&self, voice_index: usize) -> Option<ControlParameters> {
        self.senders.get(voice_index).map(|s| s.last())
    }

    /// Send a full parameter set to one voice.
    ///
    /// Returns false if the update is being held back (see `flush`).
    pub fn set_voice_parameters(&mut self, voice_index: usize, parameters: ControlParameters) -> bool {
        match self.senders.get_mut(voice_index) {
            Some(sender) => sender.send(parameters),
            None => {
                log::warn!("no voice at index {}", voice_index);
                true
            }
        }
    }

    /// Change one control on one voice
    pub fn set_voice_parameter(&mut self, voice_index: usize, id: ParameterId, value: f64) -> bool {
        match self.senders.get_mut(voice_index) {
            Some(sender) => sender.set(id, value),
            None => {
                log::warn!("no voice at index {}", voice_index);
                true
            }
        }
    }

    /// Change one control on every voice
    pub fn set_parameter(&mut self, id: ParameterId, value: f64) -> bool {
        self.senders
            .iter_mut()
            .fold(true, |sent, sender| sender.set(id, value) && sent)
    }

    /// Retry held-back updates. Returns true when nothing is left pending.
    pub fn flush(&mut self) -> bool {
        self.senders.iter_mut().fold(true, |done, sender| sender.flush() && done)
    }
}

/// Render-thread half of a split engine
pub struct EngineRenderer {
    engine: Engine,
    receivers: Vec<ParameterReceiver>,
}

impl EngineRenderer {
    pub fn sample_rate(&self) -> f64 {
        self.engine.sample_rate()
    }

    /// Apply the newest parameters from the control thread
    #[inline]
    pub fn sync(&mut self) {
        for (index, receiver) in self.receivers.iter_mut().enumerate() {
            if let Some(params) = receiver.latest() {
                self.engine.set_voice_parameters(index, params);
            }
        }
    }

    /// Pick up parameter changes, then fill `buffer`.
    ///
    /// No locks, no allocation.
    pub fn fill_buffer(&mut self, buffer: &mut [f32]) {
        self.sync();
        self.engine.fill_buffer(buffer);
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AudioConfig, MasterConfig, VoiceConfig, WavetableConfig};
    use approx::assert_relative_eq;

    fn test_config() -> WarpConfig {
        WarpConfig {
            audio: AudioConfig::default(),
            wavetable: WavetableConfig::default(),
            master: MasterConfig {
                volume: 0.5,
                ramp_duration: 0.0,
            },
            voices: vec![
                VoiceConfig {
                    name: "a".to_string(),
                    parameters: ControlParameters::new(220.0, 1.0, 0.0, 0.0, 1.0),
                    volume: 1.0,
                },
                VoiceConfig {
                    name: "b".to_string(),
                    parameters: ControlParameters::new(220.0, 1.0, 0.0, 0.0, 1.01),
                    volume: 0.5,
                },
            ],
            sweeps: vec![],
        }
    }

    fn quad_engine() -> Engine {
        let table = Wavetable::from_samples(vec![0.0, 1.0, 0.0, -1.0]).unwrap();
        let mut engine = Engine::from_wavetable(table, 4.0).unwrap();
        engine
            .add_voice("a", ControlParameters::new(1.0, 1.0, 0.0, 0.0, 1.0), 1.0)
            .unwrap();
        engine
    }

    #[test]
    fn test_engine_creation() {
        let engine = Engine::new(&test_config()).unwrap();

        assert_eq!(engine.sample_rate(), 44100.0);
        assert_eq!(engine.voice_count(), 2);
        assert_eq!(engine.voice_index("b"), Some(1));
        assert_eq!(engine.master_volume(), 0.5);
    }

    #[test]
    fn test_invalid_sample_rate() {
        let table = Wavetable::sine(16).unwrap();
        assert!(Engine::from_wavetable(table, 0.0).is_err());
    }

    #[test]
    fn test_duplicate_voice_rejected() {
        let mut engine = quad_engine();
        assert!(engine.add_voice("a", ControlParameters::default(), 1.0).is_err());
    }

    #[test]
    fn test_single_voice_output() {
        let mut engine = quad_engine();
        assert_eq!(engine.render(4), vec![0.0, 1.0, 0.0, -1.0]);
    }

    #[test]
    fn test_mix_applies_volumes() {
        let mut engine = quad_engine();
        engine
            .add_voice("b", ControlParameters::new(1.0, 1.0, 0.0, 0.0, 1.0), 0.5)
            .unwrap();
        engine.set_master_volume(0.5);

        let output = engine.render(4);
        assert_relative_eq!(output[1], 0.75);
        assert_relative_eq!(output[3], -0.75);
    }

    #[test]
    fn test_engine_produces_audio() {
        let mut engine = Engine::new(&test_config()).unwrap();
        let mut buffer = vec![0.0f32; 512];
        engine.fill_buffer(&mut buffer);

        assert!(buffer.iter().any(|&s| s.abs() > 0.0));
        assert!(buffer.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_parameter_setting() {
        let mut engine = quad_engine();
        engine.set_voice_parameter(0, ParameterId::Frequency, 50_000.0);
        assert_eq!(engine.voice_parameters(0).unwrap().frequency, 20_000.0);

        // unknown voices are ignored
        engine.set_voice_parameter(7, ParameterId::Frequency, 1.0);
        assert_eq!(engine.voice_parameters(7), None);
    }

    #[test]
    fn test_sweep_reaches_end_value() {
        let mut engine = quad_engine();
        let sweeps = vec![Sweep::linear(ParameterId::PhaseDistortion, -1.0, 1.0)];

        let mut blocks = 0;
        engine
            .render_with_sweeps(1000, 128, &sweeps, |block| {
                assert!(block.len() <= 128);
                blocks += 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(blocks, 8);
        assert_eq!(engine.voice_parameters(0).unwrap().phase_distortion, 1.0);
    }

    #[test]
    fn test_sweep_starts_at_from_value() {
        let mut swept = quad_engine();
        let mut fixed = quad_engine();
        fixed.set_parameter(ParameterId::PhaseDistortion, 0.5);

        let sweeps = vec![Sweep::linear(ParameterId::PhaseDistortion, 0.5, 0.5)];
        let output = swept.render_sweep(16, 4, &sweeps);
        assert_eq!(output, fixed.render(16));
    }

    #[test]
    fn test_collected_sweep_matches_streamed_sweep() {
        let sweeps = vec![Sweep::linear(ParameterId::PhaseDistortion, -0.5, 0.5)];
        let mut streamed = Vec::new();
        quad_engine()
            .render_with_sweeps(37, 8, &sweeps, |block| {
                streamed.extend_from_slice(block);
                Ok(())
            })
            .unwrap();

        let mut engine = quad_engine();
        assert_eq!(engine.render_sweep(37, 8, &sweeps), streamed);
        assert_eq!(engine.voice_parameters(0).unwrap().phase_distortion, 0.5);
    }

    #[test]
    fn test_sweep_render_length() {
        let mut engine = Engine::new(&test_config()).unwrap();
        let sweeps = vec![Sweep::exponential(ParameterId::Frequency, 100.0, 1000.0)];
        assert_eq!(engine.render_sweep(1234, 100, &sweeps).len(), 1234);
        assert!(engine.render_sweep(0, 100, &sweeps).is_empty());
    }

    #[test]
    fn test_sink_error_stops_render() {
        let mut engine = quad_engine();
        let mut calls = 0;
        let result = engine.render_with_sweeps(100, 10, &[], |_| {
            calls += 1;
            anyhow::bail!("disk full")
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_split_engine_applies_updates() {
        let (mut control, mut renderer) = quad_engine().split(8);
        assert_eq!(control.voice_count(), 1);
        assert_eq!(control.voice_index("a"), Some(0));

        control.set_voice_parameter(0, ParameterId::Amplitude, 2.0);
        let mut buffer = [0.0f32; 4];
        renderer.fill_buffer(&mut buffer);

        assert_eq!(buffer, [0.0, 2.0, 0.0, -2.0]);
        assert_eq!(renderer.engine().voice_parameters(0).unwrap().amplitude, 2.0);
    }

    #[test]
    fn test_split_engine_set_all() {
        let mut engine = quad_engine();
        engine
            .add_voice("b", ControlParameters::new(1.0, 1.0, 0.0, 0.0, 1.0), 1.0)
            .unwrap();
        let (mut control, mut renderer) = engine.split(8);

        assert!(control.set_parameter(ParameterId::PhaseDistortion, -0.5));
        assert!(control.flush());
        renderer.sync();

        for index in 0..2 {
            let params = renderer.engine().voice_parameters(index).unwrap();
            assert_eq!(params.phase_distortion, -0.5);
        }
    }
}
