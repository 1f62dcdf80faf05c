//! Real-time audio playback using cpal

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::EngineRenderer;

/// Mono frames rendered per chunk inside the audio callback
const SCRATCH_FRAMES: usize = 4096;

/// Real-time audio player
pub struct Player {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
}

impl Player {
    /// Open an output device, by name or the host default
    pub fn open(device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .output_devices()?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| anyhow!("No output device named '{}'", name))?,
            None => host
                .default_output_device()
                .ok_or_else(|| anyhow!("No output device available"))?,
        };

        let supported = device
            .default_output_config()
            .context("failed to query output config")?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();

        log::info!(
            "output device '{}': {} Hz, {} channels, {:?}",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            config.sample_rate.0,
            config.channels,
            sample_format
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Sample rate the device runs at; build the engine to match
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Start playing audio from the renderer
    ///
    /// The renderer moves into the audio callback. Parameter changes reach
    /// it through the matching `EngineControl`.
    pub fn start(&mut self, renderer: EngineRenderer) -> Result<()> {
        if (renderer.sample_rate() - self.sample_rate() as f64).abs() > f64::EPSILON {
            log::warn!(
                "engine runs at {} Hz but the device at {} Hz; pitch will be off",
                renderer.sample_rate(),
                self.sample_rate()
            );
        }

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(renderer, running)?,
            SampleFormat::I16 => self.build_stream::<i16>(renderer, running)?,
            SampleFormat::U16 => self.build_stream::<u16>(renderer, running)?,
            other => return Err(anyhow!("Unsupported sample format: {:?}", other)),
        };

        stream.play()?;
        self.stream = Some(stream);

        Ok(())
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.stream = None;
    }

    fn build_stream<T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>>(
        &self,
        mut renderer: EngineRenderer,
        running: Arc<AtomicBool>,
    ) -> Result<Stream> {
        let channels = self.config.channels as usize;
        let mut scratch = vec![0.0f32; SCRATCH_FRAMES];

        let stream = self.device.build_output_stream(
            &self.config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if !running.load(Ordering::Relaxed) {
                    // Fill with silence when stopped
                    for sample in data.iter_mut() {
                        *sample = T::from_sample(0.0f32);
                    }
                    return;
                }

                for chunk in data.chunks_mut(SCRATCH_FRAMES * channels) {
                    let frames = chunk.len() / channels;
                    let mono = &mut scratch[..frames];
                    renderer.fill_buffer(mono);

                    for (frame, &sample) in chunk.chunks_mut(channels).zip(mono.iter()) {
                        for channel_sample in frame.iter_mut() {
                            *channel_sample = T::from_sample(sample);
                        }
                    }
                }
            },
            |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )?;

        Ok(stream)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Get the default output device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device().and_then(|d| d.name().ok())
}

/// List all available output devices
pub fn list_output_devices() -> Vec<(String, StreamConfig)> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let (Ok(name), Ok(config)) = (device.name(), device.default_output_config()) {
                devices.push((name, config.into()));
            }
        }
    }

    devices
}
