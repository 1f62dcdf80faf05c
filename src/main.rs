//! Warpdrive - wavetable phase-distortion oscillator

use anyhow::{bail, Result};
use clap::Parser;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use warpdrive::config::{self, EXAMPLE_CONFIG};
use warpdrive::engine::{self, Engine, Player, Recorder};
use warpdrive::mapping::Sweep;
use warpdrive::synth::{DEFAULT_QUEUE_CAPACITY, PARAMETERS};

mod cli;

use cli::{Cli, Commands};

/// How often the play loop pushes sweep updates
const CONTROL_INTERVAL: Duration = Duration::from_millis(10);

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            config: config_path,
            output,
            duration,
        } => {
            if !duration.is_finite() || duration <= 0.0 {
                bail!("Duration must be a positive number of seconds");
            }

            println!("Loading configuration from {:?}...", config_path);
            let cfg = config::load_config(&config_path)?;

            let sample_rate = cfg.audio.sample_rate;
            let total_samples = (duration * sample_rate as f64).round() as usize;
            let sweeps: Vec<Sweep> = cfg.sweeps.iter().map(Sweep::from_config).collect();

            println!("Rendering {:.2} seconds to {:?}...", duration, output);

            let mut engine = Engine::new(&cfg)?;
            let mut recorder = Recorder::create(&output, sample_rate)?;
            let mut last_second = u64::MAX;

            engine.render_with_sweeps(total_samples, cfg.audio.buffer_size, &sweeps, |block| {
                recorder.write_block(block)?;

                // Progress update every second
                let second = recorder.samples_written() / sample_rate as u64;
                if second != last_second {
                    last_second = second;
                    print!("\r  Progress: {}s / {:.0}s", second, duration);
                    std::io::stdout().flush()?;
                }
                Ok(())
            })?;

            recorder.finalize()?;
            println!("\nRendered to {:?}", output);
        }

        Commands::Play {
            config: config_path,
            duration,
        } => {
            if let Some(d) = duration {
                if !d.is_finite() || d <= 0.0 {
                    bail!("Duration must be a positive number of seconds");
                }
            }

            println!("Loading configuration from {:?}...", config_path);
            let cfg = config::load_config(&config_path)?;

            let mut player = Player::open(cfg.audio.device.as_deref())?;
            let engine = Engine::with_sample_rate(&cfg, player.sample_rate() as f64)?;
            let sweeps: Vec<Sweep> = cfg.sweeps.iter().map(Sweep::from_config).collect();
            if duration.is_none() && !sweeps.is_empty() {
                log::info!("sweeps need --duration; playing the voices as configured");
            }

            let (mut control, renderer) = engine.split(DEFAULT_QUEUE_CAPACITY);

            let stop = Arc::new(AtomicBool::new(false));
            let handler_stop = stop.clone();
            ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst))?;

            player.start(renderer)?;
            println!(
                "Playing {} voices at {} Hz. Press Ctrl-C to stop.",
                control.voice_count(),
                player.sample_rate()
            );

            let started = Instant::now();
            while !stop.load(Ordering::SeqCst) {
                let elapsed = started.elapsed().as_secs_f64();

                if let Some(total) = duration {
                    if elapsed >= total {
                        break;
                    }
                    let progress = elapsed / total;
                    for sweep in &sweeps {
                        control.set_parameter(sweep.parameter(), sweep.value_at(progress));
                    }
                }
                control.flush();

                std::thread::sleep(CONTROL_INTERVAL);
            }

            player.stop();
            println!("Stopped.");
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    // Catch unreadable wavetable files as well
                    let table = engine::build_wavetable(&cfg)?;

                    println!("Configuration is valid!");
                    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
                    println!("  Buffer size: {}", cfg.audio.buffer_size);
                    match &cfg.wavetable.file {
                        Some(path) => println!("  Wavetable: {:?} ({} entries)", path, table.len()),
                        None => println!(
                            "  Wavetable: {:?} ({} entries)",
                            cfg.wavetable.shape,
                            table.len()
                        ),
                    }
                    println!("  Master volume: {:.0}%", cfg.master.volume * 100.0);
                    println!("  Ramp: {:.3}s", cfg.master.ramp_duration);
                    println!("  Voices: {}", cfg.voices.len());
                    for voice in &cfg.voices {
                        let p = voice.parameters.clamped();
                        println!(
                            "    - {} ({:.2} Hz, pd {:+.2}, amp {:.2})",
                            voice.name,
                            p.effective_frequency(),
                            p.phase_distortion,
                            p.amplitude
                        );
                    }
                    println!("  Sweeps: {}", cfg.sweeps.len());
                    for sweep in &cfg.sweeps {
                        println!(
                            "    - {} {} -> {} ({:?})",
                            sweep.parameter, sweep.from, sweep.to, sweep.kind
                        );
                    }
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Params { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&PARAMETERS)?);
            } else {
                println!("{:<22} {:>10} {:>10} {:>10}  {:<6} address", "name", "min", "max", "default", "unit");
                for def in &PARAMETERS {
                    println!(
                        "{:<22} {:>10} {:>10} {:>10}  {:<6} {}",
                        def.name, def.min, def.max, def.default, def.unit, def.address
                    );
                }
            }
        }

        Commands::Devices => {
            println!("Available audio devices:\n");

            if let Some(name) = engine::default_device_name() {
                println!("Default output: {}\n", name);
            }

            println!("Output devices:");
            let devices = engine::list_output_devices();
            if devices.is_empty() {
                println!("  (none found)");
            }
            for (name, config) in devices {
                println!(
                    "  - {} ({} Hz, {} ch)",
                    name, config.sample_rate.0, config.channels
                );
            }
        }

        Commands::Init => {
            let path = "warpdrive.yaml";
            if std::path::Path::new(path).exists() {
                println!("warpdrive.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, EXAMPLE_CONFIG)?;
                println!("Created warpdrive.yaml with example configuration.");
            }
        }
    }

    Ok(())
}
