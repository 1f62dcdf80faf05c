//! CLI interface for Warpdrive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Wavetable phase-distortion oscillator
#[derive(Parser)]
#[command(name = "warpdrive")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the configured voices and sweeps to a WAV file
    Render {
        /// Configuration file path
        #[arg(short, long, default_value = "warpdrive.yaml")]
        config: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: f64,
    },

    /// Play through an audio device; Ctrl-C stops
    Play {
        /// Configuration file path
        #[arg(short, long, default_value = "warpdrive.yaml")]
        config: PathBuf,

        /// Stop after this many seconds and run the sweeps over that time
        #[arg(short, long)]
        duration: Option<f64>,
    },

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "warpdrive.yaml")]
        config: PathBuf,
    },

    /// List the oscillator's controls and their ranges
    Params {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available audio output devices
    Devices,

    /// Generate an example configuration file
    Init,
}
