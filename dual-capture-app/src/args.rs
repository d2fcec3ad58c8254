//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::Parser;

/// Record the microphone and system audio to two WAV files
#[derive(Parser, Debug)]
#[command(name = "dual-capture")]
#[command(version)]
#[command(about = "Record the microphone and system audio side by side to two WAV files")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON recorder configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory the recordings are written to
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Name files mic_<timestamp>.wav / system_<timestamp>.wav instead of overwriting
    #[arg(short = 't', long)]
    pub timestamped: bool,

    /// Also write a <system file>.metadata.json sidecar
    #[arg(short = 'm', long)]
    pub metadata: bool,

    /// Use simulated devices instead of real hardware
    #[arg(long)]
    pub simulate: bool,
}
