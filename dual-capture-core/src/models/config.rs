use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::audio_models::StreamFormat;
use super::error::CaptureError;

/// Highest accepted capture rate in Hz.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// How output file names are chosen for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutputNaming {
    /// Same names every run; a new session overwrites the previous one.
    Fixed {
        mic_file_name: String,
        system_file_name: String,
    },
    /// `mic_YYYYMMDD_HHMMSS.wav` / `system_YYYYMMDD_HHMMSS.wav`, stamped at start.
    Timestamped,
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self::Fixed {
            mic_file_name: "mic_output.wav".into(),
            system_file_name: "system_output.wav".into(),
        }
    }
}

/// Configuration for a recorder.
///
/// Deserializable from JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfiguration {
    /// Capture and output sample rate in Hz (default: 44100).
    pub sample_rate: u32,

    /// Microphone channel count (default: 1).
    pub mic_channels: u16,

    /// Loopback channel count (default: 2).
    pub system_channels: u16,

    /// Frames per microphone read (default: 1024).
    pub chunk_frames: usize,

    /// Directory where both files are written; created if absent (default: `Audios`).
    pub output_directory: PathBuf,

    pub naming: OutputNaming,

    /// How often the loopback keeper thread checks the recording flag (default: 10ms).
    pub loopback_poll_interval_ms: u64,

    /// Write a JSON metadata sidecar next to the system track (default: false).
    pub write_metadata: bool,
}

impl RecorderConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.sample_rate > MAX_SAMPLE_RATE {
            return Err(format!(
                "sample rate {} Hz exceeds the {} Hz maximum",
                self.sample_rate, MAX_SAMPLE_RATE
            ));
        }
        if ![1, 2].contains(&self.mic_channels) {
            return Err(format!("unsupported mic channel count: {}", self.mic_channels));
        }
        if ![1, 2].contains(&self.system_channels) {
            return Err(format!(
                "unsupported system channel count: {}",
                self.system_channels
            ));
        }
        if self.chunk_frames == 0 {
            return Err("chunk size must be at least one frame".into());
        }
        if self.loopback_poll_interval_ms == 0 {
            return Err("loopback poll interval must be positive".into());
        }
        if let OutputNaming::Fixed {
            mic_file_name,
            system_file_name,
        } = &self.naming
        {
            if mic_file_name.trim().is_empty() || system_file_name.trim().is_empty() {
                return Err("output file names must not be empty".into());
            }
            if mic_file_name == system_file_name {
                return Err("mic and system output file names must differ".into());
            }
        }
        Ok(())
    }

    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file(path: &Path) -> Result<Self, CaptureError> {
        let json = fs::read_to_string(path).map_err(|e| {
            CaptureError::ConfigurationFailed(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            CaptureError::ConfigurationFailed(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn mic_format(&self) -> StreamFormat {
        StreamFormat::new(self.sample_rate, self.mic_channels, self.chunk_frames)
    }

    pub fn system_format(&self) -> StreamFormat {
        StreamFormat::new(self.sample_rate, self.system_channels, self.chunk_frames)
    }

    pub fn loopback_poll_interval(&self) -> Duration {
        Duration::from_millis(self.loopback_poll_interval_ms)
    }

    /// Resolve the `(mic, system)` output paths for a session started at `now`.
    pub fn output_paths(&self, now: DateTime<Local>) -> (PathBuf, PathBuf) {
        match &self.naming {
            OutputNaming::Fixed {
                mic_file_name,
                system_file_name,
            } => (
                self.output_directory.join(mic_file_name),
                self.output_directory.join(system_file_name),
            ),
            OutputNaming::Timestamped => {
                let stamp = now.format("%Y%m%d_%H%M%S");
                (
                    self.output_directory.join(format!("mic_{}.wav", stamp)),
                    self.output_directory.join(format!("system_{}.wav", stamp)),
                )
            }
        }
    }
}

impl Default for RecorderConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            mic_channels: 1,
            system_channels: 2,
            chunk_frames: 1024,
            output_directory: PathBuf::from("Audios"),
            naming: OutputNaming::default(),
            loopback_poll_interval_ms: 10,
            write_metadata: false,
        }
    }
}
