use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::audio_models::AudioTrackType;
use super::error::CaptureError;

/// One finalized output file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackResult {
    pub track: AudioTrackType,
    pub file_path: PathBuf,
    pub channels: u16,
    pub sample_rate: u32,
    pub frames: u64,
    pub checksum: String,
}

impl TrackResult {
    /// Length of the captured audio on this track.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

/// Result returned when a recorder stops and both files are written.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub mic: TrackResult,
    pub system: TrackResult,
    /// Wall-clock time between `start()` and `stop()`.
    pub duration_secs: f64,
    /// Runtime problems collected from the capture loops and the flush.
    pub issues: Vec<CaptureError>,
    pub metadata: RecordingMetadata,
}

impl RecordingResult {
    /// `(mic, system)` output paths.
    pub fn output_paths(&self) -> (&Path, &Path) {
        (&self.mic.file_path, &self.system.file_path)
    }
}

/// Per-track entry in the metadata sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    #[serde(rename = "type")]
    pub track_type: AudioTrackType,
    pub file_path: String,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub frames: u64,
    pub checksum: String,
}

impl From<&TrackResult> for TrackMetadata {
    fn from(track: &TrackResult) -> Self {
        Self {
            track_type: track.track,
            file_path: track.file_path.to_string_lossy().to_string(),
            channels: track.channels,
            sample_rate: track.sample_rate,
            bits_per_sample: 16,
            frames: track.frames,
            checksum: track.checksum.clone(),
        }
    }
}

/// Metadata describing a finished session.
///
/// Serializable for the optional JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub duration_secs: f64,
    pub tracks: Vec<TrackMetadata>,
    pub issues: Vec<String>,
}

impl RecordingMetadata {
    pub fn new(
        duration_secs: f64,
        mic: &TrackResult,
        system: &TrackResult,
        issues: &[CaptureError],
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            duration_secs,
            tracks: vec![TrackMetadata::from(mic), TrackMetadata::from(system)],
            issues: issues.iter().map(ToString::to_string).collect(),
        }
    }
}
