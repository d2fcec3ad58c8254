use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingMetadata;

/// Sidecar location for a recording: `{recording stem}.metadata.json`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar file next to `recording_path`.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<PathBuf, CaptureError> {
    let path = metadata_path(recording_path);
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&path, json).map_err(|e| CaptureError::StorageError(format!("failed to write metadata: {}", e)))?;
    Ok(path)
}

/// Read recording metadata from the JSON sidecar next to `recording_path`.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let json = fs::read_to_string(metadata_path(recording_path))
        .map_err(|e| CaptureError::StorageError(format!("failed to read metadata: {}", e)))?;
    let metadata: RecordingMetadata = serde_json::from_str(&json)
        .map_err(|e| CaptureError::StorageError(format!("failed to parse metadata: {}", e)))?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::AudioTrackType;
    use crate::models::recording_result::TrackResult;

    #[test]
    fn sidecar_replaces_wav_extension() {
        assert_eq!(
            metadata_path(Path::new("Audios/system_output.wav")),
            PathBuf::from("Audios/system_output.metadata.json")
        );
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("system_output.wav");
        let track = |track, channels| TrackResult {
            track,
            file_path: dir.path().join(format!("{}.wav", track)),
            channels,
            sample_rate: 44100,
            frames: 1024,
            checksum: "00".into(),
        };
        let metadata = RecordingMetadata::new(
            1.0,
            &track(AudioTrackType::Mic, 1),
            &track(AudioTrackType::System, 2),
            &[],
        );

        let written = write_metadata(&metadata, &recording).unwrap();
        assert!(written.exists());
        assert_eq!(read_metadata(&recording).unwrap(), metadata);
    }

    #[test]
    fn missing_sidecar_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_metadata(&dir.path().join("nothing.wav")),
            Err(CaptureError::StorageError(_))
        ));
    }
}
