use thiserror::Error;

use super::audio_models::AudioTrackType;

/// Errors that can occur during dual-stream capture.
///
/// `AlreadyRecording` and `NotRecording` are user-facing no-ops rather than
/// failures. `StreamRead`, `LoopbackStream` and `EmptyCapture` are raised
/// while a session runs or finalizes and are collected into
/// [`RecordingResult::issues`](crate::RecordingResult) instead of aborting it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("recording already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("microphone stream read failed: {0}")]
    StreamRead(String),

    #[error("loopback stream failed: {0}")]
    LoopbackStream(String),

    #[error("no audio captured on the {0} track")]
    EmptyCapture(AudioTrackType),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}
