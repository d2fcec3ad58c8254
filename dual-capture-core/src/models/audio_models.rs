use std::fmt;

use serde::{Deserialize, Serialize};

/// Which of the two recorded streams a piece of audio belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioTrackType {
    Mic,
    System,
}

impl fmt::Display for AudioTrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mic => f.write_str("mic"),
            Self::System => f.write_str("system"),
        }
    }
}

/// Format a stream is opened with: 16-bit interleaved PCM at a fixed rate.
///
/// `chunk_frames` is the number of frames in one blocking read (microphone)
/// or the preferred callback size (loopback).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_frames: usize,
}

impl StreamFormat {
    pub fn new(sample_rate: u32, channels: u16, chunk_frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            chunk_frames,
        }
    }

    /// Number of interleaved samples in one chunk.
    pub fn chunk_samples(&self) -> usize {
        self.chunk_frames * self.channels as usize
    }
}

/// Counters for debugging capture sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSessionDiagnostics {
    pub mic_chunks: u64,
    pub mic_samples_total: u64,
    pub system_callback_count: u64,
    pub system_samples_total: u64,
    /// Loopback frames delivered while the recording flag was down.
    pub system_frames_discarded: u64,
}
