//! # dual-capture-core
//!
//! Platform-agnostic dual-stream capture library.
//!
//! Records the microphone and the system output (loopback) side by side and
//! writes each to its own 16-bit PCM WAV file when the recording stops.
//! Platform backends implement the provider traits and plug into the generic
//! [`Recorder`].
//!
//! ## Architecture
//!
//! ```text
//! dual-capture-core (this crate)
//! ├── traits/       ← InputStreamProvider, LoopbackStreamProvider, CaptureDelegate, MessageDisplay
//! ├── models/       ← CaptureError, CaptureState, RecorderConfiguration, RecordingResult, etc.
//! ├── processing/   ← CaptureBuffer, sample conversion, WAV header generation
//! ├── session/      ← Recorder, RecordingFlag, capture loops
//! ├── storage/      ← WavFileWriter, metadata sidecar
//! ├── shell         ← RecorderShell (Start/Stop controller)
//! └── mock          ← hardware-free providers
//! ```

pub mod mock;
pub mod models;
pub mod processing;
pub mod session;
pub mod shell;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use mock::{MockInputProvider, MockLoopbackProvider};
pub use models::audio_models::{AudioTrackType, CaptureSessionDiagnostics, StreamFormat};
pub use models::config::{OutputNaming, RecorderConfiguration};
pub use models::error::CaptureError;
pub use models::recording_result::{RecordingMetadata, RecordingResult, TrackMetadata, TrackResult};
pub use models::state::CaptureState;
pub use processing::capture_buffer::{AudioChunk, CaptureBuffer};
pub use processing::convert::SampleConverter;
pub use session::flag::RecordingFlag;
pub use session::recorder::Recorder;
pub use shell::RecorderShell;
pub use storage::wav_writer::WavFileWriter;
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::capture_provider::{
    FrameCallback, InputStream, InputStreamProvider, LoopbackStream, LoopbackStreamProvider,
};
pub use traits::message_display::MessageDisplay;
