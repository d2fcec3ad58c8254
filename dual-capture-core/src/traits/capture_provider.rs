use std::sync::Arc;

use crate::models::audio_models::StreamFormat;
use crate::models::error::CaptureError;

/// Callback invoked by a loopback stream once per ready buffer.
///
/// `samples` are interleaved 16-bit frames in the format the stream was
/// opened with. Runs on the backend's audio thread; keep processing minimal.
pub type FrameCallback = Arc<dyn Fn(&[i16]) + Send + Sync + 'static>;

/// A blocking, pull-based input (microphone) stream.
pub trait InputStream: Send {
    /// Block until one chunk of `format.chunk_frames` frames is available
    /// and return it as interleaved samples.
    fn read_chunk(&mut self) -> Result<Vec<i16>, CaptureError>;

    /// Stop the hardware stream. Further reads fail.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Release the device.
    fn close(self: Box<Self>) -> Result<(), CaptureError>;
}

/// Opens input streams on a capture device.
///
/// Implemented by:
/// - `WasapiInputProvider` (Windows)
/// - `MockInputProvider` (tests, simulation)
pub trait InputStreamProvider: Send + Sync {
    /// Acquire the device exclusively. Fails with `DeviceUnavailable` if it
    /// cannot be opened or is already held.
    fn open_input_stream(&self, format: &StreamFormat) -> Result<Box<dyn InputStream>, CaptureError>;
}

/// A push-driven output-loopback stream.
///
/// The stream calls its [`FrameCallback`] on its own timing until closed.
pub trait LoopbackStream: Send {
    /// Report a fault detected since the stream was opened, if any.
    fn check(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    /// Stop delivery. No callback runs after this returns.
    fn close(self: Box<Self>) -> Result<(), CaptureError>;
}

/// Opens loopback streams on the system output device.
pub trait LoopbackStreamProvider: Send + Sync {
    fn open_output_loopback_stream(
        &self,
        format: &StreamFormat,
        callback: FrameCallback,
    ) -> Result<Box<dyn LoopbackStream>, CaptureError>;
}
