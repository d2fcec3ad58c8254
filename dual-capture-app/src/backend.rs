//! Providers used when no real capture backend is compiled in.

use dual_capture_core::{
    CaptureError, FrameCallback, InputStream, InputStreamProvider, LoopbackStream, LoopbackStreamProvider,
    StreamFormat,
};

const REASON: &str = "no audio backend for this platform (try --simulate)";

/// Microphone that always fails to open.
#[derive(Debug, Default)]
pub struct UnavailableInput;

impl InputStreamProvider for UnavailableInput {
    fn open_input_stream(&self, _format: &StreamFormat) -> Result<Box<dyn InputStream>, CaptureError> {
        Err(CaptureError::DeviceUnavailable(REASON.into()))
    }
}

/// Loopback that always fails to open.
#[derive(Debug, Default)]
pub struct UnavailableLoopback;

impl LoopbackStreamProvider for UnavailableLoopback {
    fn open_output_loopback_stream(
        &self,
        _format: &StreamFormat,
        _callback: FrameCallback,
    ) -> Result<Box<dyn LoopbackStream>, CaptureError> {
        Err(CaptureError::LoopbackStream(REASON.into()))
    }
}
