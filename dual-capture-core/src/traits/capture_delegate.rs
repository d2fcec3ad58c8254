use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;

/// Event delegate for recorder notifications.
///
/// `on_error` is called from the capture threads; the other methods from the
/// thread driving `start()`/`stop()`. Implementations should marshal to a UI
/// thread if needed.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the recorder state changes.
    fn on_state_changed(&self, state: &CaptureState);

    /// Called when a capture loop hits a runtime error.
    fn on_error(&self, error: &CaptureError);

    /// Called when both files are finalized.
    fn on_capture_finished(&self, result: &RecordingResult);
}
