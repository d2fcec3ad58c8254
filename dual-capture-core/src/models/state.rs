use super::error::CaptureError;
use super::recording_result::RecordingResult;

/// Recorder state machine.
///
/// State transitions:
/// ```text
/// idle → recording → stopping → completed → idle
///                        ↓
///                      failed
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Idle,
    Recording { duration_secs: f64 },
    Stopping,
    Completed(Box<RecordingResult>),
    Failed(CaptureError),
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates() {
        assert!(CaptureState::Idle.is_idle());
        let recording = CaptureState::Recording { duration_secs: 1.5 };
        assert!(recording.is_recording());
        assert!(!recording.is_idle());
        assert!(!CaptureState::Failed(CaptureError::NotRecording).is_recording());
        assert!(!CaptureState::Stopping.is_idle());
    }
}
