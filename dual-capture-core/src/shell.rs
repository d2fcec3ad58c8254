//! Start/Stop controller between a front end and a [`Recorder`].
//!
//! Turns recorder outcomes into user-facing notices on a [`MessageDisplay`].

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;
use crate::session::recorder::Recorder;
use crate::traits::capture_provider::{InputStreamProvider, LoopbackStreamProvider};
use crate::traits::message_display::MessageDisplay;

pub const INFO_TITLE: &str = "Info";
pub const ERROR_TITLE: &str = "Error";

pub struct RecorderShell<I: InputStreamProvider, L: LoopbackStreamProvider, D: MessageDisplay> {
    recorder: Recorder<I, L>,
    display: D,
}

impl<I: InputStreamProvider, L: LoopbackStreamProvider, D: MessageDisplay> RecorderShell<I, L, D> {
    pub fn new(recorder: Recorder<I, L>, display: D) -> Self {
        Self { recorder, display }
    }

    pub fn recorder(&self) -> &Recorder<I, L> {
        &self.recorder
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// "Start" control. Returns whether a recording began.
    pub fn press_start(&mut self) -> bool {
        match self.recorder.start() {
            Ok(()) => true,
            Err(CaptureError::AlreadyRecording) => {
                self.display.show_info(INFO_TITLE, "Recording already in progress.");
                false
            }
            Err(CaptureError::DeviceUnavailable(reason)) => {
                self.display
                    .show_error(ERROR_TITLE, &format!("Could not open stream: {}", reason));
                false
            }
            Err(e) => {
                self.display
                    .show_error(ERROR_TITLE, &format!("Could not start recording: {}", e));
                false
            }
        }
    }

    /// "Stop" control. Returns the saved recording, if one was written.
    pub fn press_stop(&mut self) -> Option<RecordingResult> {
        match self.recorder.stop() {
            Ok(result) => {
                self.display.show_info(INFO_TITLE, &saved_notice(&result));
                Some(result)
            }
            Err(CaptureError::NotRecording) => {
                self.display.show_info(INFO_TITLE, "No recording in progress.");
                None
            }
            Err(e) => {
                self.display
                    .show_error(ERROR_TITLE, &format!("Could not save recording: {}", e));
                None
            }
        }
    }

    /// One-line summary of the recorder state.
    pub fn status(&self) -> String {
        match self.recorder.state() {
            CaptureState::Idle => "Idle".to_string(),
            CaptureState::Recording { duration_secs } => format!("Recording ({:.1}s)", duration_secs),
            CaptureState::Stopping => "Stopping".to_string(),
            CaptureState::Completed(result) => format!("Completed ({:.1}s)", result.duration_secs),
            CaptureState::Failed(e) => format!("Failed: {}", e),
        }
    }

    /// Stop and save if a recording is running.
    pub fn shutdown(&mut self) -> Option<RecordingResult> {
        if self.recorder.is_recording() {
            self.press_stop()
        } else {
            None
        }
    }
}

fn saved_notice(result: &RecordingResult) -> String {
    let (mic, system) = result.output_paths();
    let mut notice = format!(
        "Recording saved.\nMicrophone: {}\nSystem audio: {}",
        mic.display(),
        system.display()
    );
    if !result.issues.is_empty() {
        notice.push_str("\nCapture issues:");
        for issue in &result.issues {
            notice.push_str("\n- ");
            notice.push_str(&issue.to_string());
        }
    }
    notice
}
