use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use chrono::Local;
use parking_lot::Mutex;

use crate::models::audio_models::{AudioTrackType, CaptureSessionDiagnostics};
use crate::models::config::RecorderConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::CaptureState;
use crate::processing::capture_buffer::CaptureBuffer;
use crate::session::capture_loops::{
    system_frame_callback, MicCapture, MicCaptureOutcome, SystemCapture, SystemCaptureOutcome,
};
use crate::session::flag::RecordingFlag;
use crate::storage::{metadata, wav_writer};
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_provider::{InputStreamProvider, LoopbackStreamProvider};

/// Handles of one running session; created by `start()`, consumed by `stop()`.
struct ActiveCapture {
    mic_handle: thread::JoinHandle<MicCaptureOutcome>,
    system_handle: Option<thread::JoinHandle<SystemCaptureOutcome>>,
    system_channels: u16,
    mic_path: PathBuf,
    system_path: PathBuf,
    started_at: Instant,
    issues: Vec<CaptureError>,
}

/// Joined outputs of both loops, ready for serialization.
struct Drained {
    mic: CaptureBuffer,
    system: CaptureBuffer,
    issues: Vec<CaptureError>,
}

/// Dual-stream recording session.
///
/// Generic over the microphone and loopback backends. Owns the recording
/// flag and, while recording, both streams and both capture threads.
///
/// ```text
/// start() ─┬─ open input stream ──► [mic thread]  read_chunk → mic buffer
///          └─ open loopback (cb) ──► [keeper thread] cb → system buffer
/// stop()  ── lower flag → join both → close streams → mic.wav + system.wav
/// ```
pub struct Recorder<I: InputStreamProvider, L: LoopbackStreamProvider> {
    input: I,
    loopback: L,
    config: RecorderConfiguration,
    flag: RecordingFlag,
    state: Arc<Mutex<CaptureState>>,
    diagnostics: Arc<Mutex<CaptureSessionDiagnostics>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    active: Option<ActiveCapture>,
}

impl<I: InputStreamProvider, L: LoopbackStreamProvider> Recorder<I, L> {
    pub fn new(input: I, loopback: L, config: RecorderConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(Self {
            input,
            loopback,
            config,
            flag: RecordingFlag::new(),
            state: Arc::new(Mutex::new(CaptureState::Idle)),
            diagnostics: Arc::new(Mutex::new(CaptureSessionDiagnostics::default())),
            delegate: None,
            active: None,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn config(&self) -> &RecorderConfiguration {
        &self.config
    }

    pub fn input_provider(&self) -> &I {
        &self.input
    }

    pub fn loopback_provider(&self) -> &L {
        &self.loopback
    }

    pub fn is_recording(&self) -> bool {
        self.flag.is_raised()
    }

    /// Current state. While recording, the duration is the time since `start()`.
    pub fn state(&self) -> CaptureState {
        let state = self.state.lock().clone();
        match (&state, &self.active) {
            (CaptureState::Recording { .. }, Some(active)) => CaptureState::Recording {
                duration_secs: active.started_at.elapsed().as_secs_f64(),
            },
            _ => state,
        }
    }

    pub fn diagnostics(&self) -> CaptureSessionDiagnostics {
        self.diagnostics.lock().clone()
    }

    /// Begin recording both streams.
    ///
    /// Fails with `AlreadyRecording` if a session is running, or
    /// `DeviceUnavailable` if the microphone cannot be opened; in both cases
    /// nothing else happens. A loopback failure does not abort the start: it
    /// is logged and reported in the final result's issues.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.flag.is_raised() || self.active.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        let mic_format = self.config.mic_format();
        let system_format = self.config.system_format();

        let input_stream = self.input.open_input_stream(&mic_format).map_err(|e| match e {
            CaptureError::DeviceUnavailable(_) => e,
            other => CaptureError::DeviceUnavailable(other.to_string()),
        })?;

        let (mic_path, system_path) = self.config.output_paths(Local::now());
        *self.diagnostics.lock() = CaptureSessionDiagnostics::default();
        let system_buffer = Arc::new(Mutex::new(CaptureBuffer::new(system_format.channels)));
        let mut issues = Vec::new();

        self.flag.try_raise();

        let mic_capture = MicCapture {
            stream: input_stream,
            channels: mic_format.channels,
            flag: self.flag.clone(),
            diagnostics: Arc::clone(&self.diagnostics),
            delegate: self.delegate.clone(),
        };
        let mic_handle = match thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || mic_capture.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                // The closure (and the stream in it) was dropped with the failed spawn.
                self.flag.try_lower();
                return Err(CaptureError::Unknown(format!("failed to spawn mic thread: {}", e)));
            }
        };

        let callback = system_frame_callback(
            Arc::clone(&system_buffer),
            system_format.channels,
            self.flag.clone(),
            Arc::clone(&self.diagnostics),
        );
        let system_handle = match self.loopback.open_output_loopback_stream(&system_format, callback) {
            Ok(stream) => {
                let keeper = SystemCapture {
                    stream,
                    buffer: system_buffer,
                    flag: self.flag.clone(),
                    poll_interval: self.config.loopback_poll_interval(),
                    delegate: self.delegate.clone(),
                };
                match thread::Builder::new()
                    .name("loopback-keeper".into())
                    .spawn(move || keeper.run())
                {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        let e = CaptureError::LoopbackStream(format!("failed to spawn loopback thread: {}", e));
                        self.report_issue(&e);
                        issues.push(e);
                        None
                    }
                }
            }
            Err(e) => {
                let e = match e {
                    CaptureError::LoopbackStream(_) => e,
                    other => CaptureError::LoopbackStream(other.to_string()),
                };
                self.report_issue(&e);
                issues.push(e);
                None
            }
        };

        self.active = Some(ActiveCapture {
            mic_handle,
            system_handle,
            system_channels: system_format.channels,
            mic_path,
            system_path,
            started_at: Instant::now(),
            issues,
        });
        self.set_state(CaptureState::Recording { duration_secs: 0.0 });
        log::info!(
            "Recording started ({} Hz, mic {}ch, system {}ch)",
            self.config.sample_rate,
            mic_format.channels,
            system_format.channels
        );
        Ok(())
    }

    /// Stop recording, join both loops, and write both files.
    ///
    /// Fails with `NotRecording` (and writes nothing) if idle.
    pub fn stop(&mut self) -> Result<RecordingResult, CaptureError> {
        let Some(active) = self.active.take() else {
            return Err(CaptureError::NotRecording);
        };
        self.flag.try_lower();
        self.set_state(CaptureState::Stopping);

        let duration_secs = active.started_at.elapsed().as_secs_f64();
        let mic_path = active.mic_path.clone();
        let system_path = active.system_path.clone();
        let drained = Self::drain(active);

        match self.finalize(drained, mic_path, system_path, duration_secs) {
            Ok(result) => {
                self.set_state(CaptureState::Completed(Box::new(result.clone())));
                if let Some(ref delegate) = self.delegate {
                    delegate.on_capture_finished(&result);
                }
                self.set_state(CaptureState::Idle);
                Ok(result)
            }
            Err(e) => {
                log::error!("Failed to save recording: {}", e);
                self.set_state(CaptureState::Failed(e.clone()));
                Err(e)
            }
        }
    }

    // --- Internal helpers ---

    fn set_state(&self, new_state: CaptureState) {
        *self.state.lock() = new_state.clone();
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&new_state);
        }
    }

    fn report_issue(&self, error: &CaptureError) {
        log::error!("{}", error);
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }

    /// Join both loops (the flag must already be down) and release the streams.
    fn drain(active: ActiveCapture) -> Drained {
        let mut issues = active.issues;

        let mic = match active.mic_handle.join() {
            Ok(outcome) => {
                let mut stream = outcome.stream;
                if let Err(e) = stream.stop() {
                    log::warn!("Failed to stop input stream: {}", e);
                }
                if let Err(e) = stream.close() {
                    log::warn!("Failed to close input stream: {}", e);
                }
                issues.extend(outcome.error);
                outcome.buffer
            }
            Err(_) => {
                issues.push(CaptureError::StreamRead("microphone capture thread panicked".into()));
                CaptureBuffer::new(1)
            }
        };

        let system = match active.system_handle.map(thread::JoinHandle::join) {
            Some(Ok(outcome)) => {
                issues.extend(outcome.error);
                outcome.buffer
            }
            Some(Err(_)) => {
                issues.push(CaptureError::LoopbackStream("loopback keeper thread panicked".into()));
                CaptureBuffer::new(active.system_channels)
            }
            None => CaptureBuffer::new(active.system_channels),
        };

        Drained { mic, system, issues }
    }

    fn finalize(
        &self,
        drained: Drained,
        mic_path: PathBuf,
        system_path: PathBuf,
        duration_secs: f64,
    ) -> Result<RecordingResult, CaptureError> {
        let Drained {
            mic: mic_buffer,
            system: system_buffer,
            mut issues,
        } = drained;

        for (track, buffer) in [(AudioTrackType::Mic, &mic_buffer), (AudioTrackType::System, &system_buffer)] {
            if buffer.is_empty() {
                log::warn!("No audio captured on the {} track; writing an empty file", track);
                issues.push(CaptureError::EmptyCapture(track));
            }
        }

        let rate = self.config.sample_rate;
        // Write both tracks before reporting either failure.
        let mic_written = wav_writer::write_track(&mic_path, AudioTrackType::Mic, rate, &mic_buffer);
        let system_written = wav_writer::write_track(&system_path, AudioTrackType::System, rate, &system_buffer);
        if let (Err(mic_err), Err(system_err)) = (&mic_written, &system_written) {
            log::error!("Both tracks failed to save: {}; {}", mic_err, system_err);
        }
        let mic = mic_written?;
        let system = system_written?;

        let metadata = RecordingMetadata::new(duration_secs, &mic, &system, &issues);
        if self.config.write_metadata {
            metadata::write_metadata(&metadata, &system_path)?;
        }

        log::info!(
            "Recording stopped after {:.2}s: mic {:.2}s, system {:.2}s, {} issue(s)",
            duration_secs,
            mic.duration_secs(),
            system.duration_secs(),
            issues.len()
        );

        Ok(RecordingResult {
            mic,
            system,
            duration_secs,
            issues,
            metadata,
        })
    }
}

impl<I: InputStreamProvider, L: LoopbackStreamProvider> Drop for Recorder<I, L> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            log::warn!("Recorder dropped while recording; captured audio is discarded");
            self.flag.try_lower();
            let _ = Self::drain(active);
        }
    }
}
