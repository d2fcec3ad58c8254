//! The two capture loops a recorder runs while recording.
//!
//! ```text
//! [InputStream] --read_chunk--> MicCapture thread ----owns----> mic CaptureBuffer
//! [LoopbackStream] --callback--> system CaptureBuffer (shared) <-- SystemCapture keeper thread
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::CaptureSessionDiagnostics;
use crate::models::error::CaptureError;
use crate::processing::capture_buffer::{AudioChunk, CaptureBuffer};
use crate::session::flag::RecordingFlag;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_provider::{FrameCallback, InputStream, LoopbackStream};

/// What the microphone loop hands back when joined.
pub(crate) struct MicCaptureOutcome {
    pub stream: Box<dyn InputStream>,
    pub buffer: CaptureBuffer,
    pub error: Option<CaptureError>,
}

/// What the loopback keeper hands back when joined.
pub(crate) struct SystemCaptureOutcome {
    pub buffer: CaptureBuffer,
    pub error: Option<CaptureError>,
}

/// Blocking pull loop over the microphone stream.
pub(crate) struct MicCapture {
    pub stream: Box<dyn InputStream>,
    pub channels: u16,
    pub flag: RecordingFlag,
    pub diagnostics: Arc<Mutex<CaptureSessionDiagnostics>>,
    pub delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl MicCapture {
    /// Read one chunk at a time until the flag drops or a read fails.
    pub fn run(mut self) -> MicCaptureOutcome {
        let mut buffer = CaptureBuffer::new(self.channels);
        let mut error = None;

        while self.flag.is_raised() {
            let appended = self
                .stream
                .read_chunk()
                .and_then(|samples| AudioChunk::new(samples, self.channels))
                .and_then(|chunk| {
                    let samples = chunk.samples().len() as u64;
                    buffer.push(chunk)?;
                    Ok(samples)
                });

            match appended {
                Ok(samples) => {
                    let mut d = self.diagnostics.lock();
                    d.mic_chunks += 1;
                    d.mic_samples_total += samples;
                }
                Err(e) => {
                    let e = match e {
                        CaptureError::StreamRead(_) => e,
                        other => CaptureError::StreamRead(other.to_string()),
                    };
                    log::error!("Microphone capture stopped early: {}", e);
                    if let Some(ref delegate) = self.delegate {
                        delegate.on_error(&e);
                    }
                    error = Some(e);
                    break;
                }
            }
        }

        log::debug!(
            "Microphone loop finished with {} chunks ({} frames)",
            buffer.chunk_count(),
            buffer.frame_count()
        );

        MicCaptureOutcome {
            stream: self.stream,
            buffer,
            error,
        }
    }
}

/// Build the callback registered with the loopback stream.
///
/// Appends a copy of every delivered buffer while the flag is raised. Frames
/// arriving after it drops are counted and discarded.
pub(crate) fn system_frame_callback(
    buffer: Arc<Mutex<CaptureBuffer>>,
    channels: u16,
    flag: RecordingFlag,
    diagnostics: Arc<Mutex<CaptureSessionDiagnostics>>,
) -> FrameCallback {
    Arc::new(move |samples: &[i16]| {
        if !flag.is_raised() {
            diagnostics.lock().system_frames_discarded += (samples.len() / channels.max(1) as usize) as u64;
            return;
        }

        let pushed = AudioChunk::new(samples.to_vec(), channels).and_then(|chunk| buffer.lock().push(chunk));
        match pushed {
            Ok(()) => {
                let mut d = diagnostics.lock();
                d.system_callback_count += 1;
                d.system_samples_total += samples.len() as u64;
            }
            Err(e) => log::warn!("Dropping malformed loopback buffer: {}", e),
        }
    })
}

/// Keeps the loopback stream open until the flag drops.
pub(crate) struct SystemCapture {
    pub stream: Box<dyn LoopbackStream>,
    pub buffer: Arc<Mutex<CaptureBuffer>>,
    pub flag: RecordingFlag,
    pub poll_interval: Duration,
    pub delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl SystemCapture {
    pub fn run(mut self) -> SystemCaptureOutcome {
        let mut error = None;

        while self.flag.is_raised() {
            thread::sleep(self.poll_interval);

            if let Err(e) = self.stream.check() {
                let e = match e {
                    CaptureError::LoopbackStream(_) => e,
                    other => CaptureError::LoopbackStream(other.to_string()),
                };
                log::error!("System audio capture stopped early: {}", e);
                if let Some(ref delegate) = self.delegate {
                    delegate.on_error(&e);
                }
                error = Some(e);
                break;
            }
        }

        // No callbacks run once close returns, so the buffer is final after this.
        if let Err(e) = self.stream.close() {
            log::warn!("Failed to close loopback stream: {}", e);
        }

        let buffer = self.buffer.lock().take();
        log::debug!(
            "System audio loop finished with {} buffers ({} frames)",
            buffer.chunk_count(),
            buffer.frame_count()
        );

        SystemCaptureOutcome { buffer, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Input stream fed from a script of results; lowers the flag when the script runs out.
    struct ScriptedInput {
        script: VecDeque<Result<Vec<i16>, CaptureError>>,
        flag: RecordingFlag,
    }

    impl InputStream for ScriptedInput {
        fn read_chunk(&mut self) -> Result<Vec<i16>, CaptureError> {
            let next = self.script.pop_front().unwrap_or_else(|| Ok(vec![0; 2]));
            if self.script.is_empty() {
                self.flag.try_lower();
            }
            next
        }

        fn stop(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }

        fn close(self: Box<Self>) -> Result<(), CaptureError> {
            Ok(())
        }
    }

    fn mic_capture(script: Vec<Result<Vec<i16>, CaptureError>>) -> (MicCapture, Arc<Mutex<CaptureSessionDiagnostics>>) {
        let flag = RecordingFlag::new();
        flag.try_raise();
        let diagnostics = Arc::new(Mutex::new(CaptureSessionDiagnostics::default()));
        let capture = MicCapture {
            stream: Box::new(ScriptedInput {
                script: script.into(),
                flag: flag.clone(),
            }),
            channels: 1,
            flag,
            diagnostics: Arc::clone(&diagnostics),
            delegate: None,
        };
        (capture, diagnostics)
    }

    #[test]
    fn mic_loop_appends_in_read_order() {
        let (capture, diagnostics) = mic_capture(vec![Ok(vec![1, 2]), Ok(vec![3, 4]), Ok(vec![5, 6])]);

        let outcome = capture.run();

        assert!(outcome.error.is_none());
        assert_eq!(outcome.buffer.samples().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(diagnostics.lock().mic_chunks, 3);
    }

    #[test]
    fn mic_loop_stops_on_read_error_and_keeps_partial_audio() {
        let (capture, _) = mic_capture(vec![
            Ok(vec![7, 8]),
            Err(CaptureError::StreamRead("unplugged".into())),
            Ok(vec![9, 9]),
        ]);

        let outcome = capture.run();

        assert_eq!(outcome.error, Some(CaptureError::StreamRead("unplugged".into())));
        assert_eq!(outcome.buffer.samples().collect::<Vec<_>>(), vec![7, 8]);
    }

    #[test]
    fn mic_loop_does_not_read_when_flag_is_down() {
        let (capture, _) = mic_capture(vec![Ok(vec![1, 1])]);
        capture.flag.try_lower();

        let outcome = capture.run();

        assert!(outcome.buffer.is_empty());
        assert!(outcome.error.is_none());
    }

    #[test]
    fn callback_discards_frames_after_flag_drops() {
        let flag = RecordingFlag::new();
        let buffer = Arc::new(Mutex::new(CaptureBuffer::new(2)));
        let diagnostics = Arc::new(Mutex::new(CaptureSessionDiagnostics::default()));
        let callback = system_frame_callback(Arc::clone(&buffer), 2, flag.clone(), Arc::clone(&diagnostics));

        flag.try_raise();
        callback(&[1, 2, 3, 4][..]);
        flag.try_lower();
        callback(&[5, 6, 7, 8, 9, 10][..]);

        assert_eq!(buffer.lock().samples().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        let d = diagnostics.lock();
        assert_eq!(d.system_callback_count, 1);
        assert_eq!(d.system_frames_discarded, 3);
    }

    #[test]
    fn callback_skips_ragged_buffers() {
        let flag = RecordingFlag::new();
        flag.try_raise();
        let buffer = Arc::new(Mutex::new(CaptureBuffer::new(2)));
        let diagnostics = Arc::new(Mutex::new(CaptureSessionDiagnostics::default()));
        let callback = system_frame_callback(Arc::clone(&buffer), 2, flag, diagnostics);

        callback(&[1, 2, 3][..]);
        callback(&[4, 5][..]);

        assert_eq!(buffer.lock().samples().collect::<Vec<_>>(), vec![4, 5]);
    }

    struct FlakyLoopback {
        fail: bool,
        closed: Arc<AtomicBool>,
    }

    impl LoopbackStream for FlakyLoopback {
        fn check(&mut self) -> Result<(), CaptureError> {
            if self.fail {
                Err(CaptureError::LoopbackStream("render device lost".into()))
            } else {
                Ok(())
            }
        }

        fn close(self: Box<Self>) -> Result<(), CaptureError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn keeper_reports_fault_and_closes_stream() {
        let flag = RecordingFlag::new();
        flag.try_raise();
        let closed = Arc::new(AtomicBool::new(false));
        let buffer = Arc::new(Mutex::new(CaptureBuffer::new(2)));
        buffer.lock().push(AudioChunk::new(vec![1, 2], 2).unwrap()).unwrap();

        let outcome = SystemCapture {
            stream: Box::new(FlakyLoopback {
                fail: true,
                closed: Arc::clone(&closed),
            }),
            buffer: Arc::clone(&buffer),
            flag,
            poll_interval: Duration::from_millis(1),
            delegate: None,
        }
        .run();

        assert!(closed.load(Ordering::SeqCst));
        assert!(matches!(outcome.error, Some(CaptureError::LoopbackStream(_))));
        assert_eq!(outcome.buffer.frame_count(), 1);
        assert!(buffer.lock().is_empty());
    }

    #[test]
    fn keeper_exits_when_flag_drops() {
        let flag = RecordingFlag::new();
        flag.try_raise();
        let closed = Arc::new(AtomicBool::new(false));
        let keeper = SystemCapture {
            stream: Box::new(FlakyLoopback {
                fail: false,
                closed: Arc::clone(&closed),
            }),
            buffer: Arc::new(Mutex::new(CaptureBuffer::new(2))),
            flag: flag.clone(),
            poll_interval: Duration::from_millis(1),
            delegate: None,
        };

        let handle = thread::spawn(move || keeper.run());
        thread::sleep(Duration::from_millis(10));
        flag.try_lower();
        let outcome = handle.join().unwrap();

        assert!(outcome.error.is_none());
        assert!(closed.load(Ordering::SeqCst));
    }
}
