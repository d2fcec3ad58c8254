//! WASAPI loopback provider for system audio.
//!
//! Captures the mix going to the default render endpoint using
//! `AUDCLNT_STREAMFLAGS_LOOPBACK`. No special permissions needed on Windows.
//!
//! - Captures the default render device only
//! - DRM-protected audio is silenced in loopback
//! - The engine queues no packets while nothing is playing

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use dual_capture_core::models::audio_models::StreamFormat;
use dual_capture_core::models::error::CaptureError;
use dual_capture_core::processing::convert::SampleConverter;
use dual_capture_core::traits::capture_provider::{FrameCallback, LoopbackStream, LoopbackStreamProvider};

use crate::endpoint::{self, EndpointCapture, EndpointKind};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// WASAPI loopback on the system default render device.
#[derive(Debug, Clone, Default)]
pub struct WasapiLoopbackProvider;

impl WasapiLoopbackProvider {
    pub fn default_device() -> Self {
        Self
    }
}

impl LoopbackStreamProvider for WasapiLoopbackProvider {
    fn open_output_loopback_stream(
        &self,
        format: &StreamFormat,
        callback: FrameCallback,
    ) -> Result<Box<dyn LoopbackStream>, CaptureError> {
        let format = *format;
        let running = Arc::new(AtomicBool::new(true));
        let fault = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), CaptureError>>(1);

        let handle = {
            let running = Arc::clone(&running);
            let fault = Arc::clone(&fault);
            thread::Builder::new()
                .name("wasapi-loopback".into())
                .spawn(move || {
                    let _com = match endpoint::init_com() {
                        Ok(guard) => guard,
                        Err(e) => {
                            let _ = ready_tx.send(Err(CaptureError::LoopbackStream(e)));
                            return;
                        }
                    };
                    let capture = match EndpointCapture::open(EndpointKind::Loopback) {
                        Ok(capture) => capture,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    endpoint::register_pro_audio_thread();
                    let _ = ready_tx.send(Ok(()));

                    let mut converter = SampleConverter::new(
                        capture.sample_rate(),
                        capture.channels(),
                        format.sample_rate,
                        format.channels,
                    );
                    while running.load(Ordering::SeqCst) {
                        thread::sleep(POLL_INTERVAL);
                        let drained = capture.drain_packets(|packet| {
                            let converted = converter.convert(packet);
                            if !converted.is_empty() {
                                callback(&converted[..]);
                            }
                        });
                        if let Err(e) = drained {
                            log::error!("Loopback capture error: {}", e);
                            *fault.lock() = Some(e);
                            break;
                        }
                    }
                })
                .map_err(|e| CaptureError::LoopbackStream(format!("failed to spawn loopback thread: {}", e)))?
        };

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(WasapiLoopbackStream {
                running,
                fault,
                handle: Some(handle),
            })),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::LoopbackStream("loopback thread exited during setup".into()))
            }
        }
    }
}

pub struct WasapiLoopbackStream {
    running: Arc<AtomicBool>,
    fault: Arc<Mutex<Option<String>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl WasapiLoopbackStream {
    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl LoopbackStream for WasapiLoopbackStream {
    fn check(&mut self) -> Result<(), CaptureError> {
        match self.fault.lock().clone() {
            Some(reason) => Err(CaptureError::LoopbackStream(reason)),
            None => Ok(()),
        }
    }

    fn close(mut self: Box<Self>) -> Result<(), CaptureError> {
        self.shutdown();
        Ok(())
    }
}

impl Drop for WasapiLoopbackStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}
