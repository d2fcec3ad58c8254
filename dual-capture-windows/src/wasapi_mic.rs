//! WASAPI microphone input provider.
//!
//! Captures the default capture endpoint in shared mode on a dedicated COM
//! thread and exposes it as a blocking, chunked [`InputStream`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use dual_capture_core::models::audio_models::StreamFormat;
use dual_capture_core::models::error::CaptureError;
use dual_capture_core::processing::convert::SampleConverter;
use dual_capture_core::traits::capture_provider::{InputStream, InputStreamProvider};

use crate::chunker::ChunkAssembler;
use crate::endpoint::{self, EndpointCapture, EndpointKind};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// WASAPI microphone on the system default capture device.
///
/// One stream at a time: a second `open_input_stream` while a stream is
/// alive fails with `DeviceUnavailable`.
#[derive(Debug, Clone, Default)]
pub struct WasapiInputProvider {
    in_use: Arc<AtomicBool>,
}

impl WasapiInputProvider {
    pub fn default_device() -> Self {
        Self::default()
    }
}

impl InputStreamProvider for WasapiInputProvider {
    fn open_input_stream(&self, format: &StreamFormat) -> Result<Box<dyn InputStream>, CaptureError> {
        if self
            .in_use
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CaptureError::DeviceUnavailable("microphone is already in use".into()));
        }

        match spawn_capture_thread(*format, Arc::clone(&self.in_use)) {
            Ok(stream) => Ok(Box::new(stream)),
            Err(e) => {
                self.in_use.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }
}

/// Open the endpoint on a new thread and wait for it to report back.
fn spawn_capture_thread(format: StreamFormat, in_use: Arc<AtomicBool>) -> Result<WasapiInputStream, CaptureError> {
    let running = Arc::new(AtomicBool::new(true));
    let fault = Arc::new(Mutex::new(None));
    let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), CaptureError>>(1);
    let (packet_tx, packet_rx) = mpsc::channel::<Vec<i16>>();

    let handle = {
        let running = Arc::clone(&running);
        let fault = Arc::clone(&fault);
        thread::Builder::new()
            .name("wasapi-mic".into())
            .spawn(move || {
                let _com = match endpoint::init_com() {
                    Ok(guard) => guard,
                    Err(e) => {
                        let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(e)));
                        return;
                    }
                };
                let capture = match EndpointCapture::open(EndpointKind::Microphone) {
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
                        let _ = packet_tx.send(converted);
                    });
                    if let Err(e) = drained {
                        log::error!("Microphone capture error: {}", e);
                        *fault.lock() = Some(e);
                        break;
                    }
                }
            })
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to spawn mic thread: {}", e)))?
    };

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(WasapiInputStream {
            in_use,
            running,
            fault,
            packets: packet_rx,
            assembler: ChunkAssembler::new(format.chunk_samples()),
            handle: Some(handle),
            released: false,
        }),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = handle.join();
            Err(CaptureError::DeviceUnavailable("microphone thread exited during setup".into()))
        }
    }
}

/// Blocking microphone stream fed by the `wasapi-mic` thread.
pub struct WasapiInputStream {
    in_use: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    fault: Arc<Mutex<Option<String>>>,
    packets: Receiver<Vec<i16>>,
    assembler: ChunkAssembler,
    handle: Option<thread::JoinHandle<()>>,
    released: bool,
}

impl WasapiInputStream {
    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn release(&mut self) {
        self.shutdown();
        if !self.released {
            self.released = true;
            self.in_use.store(false, Ordering::SeqCst);
        }
    }
}

impl InputStream for WasapiInputStream {
    fn read_chunk(&mut self) -> Result<Vec<i16>, CaptureError> {
        loop {
            if let Some(chunk) = self.assembler.next_chunk() {
                return Ok(chunk);
            }
            if !self.running.load(Ordering::SeqCst) {
                return Err(CaptureError::StreamRead("stream is stopped".into()));
            }

            match self.packets.recv_timeout(POLL_INTERVAL * 10) {
                Ok(packet) => self.assembler.push(&packet),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    let reason = self
                        .fault
                        .lock()
                        .take()
                        .unwrap_or_else(|| "capture thread exited".to_string());
                    return Err(CaptureError::StreamRead(reason));
                }
            }
        }
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.shutdown();
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), CaptureError> {
        self.release();
        Ok(())
    }
}

impl Drop for WasapiInputStream {
    fn drop(&mut self) {
        self.release();
    }
}
