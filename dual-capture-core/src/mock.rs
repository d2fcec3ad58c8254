//! Hardware-free capture providers.
//!
//! Used by the test-suite and by the app's simulation mode. Both mocks emit a
//! per-stream ramp (`frame index % 32000`, same value on every channel), so
//! the order of samples in an output file shows the order they were captured.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::models::audio_models::StreamFormat;
use crate::models::error::CaptureError;
use crate::traits::capture_provider::{
    FrameCallback, InputStream, InputStreamProvider, LoopbackStream, LoopbackStreamProvider,
};

const RAMP_PERIOD: u64 = 32000;

fn ramp_chunk(start_frame: u64, frames: usize, channels: u16) -> Vec<i16> {
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for frame in 0..frames as u64 {
        let value = ((start_frame + frame) % RAMP_PERIOD) as i16;
        samples.extend(std::iter::repeat(value).take(channels as usize));
    }
    samples
}

/// Bookkeeping for one simulated capture device.
#[derive(Debug, Default)]
struct MockDevice {
    in_use: AtomicBool,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// Simulated microphone.
///
/// Each read sleeps for `chunk_delay` before returning a chunk, standing in
/// for the hardware's buffer period. The device can be held by one stream at
/// a time; a second open fails with `DeviceUnavailable`.
#[derive(Debug, Clone)]
pub struct MockInputProvider {
    device: Arc<MockDevice>,
    chunk_delay: Duration,
    open_failure: Option<String>,
    fail_after_chunks: Option<u64>,
}

impl MockInputProvider {
    pub fn new() -> Self {
        Self {
            device: Arc::new(MockDevice::default()),
            chunk_delay: Duration::from_millis(2),
            open_failure: None,
            fail_after_chunks: None,
        }
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Make every open fail with `DeviceUnavailable(reason)`.
    pub fn failing_open(mut self, reason: impl Into<String>) -> Self {
        self.open_failure = Some(reason.into());
        self
    }

    /// Make reads fail with `StreamRead` after `chunks` successful reads.
    pub fn failing_after(mut self, chunks: u64) -> Self {
        self.fail_after_chunks = Some(chunks);
        self
    }

    /// Another provider backed by the same simulated device.
    pub fn share_device(&self) -> Self {
        self.clone()
    }

    pub fn is_in_use(&self) -> bool {
        self.device.in_use.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.device.opened.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.device.closed.load(Ordering::SeqCst)
    }
}

impl Default for MockInputProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InputStreamProvider for MockInputProvider {
    fn open_input_stream(&self, format: &StreamFormat) -> Result<Box<dyn InputStream>, CaptureError> {
        if let Some(ref reason) = self.open_failure {
            return Err(CaptureError::DeviceUnavailable(reason.clone()));
        }
        if self
            .device
            .in_use
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CaptureError::DeviceUnavailable("mock microphone is busy".into()));
        }
        self.device.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockInputStream {
            device: Arc::clone(&self.device),
            format: *format,
            chunk_delay: self.chunk_delay,
            fail_after_chunks: self.fail_after_chunks,
            chunks_read: 0,
            stopped: false,
            released: false,
        }))
    }
}

struct MockInputStream {
    device: Arc<MockDevice>,
    format: StreamFormat,
    chunk_delay: Duration,
    fail_after_chunks: Option<u64>,
    chunks_read: u64,
    stopped: bool,
    released: bool,
}

impl MockInputStream {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.device.closed.fetch_add(1, Ordering::SeqCst);
            self.device.in_use.store(false, Ordering::SeqCst);
        }
    }
}

impl InputStream for MockInputStream {
    fn read_chunk(&mut self) -> Result<Vec<i16>, CaptureError> {
        if self.stopped {
            return Err(CaptureError::StreamRead("stream is stopped".into()));
        }
        if self.fail_after_chunks.is_some_and(|limit| self.chunks_read >= limit) {
            return Err(CaptureError::StreamRead("simulated input overflow".into()));
        }

        thread::sleep(self.chunk_delay);
        let start = self.chunks_read * self.format.chunk_frames as u64;
        self.chunks_read += 1;
        Ok(ramp_chunk(start, self.format.chunk_frames, self.format.channels))
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.stopped = true;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), CaptureError> {
        self.release();
        Ok(())
    }
}

impl Drop for MockInputStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Simulated output-loopback device.
///
/// An opened stream runs its own thread and calls the callback with one
/// chunk every `period`, like a render endpoint's buffer-ready event.
#[derive(Debug, Clone)]
pub struct MockLoopbackProvider {
    period: Duration,
    open_failure: Option<String>,
    fault_after_buffers: Option<u64>,
    opened: Arc<AtomicUsize>,
}

impl MockLoopbackProvider {
    pub fn new() -> Self {
        Self {
            period: Duration::from_millis(2),
            open_failure: None,
            fault_after_buffers: None,
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Make every open fail with `LoopbackStream(reason)`.
    pub fn failing_open(mut self, reason: impl Into<String>) -> Self {
        self.open_failure = Some(reason.into());
        self
    }

    /// Stop delivering and report a fault after `buffers` callbacks.
    pub fn faulting_after(mut self, buffers: u64) -> Self {
        self.fault_after_buffers = Some(buffers);
        self
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Default for MockLoopbackProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackStreamProvider for MockLoopbackProvider {
    fn open_output_loopback_stream(
        &self,
        format: &StreamFormat,
        callback: FrameCallback,
    ) -> Result<Box<dyn LoopbackStream>, CaptureError> {
        if let Some(ref reason) = self.open_failure {
            return Err(CaptureError::LoopbackStream(reason.clone()));
        }

        let running = Arc::new(AtomicBool::new(true));
        let faulted = Arc::new(AtomicBool::new(false));
        let format = *format;
        let period = self.period;
        let fault_after = self.fault_after_buffers;

        let handle = {
            let running = Arc::clone(&running);
            let faulted = Arc::clone(&faulted);
            thread::Builder::new()
                .name("mock-loopback".into())
                .spawn(move || {
                    let mut delivered = 0u64;
                    while running.load(Ordering::SeqCst) {
                        thread::sleep(period);
                        if fault_after.is_some_and(|limit| delivered >= limit) {
                            faulted.store(true, Ordering::SeqCst);
                            break;
                        }
                        let start = delivered * format.chunk_frames as u64;
                        callback(&ramp_chunk(start, format.chunk_frames, format.channels)[..]);
                        delivered += 1;
                    }
                })
                .map_err(|e| CaptureError::LoopbackStream(format!("failed to spawn mock loopback: {}", e)))?
        };

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockLoopbackStream {
            running,
            faulted,
            handle: Some(handle),
        }))
    }
}

struct MockLoopbackStream {
    running: Arc<AtomicBool>,
    faulted: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockLoopbackStream {
    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl LoopbackStream for MockLoopbackStream {
    fn check(&mut self) -> Result<(), CaptureError> {
        if self.faulted.load(Ordering::SeqCst) {
            return Err(CaptureError::LoopbackStream("simulated render device loss".into()));
        }
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), CaptureError> {
        self.shutdown();
        Ok(())
    }
}

impl Drop for MockLoopbackStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn format(channels: u16) -> StreamFormat {
        StreamFormat::new(44100, channels, 4)
    }

    #[test]
    fn ramp_repeats_value_across_channels() {
        assert_eq!(ramp_chunk(10, 2, 2), vec![10, 10, 11, 11]);
        assert_eq!(ramp_chunk(31999, 2, 1), vec![31999, 0]);
    }

    #[test]
    fn input_reads_continue_the_ramp() {
        let provider = MockInputProvider::new().with_chunk_delay(Duration::ZERO);
        let mut stream = provider.open_input_stream(&format(1)).unwrap();

        assert_eq!(stream.read_chunk().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(stream.read_chunk().unwrap(), vec![4, 5, 6, 7]);
    }

    #[test]
    fn input_device_is_exclusive() {
        let provider = MockInputProvider::new();
        let other = provider.share_device();

        let stream = provider.open_input_stream(&format(1)).unwrap();
        assert!(matches!(
            other.open_input_stream(&format(1)),
            Err(CaptureError::DeviceUnavailable(_))
        ));

        stream.close().unwrap();
        assert!(!provider.is_in_use());
        assert!(other.open_input_stream(&format(1)).is_ok());
    }

    #[test]
    fn dropping_stream_releases_device() {
        let provider = MockInputProvider::new();
        drop(provider.open_input_stream(&format(1)).unwrap());
        assert!(!provider.is_in_use());
        assert_eq!(provider.close_count(), 1);
    }

    #[test]
    fn input_failure_injection() {
        let failing = MockInputProvider::new().failing_open("unplugged");
        assert_eq!(
            failing.open_input_stream(&format(1)).err(),
            Some(CaptureError::DeviceUnavailable("unplugged".into()))
        );

        let flaky = MockInputProvider::new()
            .with_chunk_delay(Duration::ZERO)
            .failing_after(1);
        let mut stream = flaky.open_input_stream(&format(1)).unwrap();
        assert!(stream.read_chunk().is_ok());
        assert!(matches!(stream.read_chunk(), Err(CaptureError::StreamRead(_))));
    }

    #[test]
    fn stopped_input_refuses_reads() {
        let provider = MockInputProvider::new();
        let mut stream = provider.open_input_stream(&format(1)).unwrap();
        stream.stop().unwrap();
        assert!(matches!(stream.read_chunk(), Err(CaptureError::StreamRead(_))));
    }

    #[test]
    fn loopback_delivers_until_closed() {
        let received = Arc::new(Mutex::new(Vec::<i16>::new()));
        let sink = Arc::clone(&received);
        let provider = MockLoopbackProvider::new().with_period(Duration::from_millis(1));

        let stream = provider
            .open_output_loopback_stream(&format(2), Arc::new(move |s: &[i16]| sink.lock().extend_from_slice(s)))
            .unwrap();
        thread::sleep(Duration::from_millis(20));
        stream.close().unwrap();

        let after_close = received.lock().len();
        assert!(after_close >= 8);
        assert_eq!(&received.lock()[..4], &[0, 0, 1, 1]);
        thread::sleep(Duration::from_millis(5));
        assert_eq!(received.lock().len(), after_close);
    }

    #[test]
    fn loopback_fault_is_reported_by_check() {
        let provider = MockLoopbackProvider::new()
            .with_period(Duration::from_millis(1))
            .faulting_after(0);
        let mut stream = provider
            .open_output_loopback_stream(&format(2), Arc::new(|_: &[i16]| {}))
            .unwrap();
        thread::sleep(Duration::from_millis(10));
        assert!(matches!(stream.check(), Err(CaptureError::LoopbackStream(_))));
    }

    #[test]
    fn loopback_open_failure() {
        let provider = MockLoopbackProvider::new().failing_open("no render device");
        assert!(matches!(
            provider.open_output_loopback_stream(&format(2), Arc::new(|_: &[i16]| {})),
            Err(CaptureError::LoopbackStream(_))
        ));
        assert_eq!(provider.open_count(), 0);
    }
}
