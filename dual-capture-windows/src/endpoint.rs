//! Shared-mode WASAPI endpoint plumbing used by both streams.
//!
//! Every COM object here is created and used on the thread that called
//! [`EndpointCapture::open`]; nothing in this module crosses threads.

use windows::core::PCWSTR;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;
use windows::Win32::System::Threading::*;

use dual_capture_core::models::error::CaptureError;

/// Buffer duration requested from the audio engine: 100ms in 100ns units.
const BUFFER_DURATION: i64 = 1_000_000;

/// Which default endpoint to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EndpointKind {
    /// Default capture endpoint (microphone).
    Microphone,
    /// Default render endpoint, opened with the loopback flag.
    Loopback,
}

/// An initialized, started capture client on one endpoint.
pub(crate) struct EndpointCapture {
    audio_client: IAudioClient,
    capture_client: IAudioCaptureClient,
    sample_rate: u32,
    channels: u16,
}

impl EndpointCapture {
    /// Open and start the default endpoint of `kind`.
    ///
    /// Sequence:
    /// 1. Get the default capture/render endpoint
    /// 2. Activate IAudioClient
    /// 3. Initialize in shared mode (loopback flag for render endpoints)
    /// 4. Get IAudioCaptureClient
    /// 5. Start
    ///
    /// COM must already be initialized on the calling thread.
    pub fn open(kind: EndpointKind) -> Result<Self, CaptureError> {
        let not_available = |what: &str, e: windows::core::Error| match kind {
            EndpointKind::Microphone => CaptureError::DeviceUnavailable(format!("{}: {}", what, e)),
            EndpointKind::Loopback => CaptureError::LoopbackStream(format!("{}: {}", what, e)),
        };

        unsafe {
            let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                .map_err(|e| not_available("failed to create device enumerator", e))?;

            let flow = match kind {
                EndpointKind::Microphone => eCapture,
                EndpointKind::Loopback => eRender,
            };
            let device = enumerator
                .GetDefaultAudioEndpoint(flow, eConsole)
                .map_err(|e| not_available("no default endpoint", e))?;

            let audio_client: IAudioClient = device
                .Activate(CLSCTX_ALL, None)
                .map_err(|e| not_available("Activate failed", e))?;

            let mix_format_ptr = audio_client
                .GetMixFormat()
                .map_err(|e| not_available("GetMixFormat failed", e))?;
            let mix_format = &*mix_format_ptr;
            let sample_rate = mix_format.nSamplesPerSec;
            let channels = mix_format.nChannels;
            let float_frames = mix_format.wBitsPerSample == 32 && mix_format.nBlockAlign == channels * 4;

            let stream_flags = match kind {
                EndpointKind::Microphone => AUDCLNT_STREAMFLAGS_NOPERSIST,
                EndpointKind::Loopback => AUDCLNT_STREAMFLAGS_LOOPBACK | AUDCLNT_STREAMFLAGS_NOPERSIST,
            };
            let initialized = audio_client.Initialize(
                AUDCLNT_SHAREMODE_SHARED,
                stream_flags,
                BUFFER_DURATION,
                0,
                mix_format,
                None,
            );
            CoTaskMemFree(Some(mix_format_ptr as *const _ as *const _));
            initialized.map_err(|e| not_available("IAudioClient::Initialize failed", e))?;

            // Shared-mode mix formats are 32-bit float on every supported Windows release.
            if !float_frames {
                return Err(match kind {
                    EndpointKind::Microphone => {
                        CaptureError::DeviceUnavailable("mix format is not 32-bit float".into())
                    }
                    EndpointKind::Loopback => CaptureError::LoopbackStream("mix format is not 32-bit float".into()),
                });
            }

            let capture_client: IAudioCaptureClient = audio_client
                .GetService()
                .map_err(|e| not_available("GetService failed", e))?;

            audio_client
                .Start()
                .map_err(|e| not_available("IAudioClient::Start failed", e))?;

            log::debug!("{:?} endpoint started ({} Hz, {}ch float)", kind, sample_rate, channels);

            Ok(Self {
                audio_client,
                capture_client,
                sample_rate,
                channels,
            })
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Hand every packet currently queued by the engine to `on_packet`.
    ///
    /// Packets flagged silent are delivered as zeros. Returns the error
    /// message of the first failing WASAPI call.
    pub fn drain_packets(&self, mut on_packet: impl FnMut(&[f32])) -> Result<(), String> {
        unsafe {
            let mut packet_length = self
                .capture_client
                .GetNextPacketSize()
                .map_err(|e| format!("GetNextPacketSize failed: {}", e))?;

            while packet_length > 0 {
                let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
                let mut num_frames: u32 = 0;
                let mut flags: u32 = 0;

                self.capture_client
                    .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                    .map_err(|e| format!("GetBuffer failed: {}", e))?;

                if num_frames > 0 && !buffer_ptr.is_null() {
                    let total_samples = num_frames as usize * self.channels as usize;

                    if flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0 {
                        on_packet(&vec![0.0f32; total_samples]);
                    } else {
                        on_packet(std::slice::from_raw_parts(buffer_ptr as *const f32, total_samples));
                    }
                }

                self.capture_client
                    .ReleaseBuffer(num_frames)
                    .map_err(|e| format!("ReleaseBuffer failed: {}", e))?;

                packet_length = self
                    .capture_client
                    .GetNextPacketSize()
                    .map_err(|e| format!("GetNextPacketSize failed: {}", e))?;
            }
        }
        Ok(())
    }
}

impl Drop for EndpointCapture {
    fn drop(&mut self) {
        unsafe {
            let _ = self.audio_client.Stop();
        }
    }
}

/// Initialize COM (MTA) on the current thread; uninitialized when the guard drops.
pub(crate) fn init_com() -> Result<CoUninitializeGuard, String> {
    unsafe {
        CoInitializeEx(None, COINIT_MULTITHREADED)
            .ok()
            .map_err(|e| format!("CoInitializeEx failed: {}", e))?;
    }
    Ok(CoUninitializeGuard)
}

/// Register the current thread with MMCSS for real-time priority. Best effort.
pub(crate) fn register_pro_audio_thread() {
    let mut task_index: u32 = 0;
    let task_name: Vec<u16> = "Pro Audio\0".encode_utf16().collect();
    unsafe {
        if let Err(e) = AvSetMmThreadCharacteristicsW(PCWSTR(task_name.as_ptr()), &mut task_index) {
            log::debug!("MMCSS registration failed: {}", e);
        }
    }
}

/// RAII guard to call CoUninitialize when dropped.
pub(crate) struct CoUninitializeGuard;

impl Drop for CoUninitializeGuard {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}
