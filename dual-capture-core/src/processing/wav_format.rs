//! WAV file format utilities.
//!
//! Generates standard 44-byte RIFF WAV headers, patches the size fields
//! once the data length is known, and parses headers back for checks.

use crate::models::error::CaptureError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Bits per sample for every file this crate writes.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Largest data chunk a RIFF header can describe.
pub const MAX_DATA_SIZE: u64 = u32::MAX as u64 - 36;

/// Format fields of a 16-bit PCM WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

impl WavSpec {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn block_align(&self) -> Result<u16, CaptureError> {
        block_align(self.channels, BITS_PER_SAMPLE)
    }

    pub fn byte_rate(&self) -> Result<u32, CaptureError> {
        byte_rate(self.sample_rate, self.channels, BITS_PER_SAMPLE)
    }

    pub fn header(&self, data_size: u32) -> Result<[u8; WAV_HEADER_SIZE], CaptureError> {
        generate_wav_header(self.sample_rate, BITS_PER_SAMPLE, self.channels, data_size)
    }
}

fn block_align(channels: u16, bit_depth: u16) -> Result<u16, CaptureError> {
    u16::try_from(channels as u32 * bit_depth as u32 / 8)
        .map_err(|_| CaptureError::StorageError(format!("{} channels do not fit a WAV block", channels)))
}

fn byte_rate(sample_rate: u32, channels: u16, bit_depth: u16) -> Result<u32, CaptureError> {
    u32::try_from(sample_rate as u64 * channels as u64 * bit_depth as u64 / 8).map_err(|_| {
        CaptureError::StorageError(format!(
            "byte rate of {} Hz x {} channels does not fit a WAV header",
            sample_rate, channels
        ))
    })
}

/// Generate a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (36 + data_size)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
///
/// Fails with `StorageError` if the byte rate or block align overflow their fields.
pub fn generate_wav_header(
    sample_rate: u32,
    bit_depth: u16,
    channels: u16,
    data_size: u32,
) -> Result<[u8; WAV_HEADER_SIZE], CaptureError> {
    let byte_rate = byte_rate(sample_rate, channels, bit_depth)?;
    let block_align = block_align(channels, bit_depth)?;
    let chunk_size = 36u32.saturating_add(data_size);

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    Ok(header)
}

/// Patch the RIFF chunk size (offset 4) and data size (offset 40) for `data_size` bytes of samples.
pub fn patch_sizes(header: &mut [u8], data_size: u32) {
    header[4..8].copy_from_slice(&36u32.saturating_add(data_size).to_le_bytes());
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
}

/// Header fields read back from a WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub format_code: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub riff_size: u32,
    pub data_size: u32,
}

/// Parse a canonical 44-byte PCM header. Returns `None` if the magic or layout doesn't match.
pub fn parse_wav_header(bytes: &[u8]) -> Option<WavHeader> {
    if bytes.len() < WAV_HEADER_SIZE
        || &bytes[0..4] != b"RIFF"
        || &bytes[8..12] != b"WAVE"
        || &bytes[12..16] != b"fmt "
        || &bytes[36..40] != b"data"
    {
        return None;
    }

    let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
    let u32_at = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

    if u32_at(16) != 16 {
        return None;
    }

    Some(WavHeader {
        format_code: u16_at(20),
        channels: u16_at(22),
        sample_rate: u32_at(24),
        byte_rate: u32_at(28),
        block_align: u16_at(32),
        bits_per_sample: u16_at(34),
        riff_size: u32_at(4),
        data_size: u32_at(40),
    })
}

/// Serialize interleaved samples as little-endian 16-bit PCM.
pub fn samples_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        data.extend_from_slice(&sample.to_le_bytes());
    }
    data
}
