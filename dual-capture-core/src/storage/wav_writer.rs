use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::audio_models::AudioTrackType;
use crate::models::error::CaptureError;
use crate::models::recording_result::TrackResult;
use crate::processing::capture_buffer::CaptureBuffer;
use crate::processing::wav_format::{self, WavSpec, MAX_DATA_SIZE, WAV_HEADER_SIZE};

/// Streaming 16-bit PCM WAV writer.
///
/// ```text
/// [44-byte WAV header, sizes patched on close]
/// [interleaved little-endian i16 samples...]
/// ```
pub struct WavFileWriter {
    file_path: PathBuf,
    spec: WavSpec,
    file: Option<BufWriter<File>>,
    data_bytes: u64,
}

impl WavFileWriter {
    pub fn new(file_path: PathBuf, spec: WavSpec) -> Self {
        Self {
            file_path,
            spec,
            file: None,
            data_bytes: 0,
        }
    }

    /// Create the file (and its directory) and write a placeholder header.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        if self.file.is_some() {
            return Ok(());
        }
        let header = self.spec.header(0)?;

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {}", e)))?;
            }
        }

        let file = File::create(&self.file_path).map_err(|e| {
            CaptureError::StorageError(format!("failed to create {}: {}", self.file_path.display(), e))
        })?;
        let mut file = BufWriter::new(file);
        file.write_all(&header)
            .map_err(|e| CaptureError::StorageError(format!("header write failed: {}", e)))?;

        self.file = Some(file);
        self.data_bytes = 0;
        Ok(())
    }

    /// Append interleaved samples.
    pub fn write_samples(&mut self, samples: &[i16]) -> Result<(), CaptureError> {
        let incoming = samples.len() as u64 * 2;
        if self.data_bytes + incoming > MAX_DATA_SIZE {
            return Err(CaptureError::StorageError(format!(
                "{} exceeds the 4 GiB WAV limit",
                self.file_path.display()
            )));
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is not open for writing".into()))?;
        file.write_all(&wav_format::samples_to_le_bytes(samples))
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;
        self.data_bytes += incoming;
        Ok(())
    }

    /// Patch the header sizes, flush, and return the SHA-256 of the finished file.
    pub fn close(&mut self) -> Result<String, CaptureError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;

        let mut header = self.spec.header(0)?;
        wav_format::patch_sizes(&mut header, self.data_bytes as u32);

        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.write_all(&header))
            .and_then(|_| file.flush())
            .map_err(|e| CaptureError::StorageError(format!("failed to finalize header: {}", e)))?;
        drop(file);

        sha256_file(&self.file_path)
    }

    /// Bytes written so far, header included.
    pub fn bytes_written(&self) -> u64 {
        WAV_HEADER_SIZE as u64 + self.data_bytes
    }
}

/// Serialize a whole capture buffer to `path`, chunks in append order.
pub fn write_track(
    path: &Path,
    track: AudioTrackType,
    sample_rate: u32,
    buffer: &CaptureBuffer,
) -> Result<TrackResult, CaptureError> {
    let spec = WavSpec::new(sample_rate, buffer.channels());
    let mut writer = WavFileWriter::new(path.to_path_buf(), spec);
    writer.open()?;
    for chunk in buffer.chunks() {
        writer.write_samples(chunk.samples())?;
    }
    let checksum = writer.close()?;

    log::info!(
        "Wrote {} track: {} ({} frames, {} bytes)",
        track,
        path.display(),
        buffer.frame_count(),
        writer.bytes_written()
    );

    Ok(TrackResult {
        track,
        file_path: path.to_path_buf(),
        channels: buffer.channels(),
        sample_rate,
        frames: buffer.frame_count(),
        checksum,
    })
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let data =
        fs::read(path).map_err(|e| CaptureError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::capture_buffer::AudioChunk;
    use crate::processing::wav_format::parse_wav_header;

    #[test]
    fn write_plain_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.wav");

        let mut writer = WavFileWriter::new(path.clone(), WavSpec::new(44100, 2));
        writer.open().unwrap();
        writer.write_samples(&[1, -1, 2, -2]).unwrap();
        let checksum = writer.close().unwrap();
        assert_eq!(checksum.len(), 64);

        let file_data = fs::read(&path).unwrap();
        assert_eq!(file_data.len(), 44 + 8);

        let header = parse_wav_header(&file_data).unwrap();
        assert_eq!(header.channels, 2);
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.data_size, 8);
        assert_eq!(header.riff_size, 36 + 8);
        assert_eq!(&file_data[44..], &[1, 0, 0xFF, 0xFF, 2, 0, 0xFE, 0xFF]);
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Audios").join("nested").join("out.wav");

        let mut writer = WavFileWriter::new(path.clone(), WavSpec::new(44100, 1));
        writer.open().unwrap();
        writer.close().unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 44);
    }

    #[test]
    fn write_before_open_fails() {
        let mut writer = WavFileWriter::new(PathBuf::from("never.wav"), WavSpec::new(44100, 1));
        assert!(matches!(writer.write_samples(&[0]), Err(CaptureError::StorageError(_))));
        assert!(matches!(writer.close(), Err(CaptureError::StorageError(_))));
    }

    #[test]
    fn checksum_matches_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sum.wav");

        let mut writer = WavFileWriter::new(path.clone(), WavSpec::new(8000, 1));
        writer.open().unwrap();
        writer.write_samples(&[42; 16]).unwrap();
        let checksum = writer.close().unwrap();

        let expected = hex_encode(&Sha256::digest(fs::read(&path).unwrap()));
        assert_eq!(checksum, expected);
    }

    #[test]
    fn write_track_concatenates_chunks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mic.wav");
        let mut buffer = CaptureBuffer::new(1);
        buffer.push(AudioChunk::new(vec![1, 2], 1).unwrap()).unwrap();
        buffer.push(AudioChunk::new(vec![3], 1).unwrap()).unwrap();

        let track = write_track(&path, AudioTrackType::Mic, 44100, &buffer).unwrap();

        assert_eq!(track.frames, 3);
        assert_eq!(track.channels, 1);
        let file_data = fs::read(&path).unwrap();
        assert_eq!(file_data.len(), 44 + 2 * 3);
        assert_eq!(&file_data[44..], &[1, 0, 2, 0, 3, 0]);
    }

    #[test]
    fn empty_track_is_a_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system.wav");

        let track = write_track(&path, AudioTrackType::System, 44100, &CaptureBuffer::new(2)).unwrap();

        assert_eq!(track.frames, 0);
        let header = parse_wav_header(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(header.channels, 2);
        assert_eq!(header.data_size, 0);
    }

    #[test]
    fn unrepresentable_rate_fails_before_creating_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fast.wav");

        let result = write_track(&path, AudioTrackType::Mic, 200_000_000, &CaptureBuffer::new(2));

        assert!(matches!(result, Err(CaptureError::StorageError(_))));
        assert!(!path.exists());
    }
}
