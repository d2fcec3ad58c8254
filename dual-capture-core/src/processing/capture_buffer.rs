use crate::models::error::CaptureError;

/// One block of interleaved 16-bit samples, immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    samples: Box<[i16]>,
    channels: u16,
}

impl AudioChunk {
    /// Wrap `samples`. Fails if they don't form a whole number of frames.
    pub fn new(samples: Vec<i16>, channels: u16) -> Result<Self, CaptureError> {
        if channels == 0 {
            return Err(CaptureError::ConfigurationFailed("chunk with zero channels".into()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(CaptureError::Unknown(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples: samples.into_boxed_slice(),
            channels,
        })
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }
}

/// Append-only, capture-ordered sequence of chunks for one stream.
///
/// Owned by a single capture loop while recording and drained once at stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureBuffer {
    channels: u16,
    chunks: Vec<AudioChunk>,
    frames: u64,
}

impl CaptureBuffer {
    pub fn new(channels: u16) -> Self {
        Self {
            channels,
            chunks: Vec::new(),
            frames: 0,
        }
    }

    /// Append a chunk. Rejects chunks with a different channel layout.
    pub fn push(&mut self, chunk: AudioChunk) -> Result<(), CaptureError> {
        if chunk.channels() != self.channels {
            return Err(CaptureError::Unknown(format!(
                "{}-channel chunk pushed to {}-channel buffer",
                chunk.channels(),
                self.channels
            )));
        }
        self.frames += chunk.frames() as u64;
        self.chunks.push(chunk);
        Ok(())
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    pub fn chunks(&self) -> &[AudioChunk] {
        &self.chunks
    }

    /// All samples in append order.
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.chunks.iter().flat_map(|chunk| chunk.samples().iter().copied())
    }

    /// Move the contents out, leaving an empty buffer with the same layout.
    pub fn take(&mut self) -> CaptureBuffer {
        std::mem::replace(self, CaptureBuffer::new(self.channels))
    }
}
