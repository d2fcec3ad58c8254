use std::collections::VecDeque;

/// Regroups variable-sized device packets into fixed-size chunks.
///
/// WASAPI hands out whatever the engine has queued (typically 10ms worth);
/// the microphone stream reads in `chunk_frames` blocks.
#[derive(Debug)]
pub(crate) struct ChunkAssembler {
    pending: VecDeque<i16>,
    chunk_samples: usize,
}

impl ChunkAssembler {
    pub fn new(chunk_samples: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(chunk_samples * 2),
            chunk_samples: chunk_samples.max(1),
        }
    }

    pub fn push(&mut self, samples: &[i16]) {
        self.pending.extend(samples.iter().copied());
    }

    /// Pop one full chunk, if enough samples are pending.
    pub fn next_chunk(&mut self) -> Option<Vec<i16>> {
        if self.pending.len() < self.chunk_samples {
            return None;
        }
        Some(self.pending.drain(..self.chunk_samples).collect())
    }

    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_for_a_full_chunk() {
        let mut assembler = ChunkAssembler::new(4);
        assembler.push(&[1, 2, 3]);
        assert!(assembler.next_chunk().is_none());

        assembler.push(&[4, 5]);
        assert_eq!(assembler.next_chunk(), Some(vec![1, 2, 3, 4]));
        assert!(assembler.next_chunk().is_none());
        assert_eq!(assembler.pending_samples(), 1);
    }

    #[test]
    fn splits_large_packets_in_order() {
        let mut assembler = ChunkAssembler::new(2);
        assembler.push(&[1, 2, 3, 4, 5, 6]);

        assert_eq!(assembler.next_chunk(), Some(vec![1, 2]));
        assert_eq!(assembler.next_chunk(), Some(vec![3, 4]));
        assert_eq!(assembler.next_chunk(), Some(vec![5, 6]));
        assert!(assembler.next_chunk().is_none());
    }
}
