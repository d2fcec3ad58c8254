/// Sample conversion from a device's float format to the recorder's 16-bit layout.
///
/// Backends that deliver float frames at the device's mix rate and channel
/// count keep one converter per stream and run every packet through it, so
/// both in-memory buffers hold the same representation. The converter is
/// stateful: resampling continues across packet boundaries.
#[derive(Debug, Clone)]
pub struct SampleConverter {
    source_channels: u16,
    target_channels: u16,
    resampler: StreamResampler,
}

impl SampleConverter {
    pub fn new(source_sample_rate: u32, source_channels: u16, target_sample_rate: u32, target_channels: u16) -> Self {
        Self {
            source_channels,
            target_channels,
            resampler: StreamResampler::new(target_channels, source_sample_rate, target_sample_rate),
        }
    }

    /// Remap channels, resample, and quantize the next packet of interleaved float samples.
    pub fn convert(&mut self, samples: &[f32]) -> Vec<i16> {
        let remapped = remap_channels(samples, self.source_channels, self.target_channels);
        f32_to_i16(&self.resampler.process(&remapped))
    }
}

/// Convert f32 samples `[-1.0, 1.0]` to i16. Clamps out-of-range values.
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

/// Change the channel count of interleaved audio.
///
/// Downmixing averages all source channels into each output channel's frame
/// (`to == 1`), or keeps the first `to` channels otherwise. Upmixing copies
/// the source channels cyclically, so mono becomes dual-mono.
pub fn remap_channels(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    let from = from.max(1) as usize;
    let to = to.max(1) as usize;
    if from == to {
        return samples.to_vec();
    }

    let frame_count = samples.len() / from;
    let mut output = Vec::with_capacity(frame_count * to);
    for frame in samples.chunks_exact(from) {
        if to == 1 {
            let sum: f32 = frame.iter().sum();
            output.push(sum / from as f32);
        } else {
            for ch in 0..to {
                output.push(frame[ch % from]);
            }
        }
    }
    output
}

/// Linear interpolation resampler for a continuous interleaved stream.
///
/// The read position is kept in integer ticks of `1 / target_rate` source
/// frames, and the last frame of each packet is held back to interpolate
/// against the first frame of the next one. Splitting a stream into packets
/// therefore produces exactly the output of a single call; the final source
/// frame is only emitted once a following packet arrives.
#[derive(Debug, Clone)]
pub struct StreamResampler {
    channels: usize,
    source_rate: u32,
    target_rate: u32,
    position: u64,
    previous: Vec<f32>,
}

impl StreamResampler {
    pub fn new(channels: u16, source_rate: u32, target_rate: u32) -> Self {
        Self {
            channels: channels.max(1) as usize,
            source_rate,
            target_rate,
            position: 0,
            previous: Vec::new(),
        }
    }

    fn is_passthrough(&self) -> bool {
        self.source_rate == self.target_rate || self.source_rate == 0 || self.target_rate == 0
    }

    /// Resample the next packet. Trailing samples that don't fill a frame are dropped.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        if self.is_passthrough() {
            return samples.to_vec();
        }

        let channels = self.channels;
        let whole = samples.len() / channels * channels;
        let mut frames = Vec::with_capacity(self.previous.len() + whole);
        frames.extend_from_slice(&self.previous);
        frames.extend_from_slice(&samples[..whole]);

        let frame_count = frames.len() / channels;
        if frame_count < 2 {
            self.previous = frames;
            return Vec::new();
        }

        let target = self.target_rate as u64;
        let step = self.source_rate as u64;
        let last = (frame_count - 1) as u64;
        let mut output = Vec::with_capacity(((last * target).saturating_sub(self.position) / step + 1) as usize * channels);

        while self.position / target < last {
            let index = (self.position / target) as usize;
            let fraction = (self.position % target) as f32 / target as f32;
            let (current, next) = (index * channels, (index + 1) * channels);
            for ch in 0..channels {
                let a = frames[current + ch];
                let b = frames[next + ch];
                output.push(a + (b - a) * fraction);
            }
            self.position += step;
        }

        self.position -= last * target;
        self.previous = frames.split_off(last as usize * channels);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn f32_to_i16_full_scale() {
        let pcm = f32_to_i16(&[0.0, 1.0, -1.0, 0.5]);
        assert_eq!(pcm[0], 0);
        assert_eq!(pcm[1], i16::MAX);
        assert_eq!(pcm[2], -i16::MAX);
        assert_eq!(pcm[3], 16383);
    }

    #[test]
    fn f32_to_i16_clamps() {
        assert_eq!(f32_to_i16(&[2.0, -3.0]), vec![i16::MAX, -i16::MAX]);
    }

    #[test]
    fn downmix_stereo_to_mono() {
        let mono = remap_channels(&[0.2, 0.8, 0.4, 0.6], 2, 1);
        assert_eq!(mono.len(), 2);
        assert_relative_eq!(mono[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(mono[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn upmix_mono_to_stereo() {
        assert_eq!(remap_channels(&[0.1, 0.2], 1, 2), vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn surround_to_stereo_keeps_front_pair() {
        let six = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(remap_channels(&six, 6, 2), vec![1.0, 2.0]);
    }

    #[test]
    fn remap_drops_partial_frame() {
        assert_eq!(remap_channels(&[0.1, 0.2, 0.3], 2, 1).len(), 1);
    }

    #[test]
    fn resample_same_rate_is_passthrough() {
        let samples = vec![1.0, 2.0, 3.0];
        assert_eq!(StreamResampler::new(1, 48000, 48000).process(&samples), samples);
    }

    #[test]
    fn resample_upsample_2x() {
        let mut resampler = StreamResampler::new(1, 24000, 48000);
        let result = resampler.process(&[0.0, 1.0]);
        assert_eq!(result.len(), 2);
        assert_relative_eq!(result[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(result[1], 0.5, epsilon = 1e-6);

        // the held-back frame joins the next packet
        let result = resampler.process(&[0.0]);
        assert_eq!(result.len(), 2);
        assert_relative_eq!(result[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(result[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn resample_stereo_keeps_channels_apart() {
        // L ramps 0 → 1, R stays at -1
        let samples = [0.0, -1.0, 1.0, -1.0];
        let result = StreamResampler::new(2, 22050, 44100).process(&samples);
        assert_eq!(result.len(), 4);
        assert_relative_eq!(result[2], 0.5, epsilon = 1e-6);
        assert!(result.iter().skip(1).step_by(2).all(|&r| (r + 1.0).abs() < 1e-6));
    }

    #[test]
    fn resample_downsample_48k_to_44k1() {
        let samples: Vec<f32> = (0..480).map(|i| i as f32 / 480.0).collect();
        let result = StreamResampler::new(1, 48000, 44100).process(&samples);
        assert_eq!(result.len(), 441);
    }

    fn stereo_signal(frames: usize) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let t = i as f32 / 97.0;
                [t.sin(), (t * 0.5).cos()]
            })
            .collect()
    }

    #[test]
    fn packet_boundaries_do_not_change_output() {
        let signal = stereo_signal(2000);
        for (source, target) in [(48000, 44100), (44100, 48000), (16000, 44100)] {
            let whole = StreamResampler::new(2, source, target).process(&signal);

            let mut resampler = StreamResampler::new(2, source, target);
            let mut packets = Vec::new();
            let mut rest = &signal[..];
            for frames in [1usize, 7, 480, 3, 113, 441, 2].iter().cycle() {
                if rest.is_empty() {
                    break;
                }
                let (packet, tail) = rest.split_at((frames * 2).min(rest.len()));
                packets.extend(resampler.process(packet));
                rest = tail;
            }

            assert_eq!(packets, whole, "{} Hz -> {} Hz", source, target);
        }
    }

    #[test]
    fn stream_length_tracks_rate_ratio() {
        let mut resampler = StreamResampler::new(1, 48000, 44100);
        let mut produced = 0;
        for _ in 0..100 {
            produced += resampler.process(&[0.25; 480]).len();
        }
        // 48000 source frames → 44100 output frames, less the held-back frame
        assert!((44099..=44100).contains(&produced), "{} frames", produced);
    }

    #[test]
    fn converter_runs_full_chain() {
        let mut converter = SampleConverter::new(48000, 2, 44100, 1);
        // 48 kHz stereo float → 44.1 kHz mono i16
        let device: Vec<f32> = std::iter::repeat([0.5f32, 0.5f32]).take(480).flatten().collect();
        let out = converter.convert(&device);
        assert_eq!(out.len(), 441);
        assert!(out.iter().all(|&s| s == 16383));
    }
}
