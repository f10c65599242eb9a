//! Framing and per-frame energy for the reference engine.

use super::resample::StreamResampler;

pub const FRAME_LENGTH_MS: usize = 25;
pub const FRAME_SHIFT_MS: usize = 10;

/// Splits incoming audio into overlapping frames and keeps the RMS energy
/// of every complete frame since the last [`clear`](Self::clear).
#[derive(Debug)]
pub struct FrameExtractor {
    sample_rate: i32,
    /// Present while input arrives at a rate other than `sample_rate`.
    resampler: Option<StreamResampler>,
    window: usize,
    shift: usize,
    /// Samples starting at the next frame boundary.
    pending: Vec<f32>,
    /// Leading samples of `pending` already inside an emitted frame.
    covered: usize,
    energies: Vec<f32>,
    finished: bool,
}

impl FrameExtractor {
    pub fn new(sample_rate: i32) -> Self {
        let per_ms = sample_rate.max(1) as usize / 1000;
        Self {
            sample_rate,
            resampler: None,
            window: (FRAME_LENGTH_MS * per_ms).max(1),
            shift: (FRAME_SHIFT_MS * per_ms).max(1),
            pending: Vec::new(),
            covered: 0,
            energies: Vec::new(),
            finished: false,
        }
    }

    pub fn accept(&mut self, sample_rate: i32, samples: &[f32]) {
        if self.finished {
            return;
        }
        if sample_rate == self.sample_rate {
            self.flush_resampler();
            self.push(samples);
            return;
        }
        if self.resampler.as_ref().map(StreamResampler::from_rate) != Some(sample_rate) {
            self.flush_resampler();
            self.resampler = StreamResampler::new(sample_rate, self.sample_rate);
        }
        match &mut self.resampler {
            Some(resampler) => {
                let resampled = resampler.process(samples);
                self.push(&resampled);
            }
            None => tracing::warn!(
                sample_rate,
                dropped = samples.len(),
                "Unsupported input rate, samples dropped"
            ),
        }
    }

    /// Zero-pad the tail so that leftover samples form one last frame.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.flush_resampler();
        if self.pending.len() > self.covered {
            self.pending.resize(self.window, 0.0);
        }
        self.drain_frames();
        self.pending.clear();
        self.covered = 0;
        self.finished = true;
    }

    pub fn num_frames(&self) -> usize {
        self.energies.len()
    }

    pub fn energy(&self, frame: usize) -> f32 {
        self.energies.get(frame).copied().unwrap_or(0.0)
    }

    pub fn clear(&mut self) {
        self.resampler = None;
        self.pending.clear();
        self.covered = 0;
        self.energies.clear();
        self.finished = false;
    }

    fn push(&mut self, samples: &[f32]) {
        self.pending.extend_from_slice(samples);
        self.drain_frames();
    }

    fn flush_resampler(&mut self) {
        if let Some(mut resampler) = self.resampler.take() {
            let tail = resampler.flush();
            self.push(&tail);
        }
    }

    fn drain_frames(&mut self) {
        let mut start = 0;
        while start + self.window <= self.pending.len() {
            let frame = &self.pending[start..start + self.window];
            let power = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
            self.energies.push(power.sqrt());
            start += self.shift;
        }
        if start > 0 {
            self.pending.drain(..start.min(self.pending.len()));
            self.covered = self.window.saturating_sub(self.shift);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_follows_window_and_shift() {
        let mut fx = FrameExtractor::new(16000);
        fx.accept(16000, &vec![0.0; 399]);
        assert_eq!(fx.num_frames(), 0);
        fx.accept(16000, &[0.0]);
        assert_eq!(fx.num_frames(), 1);
        fx.accept(16000, &vec![0.0; 2400]);
        assert_eq!(fx.num_frames(), 16);
    }

    #[test]
    fn test_split_input_matches_single_chunk() {
        let audio: Vec<f32> = (0..5000).map(|i| ((i % 97) as f32 / 97.0) - 0.5).collect();

        let mut whole = FrameExtractor::new(16000);
        whole.accept(16000, &audio);

        let mut pieces = FrameExtractor::new(16000);
        for chunk in audio.chunks(123) {
            pieces.accept(16000, chunk);
        }

        assert_eq!(whole.num_frames(), pieces.num_frames());
        for i in 0..whole.num_frames() {
            assert!((whole.energy(i) - pieces.energy(i)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_finish_pads_leftover_tail() {
        let mut fx = FrameExtractor::new(16000);
        fx.accept(16000, &vec![0.5; 450]);
        assert_eq!(fx.num_frames(), 1);

        fx.finish();
        assert_eq!(fx.num_frames(), 2);

        fx.accept(16000, &vec![0.5; 4000]);
        assert_eq!(fx.num_frames(), 2, "input after finish is dropped");
    }

    #[test]
    fn test_finish_without_new_samples_adds_nothing() {
        let mut fx = FrameExtractor::new(16000);
        fx.accept(16000, &vec![0.5; 400]);
        fx.finish();
        assert_eq!(fx.num_frames(), 1);
    }

    #[test]
    fn test_energy_of_constant_signal() {
        let mut fx = FrameExtractor::new(16000);
        fx.accept(16000, &vec![0.5; 400]);
        assert!((fx.energy(0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_chunked_resampled_input_frames_like_whole() {
        let audio: Vec<f32> = (0..220_500)
            .map(|i| 0.3 * (i as f32 * 0.02).sin())
            .collect();

        let mut whole = FrameExtractor::new(16000);
        whole.accept(22050, &audio);
        whole.finish();

        let mut chunked = FrameExtractor::new(16000);
        for chunk in audio.chunks(256) {
            chunked.accept(22050, chunk);
        }
        chunked.finish();

        assert_eq!(whole.num_frames(), chunked.num_frames());
        assert!(whole.num_frames().abs_diff(999) <= 5, "{}", whole.num_frames());
        for i in 0..whole.num_frames() {
            assert!((whole.energy(i) - chunked.energy(i)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rate_change_flushes_resampled_tail() {
        let mut fx = FrameExtractor::new(16000);
        fx.accept(48000, &vec![0.5; 4800]);
        fx.accept(16000, &vec![0.5; 1600]);
        fx.finish();
        // 100 ms at 48 kHz plus 100 ms at 16 kHz.
        assert!(fx.num_frames().abs_diff(19) <= 2, "{}", fx.num_frames());
    }
}
