//! Stateful resampling of stream input to the engine rate.

use rubato::{FftFixedIn, Resampler};

const CHUNK_SIZE: usize = 256;

/// Rubato FFT resampler fed in fixed-size chunks.
///
/// Input is buffered until a full chunk is available, so the output does not
/// depend on how callers split the audio.
pub struct StreamResampler {
    from_rate: i32,
    to_rate: i32,
    resampler: FftFixedIn<f32>,
    pending: Vec<f32>,
    chunk_size: usize,
}

impl StreamResampler {
    /// `None` when rubato cannot resample between the two rates.
    pub fn new(from_rate: i32, to_rate: i32) -> Option<Self> {
        if from_rate <= 0 || to_rate <= 0 {
            return None;
        }
        let resampler = match FftFixedIn::<f32>::new(
            from_rate as usize,
            to_rate as usize,
            CHUNK_SIZE,
            2, // Sub-chunks
            1, // Mono
        ) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(from_rate, to_rate, error = %e, "Cannot build resampler");
                return None;
            }
        };
        let chunk_size = resampler.input_frames_next();
        tracing::debug!(from_rate, to_rate, chunk_size, "Resampler created");
        Some(Self {
            from_rate,
            to_rate,
            resampler,
            pending: Vec::with_capacity(chunk_size * 2),
            chunk_size,
        })
    }

    pub fn from_rate(&self) -> i32 {
        self.from_rate
    }

    /// Resample every complete chunk buffered so far.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        self.pending.extend_from_slice(samples);

        let mut output = Vec::new();
        while self.pending.len() >= self.chunk_size {
            let chunk: Vec<f32> = self.pending.drain(..self.chunk_size).collect();
            match self.resampler.process(&[chunk], None) {
                Ok(resampled) => {
                    if let Some(channel) = resampled.first() {
                        output.extend_from_slice(channel);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Resampling failed, chunk dropped"),
            }
        }
        output
    }

    /// Resample the buffered tail. Output is cut to the tail's duration.
    pub fn flush(&mut self) -> Vec<f32> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let tail = std::mem::take(&mut self.pending);
        let expected =
            (tail.len() as u64 * self.to_rate as u64).div_ceil(self.from_rate as u64) as usize;

        match self.resampler.process_partial(Some(&[tail]), None) {
            Ok(resampled) => {
                let mut output = resampled.into_iter().next().unwrap_or_default();
                output.truncate(expected);
                output
            }
            Err(e) => {
                tracing::warn!(error = %e, "Resampling failed, tail dropped");
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for StreamResampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResampler")
            .field("from_rate", &self.from_rate)
            .field("to_rate", &self.to_rate)
            .field("chunk_size", &self.chunk_size)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
