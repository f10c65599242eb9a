use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::EngineStream;
use crate::recognizer::RecognizerId;
use crate::{RecognizerError, Result};

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(u64);

impl StreamId {
    fn next() -> Self {
        Self(NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Where a stream is in the accept/decode protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Waiting for more audio.
    Accepting,
    /// Enough frames are buffered for a decode step.
    Ready,
    /// Input is finished and every frame has been decoded.
    Finished,
}

/// One utterance's decoding session.
///
/// Holds only the id of the recognizer that created it; every operation
/// that needs the engine goes through that [`OnlineRecognizer`](crate::OnlineRecognizer).
pub struct OnlineStream {
    id: StreamId,
    recognizer: RecognizerId,
    inner: Box<dyn EngineStream>,
    hotwords: Option<String>,
    finished: bool,
}

impl OnlineStream {
    pub(crate) fn new(
        recognizer: RecognizerId,
        inner: Box<dyn EngineStream>,
        hotwords: Option<String>,
    ) -> Self {
        let id = StreamId::next();
        tracing::trace!(stream = id.0, recognizer = recognizer.get(), "Stream created");
        Self {
            id,
            recognizer,
            inner,
            hotwords,
            finished: false,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn recognizer_id(&self) -> RecognizerId {
        self.recognizer
    }

    /// Hotwords this stream was created with, if they override the
    /// recognizer's configured ones.
    pub fn hotwords(&self) -> Option<&str> {
        self.hotwords.as_deref()
    }

    /// Append samples in `[-1, 1]` at `sample_rate`.
    pub fn accept_waveform(&mut self, sample_rate: i32, samples: &[f32]) -> Result<()> {
        if self.finished {
            return Err(RecognizerError::InputFinished);
        }
        if sample_rate <= 0 {
            return Err(RecognizerError::InvalidSampleRate(sample_rate));
        }
        self.inner.accept_waveform(sample_rate, samples);
        Ok(())
    }

    /// Signal end of input. Further audio is rejected until reset.
    pub fn input_finished(&mut self) {
        if self.finished {
            return;
        }
        self.inner.input_finished();
        self.finished = true;
        tracing::trace!(stream = self.id.0, "Input finished");
    }

    pub fn is_input_finished(&self) -> bool {
        self.finished
    }

    /// The engine-side stream, for engine-specific inspection.
    pub fn engine_stream(&self) -> &dyn EngineStream {
        self.inner.as_ref()
    }

    pub(crate) fn engine_stream_mut(&mut self) -> &mut dyn EngineStream {
        self.inner.as_mut()
    }

    pub(crate) fn clear_finished(&mut self) {
        self.finished = false;
    }
}

impl Drop for OnlineStream {
    fn drop(&mut self) {
        tracing::trace!(stream = self.id.0, "Stream dropped");
    }
}

impl std::fmt::Debug for OnlineStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnlineStream")
            .field("id", &self.id)
            .field("recognizer", &self.recognizer)
            .field("hotwords", &self.hotwords)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
