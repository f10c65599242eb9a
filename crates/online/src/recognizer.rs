use std::sync::atomic::{AtomicU64, Ordering};

use ezy_config::{normalize, OnlineRecognizerConfig, RawRecognizerConfig};

use crate::engine::RecognitionEngine;
use crate::loader::LoaderRegistry;
use crate::stream::{OnlineStream, StreamState};
use crate::{RecognizerError, RecognizerResult, Result};

static NEXT_RECOGNIZER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecognizerId(u64);

impl RecognizerId {
    fn next() -> Self {
        Self(NEXT_RECOGNIZER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// A loaded engine plus the configuration it was built from.
///
/// Shared read-only by every stream it creates; streams must not outlive it.
pub struct OnlineRecognizer {
    id: RecognizerId,
    config: OnlineRecognizerConfig,
    engine: Box<dyn RecognitionEngine>,
}

impl OnlineRecognizer {
    /// Validate `config` and load an engine from the first loader that accepts it.
    pub fn new(config: OnlineRecognizerConfig, loaders: &LoaderRegistry) -> Result<Self> {
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Errors in config");
            return Err(e.into());
        }
        let engine = loaders.load(&config)?;
        let id = RecognizerId::next();
        tracing::info!(
            recognizer = id.0,
            engine = engine.name(),
            sample_rate = config.feat_config.sample_rate,
            decoding_method = %config.decoding_method,
            endpoint = config.enable_endpoint,
            "Online recognizer created"
        );
        Ok(Self { id, config, engine })
    }

    /// Resolve defaults for a sparse configuration, then [`new`](Self::new).
    pub fn from_raw(raw: &RawRecognizerConfig, loaders: &LoaderRegistry) -> Result<Self> {
        Self::new(normalize(raw), loaders)
    }

    pub fn id(&self) -> RecognizerId {
        self.id
    }

    pub fn config(&self) -> &OnlineRecognizerConfig {
        &self.config
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn create_stream(&self) -> OnlineStream {
        OnlineStream::new(self.id, self.engine.create_stream(), None)
    }

    /// Create a stream whose hotwords replace the configured ones.
    pub fn create_stream_with_hotwords(&self, hotwords: &str) -> OnlineStream {
        OnlineStream::new(
            self.id,
            self.engine.create_stream_with_hotwords(hotwords),
            Some(hotwords.to_string()),
        )
    }

    pub fn is_ready(&self, stream: &OnlineStream) -> bool {
        self.owns(stream) && self.engine.is_ready(stream.engine_stream())
    }

    /// Run exactly one decode step.
    pub fn decode(&self, stream: &mut OnlineStream) -> Result<()> {
        self.check_owner(stream)?;
        if !self.engine.is_ready(stream.engine_stream()) {
            return Err(RecognizerError::NotReady);
        }
        self.engine.decode_stream(stream.engine_stream_mut());
        Ok(())
    }

    /// Snapshot of the stream's current result.
    pub fn get_result(&self, stream: &OnlineStream) -> Result<RecognizerResult> {
        self.check_owner(stream)?;
        Ok(self.engine.get_result(stream.engine_stream()))
    }

    /// Start a new segment on the same stream.
    pub fn reset(&self, stream: &mut OnlineStream) -> Result<()> {
        self.check_owner(stream)?;
        self.engine.reset(stream.engine_stream_mut());
        stream.clear_finished();
        tracing::debug!(stream = stream.id().get(), "Stream reset");
        Ok(())
    }

    /// Always false when endpointing is disabled.
    pub fn is_endpoint(&self, stream: &OnlineStream) -> bool {
        self.config.enable_endpoint
            && self.owns(stream)
            && self.engine.is_endpoint(stream.engine_stream())
    }

    pub fn state(&self, stream: &OnlineStream) -> StreamState {
        if self.is_ready(stream) {
            StreamState::Ready
        } else if stream.is_input_finished() {
            StreamState::Finished
        } else {
            StreamState::Accepting
        }
    }

    pub(crate) fn engine(&self) -> &dyn RecognitionEngine {
        self.engine.as_ref()
    }

    pub(crate) fn check_owner(&self, stream: &OnlineStream) -> Result<()> {
        if stream.recognizer_id() == self.id {
            Ok(())
        } else {
            Err(RecognizerError::ForeignStream {
                stream: stream.id().get(),
            })
        }
    }

    fn owns(&self, stream: &OnlineStream) -> bool {
        let owned = stream.recognizer_id() == self.id;
        if !owned {
            tracing::warn!(
                stream = stream.id().get(),
                recognizer = self.id.0,
                "Stream belongs to another recognizer"
            );
        }
        owned
    }
}

impl Drop for OnlineRecognizer {
    fn drop(&mut self) {
        tracing::debug!(recognizer = self.id.0, "Online recognizer dropped");
    }
}
