//! Interfaces an inference backend implements to sit behind an
//! [`OnlineRecognizer`](crate::OnlineRecognizer).
//!
//! The recognizer owns exactly one [`RecognitionEngine`]; every stream it
//! creates carries a boxed [`EngineStream`] produced by that engine. Engines
//! recover their concrete stream type through [`EngineStream::as_any`].

use std::any::Any;

use ezy_config::OnlineRecognizerConfig;

use crate::{RecognizerResult, Result};

/// Engine-side state of one decoding session.
pub trait EngineStream: Send {
    /// Append samples in `[-1, 1]`. Input at a rate other than the
    /// engine's is resampled by the engine.
    fn accept_waveform(&mut self, sample_rate: i32, samples: &[f32]);

    /// No more samples will follow.
    fn input_finished(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A loaded recognition engine, shared by all streams created from it.
pub trait RecognitionEngine: Send + Sync {
    fn name(&self) -> &str;

    fn create_stream(&self) -> Box<dyn EngineStream>;

    /// Create a stream whose hotword context replaces the configured one.
    fn create_stream_with_hotwords(&self, hotwords: &str) -> Box<dyn EngineStream>;

    /// Whether enough feature frames are buffered for one decode step.
    fn is_ready(&self, stream: &dyn EngineStream) -> bool;

    /// Run one decode step. Callers guarantee `is_ready`.
    fn decode_stream(&self, stream: &mut dyn EngineStream);

    /// Run one decode step on every stream in a single call. Callers
    /// guarantee every stream is ready.
    fn decode_streams(&self, streams: &mut [&mut dyn EngineStream]) {
        for stream in streams.iter_mut() {
            self.decode_stream(&mut **stream);
        }
    }

    fn get_result(&self, stream: &dyn EngineStream) -> RecognizerResult;

    /// Clear decoder state and buffered features, keeping the hotword context.
    fn reset(&self, stream: &mut dyn EngineStream);

    fn is_endpoint(&self, stream: &dyn EngineStream) -> bool;
}

/// Factory for engines.
///
/// Backend crates implement this to register their engine; the recognizer
/// only depends on the abstraction.
pub trait EngineLoader: Send + Sync {
    /// Human-readable name of the backend (e.g. "sherpa-onnx").
    fn name(&self) -> &str;

    /// Check whether this loader handles the given configuration.
    fn can_load(&self, config: &OnlineRecognizerConfig) -> bool;

    /// Build an engine from an already validated configuration.
    fn load(&self, config: &OnlineRecognizerConfig) -> Result<Box<dyn RecognitionEngine>>;
}
