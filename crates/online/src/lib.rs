//! Streaming recognition sessions.
//!
//! An [`OnlineRecognizer`] wraps one loaded [`RecognitionEngine`] and hands
//! out [`OnlineStream`]s. Callers push audio into a stream, decode while the
//! recognizer reports it ready, and read [`RecognizerResult`] snapshots:
//!
//! ```no_run
//! # use ezy_online::{LoaderRegistry, OnlineRecognizer, reference::ReferenceLoader};
//! # use ezy_config::OnlineRecognizerConfig;
//! # fn run(config: OnlineRecognizerConfig, samples: &[f32]) -> ezy_online::Result<()> {
//! let loaders = LoaderRegistry::new().with(ReferenceLoader::new());
//! let recognizer = OnlineRecognizer::new(config, &loaders)?;
//! let mut stream = recognizer.create_stream();
//! stream.accept_waveform(16000, samples)?;
//! stream.input_finished();
//! while recognizer.is_ready(&stream) {
//!     recognizer.decode(&mut stream)?;
//! }
//! println!("{}", recognizer.get_result(&stream)?.text);
//! # Ok(())
//! # }
//! ```

mod batch;
pub mod display;
pub mod endpoint;
pub mod engine;
mod loader;
mod recognizer;
pub mod reference;
mod result;
mod stream;

use ezy_config::ConfigError;

pub use display::Display;
pub use engine::{EngineLoader, EngineStream, RecognitionEngine};
pub use loader::LoaderRegistry;
pub use recognizer::{OnlineRecognizer, RecognizerId};
pub use result::RecognizerResult;
pub use stream::{OnlineStream, StreamId, StreamState};

#[derive(Debug, thiserror::Error)]
pub enum RecognizerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no engine loader accepts this configuration")]
    NoLoader,
    #[error("engine load failed: {0}")]
    LoadFailed(String),
    #[error("stream {stream} was created by another recognizer")]
    ForeignStream { stream: u64 },
    #[error("stream is not ready for decoding")]
    NotReady,
    #[error("stream {index} in the batch is not ready for decoding")]
    NotReadyInBatch { index: usize },
    #[error("empty batch")]
    EmptyBatch,
    #[error("input already finished; reset the stream first")]
    InputFinished,
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(i32),
}

pub type Result<T> = std::result::Result<T, RecognizerError>;
