//! sherpa-onnx engine backend.
//!
//! Implements [`ezy_online::RecognitionEngine`] on top of the sherpa-onnx C
//! API through `sherpa-rs-sys`. Register [`SherpaLoader`] in a
//! [`LoaderRegistry`](ezy_online::LoaderRegistry) to use it.

mod config;
mod engine;
mod loader;

pub use config::{native_provider, ConfigStrings};
pub use engine::{RecognizerHandle, SherpaEngine, SherpaStream};
pub use loader::SherpaLoader;

use ezy_online::RecognizerError;

#[derive(Debug, thiserror::Error)]
pub enum SherpaError {
    #[error("{field} contains an interior NUL byte")]
    InvalidString { field: &'static str },
    #[error("{0} is too large")]
    BufferTooLarge(&'static str),
    #[error("SherpaOnnxCreateOnlineRecognizer failed; check the model files and the log")]
    CreateFailed,
}

pub type Result<T> = std::result::Result<T, SherpaError>;

impl From<SherpaError> for RecognizerError {
    fn from(e: SherpaError) -> Self {
        RecognizerError::LoadFailed(e.to_string())
    }
}
