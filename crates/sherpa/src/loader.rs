use ezy_config::OnlineRecognizerConfig;
use ezy_online::{EngineLoader, RecognitionEngine};

use crate::SherpaEngine;

/// Model type that is never sent to sherpa-onnx.
pub const REFERENCE_MODEL_TYPE: &str = "reference";

/// Loader for sherpa-onnx streaming models.
///
/// Accepts every configuration except `model_type = "reference"`, which is
/// left to the reference engine.
#[derive(Debug, Clone, Default)]
pub struct SherpaLoader;

impl SherpaLoader {
    pub fn new() -> Self {
        Self
    }
}

impl EngineLoader for SherpaLoader {
    fn name(&self) -> &str {
        "sherpa-onnx"
    }

    fn can_load(&self, config: &OnlineRecognizerConfig) -> bool {
        config.model_config.model_type != REFERENCE_MODEL_TYPE
    }

    fn load(
        &self,
        config: &OnlineRecognizerConfig,
    ) -> ezy_online::Result<Box<dyn RecognitionEngine>> {
        let engine = SherpaEngine::new(config)?;
        Ok(Box::new(engine))
    }
}
