use ezy_config::OnlineRecognizerConfig;

use crate::engine::{EngineLoader, RecognitionEngine};
use crate::{RecognizerError, Result};

/// Ordered set of engine loaders. The first loader whose `can_load`
/// accepts a configuration builds the engine.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: Vec<Box<dyn EngineLoader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a loader with the lowest priority so far.
    pub fn register(&mut self, loader: Box<dyn EngineLoader>) {
        self.loaders.push(loader);
    }

    /// Insert a loader ahead of every registered one.
    pub fn register_first(&mut self, loader: Box<dyn EngineLoader>) {
        self.loaders.insert(0, loader);
    }

    pub fn with(mut self, loader: impl EngineLoader + 'static) -> Self {
        self.register(Box::new(loader));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.loaders.iter().map(|l| l.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    pub fn load(&self, config: &OnlineRecognizerConfig) -> Result<Box<dyn RecognitionEngine>> {
        let loader = self
            .loaders
            .iter()
            .find(|l| l.can_load(config))
            .ok_or(RecognizerError::NoLoader)?;
        tracing::debug!(loader = loader.name(), "Loading engine");
        loader.load(config)
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceLoader;

    struct Never;

    impl EngineLoader for Never {
        fn name(&self) -> &str {
            "never"
        }

        fn can_load(&self, _config: &OnlineRecognizerConfig) -> bool {
            false
        }

        fn load(&self, _config: &OnlineRecognizerConfig) -> Result<Box<dyn RecognitionEngine>> {
            Err(RecognizerError::LoadFailed("never loads".into()))
        }
    }

    fn config() -> OnlineRecognizerConfig {
        let mut config = OnlineRecognizerConfig::default();
        config.model_config.tokens_buf = b"a 0\n".to_vec();
        config
    }

    #[test]
    fn test_empty_registry_has_no_loader() {
        let err = LoaderRegistry::new().load(&config()).err().unwrap();
        assert!(matches!(err, RecognizerError::NoLoader));
    }

    #[test]
    fn test_first_accepting_loader_wins() {
        let registry = LoaderRegistry::new().with(Never).with(ReferenceLoader::new());
        let engine = registry.load(&config()).unwrap();
        assert_eq!(engine.name(), "reference");
    }

    #[test]
    fn test_register_first_takes_priority() {
        let mut registry = LoaderRegistry::new().with(ReferenceLoader::new());
        registry.register_first(Box::new(Never));
        assert_eq!(registry.names(), vec!["never", "reference"]);
    }
}
