//! Recognizer configuration.
//!
//! Callers hand in a sparse [`RawRecognizerConfig`]; [`normalize`] resolves
//! it against the [`defaults::TABLE`] into an [`OnlineRecognizerConfig`],
//! which is then checked with [`OnlineRecognizerConfig::validate`].

pub mod defaults;
mod model;
mod normalize;
mod raw;
mod report;
mod validate;

pub use model::{
    CtcFstDecoderConfig, DecodingMethod, EndpointConfig, EndpointRule, FeatureConfig,
    HomophoneReplacerConfig, ModelFamily, ModelingUnit, OnlineModelConfig,
    OnlineRecognizerConfig, ParaformerModelConfig, TransducerModelConfig,
    Zipformer2CtcModelConfig, KNOWN_PROVIDERS,
};
pub use normalize::normalize;
pub use raw::{
    RawCtcFstDecoderConfig, RawFeatureConfig, RawHomophoneReplacerConfig, RawModelConfig,
    RawParaformerModelConfig, RawRecognizerConfig, RawTransducerModelConfig,
    RawZipformer2CtcModelConfig,
};
pub use report::{split_report, OHOS_LINE_LIMIT};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("{what} does not exist: {path:?}")]
    MissingFile { what: &'static str, path: String },
    #[error("no model configured: set a transducer, paraformer or zipformer2 ctc model")]
    NoModel,
    #[error("no tokens: set model_config.tokens or model_config.tokens_buf")]
    MissingTokens,
    #[error("unsupported decoding method: {0:?}")]
    UnsupportedDecodingMethod(String),
    #[error("unsupported modeling unit: {0:?}")]
    UnsupportedModelingUnit(String),
    #[error("hotwords require decoding_method=modified_beam_search, got {0:?}")]
    HotwordsRequireBeamSearch(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
