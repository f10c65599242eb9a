//! Sparse, caller-facing configuration.
//!
//! Every field is optional. Numeric fields use zero for "unset" and string
//! fields use `None`, matching what a zero-initialised C struct carries.

use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::{ConfigError, Result};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawFeatureConfig {
    pub sample_rate: i32,
    pub feature_dim: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawTransducerModelConfig {
    pub encoder: Option<String>,
    pub decoder: Option<String>,
    pub joiner: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawParaformerModelConfig {
    pub encoder: Option<String>,
    pub decoder: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawZipformer2CtcModelConfig {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawModelConfig {
    pub transducer: RawTransducerModelConfig,
    pub paraformer: RawParaformerModelConfig,
    pub zipformer2_ctc: RawZipformer2CtcModelConfig,
    pub tokens: Option<String>,
    pub num_threads: i32,
    pub provider: Option<String>,
    pub debug: i32,
    pub model_type: Option<String>,
    pub modeling_unit: Option<String>,
    pub bpe_vocab: Option<String>,
    /// In-memory token table. Takes precedence over `tokens` when non-empty.
    #[serde(deserialize_with = "buffer_from_str")]
    pub tokens_buf: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawCtcFstDecoderConfig {
    pub graph: Option<String>,
    pub max_active: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawHomophoneReplacerConfig {
    pub dict_dir: Option<String>,
    pub lexicon: Option<String>,
    pub rule_fsts: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawRecognizerConfig {
    pub feat_config: RawFeatureConfig,
    pub model_config: RawModelConfig,
    pub decoding_method: Option<String>,
    pub max_active_paths: i32,
    pub enable_endpoint: i32,
    pub rule1_min_trailing_silence: f32,
    pub rule2_min_trailing_silence: f32,
    pub rule3_min_utterance_length: f32,
    pub hotwords_file: Option<String>,
    pub hotwords_score: f32,
    pub ctc_fst_decoder_config: RawCtcFstDecoderConfig,
    pub rule_fsts: Option<String>,
    pub rule_fars: Option<String>,
    pub blank_penalty: f32,
    /// In-memory hotwords. Takes precedence over `hotwords_file` when non-empty.
    #[serde(deserialize_with = "buffer_from_str")]
    pub hotwords_buf: Option<Vec<u8>>,
    pub hr: RawHomophoneReplacerConfig,
}

impl RawRecognizerConfig {
    /// Parse a sparse configuration from JSON. Missing keys stay unset.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

fn buffer_from_str<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.map(String::into_bytes))
}
