//! Fully-populated recognizer configuration produced by [`crate::normalize`].

use std::str::FromStr;

use serde::Serialize;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureConfig {
    pub sample_rate: i32,
    pub feature_dim: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransducerModelConfig {
    pub encoder: String,
    pub decoder: String,
    pub joiner: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParaformerModelConfig {
    pub encoder: String,
    pub decoder: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Zipformer2CtcModelConfig {
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnlineModelConfig {
    pub transducer: TransducerModelConfig,
    pub paraformer: ParaformerModelConfig,
    pub zipformer2_ctc: Zipformer2CtcModelConfig,
    pub tokens: String,
    /// Raw token table bytes, copied verbatim. Empty when not supplied.
    pub tokens_buf: Vec<u8>,
    pub num_threads: i32,
    pub provider: String,
    pub debug: bool,
    pub model_type: String,
    pub modeling_unit: String,
    pub bpe_vocab: String,
}

impl OnlineModelConfig {
    /// The model family the engine will load, checked in the same order
    /// the engine checks it: paraformer, then zipformer2 CTC, then transducer.
    pub fn family(&self) -> Option<ModelFamily> {
        if !self.paraformer.encoder.is_empty() {
            Some(ModelFamily::Paraformer)
        } else if !self.zipformer2_ctc.model.is_empty() {
            Some(ModelFamily::Zipformer2Ctc)
        } else if !self.transducer.encoder.is_empty() {
            Some(ModelFamily::Transducer)
        } else {
            None
        }
    }
}

/// A single endpointing rule.
///
/// The rule fires when trailing silence and utterance length both reach
/// their minimums, and, if `must_contain_nonsilence` is set, something other
/// than silence has been decoded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EndpointRule {
    pub must_contain_nonsilence: bool,
    pub min_trailing_silence: f32,
    pub min_utterance_length: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EndpointConfig {
    pub rule1: EndpointRule,
    pub rule2: EndpointRule,
    pub rule3: EndpointRule,
}

impl EndpointConfig {
    pub fn new(rule1_silence: f32, rule2_silence: f32, rule3_length: f32) -> Self {
        Self {
            rule1: EndpointRule {
                must_contain_nonsilence: false,
                min_trailing_silence: rule1_silence,
                min_utterance_length: 0.0,
            },
            rule2: EndpointRule {
                must_contain_nonsilence: true,
                min_trailing_silence: rule2_silence,
                min_utterance_length: 0.0,
            },
            rule3: EndpointRule {
                must_contain_nonsilence: false,
                min_trailing_silence: 0.0,
                min_utterance_length: rule3_length,
            },
        }
    }

    pub fn rules(&self) -> [&EndpointRule; 3] {
        [&self.rule1, &self.rule2, &self.rule3]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CtcFstDecoderConfig {
    pub graph: String,
    pub max_active: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HomophoneReplacerConfig {
    pub dict_dir: String,
    pub lexicon: String,
    pub rule_fsts: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnlineRecognizerConfig {
    pub feat_config: FeatureConfig,
    pub model_config: OnlineModelConfig,
    pub endpoint_config: EndpointConfig,
    pub enable_endpoint: bool,
    pub decoding_method: String,
    pub max_active_paths: i32,
    pub hotwords_file: String,
    pub hotwords_score: f32,
    /// Raw hotwords bytes, copied verbatim. Empty when not supplied.
    pub hotwords_buf: Vec<u8>,
    pub blank_penalty: f32,
    pub ctc_fst_decoder_config: CtcFstDecoderConfig,
    pub rule_fsts: String,
    pub rule_fars: String,
    pub hr: HomophoneReplacerConfig,
}

impl Default for OnlineRecognizerConfig {
    fn default() -> Self {
        crate::normalize(&crate::RawRecognizerConfig::default())
    }
}

impl OnlineRecognizerConfig {
    pub fn decoding_method(&self) -> Result<DecodingMethod, ConfigError> {
        self.decoding_method.parse()
    }

    pub fn modeling_unit(&self) -> Result<ModelingUnit, ConfigError> {
        self.model_config.modeling_unit.parse()
    }

    /// True when hotwords were supplied either as a file or as a buffer.
    pub fn has_hotwords(&self) -> bool {
        !self.hotwords_file.is_empty() || !self.hotwords_buf.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Transducer,
    Paraformer,
    Zipformer2Ctc,
}

impl ModelFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Transducer => "transducer",
            ModelFamily::Paraformer => "paraformer",
            ModelFamily::Zipformer2Ctc => "zipformer2_ctc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodingMethod {
    GreedySearch,
    ModifiedBeamSearch,
}

impl DecodingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodingMethod::GreedySearch => "greedy_search",
            DecodingMethod::ModifiedBeamSearch => "modified_beam_search",
        }
    }
}

impl FromStr for DecodingMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greedy_search" => Ok(DecodingMethod::GreedySearch),
            "modified_beam_search" => Ok(DecodingMethod::ModifiedBeamSearch),
            other => Err(ConfigError::UnsupportedDecodingMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelingUnit {
    CjkChar,
    Bpe,
    CjkCharBpe,
}

impl ModelingUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelingUnit::CjkChar => "cjkchar",
            ModelingUnit::Bpe => "bpe",
            ModelingUnit::CjkCharBpe => "cjkchar+bpe",
        }
    }

    pub fn needs_bpe_vocab(&self) -> bool {
        matches!(self, ModelingUnit::Bpe | ModelingUnit::CjkCharBpe)
    }
}

impl FromStr for ModelingUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cjkchar" => Ok(ModelingUnit::CjkChar),
            "bpe" => Ok(ModelingUnit::Bpe),
            "cjkchar+bpe" => Ok(ModelingUnit::CjkCharBpe),
            other => Err(ConfigError::UnsupportedModelingUnit(other.to_string())),
        }
    }
}

/// Execution providers understood by the native engine. Anything else runs
/// on the CPU.
pub const KNOWN_PROVIDERS: &[&str] =
    &["cpu", "cuda", "coreml", "xnnpack", "nnapi", "trt", "directml"];
