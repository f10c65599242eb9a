//! Owned C strings for a native recognizer configuration.

use std::ffi::{c_char, CString};
use std::ptr;

use ezy_config::{OnlineRecognizerConfig, KNOWN_PROVIDERS};

use crate::{Result, SherpaError};

/// Provider name passed to onnxruntime. Unknown names fall back to cpu.
pub fn native_provider(provider: &str) -> &str {
    if KNOWN_PROVIDERS.contains(&provider) {
        provider
    } else {
        tracing::warn!(provider, "Unknown provider, using cpu");
        "cpu"
    }
}

/// Every string of an [`OnlineRecognizerConfig`] as a `CString`. Empty
/// strings become null pointers.
#[derive(Debug)]
pub struct ConfigStrings {
    encoder: Option<CString>,
    decoder: Option<CString>,
    joiner: Option<CString>,
    paraformer_encoder: Option<CString>,
    paraformer_decoder: Option<CString>,
    zipformer2_ctc: Option<CString>,
    tokens: Option<CString>,
    provider: Option<CString>,
    model_type: Option<CString>,
    modeling_unit: Option<CString>,
    bpe_vocab: Option<CString>,
    decoding_method: Option<CString>,
    hotwords_file: Option<CString>,
    ctc_graph: Option<CString>,
    rule_fsts: Option<CString>,
    rule_fars: Option<CString>,
    hr_dict_dir: Option<CString>,
    hr_lexicon: Option<CString>,
    hr_rule_fsts: Option<CString>,
}

impl ConfigStrings {
    pub fn new(config: &OnlineRecognizerConfig) -> Result<Self> {
        let m = &config.model_config;
        Ok(Self {
            encoder: c_string("transducer.encoder", &m.transducer.encoder)?,
            decoder: c_string("transducer.decoder", &m.transducer.decoder)?,
            joiner: c_string("transducer.joiner", &m.transducer.joiner)?,
            paraformer_encoder: c_string("paraformer.encoder", &m.paraformer.encoder)?,
            paraformer_decoder: c_string("paraformer.decoder", &m.paraformer.decoder)?,
            zipformer2_ctc: c_string("zipformer2_ctc.model", &m.zipformer2_ctc.model)?,
            tokens: c_string("tokens", &m.tokens)?,
            provider: c_string("provider", native_provider(&m.provider))?,
            model_type: c_string("model_type", &m.model_type)?,
            modeling_unit: c_string("modeling_unit", &m.modeling_unit)?,
            bpe_vocab: c_string("bpe_vocab", &m.bpe_vocab)?,
            decoding_method: c_string("decoding_method", &config.decoding_method)?,
            hotwords_file: c_string("hotwords_file", &config.hotwords_file)?,
            ctc_graph: c_string(
                "ctc_fst_decoder_config.graph",
                &config.ctc_fst_decoder_config.graph,
            )?,
            rule_fsts: c_string("rule_fsts", &config.rule_fsts)?,
            rule_fars: c_string("rule_fars", &config.rule_fars)?,
            hr_dict_dir: c_string("hr.dict_dir", &config.hr.dict_dir)?,
            hr_lexicon: c_string("hr.lexicon", &config.hr.lexicon)?,
            hr_rule_fsts: c_string("hr.rule_fsts", &config.hr.rule_fsts)?,
        })
    }

    /// Native configuration borrowing from `self` and `config`.
    ///
    /// # Safety
    /// The returned struct holds raw pointers into `self` and into the
    /// buffers of `config`; both must outlive every use of it.
    pub unsafe fn native(
        &self,
        config: &OnlineRecognizerConfig,
    ) -> Result<sherpa_rs_sys::SherpaOnnxOnlineRecognizerConfig> {
        let m = &config.model_config;
        let (tokens_buf, tokens_buf_size) = buffer("tokens_buf", &m.tokens_buf)?;
        let (hotwords_buf, hotwords_buf_size) = buffer("hotwords_buf", &config.hotwords_buf)?;
        let endpoint = &config.endpoint_config;

        Ok(sherpa_rs_sys::SherpaOnnxOnlineRecognizerConfig {
            feat_config: sherpa_rs_sys::SherpaOnnxFeatureConfig {
                sample_rate: config.feat_config.sample_rate,
                feature_dim: config.feat_config.feature_dim,
            },
            model_config: sherpa_rs_sys::SherpaOnnxOnlineModelConfig {
                transducer: sherpa_rs_sys::SherpaOnnxOnlineTransducerModelConfig {
                    encoder: ptr_of(&self.encoder),
                    decoder: ptr_of(&self.decoder),
                    joiner: ptr_of(&self.joiner),
                },
                paraformer: sherpa_rs_sys::SherpaOnnxOnlineParaformerModelConfig {
                    encoder: ptr_of(&self.paraformer_encoder),
                    decoder: ptr_of(&self.paraformer_decoder),
                },
                zipformer2_ctc: sherpa_rs_sys::SherpaOnnxOnlineZipformer2CtcModelConfig {
                    model: ptr_of(&self.zipformer2_ctc),
                },
                tokens: ptr_of(&self.tokens),
                num_threads: m.num_threads,
                provider: ptr_of(&self.provider),
                debug: m.debug as i32,
                model_type: ptr_of(&self.model_type),
                modeling_unit: ptr_of(&self.modeling_unit),
                bpe_vocab: ptr_of(&self.bpe_vocab),
                tokens_buf,
                tokens_buf_size,

                // Unused model family
                nemo_ctc: std::mem::zeroed::<_>(),
            },
            decoding_method: ptr_of(&self.decoding_method),
            max_active_paths: config.max_active_paths,
            enable_endpoint: config.enable_endpoint as i32,
            rule1_min_trailing_silence: endpoint.rule1.min_trailing_silence,
            rule2_min_trailing_silence: endpoint.rule2.min_trailing_silence,
            rule3_min_utterance_length: endpoint.rule3.min_utterance_length,
            hotwords_file: ptr_of(&self.hotwords_file),
            hotwords_score: config.hotwords_score,
            ctc_fst_decoder_config: sherpa_rs_sys::SherpaOnnxOnlineCtcFstDecoderConfig {
                graph: ptr_of(&self.ctc_graph),
                max_active: config.ctc_fst_decoder_config.max_active,
            },
            rule_fsts: ptr_of(&self.rule_fsts),
            rule_fars: ptr_of(&self.rule_fars),
            blank_penalty: config.blank_penalty,
            hotwords_buf,
            hotwords_buf_size,
            hr: sherpa_rs_sys::SherpaOnnxHomophoneReplacerConfig {
                dict_dir: ptr_of(&self.hr_dict_dir),
                lexicon: ptr_of(&self.hr_lexicon),
                rule_fsts: ptr_of(&self.hr_rule_fsts),
            },
        })
    }
}

fn c_string(field: &'static str, value: &str) -> Result<Option<CString>> {
    if value.is_empty() {
        return Ok(None);
    }
    CString::new(value)
        .map(Some)
        .map_err(|_| SherpaError::InvalidString { field })
}

fn ptr_of(value: &Option<CString>) -> *const c_char {
    value.as_ref().map_or(ptr::null(), |s| s.as_ptr())
}

fn buffer(field: &'static str, bytes: &[u8]) -> Result<(*const c_char, i32)> {
    if bytes.is_empty() {
        return Ok((ptr::null(), 0));
    }
    let size = i32::try_from(bytes.len()).map_err(|_| SherpaError::BufferTooLarge(field))?;
    Ok((bytes.as_ptr().cast(), size))
}
