//! C layout of the recognizer configuration.
//!
//! Every field may be left zero or null; [`ezy_config::normalize`] fills in
//! the defaults. Strings are NUL-terminated UTF-8. Buffers are
//! length-delimited and copied only when the pointer is non-null and the
//! size is positive.

use std::ffi::{c_char, CStr};

use ezy_config::{
    RawCtcFstDecoderConfig, RawFeatureConfig, RawHomophoneReplacerConfig, RawModelConfig,
    RawParaformerModelConfig, RawRecognizerConfig, RawTransducerModelConfig,
    RawZipformer2CtcModelConfig,
};

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EzyFeatureConfig {
    /// Expected input sample rate. 0 selects 16000.
    pub sample_rate: i32,
    /// 0 selects 80.
    pub feature_dim: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EzyOnlineTransducerModelConfig {
    pub encoder: *const c_char,
    pub decoder: *const c_char,
    pub joiner: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EzyOnlineParaformerModelConfig {
    pub encoder: *const c_char,
    pub decoder: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EzyOnlineZipformer2CtcModelConfig {
    pub model: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EzyOnlineModelConfig {
    pub transducer: EzyOnlineTransducerModelConfig,
    pub paraformer: EzyOnlineParaformerModelConfig,
    pub zipformer2_ctc: EzyOnlineZipformer2CtcModelConfig,
    pub tokens: *const c_char,
    pub num_threads: i32,
    pub provider: *const c_char,
    /// Non-zero logs the resolved configuration.
    pub debug: i32,
    pub model_type: *const c_char,
    /// `cjkchar`, `bpe` or `cjkchar+bpe`.
    pub modeling_unit: *const c_char,
    pub bpe_vocab: *const c_char,
    /// Token table contents; used instead of `tokens` when non-null.
    pub tokens_buf: *const c_char,
    /// Byte size of `tokens_buf`, excluding any trailing NUL.
    pub tokens_buf_size: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EzyOnlineCtcFstDecoderConfig {
    pub graph: *const c_char,
    pub max_active: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EzyHomophoneReplacerConfig {
    pub dict_dir: *const c_char,
    pub lexicon: *const c_char,
    pub rule_fsts: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EzyOnlineRecognizerConfig {
    pub feat_config: EzyFeatureConfig,
    pub model_config: EzyOnlineModelConfig,
    /// `greedy_search` or `modified_beam_search`.
    pub decoding_method: *const c_char,
    pub max_active_paths: i32,
    /// Non-zero enables endpoint detection.
    pub enable_endpoint: i32,
    pub rule1_min_trailing_silence: f32,
    pub rule2_min_trailing_silence: f32,
    pub rule3_min_utterance_length: f32,
    pub hotwords_file: *const c_char,
    pub hotwords_score: f32,
    pub ctc_fst_decoder_config: EzyOnlineCtcFstDecoderConfig,
    pub rule_fsts: *const c_char,
    pub rule_fars: *const c_char,
    pub blank_penalty: f32,
    /// Hotwords contents; used instead of `hotwords_file` when non-null.
    pub hotwords_buf: *const c_char,
    pub hotwords_buf_size: i32,
    pub hr: EzyHomophoneReplacerConfig,
}

impl Default for EzyOnlineRecognizerConfig {
    /// All pointers null and all numbers zero.
    fn default() -> Self {
        // SAFETY: every field is a raw pointer, an integer or a float, for
        // which all-zero bytes are a valid value.
        unsafe { std::mem::zeroed() }
    }
}

/// Copy a C configuration into its owned, sparse Rust form.
///
/// # Safety
/// Every non-null string must be NUL-terminated and every non-null buffer
/// must be readable for its stated size.
pub(crate) unsafe fn to_raw(c: &EzyOnlineRecognizerConfig) -> RawRecognizerConfig {
    let m = &c.model_config;
    RawRecognizerConfig {
        feat_config: RawFeatureConfig {
            sample_rate: c.feat_config.sample_rate,
            feature_dim: c.feat_config.feature_dim,
        },
        model_config: RawModelConfig {
            transducer: RawTransducerModelConfig {
                encoder: opt_str(m.transducer.encoder),
                decoder: opt_str(m.transducer.decoder),
                joiner: opt_str(m.transducer.joiner),
            },
            paraformer: RawParaformerModelConfig {
                encoder: opt_str(m.paraformer.encoder),
                decoder: opt_str(m.paraformer.decoder),
            },
            zipformer2_ctc: RawZipformer2CtcModelConfig {
                model: opt_str(m.zipformer2_ctc.model),
            },
            tokens: opt_str(m.tokens),
            num_threads: m.num_threads,
            provider: opt_str(m.provider),
            debug: m.debug,
            model_type: opt_str(m.model_type),
            modeling_unit: opt_str(m.modeling_unit),
            bpe_vocab: opt_str(m.bpe_vocab),
            tokens_buf: opt_buf(m.tokens_buf, m.tokens_buf_size),
        },
        decoding_method: opt_str(c.decoding_method),
        max_active_paths: c.max_active_paths,
        enable_endpoint: c.enable_endpoint,
        rule1_min_trailing_silence: c.rule1_min_trailing_silence,
        rule2_min_trailing_silence: c.rule2_min_trailing_silence,
        rule3_min_utterance_length: c.rule3_min_utterance_length,
        hotwords_file: opt_str(c.hotwords_file),
        hotwords_score: c.hotwords_score,
        ctc_fst_decoder_config: RawCtcFstDecoderConfig {
            graph: opt_str(c.ctc_fst_decoder_config.graph),
            max_active: c.ctc_fst_decoder_config.max_active,
        },
        rule_fsts: opt_str(c.rule_fsts),
        rule_fars: opt_str(c.rule_fars),
        blank_penalty: c.blank_penalty,
        hotwords_buf: opt_buf(c.hotwords_buf, c.hotwords_buf_size),
        hr: RawHomophoneReplacerConfig {
            dict_dir: opt_str(c.hr.dict_dir),
            lexicon: opt_str(c.hr.lexicon),
            rule_fsts: opt_str(c.hr.rule_fsts),
        },
    }
}

pub(crate) unsafe fn opt_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

unsafe fn opt_buf(ptr: *const c_char, size: i32) -> Option<Vec<u8>> {
    if ptr.is_null() || size <= 0 {
        return None;
    }
    Some(std::slice::from_raw_parts(ptr.cast::<u8>(), size as usize).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_zeroed_config_is_all_absent() {
        let raw = unsafe { to_raw(&EzyOnlineRecognizerConfig::default()) };
        assert_eq!(raw, RawRecognizerConfig::default());
    }

    #[test]
    fn test_strings_and_numbers_are_copied() {
        let encoder = CString::new("/models/encoder.onnx").unwrap();
        let method = CString::new("modified_beam_search").unwrap();
        let empty = CString::new("").unwrap();

        let mut c = EzyOnlineRecognizerConfig::default();
        c.model_config.transducer.encoder = encoder.as_ptr();
        c.model_config.provider = empty.as_ptr();
        c.decoding_method = method.as_ptr();
        c.max_active_paths = 8;
        c.blank_penalty = 0.5;

        let raw = unsafe { to_raw(&c) };
        assert_eq!(raw.model_config.transducer.encoder.as_deref(), Some("/models/encoder.onnx"));
        assert_eq!(raw.model_config.provider.as_deref(), Some(""));
        assert_eq!(raw.model_config.transducer.decoder, None);
        assert_eq!(raw.decoding_method.as_deref(), Some("modified_beam_search"));
        assert_eq!(raw.max_active_paths, 8);
        assert_eq!(raw.blank_penalty, 0.5);
    }

    #[test]
    fn test_buffers_need_pointer_and_positive_size() {
        let bytes = b"a 0\nb 1\n\0trailing";
        let mut c = EzyOnlineRecognizerConfig::default();

        c.model_config.tokens_buf = bytes.as_ptr().cast();
        c.model_config.tokens_buf_size = 0;
        assert_eq!(unsafe { to_raw(&c) }.model_config.tokens_buf, None);

        c.model_config.tokens_buf_size = -3;
        assert_eq!(unsafe { to_raw(&c) }.model_config.tokens_buf, None);

        c.model_config.tokens_buf_size = 8;
        assert_eq!(
            unsafe { to_raw(&c) }.model_config.tokens_buf.as_deref(),
            Some(&b"a 0\nb 1\n"[..])
        );

        c.model_config.tokens_buf = std::ptr::null();
        assert_eq!(unsafe { to_raw(&c) }.model_config.tokens_buf, None);
    }

    #[test]
    fn test_hotwords_buffer_is_length_delimited() {
        let bytes = b"HELLO\0WORLD";
        let mut c = EzyOnlineRecognizerConfig::default();
        c.hotwords_buf = bytes.as_ptr().cast();
        c.hotwords_buf_size = bytes.len() as i32;
        assert_eq!(unsafe { to_raw(&c) }.hotwords_buf.as_deref(), Some(&bytes[..]));
    }
}
