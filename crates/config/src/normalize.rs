use crate::defaults::{resolve_float, resolve_int, resolve_str};
use crate::model::{
    CtcFstDecoderConfig, EndpointConfig, FeatureConfig, HomophoneReplacerConfig,
    OnlineModelConfig, OnlineRecognizerConfig, ParaformerModelConfig, TransducerModelConfig,
    Zipformer2CtcModelConfig,
};
use crate::raw::RawRecognizerConfig;
use crate::report;

/// Resolve a sparse configuration against the default table.
///
/// Never fails: every field ends up with either the caller's value or its
/// default. Call [`OnlineRecognizerConfig::validate`] on the result before
/// handing it to an engine. When `model_config.debug` is set the resolved
/// configuration is logged.
pub fn normalize(raw: &RawRecognizerConfig) -> OnlineRecognizerConfig {
    let m = &raw.model_config;

    let config = OnlineRecognizerConfig {
        feat_config: FeatureConfig {
            sample_rate: resolve_int("feat_config.sample_rate", raw.feat_config.sample_rate),
            feature_dim: resolve_int("feat_config.feature_dim", raw.feat_config.feature_dim),
        },
        model_config: OnlineModelConfig {
            transducer: TransducerModelConfig {
                encoder: text(&m.transducer.encoder),
                decoder: text(&m.transducer.decoder),
                joiner: text(&m.transducer.joiner),
            },
            paraformer: ParaformerModelConfig {
                encoder: text(&m.paraformer.encoder),
                decoder: text(&m.paraformer.decoder),
            },
            zipformer2_ctc: Zipformer2CtcModelConfig {
                model: text(&m.zipformer2_ctc.model),
            },
            tokens: text(&m.tokens),
            tokens_buf: buffer(&m.tokens_buf),
            num_threads: resolve_int("model_config.num_threads", m.num_threads),
            provider: resolve_str("model_config.provider", &m.provider),
            debug: m.debug != 0,
            model_type: text(&m.model_type),
            modeling_unit: resolve_str("model_config.modeling_unit", &m.modeling_unit),
            bpe_vocab: text(&m.bpe_vocab),
        },
        endpoint_config: EndpointConfig::new(
            resolve_float("rule1_min_trailing_silence", raw.rule1_min_trailing_silence),
            resolve_float("rule2_min_trailing_silence", raw.rule2_min_trailing_silence),
            resolve_float("rule3_min_utterance_length", raw.rule3_min_utterance_length),
        ),
        enable_endpoint: raw.enable_endpoint != 0,
        decoding_method: resolve_str("decoding_method", &raw.decoding_method),
        max_active_paths: resolve_int("max_active_paths", raw.max_active_paths),
        hotwords_file: text(&raw.hotwords_file),
        hotwords_score: resolve_float("hotwords_score", raw.hotwords_score),
        hotwords_buf: buffer(&raw.hotwords_buf),
        blank_penalty: raw.blank_penalty,
        ctc_fst_decoder_config: CtcFstDecoderConfig {
            graph: text(&raw.ctc_fst_decoder_config.graph),
            max_active: resolve_int(
                "ctc_fst_decoder_config.max_active",
                raw.ctc_fst_decoder_config.max_active,
            ),
        },
        rule_fsts: text(&raw.rule_fsts),
        rule_fars: text(&raw.rule_fars),
        hr: HomophoneReplacerConfig {
            dict_dir: text(&raw.hr.dict_dir),
            lexicon: text(&raw.hr.lexicon),
            rule_fsts: text(&raw.hr.rule_fsts),
        },
    };

    if config.model_config.debug {
        report::log(&config);
    }

    config
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Buffers are only taken when they carry at least one byte.
fn buffer(value: &Option<Vec<u8>>) -> Vec<u8> {
    match value {
        Some(bytes) if !bytes.is_empty() => bytes.clone(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{DefaultValue, TABLE};
    use crate::raw::RawRecognizerConfig;

    fn resolved(config: &OnlineRecognizerConfig, field: &str) -> DefaultValue {
        match field {
            "feat_config.sample_rate" => DefaultValue::Int(config.feat_config.sample_rate),
            "feat_config.feature_dim" => DefaultValue::Int(config.feat_config.feature_dim),
            "model_config.num_threads" => DefaultValue::Int(config.model_config.num_threads),
            "max_active_paths" => DefaultValue::Int(config.max_active_paths),
            "rule1_min_trailing_silence" => {
                DefaultValue::Float(config.endpoint_config.rule1.min_trailing_silence)
            }
            "rule2_min_trailing_silence" => {
                DefaultValue::Float(config.endpoint_config.rule2.min_trailing_silence)
            }
            "rule3_min_utterance_length" => {
                DefaultValue::Float(config.endpoint_config.rule3.min_utterance_length)
            }
            "hotwords_score" => DefaultValue::Float(config.hotwords_score),
            "ctc_fst_decoder_config.max_active" => {
                DefaultValue::Int(config.ctc_fst_decoder_config.max_active)
            }
            other => panic!("no resolver for {other}"),
        }
    }

    #[test]
    fn test_every_table_entry_applies_to_empty_config() {
        let config = normalize(&RawRecognizerConfig::default());
        for entry in TABLE {
            match entry.value {
                DefaultValue::Str(expected) => {
                    let actual = match entry.field {
                        "model_config.provider" => config.model_config.provider.as_str(),
                        "model_config.modeling_unit" => config.model_config.modeling_unit.as_str(),
                        "decoding_method" => config.decoding_method.as_str(),
                        other => panic!("no resolver for {other}"),
                    };
                    assert_eq!(actual, expected, "{}", entry.field);
                }
                _ => assert_eq!(resolved(&config, entry.field), entry.value, "{}", entry.field),
            }
        }
    }

    #[test]
    fn test_explicit_nonzero_values_are_preserved() {
        let mut raw = RawRecognizerConfig::default();
        raw.feat_config.sample_rate = 8000;
        raw.feat_config.feature_dim = 40;
        raw.model_config.num_threads = 4;
        raw.max_active_paths = 8;
        raw.rule1_min_trailing_silence = 1.0;
        raw.rule2_min_trailing_silence = 0.5;
        raw.rule3_min_utterance_length = 30.0;
        raw.hotwords_score = 2.0;
        raw.ctc_fst_decoder_config.max_active = 7000;

        let config = normalize(&raw);
        assert_eq!(config.feat_config.sample_rate, 8000);
        assert_eq!(config.feat_config.feature_dim, 40);
        assert_eq!(config.model_config.num_threads, 4);
        assert_eq!(config.max_active_paths, 8);
        assert_eq!(config.endpoint_config.rule1.min_trailing_silence, 1.0);
        assert_eq!(config.endpoint_config.rule2.min_trailing_silence, 0.5);
        assert_eq!(config.endpoint_config.rule3.min_utterance_length, 30.0);
        assert_eq!(config.hotwords_score, 2.0);
        assert_eq!(config.ctc_fst_decoder_config.max_active, 7000);
    }

    #[test]
    fn test_explicit_empty_strings_fall_back() {
        let mut raw = RawRecognizerConfig::default();
        raw.model_config.provider = Some(String::new());
        raw.model_config.modeling_unit = Some(String::new());
        raw.decoding_method = Some(String::new());

        let config = normalize(&raw);
        assert_eq!(config.model_config.provider, "cpu");
        assert_eq!(config.model_config.modeling_unit, "cjkchar");
        assert_eq!(config.decoding_method, "greedy_search");
    }

    #[test]
    fn test_plain_strings_default_to_empty() {
        let config = normalize(&RawRecognizerConfig::default());
        assert!(config.model_config.tokens.is_empty());
        assert!(config.model_config.model_type.is_empty());
        assert!(config.hotwords_file.is_empty());
        assert!(config.hr.dict_dir.is_empty());
        assert!(!config.enable_endpoint);
        assert!(!config.model_config.debug);
        assert_eq!(config.blank_penalty, 0.0);
    }

    #[test]
    fn test_buffers_copied_verbatim() {
        let mut raw = RawRecognizerConfig::default();
        raw.model_config.tokens_buf = Some(b"a 0\n\0b 1".to_vec());
        raw.hotwords_buf = Some(Vec::new());

        let config = normalize(&raw);
        assert_eq!(config.model_config.tokens_buf, b"a 0\n\0b 1");
        assert!(config.hotwords_buf.is_empty());
        assert!(!config.has_hotwords());
    }

    #[test]
    fn test_blank_penalty_is_not_defaulted() {
        let mut raw = RawRecognizerConfig::default();
        raw.blank_penalty = 0.0;
        assert_eq!(normalize(&raw).blank_penalty, 0.0);
        raw.blank_penalty = 1.25;
        assert_eq!(normalize(&raw).blank_penalty, 1.25);
    }

    mod proptests {
        use super::*;
        use crate::defaults;
        use proptest::prelude::*;

        /// Zero half of the time, otherwise any non-zero value.
        fn int_or_zero() -> impl Strategy<Value = i32> {
            prop_oneof![Just(0), any::<i32>().prop_filter("non-zero", |v| *v != 0)]
        }

        fn float_or_zero() -> impl Strategy<Value = f32> {
            prop_oneof![
                Just(0.0f32),
                (-100.0f32..100.0).prop_filter("non-zero", |v| *v != 0.0),
            ]
        }

        fn text_or_empty() -> impl Strategy<Value = Option<String>> {
            prop_oneof![
                Just(None),
                Just(Some(String::new())),
                "[a-z_]{1,12}".prop_map(Some),
            ]
        }

        fn expect_int(value: i32, default: i32) -> i32 {
            if value == 0 {
                default
            } else {
                value
            }
        }

        fn expect_float(value: f32, default: f32) -> f32 {
            if value == 0.0 {
                default
            } else {
                value
            }
        }

        fn expect_text(value: &Option<String>, default: &str) -> String {
            match value.as_deref() {
                None | Some("") => default.to_string(),
                Some(v) => v.to_string(),
            }
        }

        proptest! {
            #[test]
            fn numerics_resolve_truthy_or_default(
                ints in proptest::array::uniform6(int_or_zero()),
                floats in proptest::array::uniform4(float_or_zero()),
                blank_penalty in -10.0f32..10.0,
            ) {
                let mut raw = RawRecognizerConfig::default();
                raw.feat_config.sample_rate = ints[0];
                raw.feat_config.feature_dim = ints[1];
                raw.model_config.num_threads = ints[2];
                raw.max_active_paths = ints[3];
                raw.ctc_fst_decoder_config.max_active = ints[4];
                raw.enable_endpoint = ints[5];
                raw.rule1_min_trailing_silence = floats[0];
                raw.rule2_min_trailing_silence = floats[1];
                raw.rule3_min_utterance_length = floats[2];
                raw.hotwords_score = floats[3];
                raw.blank_penalty = blank_penalty;

                let config = normalize(&raw);
                prop_assert_eq!(
                    config.feat_config.sample_rate,
                    expect_int(ints[0], defaults::SAMPLE_RATE)
                );
                prop_assert_eq!(
                    config.feat_config.feature_dim,
                    expect_int(ints[1], defaults::FEATURE_DIM)
                );
                prop_assert_eq!(
                    config.model_config.num_threads,
                    expect_int(ints[2], defaults::NUM_THREADS)
                );
                prop_assert_eq!(
                    config.max_active_paths,
                    expect_int(ints[3], defaults::MAX_ACTIVE_PATHS)
                );
                prop_assert_eq!(
                    config.ctc_fst_decoder_config.max_active,
                    expect_int(ints[4], defaults::CTC_FST_MAX_ACTIVE)
                );
                prop_assert_eq!(config.enable_endpoint, ints[5] != 0);
                prop_assert_eq!(
                    config.endpoint_config.rule1.min_trailing_silence,
                    expect_float(floats[0], defaults::RULE1_MIN_TRAILING_SILENCE)
                );
                prop_assert_eq!(
                    config.endpoint_config.rule2.min_trailing_silence,
                    expect_float(floats[1], defaults::RULE2_MIN_TRAILING_SILENCE)
                );
                prop_assert_eq!(
                    config.endpoint_config.rule3.min_utterance_length,
                    expect_float(floats[2], defaults::RULE3_MIN_UTTERANCE_LENGTH)
                );
                prop_assert_eq!(
                    config.hotwords_score,
                    expect_float(floats[3], defaults::HOTWORDS_SCORE)
                );
                prop_assert_eq!(config.blank_penalty, blank_penalty);
            }

            #[test]
            fn strings_resolve_non_empty_or_default(
                provider in text_or_empty(),
                modeling_unit in text_or_empty(),
                decoding_method in text_or_empty(),
                tokens in text_or_empty(),
            ) {
                let mut raw = RawRecognizerConfig::default();
                raw.model_config.provider = provider.clone();
                raw.model_config.modeling_unit = modeling_unit.clone();
                raw.decoding_method = decoding_method.clone();
                raw.model_config.tokens = tokens.clone();

                let config = normalize(&raw);
                prop_assert_eq!(
                    config.model_config.provider,
                    expect_text(&provider, defaults::PROVIDER)
                );
                prop_assert_eq!(
                    config.model_config.modeling_unit,
                    expect_text(&modeling_unit, defaults::MODELING_UNIT)
                );
                prop_assert_eq!(
                    config.decoding_method,
                    expect_text(&decoding_method, defaults::DECODING_METHOD)
                );
                prop_assert_eq!(config.model_config.tokens, tokens.unwrap_or_default());
            }
        }
    }
}
