//! Structural validation of a normalized configuration.

use std::path::Path;

use crate::model::{DecodingMethod, ModelFamily, OnlineRecognizerConfig, KNOWN_PROVIDERS};
use crate::{ConfigError, Result};

impl OnlineRecognizerConfig {
    /// Check the configuration before an engine is built from it.
    ///
    /// Referenced files must exist. The first failing check is returned.
    pub fn validate(&self) -> Result<()> {
        self.validate_features()?;
        self.validate_model()?;
        self.validate_decoding()?;
        self.validate_endpoint()?;
        self.validate_graphs()?;
        Ok(())
    }

    fn validate_features(&self) -> Result<()> {
        if self.feat_config.sample_rate <= 0 {
            return Err(invalid("feat_config.sample_rate", self.feat_config.sample_rate));
        }
        if self.feat_config.feature_dim <= 0 {
            return Err(invalid("feat_config.feature_dim", self.feat_config.feature_dim));
        }
        Ok(())
    }

    fn validate_model(&self) -> Result<()> {
        let m = &self.model_config;

        if m.num_threads < 1 {
            return Err(invalid("model_config.num_threads", m.num_threads));
        }

        if m.tokens_buf.is_empty() {
            if m.tokens.is_empty() {
                return Err(ConfigError::MissingTokens);
            }
            require_file("tokens", &m.tokens)?;
        }

        let unit = self.modeling_unit()?;
        if unit.needs_bpe_vocab() {
            require_file("bpe_vocab", &m.bpe_vocab)?;
        }

        match m.family() {
            Some(ModelFamily::Paraformer) => {
                require_file("paraformer encoder", &m.paraformer.encoder)?;
                require_file("paraformer decoder", &m.paraformer.decoder)?;
            }
            Some(ModelFamily::Zipformer2Ctc) => {
                require_file("zipformer2 ctc model", &m.zipformer2_ctc.model)?;
            }
            Some(ModelFamily::Transducer) => {
                require_file("transducer encoder", &m.transducer.encoder)?;
                require_file("transducer decoder", &m.transducer.decoder)?;
                require_file("transducer joiner", &m.transducer.joiner)?;
            }
            None => return Err(ConfigError::NoModel),
        }

        if !KNOWN_PROVIDERS.contains(&m.provider.as_str()) {
            tracing::warn!(
                provider = %m.provider,
                "Unknown execution provider, falling back to cpu"
            );
        }

        Ok(())
    }

    fn validate_decoding(&self) -> Result<()> {
        let method = self.decoding_method()?;

        if method == DecodingMethod::ModifiedBeamSearch && self.max_active_paths < 1 {
            return Err(invalid("max_active_paths", self.max_active_paths));
        }

        if self.has_hotwords() {
            if method != DecodingMethod::ModifiedBeamSearch {
                return Err(ConfigError::HotwordsRequireBeamSearch(
                    self.decoding_method.clone(),
                ));
            }
            if self.hotwords_buf.is_empty() {
                require_file("hotwords_file", &self.hotwords_file)?;
            }
        }

        Ok(())
    }

    fn validate_endpoint(&self) -> Result<()> {
        let e = &self.endpoint_config;
        let checks = [
            ("rule1_min_trailing_silence", e.rule1.min_trailing_silence),
            ("rule2_min_trailing_silence", e.rule2.min_trailing_silence),
            ("rule3_min_utterance_length", e.rule3.min_utterance_length),
        ];
        for (field, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, value));
            }
        }
        Ok(())
    }

    fn validate_graphs(&self) -> Result<()> {
        let fst = &self.ctc_fst_decoder_config;
        if !fst.graph.is_empty() {
            require_file("ctc_fst_decoder_config.graph", &fst.graph)?;
            if fst.max_active < 1 {
                return Err(invalid("ctc_fst_decoder_config.max_active", fst.max_active));
            }
        }

        require_files("rule_fsts", &self.rule_fsts)?;
        require_files("rule_fars", &self.rule_fars)?;

        let hr = &self.hr;
        if !hr.dict_dir.is_empty() && !Path::new(&hr.dict_dir).is_dir() {
            return Err(ConfigError::MissingFile {
                what: "hr.dict_dir",
                path: hr.dict_dir.clone(),
            });
        }
        if !hr.lexicon.is_empty() {
            require_file("hr.lexicon", &hr.lexicon)?;
        }
        require_files("hr.rule_fsts", &hr.rule_fsts)?;

        Ok(())
    }
}

fn invalid(field: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        value: value.to_string(),
    }
}

fn require_file(what: &'static str, path: &str) -> Result<()> {
    if path.is_empty() || !Path::new(path).exists() {
        return Err(ConfigError::MissingFile {
            what,
            path: path.to_string(),
        });
    }
    Ok(())
}

/// Comma-separated file lists; empty entries are skipped.
fn require_files(what: &'static str, list: &str) -> Result<()> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .try_for_each(|p| require_file(what, p))
}
