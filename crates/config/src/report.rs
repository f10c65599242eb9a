//! Human-readable rendering of a resolved configuration for debug logs.

use std::fmt;

use crate::model::{EndpointRule, OnlineRecognizerConfig};

/// Log lines are truncated around this length on OpenHarmony.
pub const OHOS_LINE_LIMIT: usize = 128;

impl fmt::Display for EndpointRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "must_contain_nonsilence={} min_trailing_silence={} min_utterance_length={}",
            self.must_contain_nonsilence, self.min_trailing_silence, self.min_utterance_length
        )
    }
}

impl fmt::Display for OnlineRecognizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.model_config;
        writeln!(f, "OnlineRecognizerConfig")?;
        writeln!(
            f,
            "  feat_config: sample_rate={} feature_dim={}",
            self.feat_config.sample_rate, self.feat_config.feature_dim
        )?;
        writeln!(f, "  model_config:")?;
        writeln!(
            f,
            "    transducer: encoder={:?} decoder={:?} joiner={:?}",
            m.transducer.encoder, m.transducer.decoder, m.transducer.joiner
        )?;
        writeln!(
            f,
            "    paraformer: encoder={:?} decoder={:?}",
            m.paraformer.encoder, m.paraformer.decoder
        )?;
        writeln!(f, "    zipformer2_ctc: model={:?}", m.zipformer2_ctc.model)?;
        writeln!(
            f,
            "    tokens={:?} tokens_buf=<{} bytes> num_threads={} provider={:?} debug={}",
            m.tokens,
            m.tokens_buf.len(),
            m.num_threads,
            m.provider,
            m.debug
        )?;
        writeln!(
            f,
            "    model_type={:?} modeling_unit={:?} bpe_vocab={:?}",
            m.model_type, m.modeling_unit, m.bpe_vocab
        )?;
        writeln!(f, "  enable_endpoint={}", self.enable_endpoint)?;
        writeln!(f, "    rule1: {}", self.endpoint_config.rule1)?;
        writeln!(f, "    rule2: {}", self.endpoint_config.rule2)?;
        writeln!(f, "    rule3: {}", self.endpoint_config.rule3)?;
        writeln!(
            f,
            "  decoding_method={:?} max_active_paths={}",
            self.decoding_method, self.max_active_paths
        )?;
        writeln!(
            f,
            "  hotwords: file={:?} buf=<{} bytes> score={}",
            self.hotwords_file,
            self.hotwords_buf.len(),
            self.hotwords_score
        )?;
        writeln!(f, "  blank_penalty={}", self.blank_penalty)?;
        writeln!(
            f,
            "  ctc_fst_decoder_config: graph={:?} max_active={}",
            self.ctc_fst_decoder_config.graph, self.ctc_fst_decoder_config.max_active
        )?;
        writeln!(
            f,
            "  rule_fsts={:?} rule_fars={:?}",
            self.rule_fsts, self.rule_fars
        )?;
        write!(
            f,
            "  hr: dict_dir={:?} lexicon={:?} rule_fsts={:?}",
            self.hr.dict_dir, self.hr.lexicon, self.hr.rule_fsts
        )
    }
}

/// Split a report into lines no longer than `max_len` bytes, cutting on
/// character boundaries.
pub fn split_report(report: &str, max_len: usize) -> Vec<&str> {
    let max_len = max_len.max(4);
    let mut out = Vec::new();
    for line in report.lines() {
        let mut rest = line;
        while rest.len() > max_len {
            let mut cut = max_len;
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            let (head, tail) = rest.split_at(cut);
            out.push(head);
            rest = tail;
        }
        out.push(rest);
    }
    out
}

pub(crate) fn log(config: &OnlineRecognizerConfig) {
    let report = config.to_string();
    if cfg!(target_env = "ohos") {
        for line in split_report(&report, OHOS_LINE_LIMIT) {
            tracing::info!(target: "ezy::config", "{line}");
        }
    } else {
        tracing::info!(target: "ezy::config", "{report}");
    }
}
