//! Endpoint detection from decoded length and trailing silence.

use ezy_config::{EndpointConfig, EndpointRule};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoint {
    config: EndpointConfig,
}

impl Endpoint {
    pub fn new(config: EndpointConfig) -> Self {
        Self { config }
    }

    /// True when any of the three rules fires.
    ///
    /// Lengths are given in frames of `frame_shift_ms` milliseconds.
    pub fn is_endpoint(
        &self,
        num_frames_decoded: usize,
        trailing_silence_frames: usize,
        frame_shift_ms: usize,
    ) -> bool {
        let utterance_length = seconds(num_frames_decoded, frame_shift_ms);
        let trailing_silence = seconds(trailing_silence_frames, frame_shift_ms);
        for (i, rule) in self.config.rules().into_iter().enumerate() {
            if rule_activated(rule, trailing_silence, utterance_length) {
                tracing::debug!(
                    rule = i + 1,
                    trailing_silence,
                    utterance_length,
                    "Endpoint detected"
                );
                return true;
            }
        }
        false
    }
}

pub fn rule_activated(rule: &EndpointRule, trailing_silence: f32, utterance_length: f32) -> bool {
    let contains_nonsilence = utterance_length > trailing_silence;
    (contains_nonsilence || !rule.must_contain_nonsilence)
        && trailing_silence >= rule.min_trailing_silence
        && utterance_length >= rule.min_utterance_length
}

fn seconds(frames: usize, frame_shift_ms: usize) -> f32 {
    (frames * frame_shift_ms) as f32 / 1000.0
}
