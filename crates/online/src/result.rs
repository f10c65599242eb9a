use serde::{Deserialize, Serialize};

/// Snapshot of a stream's decoded output.
///
/// Independent of the stream that produced it. Field order is the JSON
/// field order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognizerResult {
    pub text: String,
    pub tokens: Vec<String>,
    /// Per-token start times in seconds, relative to `start_time`.
    pub timestamps: Vec<f32>,
    /// Index of the current segment; advances when a non-empty result is reset.
    pub segment: i32,
    /// Start of the current segment in seconds from the first sample.
    pub start_time: f32,
    pub is_final: bool,
}

impl RecognizerResult {
    /// Timestamps, only when there is exactly one per token.
    pub fn aligned_timestamps(&self) -> Option<&[f32]> {
        if !self.tokens.is_empty() && self.timestamps.len() == self.tokens.len() {
            Some(&self.timestamps)
        } else {
            None
        }
    }

    /// Render as `{"text", "tokens", "timestamps", "segment", "start_time", "is_final"}`.
    pub fn as_json_string(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize recognizer result");
                String::from("{}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecognizerResult {
        RecognizerResult {
            text: "HELLO WORLD".to_string(),
            tokens: vec!["▁HE".into(), "LLO".into(), "▁WORLD".into()],
            timestamps: vec![0.0, 0.12, 0.48],
            segment: 2,
            start_time: 3.5,
            is_final: true,
        }
    }

    #[test]
    fn test_json_field_set_and_order() {
        let json = sample().as_json_string();
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&json).unwrap();
        let mut keys: Vec<String> = map.keys().cloned().collect();
        let mut expected =
            vec!["text", "tokens", "timestamps", "segment", "start_time", "is_final"];
        expected.sort();
        keys.sort();
        assert_eq!(keys, expected);
        assert!(json.starts_with(r#"{"text":"HELLO WORLD","tokens":["#));
    }

    #[test]
    fn test_json_parses_back() {
        let result = sample();
        let parsed: RecognizerResult = serde_json::from_str(&result.as_json_string()).unwrap();
        assert_eq!(parsed, result);
    }

    #[test]
    fn test_aligned_timestamps() {
        let mut result = sample();
        assert_eq!(result.aligned_timestamps(), Some(&[0.0, 0.12, 0.48][..]));

        result.timestamps.pop();
        assert_eq!(result.aligned_timestamps(), None);

        result.timestamps.clear();
        assert_eq!(result.aligned_timestamps(), None);

        let empty = RecognizerResult::default();
        assert_eq!(empty.aligned_timestamps(), None);
    }
}
