//! The default table applied by [`crate::normalize`].
//!
//! Numeric entries follow the truthy-or-default rule: a caller value of zero
//! counts as unset, so zero can never be requested for these fields. String
//! entries follow the non-empty-or-default rule: an absent value and an
//! explicit empty string both resolve to the default.

pub const SAMPLE_RATE: i32 = 16000;
pub const FEATURE_DIM: i32 = 80;
pub const NUM_THREADS: i32 = 1;
pub const MAX_ACTIVE_PATHS: i32 = 4;
pub const RULE1_MIN_TRAILING_SILENCE: f32 = 2.4;
pub const RULE2_MIN_TRAILING_SILENCE: f32 = 1.2;
pub const RULE3_MIN_UTTERANCE_LENGTH: f32 = 20.0;
pub const HOTWORDS_SCORE: f32 = 1.5;
pub const CTC_FST_MAX_ACTIVE: i32 = 3000;

pub const PROVIDER: &str = "cpu";
pub const MODELING_UNIT: &str = "cjkchar";
pub const DECODING_METHOD: &str = "greedy_search";

/// How a field's caller value is replaced by its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Zero or absent resolves to the default.
    TruthyOr,
    /// Absent or empty string resolves to the default.
    NonEmptyOr,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Int(i32),
    Float(f32),
    Str(&'static str),
}

impl std::fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefaultValue::Int(v) => write!(f, "{v}"),
            DefaultValue::Float(v) => write!(f, "{v}"),
            DefaultValue::Str(v) => write!(f, "\"{v}\""),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDefault {
    /// Dotted path of the field in the sparse configuration.
    pub field: &'static str,
    pub value: DefaultValue,
    pub rule: Rule,
}

const fn int(field: &'static str, value: i32) -> FieldDefault {
    FieldDefault {
        field,
        value: DefaultValue::Int(value),
        rule: Rule::TruthyOr,
    }
}

const fn float(field: &'static str, value: f32) -> FieldDefault {
    FieldDefault {
        field,
        value: DefaultValue::Float(value),
        rule: Rule::TruthyOr,
    }
}

const fn string(field: &'static str, value: &'static str) -> FieldDefault {
    FieldDefault {
        field,
        value: DefaultValue::Str(value),
        rule: Rule::NonEmptyOr,
    }
}

/// Every defaulted field. Fields missing from this table default to zero,
/// `false` or the empty string.
pub const TABLE: &[FieldDefault] = &[
    int("feat_config.sample_rate", SAMPLE_RATE),
    int("feat_config.feature_dim", FEATURE_DIM),
    int("model_config.num_threads", NUM_THREADS),
    string("model_config.provider", PROVIDER),
    string("model_config.modeling_unit", MODELING_UNIT),
    string("decoding_method", DECODING_METHOD),
    int("max_active_paths", MAX_ACTIVE_PATHS),
    float("rule1_min_trailing_silence", RULE1_MIN_TRAILING_SILENCE),
    float("rule2_min_trailing_silence", RULE2_MIN_TRAILING_SILENCE),
    float("rule3_min_utterance_length", RULE3_MIN_UTTERANCE_LENGTH),
    float("hotwords_score", HOTWORDS_SCORE),
    int("ctc_fst_decoder_config.max_active", CTC_FST_MAX_ACTIVE),
];

/// Look up the default for a dotted field path.
pub fn lookup(field: &str) -> Option<&'static FieldDefault> {
    TABLE.iter().find(|d| d.field == field)
}

/// Resolve a numeric caller value against its [`TABLE`] entry.
pub fn resolve_int(field: &str, value: i32) -> i32 {
    match lookup(field).map(|d| d.value) {
        Some(DefaultValue::Int(default)) => value.truthy_or(default),
        _ => {
            tracing::error!(field, "No integer default in table");
            value
        }
    }
}

pub fn resolve_float(field: &str, value: f32) -> f32 {
    match lookup(field).map(|d| d.value) {
        Some(DefaultValue::Float(default)) => value.truthy_or(default),
        _ => {
            tracing::error!(field, "No float default in table");
            value
        }
    }
}

pub fn resolve_str(field: &str, value: &Option<String>) -> String {
    let value = value.clone().unwrap_or_default();
    match lookup(field).map(|d| d.value) {
        Some(DefaultValue::Str(default)) => value.truthy_or(default.to_string()),
        _ => {
            tracing::error!(field, "No string default in table");
            value
        }
    }
}

/// Applies a [`Rule`] to a caller-supplied value.
pub trait TruthyOr: Sized {
    fn truthy_or(self, default: Self) -> Self;
}

impl TruthyOr for i32 {
    fn truthy_or(self, default: Self) -> Self {
        if self != 0 {
            self
        } else {
            default
        }
    }
}

impl TruthyOr for f32 {
    fn truthy_or(self, default: Self) -> Self {
        if self != 0.0 {
            self
        } else {
            default
        }
    }
}

impl TruthyOr for String {
    fn truthy_or(self, default: Self) -> Self {
        if self.is_empty() {
            default
        } else {
            self
        }
    }
}
