//! Token table parsing (`sym id` per line).

use std::fs;

use ezy_config::OnlineModelConfig;

use crate::{RecognizerError, Result};

const SPECIAL_SYMBOLS: &[&str] = &[
    "<blk>", "<blank>", "<eps>", "<unk>", "<sos/eos>", "<sos>", "<eos>",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    symbols: Vec<String>,
}

impl Vocabulary {
    /// Load from the in-memory token buffer when present, else from the
    /// tokens file.
    pub fn load(model: &OnlineModelConfig) -> Result<Self> {
        let text = if !model.tokens_buf.is_empty() {
            String::from_utf8_lossy(&model.tokens_buf).into_owned()
        } else {
            fs::read_to_string(&model.tokens).map_err(|e| {
                RecognizerError::LoadFailed(format!("cannot read tokens {:?}: {e}", model.tokens))
            })?
        };
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let symbols: Vec<String> = text
            .lines()
            .filter_map(symbol_of)
            .filter(|sym| !SPECIAL_SYMBOLS.contains(sym))
            .map(str::to_string)
            .collect();
        if symbols.is_empty() {
            return Err(RecognizerError::LoadFailed(
                "token table has no usable symbols".to_string(),
            ));
        }
        Ok(Self { symbols })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Deterministic symbol for a voiced onset of the given energy.
    pub fn pick(&self, energy: f32) -> &str {
        let index = (energy.max(0.0) * 1000.0) as usize % self.symbols.len().max(1);
        self.symbols.get(index).map(String::as_str).unwrap_or_default()
    }
}

fn symbol_of(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.rsplit_once(char::is_whitespace) {
        Some((sym, id)) if id.parse::<i64>().is_ok() => Some(sym.trim_end()),
        _ => Some(line),
    }
}
