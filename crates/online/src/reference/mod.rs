//! Deterministic, model-free engine.
//!
//! Frames audio, marks frames voiced or silent by energy and emits one
//! vocabulary token at each silence-to-voice onset. Useful for exercising the
//! session protocol without native model files.

mod features;
mod resample;
mod vocab;

use std::any::Any;
use std::fs;
use std::sync::Arc;

use ezy_config::OnlineRecognizerConfig;

use crate::endpoint::Endpoint;
use crate::engine::{EngineLoader, EngineStream, RecognitionEngine};
use crate::{RecognizerError, RecognizerResult, Result};

pub use features::{FrameExtractor, FRAME_LENGTH_MS, FRAME_SHIFT_MS};
pub use resample::StreamResampler;
pub use vocab::Vocabulary;

pub const DEFAULT_CHUNK_FRAMES: usize = 16;

/// Frames with RMS energy at or above this are voiced.
pub const VOICED_RMS: f32 = 0.01;

pub struct ReferenceEngine {
    sample_rate: i32,
    chunk_frames: usize,
    endpoint: Option<Endpoint>,
    vocab: Vocabulary,
    hotwords: Arc<[String]>,
}

impl ReferenceEngine {
    pub fn new(config: &OnlineRecognizerConfig) -> Result<Self> {
        let vocab = Vocabulary::load(&config.model_config)?;
        let hotwords = load_hotwords(config)?;
        Ok(Self {
            sample_rate: config.feat_config.sample_rate,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            endpoint: config
                .enable_endpoint
                .then(|| Endpoint::new(config.endpoint_config)),
            vocab,
            hotwords: hotwords.into(),
        })
    }

    pub fn with_chunk_frames(mut self, chunk_frames: usize) -> Self {
        self.chunk_frames = chunk_frames.max(1);
        self
    }

    pub fn chunk_frames(&self) -> usize {
        self.chunk_frames
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    fn new_stream(&self, hotwords: Arc<[String]>) -> Box<dyn EngineStream> {
        Box::new(ReferenceStream {
            features: FrameExtractor::new(self.sample_rate),
            num_processed: 0,
            in_voice: false,
            trailing_silence: 0,
            tokens: Vec::new(),
            timestamps: Vec::new(),
            segment: 0,
            start_frame: 0,
            finished: false,
            hotwords,
        })
    }

    fn step(&self, s: &mut ReferenceStream, frame: usize) {
        let energy = s.features.energy(frame);
        if energy >= VOICED_RMS {
            if !s.in_voice {
                s.tokens.push(self.vocab.pick(energy).to_string());
                s.timestamps.push(seconds(frame));
            }
            s.in_voice = true;
            s.trailing_silence = 0;
        } else {
            s.in_voice = false;
            s.trailing_silence += 1;
        }
    }

    fn ready(&self, s: &ReferenceStream) -> bool {
        let available = s.features.num_frames() - s.num_processed;
        available >= self.chunk_frames || (s.finished && available > 0)
    }

    fn endpoint_reached(&self, s: &ReferenceStream) -> bool {
        match &self.endpoint {
            Some(endpoint) => {
                endpoint.is_endpoint(s.num_processed, s.trailing_silence, FRAME_SHIFT_MS)
            }
            None => false,
        }
    }
}

impl RecognitionEngine for ReferenceEngine {
    fn name(&self) -> &str {
        "reference"
    }

    fn create_stream(&self) -> Box<dyn EngineStream> {
        self.new_stream(Arc::clone(&self.hotwords))
    }

    fn create_stream_with_hotwords(&self, hotwords: &str) -> Box<dyn EngineStream> {
        self.new_stream(parse_hotwords(hotwords).into())
    }

    fn is_ready(&self, stream: &dyn EngineStream) -> bool {
        downcast(stream).is_some_and(|s| self.ready(s))
    }

    fn decode_stream(&self, stream: &mut dyn EngineStream) {
        let Some(s) = downcast_mut(stream) else {
            return;
        };
        let end = (s.num_processed + self.chunk_frames).min(s.features.num_frames());
        for frame in s.num_processed..end {
            self.step(s, frame);
        }
        s.num_processed = end;
    }

    fn get_result(&self, stream: &dyn EngineStream) -> RecognizerResult {
        let Some(s) = downcast(stream) else {
            return RecognizerResult::default();
        };
        let text = s.tokens.concat().replace('▁', " ").trim().to_string();
        RecognizerResult {
            text,
            tokens: s.tokens.clone(),
            timestamps: s.timestamps.clone(),
            segment: s.segment,
            start_time: seconds(s.start_frame),
            is_final: self.endpoint_reached(s) || (s.finished && !self.ready(s)),
        }
    }

    fn reset(&self, stream: &mut dyn EngineStream) {
        let Some(s) = downcast_mut(stream) else {
            return;
        };
        if !s.tokens.is_empty() {
            s.segment += 1;
        }
        s.start_frame += s.num_processed;
        s.features.clear();
        s.num_processed = 0;
        s.in_voice = false;
        s.trailing_silence = 0;
        s.tokens.clear();
        s.timestamps.clear();
        s.finished = false;
    }

    fn is_endpoint(&self, stream: &dyn EngineStream) -> bool {
        downcast(stream).is_some_and(|s| self.endpoint_reached(s))
    }
}

pub struct ReferenceStream {
    features: FrameExtractor,
    /// Frames decoded since the last reset.
    num_processed: usize,
    in_voice: bool,
    trailing_silence: usize,
    tokens: Vec<String>,
    timestamps: Vec<f32>,
    segment: i32,
    /// Frames decoded in earlier segments.
    start_frame: usize,
    finished: bool,
    hotwords: Arc<[String]>,
}

impl ReferenceStream {
    pub fn hotwords(&self) -> &[String] {
        &self.hotwords
    }
}

impl EngineStream for ReferenceStream {
    fn accept_waveform(&mut self, sample_rate: i32, samples: &[f32]) {
        self.features.accept(sample_rate, samples);
    }

    fn input_finished(&mut self) {
        self.features.finish();
        self.finished = true;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Loads a [`ReferenceEngine`] for any valid configuration.
///
/// Registered last so that native backends get the first chance.
#[derive(Debug, Clone)]
pub struct ReferenceLoader {
    chunk_frames: usize,
}

impl ReferenceLoader {
    pub fn new() -> Self {
        Self {
            chunk_frames: DEFAULT_CHUNK_FRAMES,
        }
    }

    pub fn with_chunk_frames(chunk_frames: usize) -> Self {
        Self {
            chunk_frames: chunk_frames.max(1),
        }
    }
}

impl Default for ReferenceLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineLoader for ReferenceLoader {
    fn name(&self) -> &str {
        "reference"
    }

    fn can_load(&self, _config: &OnlineRecognizerConfig) -> bool {
        true
    }

    fn load(&self, config: &OnlineRecognizerConfig) -> Result<Box<dyn RecognitionEngine>> {
        let engine = ReferenceEngine::new(config)?.with_chunk_frames(self.chunk_frames);
        tracing::info!(
            vocabulary = engine.vocabulary().len(),
            chunk_frames = engine.chunk_frames(),
            "Reference engine loaded"
        );
        Ok(Box::new(engine))
    }
}

fn downcast(stream: &dyn EngineStream) -> Option<&ReferenceStream> {
    let s = stream.as_any().downcast_ref::<ReferenceStream>();
    if s.is_none() {
        tracing::warn!("Stream was not created by the reference engine");
    }
    s
}

fn downcast_mut(stream: &mut dyn EngineStream) -> Option<&mut ReferenceStream> {
    let s = stream.as_any_mut().downcast_mut::<ReferenceStream>();
    if s.is_none() {
        tracing::warn!("Stream was not created by the reference engine");
    }
    s
}

fn load_hotwords(config: &OnlineRecognizerConfig) -> Result<Vec<String>> {
    if !config.hotwords_buf.is_empty() {
        return Ok(parse_hotwords(&String::from_utf8_lossy(&config.hotwords_buf)));
    }
    if config.hotwords_file.is_empty() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(&config.hotwords_file).map_err(|e| {
        RecognizerError::LoadFailed(format!(
            "cannot read hotwords {:?}: {e}",
            config.hotwords_file
        ))
    })?;
    Ok(parse_hotwords(&text))
}

/// One phrase per line; `/` also separates phrases in inline hotwords.
fn parse_hotwords(text: &str) -> Vec<String> {
    text.split(['\n', '/'])
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .map(str::to_string)
        .collect()
}

fn seconds(frames: usize) -> f32 {
    (frames * FRAME_SHIFT_MS) as f32 / 1000.0
}
