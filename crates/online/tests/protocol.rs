//! Session protocol tests against the reference engine.

use std::fs;
use std::path::Path;

use ezy_config::{ConfigError, OnlineRecognizerConfig, RawRecognizerConfig};
use ezy_online::reference::{ReferenceLoader, ReferenceStream};
use ezy_online::{
    LoaderRegistry, OnlineRecognizer, OnlineStream, RecognizerError, StreamState,
};
use tempfile::TempDir;

const RATE: i32 = 16000;

/// Samples for the first 16-frame chunk at 16 kHz.
const CHUNK: usize = 400 + 15 * 160;

fn stub(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

fn raw_config(dir: &TempDir) -> RawRecognizerConfig {
    let mut raw = RawRecognizerConfig::default();
    raw.model_config.transducer.encoder = Some(stub(dir.path(), "encoder.onnx", "stub"));
    raw.model_config.transducer.decoder = Some(stub(dir.path(), "decoder.onnx", "stub"));
    raw.model_config.transducer.joiner = Some(stub(dir.path(), "joiner.onnx", "stub"));
    raw.model_config.tokens = Some(stub(
        dir.path(),
        "tokens.txt",
        "<blk> 0\n▁HELLO 1\n▁WORLD 2\n▁EZY 3\nS 4\n",
    ));
    raw
}

fn loaders() -> LoaderRegistry {
    LoaderRegistry::new().with(ReferenceLoader::new())
}

fn recognizer(enable_endpoint: bool) -> (TempDir, OnlineRecognizer) {
    let dir = tempfile::tempdir().unwrap();
    let mut raw = raw_config(&dir);
    raw.enable_endpoint = enable_endpoint as i32;
    let recognizer = OnlineRecognizer::from_raw(&raw, &loaders()).unwrap();
    (dir, recognizer)
}

fn tone(samples: usize, amplitude: f32) -> Vec<f32> {
    (0..samples)
        .map(|i| amplitude * (i as f32 * 0.07).sin())
        .collect()
}

fn silence(seconds: f32) -> Vec<f32> {
    vec![0.0; (seconds * RATE as f32) as usize]
}

fn drain(recognizer: &OnlineRecognizer, stream: &mut OnlineStream) {
    while recognizer.is_ready(stream) {
        recognizer.decode(stream).unwrap();
    }
}

#[test]
fn test_recognizer_uses_reference_engine() {
    let (_dir, recognizer) = recognizer(false);
    assert_eq!(recognizer.engine_name(), "reference");
    assert_eq!(recognizer.config().feat_config.sample_rate, 16000);
    assert_eq!(recognizer.config().decoding_method, "greedy_search");
}

#[test]
fn test_invalid_config_yields_no_recognizer() {
    let dir = tempfile::tempdir().unwrap();
    let mut raw = raw_config(&dir);
    raw.model_config.tokens = Some("/nonexistent/tokens.txt".into());

    let err = OnlineRecognizer::from_raw(&raw, &loaders()).err().unwrap();
    assert!(matches!(
        err,
        RecognizerError::Config(ConfigError::MissingTokens)
            | RecognizerError::Config(ConfigError::MissingFile { .. })
    ));
}

#[test]
fn test_no_loader_for_valid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config: OnlineRecognizerConfig = ezy_config::normalize(&raw_config(&dir));
    let err = OnlineRecognizer::new(config, &LoaderRegistry::new()).err().unwrap();
    assert!(matches!(err, RecognizerError::NoLoader));
}

#[test]
fn test_readiness_protocol() {
    let (_dir, recognizer) = recognizer(false);
    let mut stream = recognizer.create_stream();
    assert_eq!(recognizer.state(&stream), StreamState::Accepting);

    stream.accept_waveform(RATE, &tone(CHUNK - 1, 0.5)).unwrap();
    assert!(!recognizer.is_ready(&stream));
    assert!(matches!(
        recognizer.decode(&mut stream),
        Err(RecognizerError::NotReady)
    ));

    stream.accept_waveform(RATE, &tone(1, 0.5)).unwrap();
    assert!(recognizer.is_ready(&stream));
    assert_eq!(recognizer.state(&stream), StreamState::Ready);

    recognizer.decode(&mut stream).unwrap();
    assert!(!recognizer.is_ready(&stream));

    // Another 16 frames need 16 more shifts of audio.
    stream.accept_waveform(RATE, &tone(16 * 160, 0.5)).unwrap();
    assert!(recognizer.is_ready(&stream));
    recognizer.decode(&mut stream).unwrap();
    assert!(!recognizer.is_ready(&stream));

    let result = recognizer.get_result(&stream).unwrap();
    assert_eq!(result.tokens.len(), 1);
    assert_eq!(result.timestamps, vec![0.0]);
    assert!(!result.text.is_empty());
    assert!(!result.is_final);
}

#[test]
fn test_finish_drains_partial_chunk() {
    let (_dir, recognizer) = recognizer(false);
    let mut stream = recognizer.create_stream();
    stream.accept_waveform(RATE, &tone(1000, 0.5)).unwrap();
    assert!(!recognizer.is_ready(&stream));

    stream.input_finished();
    assert!(recognizer.is_ready(&stream));
    drain(&recognizer, &mut stream);

    assert_eq!(recognizer.state(&stream), StreamState::Finished);
    let result = recognizer.get_result(&stream).unwrap();
    assert!(result.is_final);
    assert_eq!(result.tokens.len(), 1);
}

#[test]
fn test_accept_after_finish_is_rejected_until_reset() {
    let (_dir, recognizer) = recognizer(false);
    let mut stream = recognizer.create_stream();
    stream.input_finished();
    stream.input_finished();

    assert!(matches!(
        stream.accept_waveform(RATE, &silence(0.1)),
        Err(RecognizerError::InputFinished)
    ));

    recognizer.reset(&mut stream).unwrap();
    assert!(!stream.is_input_finished());
    stream.accept_waveform(RATE, &silence(0.1)).unwrap();
}

#[test]
fn test_invalid_sample_rate_is_rejected() {
    let (_dir, recognizer) = recognizer(false);
    let mut stream = recognizer.create_stream();
    assert!(matches!(
        stream.accept_waveform(0, &silence(0.1)),
        Err(RecognizerError::InvalidSampleRate(0))
    ));
}

#[test]
fn test_endpoint_after_long_trailing_silence() {
    let (_dir, recognizer) = recognizer(true);
    let mut stream = recognizer.create_stream();
    stream.accept_waveform(RATE, &silence(2.5)).unwrap();
    stream.input_finished();
    drain(&recognizer, &mut stream);

    assert!(recognizer.is_endpoint(&stream));
    assert!(recognizer.get_result(&stream).unwrap().is_final);
}

#[test]
fn test_no_endpoint_before_rule1_threshold() {
    let (_dir, recognizer) = recognizer(true);
    let mut stream = recognizer.create_stream();
    stream.accept_waveform(RATE, &silence(2.0)).unwrap();
    stream.input_finished();
    drain(&recognizer, &mut stream);

    assert!(!recognizer.is_endpoint(&stream));
}

#[test]
fn test_endpoint_after_speech_uses_rule2() {
    let (_dir, recognizer) = recognizer(true);
    let mut stream = recognizer.create_stream();
    stream.accept_waveform(RATE, &tone(RATE as usize, 0.5)).unwrap();
    stream.accept_waveform(RATE, &silence(1.5)).unwrap();
    drain(&recognizer, &mut stream);

    assert!(recognizer.is_endpoint(&stream));
}

#[test]
fn test_endpoint_disabled_never_fires() {
    let (_dir, recognizer) = recognizer(false);
    let mut stream = recognizer.create_stream();
    stream.accept_waveform(RATE, &silence(5.0)).unwrap();
    stream.input_finished();
    drain(&recognizer, &mut stream);

    assert!(!recognizer.is_endpoint(&stream));
}

#[test]
fn test_batch_decode_matches_sequential() {
    let (_dir, recognizer) = recognizer(true);
    let inputs: Vec<Vec<f32>> = vec![
        [tone(8000, 0.3), silence(0.5), tone(4000, 0.8)].concat(),
        [silence(0.3), tone(12000, 0.6)].concat(),
        [tone(3000, 0.2), silence(1.0), tone(3000, 0.9), silence(0.2), tone(2000, 0.4)].concat(),
    ];

    let mut sequential: Vec<OnlineStream> = Vec::new();
    for input in &inputs {
        let mut stream = recognizer.create_stream();
        stream.accept_waveform(RATE, input).unwrap();
        stream.input_finished();
        drain(&recognizer, &mut stream);
        sequential.push(stream);
    }

    let mut batched: Vec<OnlineStream> = inputs
        .iter()
        .map(|input| {
            let mut stream = recognizer.create_stream();
            stream.accept_waveform(RATE, input).unwrap();
            stream.input_finished();
            stream
        })
        .collect();
    loop {
        let mut ready: Vec<&mut OnlineStream> = batched
            .iter_mut()
            .filter(|s| recognizer.is_ready(s))
            .collect();
        if ready.is_empty() {
            break;
        }
        recognizer.decode_streams(&mut ready).unwrap();
    }

    for (seq, bat) in sequential.iter().zip(&batched) {
        let seq = recognizer.get_result(seq).unwrap();
        let bat = recognizer.get_result(bat).unwrap();
        assert_eq!(seq, bat);
        assert!(!seq.tokens.is_empty());
    }
}

#[test]
fn test_batch_rejects_empty_and_not_ready() {
    let (_dir, recognizer) = recognizer(false);
    assert!(matches!(
        recognizer.decode_streams(&mut []),
        Err(RecognizerError::EmptyBatch)
    ));

    let mut ready = recognizer.create_stream();
    ready.accept_waveform(RATE, &tone(CHUNK, 0.5)).unwrap();
    let mut idle = recognizer.create_stream();

    let err = recognizer
        .decode_streams(&mut [&mut ready, &mut idle])
        .unwrap_err();
    assert!(matches!(err, RecognizerError::NotReadyInBatch { index: 1 }));

    // Nothing was decoded.
    assert!(recognizer.is_ready(&ready));
}

#[test]
fn test_streams_are_bound_to_their_recognizer() {
    let (_dir_a, a) = recognizer(false);
    let (_dir_b, b) = recognizer(false);
    let mut stream = a.create_stream();
    stream.accept_waveform(RATE, &tone(CHUNK, 0.5)).unwrap();

    assert!(!b.is_ready(&stream));
    assert!(matches!(
        b.decode(&mut stream),
        Err(RecognizerError::ForeignStream { .. })
    ));
    assert!(matches!(
        b.decode_streams(&mut [&mut stream]),
        Err(RecognizerError::ForeignStream { .. })
    ));
    assert!(b.get_result(&stream).is_err());
    assert!(b.reset(&mut stream).is_err());
    assert!(a.is_ready(&stream));
}

#[test]
fn test_reset_starts_new_segment_and_keeps_hotwords() {
    let dir = tempfile::tempdir().unwrap();
    let mut raw = raw_config(&dir);
    raw.decoding_method = Some("modified_beam_search".into());
    raw.hotwords_buf = Some(b"HELLO WORLD\n".to_vec());
    let recognizer = OnlineRecognizer::from_raw(&raw, &loaders()).unwrap();

    let mut stream = recognizer.create_stream_with_hotwords("EZY");
    stream.accept_waveform(RATE, &tone(RATE as usize, 0.5)).unwrap();
    stream.input_finished();
    drain(&recognizer, &mut stream);
    let before = recognizer.get_result(&stream).unwrap();
    assert_eq!(before.segment, 0);
    assert_eq!(before.start_time, 0.0);

    recognizer.reset(&mut stream).unwrap();
    let after = recognizer.get_result(&stream).unwrap();
    assert_eq!(after.segment, 1);
    assert!(after.start_time > 0.9);
    assert!(after.tokens.is_empty());
    assert_eq!(recognizer.state(&stream), StreamState::Accepting);

    assert_eq!(stream.hotwords(), Some("EZY"));
    let inner = stream
        .engine_stream()
        .as_any()
        .downcast_ref::<ReferenceStream>()
        .unwrap();
    assert_eq!(inner.hotwords(), ["EZY"]);

    let plain = recognizer.create_stream();
    let inner = plain
        .engine_stream()
        .as_any()
        .downcast_ref::<ReferenceStream>()
        .unwrap();
    assert_eq!(inner.hotwords(), ["HELLO WORLD"]);
}
