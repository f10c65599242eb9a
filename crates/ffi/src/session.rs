//! Recognizer and stream lifecycle, audio input and decoding.

use std::collections::HashSet;
use std::ffi::{c_char, CStr};
use std::ptr;
use std::sync::PoisonError;

use ezy_config::normalize;
use ezy_online::{OnlineRecognizer, OnlineStream};

use crate::config::{to_raw, EzyOnlineRecognizerConfig};
use crate::handles::{self, HandleKind};
use crate::{clear_last_error, contract_violation, guard, init_logging, loaders, set_last_error};

/// Opaque recognizer handle.
pub struct EzyOnlineRecognizer {
    pub(crate) inner: OnlineRecognizer,
}

/// Opaque stream handle.
pub struct EzyOnlineStream {
    pub(crate) inner: OnlineStream,
}

// ============================================================================
// Recognizer
// ============================================================================

/// Create a recognizer, or return null when the configuration is invalid
/// or no engine can be loaded (see `ezy_last_error`).
///
/// Release with `ezy_online_recognizer_destroy`.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_recognizer_create(
    config: *const EzyOnlineRecognizerConfig,
) -> *const EzyOnlineRecognizer {
    const NAME: &str = "ezy_online_recognizer_create";
    guard(NAME, ptr::null(), || {
        init_logging();
        let Some(config) = config.as_ref() else {
            set_last_error("config is null");
            tracing::error!(function = NAME, "Config is null");
            return ptr::null();
        };

        let config = normalize(&to_raw(config));
        let registry = loaders().read().unwrap_or_else(PoisonError::into_inner);
        match OnlineRecognizer::new(config, &registry) {
            Ok(inner) => {
                clear_last_error();
                let handle = Box::into_raw(Box::new(EzyOnlineRecognizer { inner }));
                handles::register(handle, HandleKind::Recognizer).cast_const()
            }
            Err(e) => {
                tracing::error!(function = NAME, error = %e, "Failed to create recognizer");
                set_last_error(&e.to_string());
                ptr::null()
            }
        }
    })
}

/// Destroy a recognizer. Every stream created from it must be destroyed
/// first. Null and repeated calls are ignored.
///
/// A repeated call after the address was reused by a newer handle of the
/// same kind destroys that newer handle.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_recognizer_destroy(recognizer: *const EzyOnlineRecognizer) {
    guard("ezy_online_recognizer_destroy", (), || {
        if handles::release(recognizer, HandleKind::Recognizer) {
            drop(Box::from_raw(recognizer.cast_mut()));
        }
    });
}

// ============================================================================
// Stream
// ============================================================================

/// Create a stream using the recognizer's configured hotwords.
///
/// Release with `ezy_online_stream_destroy`.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_stream_create(
    recognizer: *const EzyOnlineRecognizer,
) -> *mut EzyOnlineStream {
    const NAME: &str = "ezy_online_stream_create";
    guard(NAME, ptr::null_mut(), || {
        let Some(recognizer) = recognizer.as_ref() else {
            contract_violation(NAME, "recognizer is null");
            return ptr::null_mut();
        };
        new_stream(recognizer.inner.create_stream())
    })
}

/// Create a stream whose hotwords replace the configured ones.
///
/// `hotwords` holds one phrase per line, or phrases separated by `/`.
/// A null `hotwords` behaves like `ezy_online_stream_create`.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_stream_create_with_hotwords(
    recognizer: *const EzyOnlineRecognizer,
    hotwords: *const c_char,
) -> *mut EzyOnlineStream {
    const NAME: &str = "ezy_online_stream_create_with_hotwords";
    guard(NAME, ptr::null_mut(), || {
        let Some(recognizer) = recognizer.as_ref() else {
            contract_violation(NAME, "recognizer is null");
            return ptr::null_mut();
        };
        let stream = if hotwords.is_null() {
            recognizer.inner.create_stream()
        } else {
            let hotwords = CStr::from_ptr(hotwords).to_string_lossy();
            recognizer.inner.create_stream_with_hotwords(&hotwords)
        };
        new_stream(stream)
    })
}

fn new_stream(inner: OnlineStream) -> *mut EzyOnlineStream {
    let handle = Box::into_raw(Box::new(EzyOnlineStream { inner }));
    handles::register(handle, HandleKind::Stream)
}

/// Destroy a stream in any state. Null and repeated calls are ignored.
///
/// A repeated call after the address was reused by a newer handle of the
/// same kind destroys that newer handle.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_stream_destroy(stream: *mut EzyOnlineStream) {
    guard("ezy_online_stream_destroy", (), || {
        if handles::release(stream, HandleKind::Stream) {
            drop(Box::from_raw(stream));
        }
    });
}

/// Append `n` samples in `[-1, 1]` recorded at `sample_rate`.
///
/// Ignored after `ezy_online_stream_input_finished` until the stream is reset.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_stream_accept_waveform(
    stream: *mut EzyOnlineStream,
    sample_rate: i32,
    samples: *const f32,
    n: i32,
) {
    const NAME: &str = "ezy_online_stream_accept_waveform";
    guard(NAME, (), || {
        let Some(stream) = stream.as_mut() else {
            contract_violation(NAME, "stream is null");
            return;
        };
        let samples = if n <= 0 {
            &[][..]
        } else if samples.is_null() {
            contract_violation(NAME, "samples is null");
            return;
        } else {
            std::slice::from_raw_parts(samples, n as usize)
        };
        if let Err(e) = stream.inner.accept_waveform(sample_rate, samples) {
            contract_violation(NAME, &e.to_string());
        }
    });
}

/// Signal that no more audio follows. Buffered samples become decodable.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_stream_input_finished(stream: *mut EzyOnlineStream) {
    const NAME: &str = "ezy_online_stream_input_finished";
    guard(NAME, (), || match stream.as_mut() {
        Some(stream) => stream.inner.input_finished(),
        None => contract_violation(NAME, "stream is null"),
    });
}

// ============================================================================
// Decoding
// ============================================================================

/// 1 when enough audio is buffered for `ezy_online_stream_decode`, else 0.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_stream_is_ready(
    recognizer: *const EzyOnlineRecognizer,
    stream: *const EzyOnlineStream,
) -> i32 {
    guard("ezy_online_stream_is_ready", 0, || {
        match (recognizer.as_ref(), stream.as_ref()) {
            (Some(recognizer), Some(stream)) => recognizer.inner.is_ready(&stream.inner) as i32,
            _ => 0,
        }
    })
}

/// Run one decode step. Call only while `ezy_online_stream_is_ready`
/// returns 1; otherwise nothing happens.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_stream_decode(
    recognizer: *const EzyOnlineRecognizer,
    stream: *mut EzyOnlineStream,
) {
    const NAME: &str = "ezy_online_stream_decode";
    guard(NAME, (), || {
        let (Some(recognizer), Some(stream)) = (recognizer.as_ref(), stream.as_mut()) else {
            contract_violation(NAME, "null recognizer or stream");
            return;
        };
        if let Err(e) = recognizer.inner.decode(&mut stream.inner) {
            contract_violation(NAME, &e.to_string());
        }
    });
}

/// Run one decode step on `n` distinct streams in one engine call. Every
/// stream must be ready; otherwise nothing is decoded.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_streams_decode(
    recognizer: *const EzyOnlineRecognizer,
    streams: *const *mut EzyOnlineStream,
    n: i32,
) {
    const NAME: &str = "ezy_online_streams_decode";
    guard(NAME, (), || {
        let Some(recognizer) = recognizer.as_ref() else {
            contract_violation(NAME, "recognizer is null");
            return;
        };
        if streams.is_null() || n <= 0 {
            contract_violation(NAME, "empty batch");
            return;
        }
        let pointers = std::slice::from_raw_parts(streams, n as usize);

        let mut seen = HashSet::with_capacity(pointers.len());
        for (index, ptr) in pointers.iter().enumerate() {
            if ptr.is_null() {
                contract_violation(NAME, &format!("stream {index} is null"));
                return;
            }
            if !seen.insert(*ptr) {
                contract_violation(NAME, &format!("stream {index} appears twice in the batch"));
                return;
            }
        }

        // SAFETY: pointers are non-null and pairwise distinct, so the
        // mutable borrows do not alias.
        let mut batch: Vec<&mut OnlineStream> =
            pointers.iter().map(|ptr| &mut (**ptr).inner).collect();
        if let Err(e) = recognizer.inner.decode_streams(&mut batch) {
            contract_violation(NAME, &e.to_string());
        }
    });
}

/// Start a new segment: clear decoder state and buffered audio, keep the
/// stream's hotwords, accept audio again.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_stream_reset(
    recognizer: *const EzyOnlineRecognizer,
    stream: *mut EzyOnlineStream,
) {
    const NAME: &str = "ezy_online_stream_reset";
    guard(NAME, (), || {
        let (Some(recognizer), Some(stream)) = (recognizer.as_ref(), stream.as_mut()) else {
            contract_violation(NAME, "null recognizer or stream");
            return;
        };
        if let Err(e) = recognizer.inner.reset(&mut stream.inner) {
            contract_violation(NAME, &e.to_string());
        }
    });
}

/// 1 when an endpoint rule fires, else 0. Always 0 when endpoint detection
/// is disabled.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_stream_is_endpoint(
    recognizer: *const EzyOnlineRecognizer,
    stream: *const EzyOnlineStream,
) -> i32 {
    guard("ezy_online_stream_is_endpoint", 0, || {
        match (recognizer.as_ref(), stream.as_ref()) {
            (Some(recognizer), Some(stream)) => {
                recognizer.inner.is_endpoint(&stream.inner) as i32
            }
            _ => 0,
        }
    })
}
