use std::any::Any;
use std::ffi::{CStr, CString};
use std::ptr;
use std::slice;
use std::sync::Arc;

use ezy_config::OnlineRecognizerConfig;
use ezy_online::{EngineStream, RecognitionEngine, RecognizerResult};

use crate::config::ConfigStrings;
use crate::{Result, SherpaError};

/// Owns the native recognizer.
///
/// Shared by the engine and every stream through an `Arc`, so the native
/// recognizer is destroyed only after the last stream.
#[derive(Debug)]
pub struct RecognizerHandle {
    ptr: *const sherpa_rs_sys::SherpaOnnxOnlineRecognizer,
}

impl RecognizerHandle {
    pub fn ptr(&self) -> *const sherpa_rs_sys::SherpaOnnxOnlineRecognizer {
        self.ptr
    }
}

// Safety: sherpa-onnx recognizers are safe to share across threads for
// inference; streams carry the per-utterance state.
unsafe impl Send for RecognizerHandle {}
unsafe impl Sync for RecognizerHandle {}

impl Drop for RecognizerHandle {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                sherpa_rs_sys::SherpaOnnxDestroyOnlineRecognizer(self.ptr);
            }
            tracing::debug!("Destroyed sherpa recognizer");
        }
    }
}

/// One native stream.
pub struct SherpaStream {
    recognizer: Arc<RecognizerHandle>,
    ptr: *const sherpa_rs_sys::SherpaOnnxOnlineStream,
}

// Safety: a stream is only used by one thread at a time (`&mut` access).
unsafe impl Send for SherpaStream {}

impl SherpaStream {
    pub fn ptr(&self) -> *const sherpa_rs_sys::SherpaOnnxOnlineStream {
        self.ptr
    }
}

impl EngineStream for SherpaStream {
    fn accept_waveform(&mut self, sample_rate: i32, samples: &[f32]) {
        if self.ptr.is_null() || samples.is_empty() {
            return;
        }
        let n = i32::try_from(samples.len()).unwrap_or(i32::MAX);
        unsafe {
            sherpa_rs_sys::SherpaOnnxOnlineStreamAcceptWaveform(
                self.ptr,
                sample_rate,
                samples.as_ptr(),
                n,
            );
        }
    }

    fn input_finished(&mut self) {
        if !self.ptr.is_null() {
            unsafe { sherpa_rs_sys::SherpaOnnxOnlineStreamInputFinished(self.ptr) };
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for SherpaStream {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { sherpa_rs_sys::SherpaOnnxDestroyOnlineStream(self.ptr) };
            self.ptr = ptr::null();
        }
        tracing::trace!(refs = Arc::strong_count(&self.recognizer), "Destroyed sherpa stream");
    }
}

pub struct SherpaEngine {
    recognizer: Arc<RecognizerHandle>,
}

impl SherpaEngine {
    pub fn new(config: &OnlineRecognizerConfig) -> Result<Self> {
        let strings = ConfigStrings::new(config)?;
        tracing::info!(
            provider = %config.model_config.provider,
            num_threads = config.model_config.num_threads,
            decoding_method = %config.decoding_method,
            "Initializing sherpa recognizer"
        );

        let recognizer = unsafe {
            let native = strings.native(config)?;
            sherpa_rs_sys::SherpaOnnxCreateOnlineRecognizer(&native)
        };
        if recognizer.is_null() {
            return Err(SherpaError::CreateFailed);
        }
        Ok(Self {
            recognizer: Arc::new(RecognizerHandle { ptr: recognizer }),
        })
    }

    fn wrap(&self, ptr: *const sherpa_rs_sys::SherpaOnnxOnlineStream) -> Box<dyn EngineStream> {
        if ptr.is_null() {
            tracing::error!("SherpaOnnxCreateOnlineStream returned NULL");
        }
        Box::new(SherpaStream {
            recognizer: Arc::clone(&self.recognizer),
            ptr,
        })
    }

    fn native(stream: &dyn EngineStream) -> *const sherpa_rs_sys::SherpaOnnxOnlineStream {
        match stream.as_any().downcast_ref::<SherpaStream>() {
            Some(s) => s.ptr,
            None => {
                tracing::warn!("Stream was not created by the sherpa engine");
                ptr::null()
            }
        }
    }
}

impl RecognitionEngine for SherpaEngine {
    fn name(&self) -> &str {
        "sherpa-onnx"
    }

    fn create_stream(&self) -> Box<dyn EngineStream> {
        let ptr = unsafe { sherpa_rs_sys::SherpaOnnxCreateOnlineStream(self.recognizer.ptr()) };
        self.wrap(ptr)
    }

    fn create_stream_with_hotwords(&self, hotwords: &str) -> Box<dyn EngineStream> {
        let Ok(hotwords) = CString::new(hotwords.replace('\0', "")) else {
            return self.create_stream();
        };
        let ptr = unsafe {
            sherpa_rs_sys::SherpaOnnxCreateOnlineStreamWithHotwords(
                self.recognizer.ptr(),
                hotwords.as_ptr(),
            )
        };
        self.wrap(ptr)
    }

    fn is_ready(&self, stream: &dyn EngineStream) -> bool {
        let s = Self::native(stream);
        !s.is_null()
            && unsafe { sherpa_rs_sys::SherpaOnnxIsOnlineStreamReady(self.recognizer.ptr(), s) }
                == 1
    }

    fn decode_stream(&self, stream: &mut dyn EngineStream) {
        let s = Self::native(stream);
        if !s.is_null() {
            unsafe { sherpa_rs_sys::SherpaOnnxDecodeOnlineStream(self.recognizer.ptr(), s) };
        }
    }

    fn decode_streams(&self, streams: &mut [&mut dyn EngineStream]) {
        let mut ptrs: Vec<*const sherpa_rs_sys::SherpaOnnxOnlineStream> = streams
            .iter()
            .map(|s| Self::native(&**s))
            .filter(|p| !p.is_null())
            .collect();
        if ptrs.is_empty() {
            return;
        }
        let n = i32::try_from(ptrs.len()).unwrap_or(i32::MAX);
        unsafe {
            sherpa_rs_sys::SherpaOnnxDecodeMultipleOnlineStreams(
                self.recognizer.ptr(),
                ptrs.as_mut_ptr(),
                n,
            );
        }
    }

    fn get_result(&self, stream: &dyn EngineStream) -> RecognizerResult {
        let s = Self::native(stream);
        if s.is_null() {
            return RecognizerResult::default();
        }
        unsafe {
            let r = sherpa_rs_sys::SherpaOnnxGetOnlineStreamResult(self.recognizer.ptr(), s);
            if r.is_null() {
                tracing::error!("SherpaOnnxGetOnlineStreamResult returned NULL");
                return RecognizerResult::default();
            }
            let result = read_result(&*r);
            sherpa_rs_sys::SherpaOnnxDestroyOnlineRecognizerResult(r);
            result
        }
    }

    fn reset(&self, stream: &mut dyn EngineStream) {
        let s = Self::native(stream);
        if !s.is_null() {
            unsafe { sherpa_rs_sys::SherpaOnnxOnlineStreamReset(self.recognizer.ptr(), s) };
        }
    }

    fn is_endpoint(&self, stream: &dyn EngineStream) -> bool {
        let s = Self::native(stream);
        !s.is_null()
            && unsafe { sherpa_rs_sys::SherpaOnnxOnlineStreamIsEndpoint(self.recognizer.ptr(), s) }
                == 1
    }
}

/// Prefer the JSON form, which carries segment and timing; fall back to
/// the flat fields.
unsafe fn read_result(r: &sherpa_rs_sys::SherpaOnnxOnlineRecognizerResult) -> RecognizerResult {
    if !r.json.is_null() {
        let json = CStr::from_ptr(r.json).to_string_lossy();
        match serde_json::from_str::<RecognizerResult>(&json) {
            Ok(result) => return result,
            Err(e) => tracing::debug!(error = %e, "Falling back to flat sherpa result"),
        }
    }

    let text = if r.text.is_null() {
        String::new()
    } else {
        CStr::from_ptr(r.text).to_string_lossy().into_owned()
    };
    let count = usize::try_from(r.count).unwrap_or(0);
    let tokens = if count == 0 || r.tokens_arr.is_null() {
        Vec::new()
    } else {
        slice::from_raw_parts(r.tokens_arr, count)
            .iter()
            .map(|p| CStr::from_ptr(*p).to_string_lossy().into_owned())
            .collect()
    };
    let timestamps = if count == 0 || r.timestamps.is_null() {
        Vec::new()
    } else {
        slice::from_raw_parts(r.timestamps, count).to_vec()
    };
    RecognizerResult {
        text,
        tokens,
        timestamps,
        ..Default::default()
    }
}
