//! Flat, C-readable recognition results.

use std::ffi::{c_char, CString};
use std::ptr;

use ezy_online::RecognizerResult;

use crate::handles::{self, HandleKind};
use crate::session::{EzyOnlineRecognizer, EzyOnlineStream};
use crate::{clear_last_error, contract_violation, guard};

/// Result snapshot handed to C callers.
///
/// When `count` is 0, `tokens`, `tokens_arr` and `timestamps` are null.
/// Otherwise `tokens` is one block holding every token followed by a NUL,
/// and `tokens_arr[i]` points at token `i` inside it. `timestamps` holds
/// `count` values, or is null when the engine did not produce one per token.
#[repr(C)]
#[derive(Debug)]
pub struct EzyOnlineRecognizerResult {
    pub text: *const c_char,
    pub tokens: *const c_char,
    pub tokens_arr: *const *const c_char,
    pub timestamps: *const f32,
    pub count: i32,
    /// `{"text", "tokens", "timestamps", "segment", "start_time", "is_final"}`
    pub json: *const c_char,
}

/// Tokens packed into one allocation, each followed by a NUL byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBlock {
    bytes: Box<[u8]>,
    offsets: Box<[usize]>,
}

impl TokenBlock {
    /// `offsets[0] == 0` and `offsets[i + 1] == offsets[i] + len(token i) + 1`.
    /// Interior NUL bytes are dropped from tokens.
    pub fn pack<S: AsRef<str>>(tokens: &[S]) -> Self {
        let total: usize = tokens.iter().map(|t| t.as_ref().len() + 1).sum();
        let mut bytes = Vec::with_capacity(total);
        let mut offsets = Vec::with_capacity(tokens.len());
        for token in tokens {
            offsets.push(bytes.len());
            bytes.extend(token.as_ref().bytes().filter(|b| *b != 0));
            bytes.push(0);
        }
        Self {
            bytes: bytes.into_boxed_slice(),
            offsets: offsets.into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn base(&self) -> *const c_char {
        self.bytes.as_ptr().cast()
    }

    fn pointers(&self) -> Box<[*const c_char]> {
        self.offsets
            .iter()
            .map(|&offset| self.base().wrapping_add(offset))
            .collect()
    }
}

/// Owns every block a result points into. `result` comes first so that a
/// pointer to the block is also a pointer to the public struct.
#[repr(C)]
struct ResultBlock {
    result: EzyOnlineRecognizerResult,
    _text: CString,
    _json: CString,
    _tokens: Option<TokenBlock>,
    _tokens_arr: Box<[*const c_char]>,
    _timestamps: Option<Box<[f32]>>,
}

impl ResultBlock {
    fn new(result: &RecognizerResult) -> Box<Self> {
        let text = to_cstring(&result.text);
        let json = to_cstring(&result.as_json_string());

        let (tokens, tokens_arr, timestamps) = if result.tokens.is_empty() {
            (None, Box::default(), None)
        } else {
            let block = TokenBlock::pack(&result.tokens);
            let arr = block.pointers();
            let timestamps = result
                .aligned_timestamps()
                .map(|ts| ts.to_vec().into_boxed_slice());
            (Some(block), arr, timestamps)
        };

        let flat = EzyOnlineRecognizerResult {
            text: text.as_ptr(),
            tokens: tokens.as_ref().map_or(ptr::null(), TokenBlock::base),
            tokens_arr: if tokens.is_some() {
                tokens_arr.as_ptr()
            } else {
                ptr::null()
            },
            timestamps: timestamps.as_ref().map_or(ptr::null(), |ts| ts.as_ptr()),
            count: i32::try_from(tokens.as_ref().map_or(0, TokenBlock::len)).unwrap_or(i32::MAX),
            json: json.as_ptr(),
        };

        Box::new(Self {
            result: flat,
            _text: text,
            _json: json,
            _tokens: tokens,
            _tokens_arr: tokens_arr,
            _timestamps: timestamps,
        })
    }
}

fn to_cstring(s: &str) -> CString {
    CString::new(s.replace('\0', "")).unwrap_or_default()
}

/// Marshal a result into a caller-owned flat block.
pub(crate) fn marshal(result: &RecognizerResult) -> *const EzyOnlineRecognizerResult {
    let block = Box::into_raw(ResultBlock::new(result));
    handles::register(block, HandleKind::Result).cast_const().cast()
}

/// Free a result from [`marshal`]. Null and repeated releases are ignored.
pub(crate) fn release(result: *const EzyOnlineRecognizerResult) {
    if handles::release(result, HandleKind::Result) {
        // SAFETY: the registry only holds pointers produced by `marshal`.
        drop(unsafe { Box::from_raw(result.cast::<ResultBlock>().cast_mut()) });
    }
}

// ============================================================================
// C ABI
// ============================================================================

/// Snapshot of the stream's current result, or null on bad arguments.
///
/// Release with `ezy_online_result_destroy`.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_stream_get_result(
    recognizer: *const EzyOnlineRecognizer,
    stream: *const EzyOnlineStream,
) -> *const EzyOnlineRecognizerResult {
    const NAME: &str = "ezy_online_stream_get_result";
    guard(NAME, ptr::null(), || {
        let (Some(recognizer), Some(stream)) = (recognizer.as_ref(), stream.as_ref()) else {
            contract_violation(NAME, "null recognizer or stream");
            return ptr::null();
        };
        match recognizer.inner.get_result(&stream.inner) {
            Ok(result) => {
                clear_last_error();
                marshal(&result)
            }
            Err(e) => {
                contract_violation(NAME, &e.to_string());
                ptr::null()
            }
        }
    })
}

/// Free a result. Null and already released results are ignored.
///
/// A repeated call after the address was reused by a newer handle of the
/// same kind destroys that newer handle.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_result_destroy(result: *const EzyOnlineRecognizerResult) {
    guard("ezy_online_result_destroy", (), || release(result));
}

/// The stream's current result as a JSON string, or null on bad arguments.
///
/// Release with `ezy_online_result_json_destroy`.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_stream_get_result_json(
    recognizer: *const EzyOnlineRecognizer,
    stream: *const EzyOnlineStream,
) -> *const c_char {
    const NAME: &str = "ezy_online_stream_get_result_json";
    guard(NAME, ptr::null(), || {
        let (Some(recognizer), Some(stream)) = (recognizer.as_ref(), stream.as_ref()) else {
            contract_violation(NAME, "null recognizer or stream");
            return ptr::null();
        };
        match recognizer.inner.get_result(&stream.inner) {
            Ok(result) => {
                clear_last_error();
                let json = to_cstring(&result.as_json_string()).into_raw();
                handles::register(json, HandleKind::ResultJson).cast_const()
            }
            Err(e) => {
                contract_violation(NAME, &e.to_string());
                ptr::null()
            }
        }
    })
}

/// Free a string from `ezy_online_stream_get_result_json`. Null and
/// already released strings are ignored.
///
/// A repeated call after the address was reused by a newer handle of the
/// same kind destroys that newer handle.
#[no_mangle]
pub unsafe extern "C" fn ezy_online_result_json_destroy(json: *const c_char) {
    guard("ezy_online_result_json_destroy", (), || {
        if handles::release(json, HandleKind::ResultJson) {
            drop(CString::from_raw(json.cast_mut()));
        }
    });
}
