//! # ezy-ffi
//!
//! C ABI for the ezy streaming recognizer.
//!
//! Build the library:
//! ```sh
//! cargo build -p ezy-ffi --release
//! cargo build -p ezy-ffi --release --features sherpa   # native sherpa-onnx engine
//! ```
//!
//! The header is generated into `include/ezy.h` by the build script.
//!
//! Handles follow one rule: whatever `*_create` or `*_get_*` returns must be
//! released with the matching `*_destroy`. Streams must be destroyed before
//! the recognizer that created them. A stream must not be used from two
//! threads at the same time.
//!
//! Contract violations that are cheap to detect (decoding a stream that is
//! not ready, feeding audio after `input_finished`, null arguments, a
//! stream passed to a recognizer that did not create it) are logged and the
//! call does nothing. Use after destroy is not detected.
//!
//! Destroying a handle twice is ignored only while its address has not been
//! handed out again. Once a later `*_create` or `*_get_*` returns the same
//! address, a stale destroy releases the new handle. Clear pointers after
//! destroying them.

#![allow(clippy::missing_safety_doc)]

mod config;
mod display;
mod handles;
mod result;
mod session;

use std::any::Any;
use std::cell::RefCell;
use std::ffi::{c_char, CString};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Once, OnceLock, PoisonError, RwLock};

use ezy_online::reference::ReferenceLoader;
use ezy_online::{EngineLoader, LoaderRegistry};
use tracing_subscriber::EnvFilter;

pub use config::{
    EzyFeatureConfig, EzyHomophoneReplacerConfig, EzyOnlineCtcFstDecoderConfig,
    EzyOnlineModelConfig, EzyOnlineParaformerModelConfig, EzyOnlineRecognizerConfig,
    EzyOnlineTransducerModelConfig, EzyOnlineZipformer2CtcModelConfig,
};
pub use display::*;
pub use result::*;
pub use session::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the log filter, e.g. `EZY_LOG=ezy=trace`.
pub const LOG_ENV: &str = "EZY_LOG";
const DEFAULT_LOG_FILTER: &str = "info,ezy=debug";

// ============================================================================
// Error Handling
// ============================================================================

thread_local! {
    /// Message of the last failed call on this thread.
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

pub(crate) fn set_last_error(message: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(message.replace('\0', " ")).ok();
    });
}

pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Log a contract violation and remember it as the last error.
pub(crate) fn contract_violation(function: &'static str, message: &str) {
    tracing::warn!(function, "{message}");
    set_last_error(&format!("{function}: {message}"));
}

/// Run `f`, turning a panic into `fallback` so that no unwind crosses the
/// C boundary.
pub(crate) fn guard<T>(function: &'static str, fallback: T, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(function, panic = %message, "Panic caught at C boundary");
            set_last_error(&format!("{function}: internal error: {message}"));
            fallback
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Library version as a static NUL-terminated string. Never null.
#[no_mangle]
pub extern "C" fn ezy_version() -> *const c_char {
    static VERSION_CSTRING: OnceLock<CString> = OnceLock::new();
    VERSION_CSTRING
        .get_or_init(|| CString::new(VERSION).unwrap_or_default())
        .as_ptr()
}

/// Message of the last failed call on the calling thread, or null.
///
/// The pointer stays valid until the next failing call on the same thread.
#[no_mangle]
pub extern "C" fn ezy_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(message) => message.as_ptr(),
        None => std::ptr::null(),
    })
}

/// Install the stderr log subscriber, filtered by `EZY_LOG`.
///
/// Called implicitly by `ezy_online_recognizer_create`. Does nothing if a
/// global subscriber is already set.
#[no_mangle]
pub extern "C" fn ezy_init_logging() {
    guard("ezy_init_logging", (), init_logging);
}

pub(crate) fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!(version = VERSION, "Logging initialized");
        }
    });
}

// ============================================================================
// Engine Loaders
// ============================================================================

fn loaders() -> &'static RwLock<LoaderRegistry> {
    static LOADERS: OnceLock<RwLock<LoaderRegistry>> = OnceLock::new();
    LOADERS.get_or_init(|| RwLock::new(default_loaders()))
}

fn default_loaders() -> LoaderRegistry {
    let mut registry = LoaderRegistry::new();
    #[cfg(feature = "sherpa")]
    registry.register(Box::new(ezy_sherpa::SherpaLoader::new()));
    registry.register(Box::new(ReferenceLoader::new()));
    registry
}

/// Give `loader` priority over the built-in loaders for recognizers created
/// after this call. For Rust hosts linking the rlib.
pub fn register_loader(loader: impl EngineLoader + 'static) {
    let mut registry = loaders().write().unwrap_or_else(PoisonError::into_inner);
    tracing::info!(loader = loader.name(), "Registering engine loader");
    registry.register_first(Box::new(loader));
}

/// Names of the registered loaders in priority order.
pub fn loader_names() -> Vec<String> {
    let registry = loaders().read().unwrap_or_else(PoisonError::into_inner);
    registry.names().into_iter().map(str::to_string).collect()
}
