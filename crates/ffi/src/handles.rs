//! Registry of handles currently owned by C callers.
//!
//! Touched only when a handle is created or destroyed, so that destroying a
//! handle twice, or destroying it through the wrong function, is a no-op.
//! Entries are keyed by address: once an address is registered again, a
//! stale release cannot be told apart from a release of the new handle.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandleKind {
    Recognizer,
    Stream,
    Result,
    ResultJson,
    Display,
}

fn live() -> &'static Mutex<HashMap<usize, HandleKind>> {
    static LIVE: OnceLock<Mutex<HashMap<usize, HandleKind>>> = OnceLock::new();
    LIVE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Record `ptr` as live and hand it back.
pub(crate) fn register<T>(ptr: *mut T, kind: HandleKind) -> *mut T {
    if !ptr.is_null() {
        let mut live = live().lock().unwrap_or_else(PoisonError::into_inner);
        live.insert(ptr as usize, kind);
    }
    ptr
}

/// Forget `ptr` if it is a live handle of `kind`. Returns whether the
/// caller now owns the allocation and must free it.
pub(crate) fn release<T>(ptr: *const T, kind: HandleKind) -> bool {
    if ptr.is_null() {
        return false;
    }
    let mut live = live().lock().unwrap_or_else(PoisonError::into_inner);
    match live.get(&(ptr as usize)) {
        Some(k) if *k == kind => {
            live.remove(&(ptr as usize));
            true
        }
        Some(other) => {
            tracing::warn!(?kind, actual = ?other, "Handle released through the wrong function");
            false
        }
        None => {
            tracing::warn!(?kind, "Release of unknown or already released handle ignored");
            false
        }
    }
}

#[cfg(test)]
pub(crate) fn is_live<T>(ptr: *const T, kind: HandleKind) -> bool {
    let live = live().lock().unwrap_or_else(PoisonError::into_inner);
    live.get(&(ptr as usize)) == Some(&kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_is_single_shot() {
        let ptr = Box::into_raw(Box::new(7u64));
        register(ptr, HandleKind::Display);
        assert!(is_live(ptr, HandleKind::Display));

        assert!(!release(ptr, HandleKind::Stream));
        assert!(release(ptr, HandleKind::Display));
        assert!(!release(ptr, HandleKind::Display));
        assert!(!is_live(ptr, HandleKind::Display));

        drop(unsafe { Box::from_raw(ptr) });
    }

    #[test]
    fn test_reused_address_is_owned_by_newest_handle() {
        let ptr = Box::into_raw(Box::new(1u64));
        register(ptr, HandleKind::ResultJson);
        assert!(release(ptr, HandleKind::ResultJson));

        // The allocator hands out the same address for a newer handle.
        register(ptr, HandleKind::ResultJson);
        assert!(release(ptr, HandleKind::ResultJson));
        assert!(!is_live(ptr, HandleKind::ResultJson));

        drop(unsafe { Box::from_raw(ptr) });
    }

    #[test]
    fn test_null_is_never_live() {
        let null: *mut u8 = std::ptr::null_mut();
        assert!(register(null, HandleKind::Result).is_null());
        assert!(!release(null, HandleKind::Result));
    }
}
