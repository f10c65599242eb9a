use std::ffi::{c_char, CStr};
use std::ptr;

use ezy_online::Display;

use crate::handles::{self, HandleKind};
use crate::{contract_violation, guard};

/// Opaque console display handle.
pub struct EzyDisplay {
    inner: Display,
}

/// Create a display wrapping at `max_word_per_line` words. Zero or a
/// negative value disables wrapping.
#[no_mangle]
pub extern "C" fn ezy_display_create(max_word_per_line: i32) -> *const EzyDisplay {
    guard("ezy_display_create", ptr::null(), || {
        let inner = Display::new(max_word_per_line.max(0) as usize);
        let handle = Box::into_raw(Box::new(EzyDisplay { inner }));
        handles::register(handle, HandleKind::Display).cast_const()
    })
}

/// Destroy a display. Null and repeated calls are ignored.
///
/// A repeated call after the address was reused by a newer handle of the
/// same kind destroys that newer handle.
#[no_mangle]
pub unsafe extern "C" fn ezy_display_destroy(display: *const EzyDisplay) {
    guard("ezy_display_destroy", (), || {
        if handles::release(display, HandleKind::Display) {
            drop(Box::from_raw(display.cast_mut()));
        }
    });
}

/// Print `text` as segment `idx`. Repeating an `idx` redraws that segment
/// in place; a new `idx` starts on the next line.
#[no_mangle]
pub unsafe extern "C" fn ezy_display_print(
    display: *const EzyDisplay,
    idx: i32,
    text: *const c_char,
) {
    const NAME: &str = "ezy_display_print";
    guard(NAME, (), || {
        let Some(display) = display.as_ref() else {
            contract_violation(NAME, "display is null");
            return;
        };
        let text = if text.is_null() {
            Default::default()
        } else {
            CStr::from_ptr(text).to_string_lossy()
        };
        display.inner.print(idx, &text);
    });
}
