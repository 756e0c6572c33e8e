//! FFI bindings for Synheart Hypnogram
//!
//! This module provides C-compatible functions for calling Hypnogram from other
//! languages. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `hypno_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::LayoutConfig;
use crate::error::ComputeError;
use crate::pipeline::{hypnogram_to_layout_json, NightProcessor};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Parse an optional configuration; NULL selects the defaults
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<LayoutConfig, ComputeError> {
    if config_json.is_null() {
        return Ok(LayoutConfig::default());
    }
    let json = cstr_to_string(config_json)
        .ok_or_else(|| ComputeError::InvalidConfig("config is not valid UTF-8".to_string()))?;
    LayoutConfig::from_json(&json)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Lay out a JSON array of rows and return the layout payload JSON.
///
/// # Safety
/// - `rows_json` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a newly allocated string that must be freed with `hypno_free_string`.
/// - Returns NULL on error; call `hypno_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn hypno_rows_to_layout(
    rows_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let rows_str = match cstr_to_string(rows_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid rows string pointer");
            return ptr::null_mut();
        }
    };

    let config = match config_from_ptr(config_json) {
        Ok(config) => config,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match hypnogram_to_layout_json(rows_str, &config) {
        Ok(payload) => string_to_cstr(&payload),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Processor API
// ============================================================================

/// Opaque handle to a NightProcessor
pub struct NightProcessorHandle {
    processor: NightProcessor,
}

/// Create a new NightProcessor.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a pointer to a newly allocated NightProcessor.
/// - Must be freed with `hypno_processor_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn hypno_processor_new(config_json: *const c_char) -> *mut NightProcessorHandle {
    clear_last_error();

    let processor = match config_from_ptr(config_json).and_then(NightProcessor::new) {
        Ok(processor) => processor,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    Box::into_raw(Box::new(NightProcessorHandle { processor }))
}

/// Free a NightProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `hypno_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn hypno_processor_free(processor: *mut NightProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Lay out a JSON array of rows with a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `hypno_processor_new`.
/// - `rows_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `hypno_free_string`.
/// - Returns NULL on error; call `hypno_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn hypno_processor_process(
    processor: *const NightProcessorHandle,
    rows_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    let rows_str = match cstr_to_string(rows_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid rows string pointer");
            return ptr::null_mut();
        }
    };

    match handle.processor.process_json(&rows_str) {
        Ok(payload) => string_to_cstr(&payload),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Hypnogram functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Hypnogram function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn hypno_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Hypnogram function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn hypno_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Hypnogram library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn hypno_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn sample_rows_json() -> CString {
        CString::new(
            r#"[
                {"timestamp": 1600000000, "sleep_stage": 0},
                {"timestamp": 1600000001, "sleep_stage": 1},
                {"timestamp": 1600000002, "sleep_stage": 1},
                {"timestamp": 1600000003, "sleep_stage": 4}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_rows_to_layout() {
        let rows = sample_rows_json();

        unsafe {
            let result = hypno_rows_to_layout(rows.as_ptr(), ptr::null());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            let payload: serde_json::Value = serde_json::from_str(result_str).unwrap();
            assert_eq!(payload["intervals"].as_array().unwrap().len(), 3);

            hypno_free_string(result);
        }
    }

    #[test]
    fn test_ffi_custom_config() {
        let rows = sample_rows_json();
        let config = CString::new(r#"{"use_transitions": false}"#).unwrap();

        unsafe {
            let result = hypno_rows_to_layout(rows.as_ptr(), config.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            let payload: serde_json::Value = serde_json::from_str(result_str).unwrap();
            assert!(payload["plan"].get("decomposed").is_none());

            hypno_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor() {
        let rows = sample_rows_json();

        unsafe {
            let processor = hypno_processor_new(ptr::null());
            assert!(!processor.is_null());

            let result = hypno_processor_process(processor, rows.as_ptr());
            assert!(!result.is_null());

            hypno_free_string(result);
            hypno_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let bad = CString::new("not valid json").unwrap();

        unsafe {
            let result = hypno_rows_to_layout(bad.as_ptr(), ptr::null());
            assert!(result.is_null());

            let error = hypno_last_error();
            assert!(!error.is_null());

            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());
        }
    }

    #[test]
    fn test_ffi_invalid_config() {
        let config = CString::new(r#"{"width": 0}"#).unwrap();

        unsafe {
            let processor = hypno_processor_new(config.as_ptr());
            assert!(processor.is_null());
            assert!(!hypno_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = hypno_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
