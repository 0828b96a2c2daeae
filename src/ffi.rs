//! FFI bindings for Stride Analytics
//!
//! This module provides C-compatible functions for calling the analytics core
//! from other languages. All functions use C strings (null-terminated) and
//! return allocated memory that must be freed by the caller using
//! `stride_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::AnalyticsConfig;
use crate::encoder::ReportEncoder;
use crate::error::AnalyticsError;
use crate::pipeline::{analyze_json, AnalyticsProcessor, AnalyticsRequest};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Read a required C string argument
unsafe fn required_str(ptr: *const c_char, name: &str) -> Result<String, AnalyticsError> {
    if ptr.is_null() {
        return Err(AnalyticsError::InvalidRequest(format!("{name} is null")));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(str::to_string)
        .map_err(|_| AnalyticsError::InvalidRequest(format!("{name} is not valid UTF-8")))
}

/// Read an optional C string argument; NULL means "use the default"
unsafe fn optional_str(ptr: *const c_char, name: &str) -> Result<Option<String>, AnalyticsError> {
    if ptr.is_null() {
        Ok(None)
    } else {
        required_str(ptr, name).map(Some)
    }
}

unsafe fn config_arg(ptr: *const c_char) -> Result<AnalyticsConfig, AnalyticsError> {
    match optional_str(ptr, "config_json")? {
        Some(json) => AnalyticsConfig::from_json_str(&json),
        None => Ok(AnalyticsConfig::default()),
    }
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a result across the boundary: a new string, or NULL plus last error
fn into_c_string(result: Result<String, AnalyticsError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Normalize a payload, compute one request and return the JSON report.
///
/// # Safety
/// - `payload_json` must be a valid null-terminated C string.
/// - `request_json` and `config_json` may be NULL to use defaults; otherwise
///   they must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `stride_free_string`.
/// - Returns NULL on error; call `stride_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stride_analyze(
    payload_json: *const c_char,
    request_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let report = (|| {
        let payload = required_str(payload_json, "payload_json")?;
        let request = optional_str(request_json, "request_json")?;
        let config = config_arg(config_json)?;
        let result = analyze_json(&payload, request.as_deref(), &config)?;
        ReportEncoder::new().encode_to_json(&result)
    })();

    into_c_string(report)
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to an AnalyticsProcessor
pub struct StrideProcessorHandle {
    processor: AnalyticsProcessor,
    encoder: ReportEncoder,
}

/// Create a new processor.
///
/// # Safety
/// - `config_json` may be NULL for the default configuration.
/// - Returns NULL if the configuration is invalid; call `stride_last_error`.
/// - The returned pointer must be freed with `stride_processor_free`.
#[no_mangle]
pub unsafe extern "C" fn stride_processor_new(
    config_json: *const c_char,
) -> *mut StrideProcessorHandle {
    clear_last_error();

    match config_arg(config_json) {
        Ok(config) => Box::into_raw(Box::new(StrideProcessorHandle {
            processor: AnalyticsProcessor::with_config(config),
            encoder: ReportEncoder::new(),
        })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `stride_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn stride_processor_free(processor: *mut StrideProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Load a raw activity payload into the processor, replacing the previous one.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `stride_processor_new`.
/// - `payload_json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error; call `stride_last_error` on error.
#[no_mangle]
pub unsafe extern "C" fn stride_processor_load(
    processor: *mut StrideProcessorHandle,
    payload_json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }
    let handle = &mut *processor;

    let loaded = required_str(payload_json, "payload_json")
        .and_then(|json| handle.processor.load_json(&json));
    match loaded {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Compute a request against the loaded activity and return the JSON report.
/// Unchanged stages are served from the processor's cache.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `stride_processor_new`.
/// - `request_json` may be NULL for the default request.
/// - Returns a newly allocated string that must be freed with `stride_free_string`.
/// - Returns NULL on error; call `stride_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stride_processor_compute(
    processor: *mut StrideProcessorHandle,
    request_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &mut *processor;

    let report = (|| {
        let request = match optional_str(request_json, "request_json")? {
            Some(json) => AnalyticsRequest::from_json(&json)?,
            None => AnalyticsRequest::default(),
        };
        let result = handle.processor.compute(&request)?;
        handle.encoder.encode_to_json(&result)
    })();

    into_c_string(report)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by a stride function.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a stride function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn stride_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next stride function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn stride_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn stride_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
