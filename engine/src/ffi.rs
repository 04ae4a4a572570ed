//! FFI layer for non-Rust hosts.
//!
//! This module provides C-compatible functions so a JavaScript, Dart or
//! Swift host can drive the reducer and the pure transforms directly.
//! All data crosses the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `flute_*` functions are allocated by Rust
//! - Caller must free them with `flute_string_free`
//! - Registry pointers must be freed with `flute_registry_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure

use crate::{
    action::Action,
    config::ApiConfig,
    diff::{prune_deep, request_body},
    record::Record,
    reducer::Reducer,
    registry::Registry,
    route::resolve_route,
    schema::Verb,
    state::StoreState,
};
use serde_json::Value;
use std::ffi::{c_char, CStr, CString};
use std::ptr;
use std::sync::Arc;

/// Registered models plus the API configuration used for routes.
pub struct FluteRegistry {
    reducer: Reducer,
    config: ApiConfig,
}

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `flute_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    CString::new(s)
        .or_else(|_| CString::new(r#"{"error":"string contained null bytes"}"#))
        .unwrap_or_default()
        .into_raw()
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Parse a JSON argument, or produce the error response for it.
unsafe fn parse_arg<T: serde::de::DeserializeOwned>(
    ptr: *const c_char,
    what: &str,
) -> Result<T, *mut c_char> {
    let raw = from_c_string(ptr)
        .ok_or_else(|| to_c_string(FfiResult::<()>::err(format!("invalid {what} JSON")).to_json()))?;
    serde_json::from_str(&raw).map_err(|e| {
        to_c_string(FfiResult::<()>::err(format!("{what} parse error: {e}")).to_json())
    })
}

fn respond<T: serde::Serialize>(result: crate::error::Result<T>) -> *mut c_char {
    match result {
        Ok(value) => to_c_string(FfiResult::ok(value).to_json()),
        Err(e) => to_c_string(FfiResult::<()>::err(e.to_string()).to_json()),
    }
}

// ============================================================================
// Registry Lifecycle
// ============================================================================

/// Create a registry from model declarations.
///
/// # Arguments
/// - `models_json`: JSON array of model descriptors
/// - `config_json`: JSON `ApiConfig`, or null for defaults
///
/// # Returns
/// Pointer to the registry, or null on failure.
///
/// # Safety
/// - `models_json` must be a valid null-terminated C string or null
/// - `config_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `flute_registry_free`
#[no_mangle]
pub unsafe extern "C" fn flute_registry_new(
    models_json: *const c_char,
    config_json: *const c_char,
) -> *mut FluteRegistry {
    let models: Vec<Value> = match from_c_string(models_json).map(|s| serde_json::from_str(&s)) {
        Some(Ok(models)) => models,
        _ => return ptr::null_mut(),
    };

    let config: ApiConfig = match from_c_string(config_json) {
        None => ApiConfig::default(),
        Some(s) => match serde_json::from_str(&s) {
            Ok(config) => config,
            Err(_) => return ptr::null_mut(),
        },
    };

    let mut registry = Registry::new();
    for model in models {
        if registry.register_value(model).is_err() {
            return ptr::null_mut();
        }
    }

    let handle = FluteRegistry {
        reducer: Reducer::new(Arc::new(registry)),
        config,
    };
    Box::into_raw(Box::new(handle))
}

/// Free a registry.
///
/// # Safety
/// - `registry` must be a valid pointer from `flute_registry_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn flute_registry_free(registry: *mut FluteRegistry) {
    if !registry.is_null() {
        drop(Box::from_raw(registry));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `flute_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn flute_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Store State
// ============================================================================

/// Build the initial store state.
///
/// # Returns
/// JSON string: `{"ok": StoreState}` or `{"error": "message"}`
///
/// # Safety
/// - `registry` must be a valid pointer from `flute_registry_new` or null
/// - Caller must free the returned string with `flute_string_free`
#[no_mangle]
pub unsafe extern "C" fn flute_initial_state(registry: *const FluteRegistry) -> *mut c_char {
    let registry = match registry.as_ref() {
        Some(r) => r,
        None => return to_c_string(FfiResult::<()>::err("null registry pointer").to_json()),
    };

    to_c_string(FfiResult::ok(registry.reducer.initial_state()).to_json())
}

/// Apply an action to a store state.
///
/// # Arguments
/// - `state_json`: JSON `StoreState`
/// - `action_json`: JSON action (`{"type": ..., "record": ...}`)
///
/// # Returns
/// JSON string: `{"ok": StoreState}` or `{"error": "message"}`
///
/// # Safety
/// - `registry` must be a valid pointer from `flute_registry_new` or null
/// - `state_json` and `action_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `flute_string_free`
#[no_mangle]
pub unsafe extern "C" fn flute_reduce(
    registry: *const FluteRegistry,
    state_json: *const c_char,
    action_json: *const c_char,
) -> *mut c_char {
    let registry = match registry.as_ref() {
        Some(r) => r,
        None => return to_c_string(FfiResult::<()>::err("null registry pointer").to_json()),
    };

    let state: StoreState = match parse_arg(state_json, "state") {
        Ok(state) => state,
        Err(response) => return response,
    };
    let action: Action = match parse_arg(action_json, "action") {
        Ok(action) => action,
        Err(response) => return response,
    };

    to_c_string(FfiResult::ok(registry.reducer.reduce(&state, &action)).to_json())
}

// ============================================================================
// Routes and Bodies
// ============================================================================

/// Resolve the route for a model and verb.
///
/// # Arguments
/// - `model`: Model name (e.g. `BankAccount`)
/// - `verb`: `GET`, `POST`, `PUT`, `DELETE` or `INDEX`
/// - `record_json`: JSON record used for interpolation, or null
/// - `query_json`: JSON object or string query, or null
///
/// # Returns
/// JSON string: `{"ok": "/route"}` or `{"error": "message"}`
///
/// # Safety
/// - `registry` must be a valid pointer from `flute_registry_new` or null
/// - String arguments must be valid null-terminated C strings or null
/// - Caller must free the returned string with `flute_string_free`
#[no_mangle]
pub unsafe extern "C" fn flute_resolve_route(
    registry: *const FluteRegistry,
    model: *const c_char,
    verb: *const c_char,
    record_json: *const c_char,
    query_json: *const c_char,
) -> *mut c_char {
    let registry = match registry.as_ref() {
        Some(r) => r,
        None => return to_c_string(FfiResult::<()>::err("null registry pointer").to_json()),
    };

    let model = match from_c_string(model) {
        Some(m) => m,
        None => return to_c_string(FfiResult::<()>::err("invalid model name").to_json()),
    };
    let verb: Verb = match from_c_string(verb).map(|v| v.parse()) {
        Some(Ok(v)) => v,
        Some(Err(e)) => return respond::<()>(Err(e)),
        None => return to_c_string(FfiResult::<()>::err("invalid verb").to_json()),
    };

    let record: Record = if record_json.is_null() {
        Record::new()
    } else {
        match parse_arg::<Option<Record>>(record_json, "record") {
            Ok(record) => record.unwrap_or_default(),
            Err(response) => return response,
        }
    };
    let query: Option<Value> = if query_json.is_null() {
        None
    } else {
        match parse_arg(query_json, "query") {
            Ok(query) => Some(query),
            Err(response) => return response,
        }
    };

    respond(registry.reducer.registry().get(&model).and_then(|descriptor| {
        resolve_route(&registry.config, descriptor, verb, &record, query.as_ref())
    }))
}

/// Compute the request body for a save.
///
/// # Returns
/// JSON string: `{"ok": body}` or `{"error": "message"}`
///
/// # Safety
/// - `pristine_json` and `current_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `flute_string_free`
#[no_mangle]
pub unsafe extern "C" fn flute_request_body(
    pristine_json: *const c_char,
    current_json: *const c_char,
    diff_mode: bool,
) -> *mut c_char {
    let pristine: Record = match parse_arg(pristine_json, "pristine record") {
        Ok(record) => record,
        Err(response) => return response,
    };
    let current: Record = match parse_arg(current_json, "current record") {
        Ok(record) => record,
        Err(response) => return response,
    };

    to_c_string(FfiResult::ok(request_body(&pristine, &current, diff_mode)).to_json())
}

/// Recursively prune nulls and empty containers from a JSON value.
///
/// # Returns
/// JSON string: `{"ok": value}` or `{"error": "message"}`
///
/// # Safety
/// - `value_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `flute_string_free`
#[no_mangle]
pub unsafe extern "C" fn flute_prune(value_json: *const c_char) -> *mut c_char {
    let value: Value = match parse_arg(value_json, "value") {
        Ok(value) => value,
        Err(response) => return response,
    };

    to_c_string(FfiResult::ok(prune_deep(&value)).to_json())
}

// ============================================================================
// Utility
// ============================================================================

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn flute_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
