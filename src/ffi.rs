use std::ffi::{c_char, CStr, CString};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use crate::config::Settings;
use crate::dictionary::DictionaryRegistry;
use crate::pipeline::ShieldPipeline;
use crate::shield::{restore_text, ShieldMapping};

static LAST_ERROR: Lazy<Mutex<Option<CString>>> = Lazy::new(|| Mutex::new(None));
static LAST_RESULT: Lazy<Mutex<Option<CString>>> = Lazy::new(|| Mutex::new(None));

/// Stores `msg` for [`ts_last_error_utf8`]. Interior NULs are dropped.
fn set_last_error(msg: &str) {
    let bytes: Vec<u8> = msg.bytes().filter(|&b| b != 0).collect();
    let msg = CString::new(bytes).unwrap_or_default();
    *LAST_ERROR.lock().unwrap_or_else(|e| e.into_inner()) = Some(msg);
}

fn set_last_result(s: String) -> *const c_char {
    let c = match CString::new(s) {
        Ok(c) => c,
        Err(_) => {
            set_last_error("result contains NUL");
            return std::ptr::null();
        }
    };
    let mut guard = LAST_RESULT.lock().unwrap_or_else(|e| e.into_inner());
    *guard = Some(c);
    guard.as_ref().map_or(std::ptr::null(), |c| c.as_ptr())
}

/// Copies a caller-owned C string argument; `arg` names it in the error.
fn take_cstr(ptr: *const c_char, arg: &str) -> Result<String, String> {
    if ptr.is_null() {
        return Err(format!("{arg} is null"));
    }
    // SAFETY: non-null and NUL-terminated per the exported function contracts.
    let raw = unsafe { CStr::from_ptr(ptr) };
    raw.to_str()
        .map(str::to_owned)
        .map_err(|_| format!("{arg} is not valid UTF-8"))
}

fn optional_path(ptr: *const c_char, name: &str) -> Result<Option<PathBuf>, String> {
    if ptr.is_null() {
        return Ok(None);
    }
    take_cstr(ptr, name).map(|s| Some(PathBuf::from(s)))
}

fn load_registry(config_path: *const c_char) -> Result<(Settings, Arc<DictionaryRegistry>), String> {
    let cfg = optional_path(config_path, "config_path")?;
    let settings = Settings::load(cfg).map_err(|e| format!("{e:#}"))?;
    let registry = Arc::new(DictionaryRegistry::with_selection(
        &settings.dict_dir,
        settings.active_dictionary.as_deref(),
    ));
    Ok((settings, registry))
}

/// Shields `text` with the configured dictionary.
///
/// Returns JSON `{"text", "mapping", "terms"}`, or null on failure (see
/// `ts_last_error_utf8()`). `config_path` may be null to use the default search.
/// The pointer is valid until the next `ts_shield_json`/`ts_restore_json` call.
#[no_mangle]
pub extern "C" fn ts_shield_json(config_path: *const c_char, text: *const c_char) -> *const c_char {
    let text = match take_cstr(text, "text") {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&e);
            return std::ptr::null();
        }
    };
    let (settings, registry) = match load_registry(config_path) {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&e);
            return std::ptr::null();
        }
    };
    let pipeline = ShieldPipeline::with_registry(registry, settings.default_fuzzy);
    let shielded = pipeline.prepare(&text);
    match serde_json::to_string(&shielded) {
        Ok(json) => set_last_result(json),
        Err(e) => {
            set_last_error(&e.to_string());
            std::ptr::null()
        }
    }
}

/// Restores sentinels in `text` using a JSON object mapping sentinel → target.
#[no_mangle]
pub extern "C" fn ts_restore_json(text: *const c_char, mapping_json: *const c_char) -> *const c_char {
    let text = match take_cstr(text, "text") {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&e);
            return std::ptr::null();
        }
    };
    let mapping = match take_cstr(mapping_json, "mapping_json")
        .and_then(|s| serde_json::from_str::<ShieldMapping>(&s).map_err(|e| e.to_string()))
    {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&e);
            return std::ptr::null();
        }
    };
    set_last_result(restore_text(&text, &mapping))
}

/// Stores a base64-encoded dictionary under `filename`.
///
/// Returns 0 on success; non-zero on failure (see `ts_last_error_utf8()`).
#[no_mangle]
pub extern "C" fn ts_upload_dictionary(
    config_path: *const c_char,
    filename: *const c_char,
    content_base64: *const c_char,
    overwrite: i32,
) -> i32 {
    let (_, registry) = match load_registry(config_path) {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&e);
            return 2;
        }
    };
    let name = match take_cstr(filename, "filename") {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&e);
            return 3;
        }
    };
    let content = match take_cstr(content_base64, "content_base64") {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&e);
            return 4;
        }
    };
    match registry.upload_base64(&name, &content, overwrite != 0) {
        Ok(_) => 0,
        Err(err) => {
            set_last_error(&err.to_string());
            10
        }
    }
}

/// Message of the most recent failed call, or null. The pointer stays valid until
/// the next failure replaces it.
#[no_mangle]
pub extern "C" fn ts_last_error_utf8() -> *const c_char {
    LAST_ERROR
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .as_ref()
        .map_or(std::ptr::null(), |msg| msg.as_ptr())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_json_round_trips_through_c_strings() {
        let text = CString::new("I like TkdicoTranslate1.").expect("cstr");
        let mapping = CString::new(r#"{"TkdicoTranslate1":"연필"}"#).expect("cstr");
        let out = ts_restore_json(text.as_ptr(), mapping.as_ptr());
        assert!(!out.is_null());
        let s = unsafe { CStr::from_ptr(out) }.to_str().expect("utf8").to_string();
        assert_eq!(s, "I like 연필.");
    }

    #[test]
    fn null_text_sets_last_error() {
        let out = ts_restore_json(std::ptr::null(), std::ptr::null());
        assert!(out.is_null());
        assert!(!ts_last_error_utf8().is_null());
    }
}
