//! C ABI over the global core.
//!
//! Strings come back as heap `char*` owned by the caller and must be
//! returned with [`sight_string_free`]. Float and int buffers come back with
//! their length in `out_len` and are freed with [`sight_floats_free`] /
//! [`sight_ints_free`] using that same length. Null means "no result"; the
//! reason is in [`sight_last_error`].

use sight_infer::{boundary, InferenceCore};
use std::ffi::{c_char, CStr, CString};
use std::ptr;

fn core() -> &'static InferenceCore {
    InferenceCore::global()
}

/// Borrow a C string argument, recording an error for null or non-UTF-8.
///
/// # Safety
/// `value` must be null or point to a NUL-terminated string that outlives
/// the returned reference.
unsafe fn read_str<'a>(value: *const c_char, what: &str) -> Option<&'a str> {
    if value.is_null() {
        core().register().record_error(format!("{what} is null"));
        return None;
    }
    match unsafe { CStr::from_ptr(value) }.to_str() {
        Ok(s) => Some(s),
        Err(_) => {
            core().register().record_error(format!("{what} is not valid UTF-8"));
            None
        }
    }
}

/// # Safety
/// `data` must be null or valid for `len` bytes.
unsafe fn read_bytes<'a>(data: *const u8, len: usize) -> Option<&'a [u8]> {
    if data.is_null() {
        boundary::reject_inference(core(), "image data is null");
        return None;
    }
    Some(unsafe { std::slice::from_raw_parts(data, len) })
}

/// Prediction text already escapes NUL; this only touches free-form
/// messages such as error text.
fn into_c_string(value: String) -> *mut c_char {
    let value = value.replace('\0', " ");
    match CString::new(value) {
        Ok(s) => s.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// # Safety
/// `out_len` must be null or valid for a write.
unsafe fn into_buffer<T>(values: Option<Vec<T>>, out_len: *mut usize) -> *mut T {
    let (ptr, len) = match values {
        Some(values) => {
            let boxed = values.into_boxed_slice();
            let len = boxed.len();
            (Box::into_raw(boxed) as *mut T, len)
        }
        None => (ptr::null_mut(), 0),
    };
    if !out_len.is_null() {
        unsafe { *out_len = len };
    }
    ptr
}

/// # Safety
/// `ptr` must come from [`into_buffer`] with this `len`, or be null.
unsafe fn free_buffer<T>(ptr: *mut T, len: usize) {
    if !ptr.is_null() {
        drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)) });
    }
}

/// Install the log sink. `dir` null logs to stdout, otherwise to dated
/// files in `dir`.
///
/// # Safety
/// `dir` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sight_init_logging(dir: *const c_char) -> bool {
    if dir.is_null() {
        return boundary::init_logging(core(), None);
    }
    match unsafe { read_str(dir, "log directory") } {
        Some(dir) => boundary::init_logging(core(), Some(dir)),
        None => false,
    }
}

/// # Safety
/// `path` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sight_load_model(path: *const c_char) -> *mut c_char {
    let message = match unsafe { read_str(path, "model path") } {
        Some(path) => boundary::load_model(core(), path),
        None => format!("{}: model path is null or invalid", sight_infer::constants::LOAD_FAILURE_PREFIX),
    };
    into_c_string(message)
}

#[unsafe(no_mangle)]
pub extern "C" fn sight_unload_model() -> bool {
    boundary::unload_model(core())
}

#[unsafe(no_mangle)]
pub extern "C" fn sight_is_model_loaded() -> bool {
    boundary::is_model_loaded(core())
}

#[unsafe(no_mangle)]
pub extern "C" fn sight_loaded_model_path() -> *mut c_char {
    into_c_string(boundary::loaded_model_path(core()))
}

/// # Safety
/// `data` must be null or valid for `len` bytes; `out_len` must be null or
/// valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sight_run_inference(data: *const u8, len: usize, out_len: *mut usize) -> *mut f32 {
    let output = unsafe { read_bytes(data, len) }.and_then(|image| boundary::run_inference(core(), image));
    unsafe { into_buffer(output, out_len) }
}

/// Same as [`sight_run_inference`]; `path` is accepted for older hosts and
/// ignored.
///
/// # Safety
/// As [`sight_run_inference`]; `path` must be null or a valid string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sight_run_inference_with_path(
    path: *const c_char,
    data: *const u8,
    len: usize,
    out_len: *mut usize,
) -> *mut f32 {
    let path = if path.is_null() {
        ""
    } else {
        unsafe { CStr::from_ptr(path) }.to_str().unwrap_or("")
    };
    let output =
        unsafe { read_bytes(data, len) }.and_then(|image| boundary::run_inference_with_path(core(), path, image));
    unsafe { into_buffer(output, out_len) }
}

/// # Safety
/// `out_len` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sight_output_shape(out_len: *mut usize) -> *mut i32 {
    unsafe { into_buffer(boundary::output_shape(core()), out_len) }
}

#[unsafe(no_mangle)]
pub extern "C" fn sight_is_classification() -> bool {
    boundary::is_classification(core())
}

#[unsafe(no_mangle)]
pub extern "C" fn sight_top_predictions_serialized() -> *mut c_char {
    into_c_string(boundary::top_predictions_serialized(core()))
}

#[unsafe(no_mangle)]
pub extern "C" fn sight_top_predictions_json() -> *mut c_char {
    boundary::top_predictions_json(core()).map_or(ptr::null_mut(), into_c_string)
}

#[unsafe(no_mangle)]
pub extern "C" fn sight_inference_time_ms() -> f32 {
    boundary::inference_time_ms(core())
}

#[unsafe(no_mangle)]
pub extern "C" fn sight_preprocessing_time_ms() -> f32 {
    boundary::preprocessing_time_ms(core())
}

#[unsafe(no_mangle)]
pub extern "C" fn sight_postprocessing_time_ms() -> f32 {
    boundary::postprocessing_time_ms(core())
}

#[unsafe(no_mangle)]
pub extern "C" fn sight_total_time_ms() -> f32 {
    boundary::total_time_ms(core())
}

#[unsafe(no_mangle)]
pub extern "C" fn sight_last_error() -> *mut c_char {
    into_c_string(boundary::last_error(core()))
}

/// # Safety
/// `path` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sight_load_labels(path: *const c_char) -> *mut c_char {
    let message = match unsafe { read_str(path, "labels path") } {
        Some(path) => boundary::load_labels(core(), path),
        None => "Failed to load labels: path is null or invalid".to_string(),
    };
    into_c_string(message)
}

/// # Safety
/// `json` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sight_configure(json: *const c_char) -> *mut c_char {
    let message = match unsafe { read_str(json, "configuration") } {
        Some(json) => boundary::configure(core(), json),
        None => "Failed to apply configuration: configuration is null or invalid".to_string(),
    };
    into_c_string(message)
}

#[unsafe(no_mangle)]
pub extern "C" fn sight_describe_backends() -> *mut c_char {
    into_c_string(boundary::describe_backends(core()))
}

/// # Safety
/// `path` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sight_probe_image(path: *const c_char) -> *mut c_char {
    let message = match unsafe { read_str(path, "image path") } {
        Some(path) => boundary::probe_image(core(), path),
        None => "Failed to load image: path is null or invalid".to_string(),
    };
    into_c_string(message)
}

/// # Safety
/// `value` must be null or a string returned by this library, freed once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sight_string_free(value: *mut c_char) {
    if !value.is_null() {
        drop(unsafe { CString::from_raw(value) });
    }
}

/// # Safety
/// `ptr` and `len` must come from one float-returning call, freed once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sight_floats_free(ptr: *mut f32, len: usize) {
    unsafe { free_buffer(ptr, len) }
}

/// # Safety
/// `ptr` and `len` must come from [`sight_output_shape`], freed once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sight_ints_free(ptr: *mut i32, len: usize) {
    unsafe { free_buffer(ptr, len) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interior_nul_is_replaced() {
        let raw = into_c_string("a\0b".to_string());
        let text = unsafe { CStr::from_ptr(raw) }.to_str().unwrap().to_string();
        unsafe { sight_string_free(raw) };
        assert_eq!(text, "a b");
    }

    #[test]
    fn test_buffer_round_trip() {
        let mut len = 99;
        let ptr = unsafe { into_buffer(Some(vec![1.5f32, 2.5, 3.5]), &mut len) };
        assert_eq!(len, 3);
        let values = unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec();
        unsafe { sight_floats_free(ptr, len) };
        assert_eq!(values, vec![1.5, 2.5, 3.5]);

        let ptr = unsafe { into_buffer::<i32>(None, &mut len) };
        assert!(ptr.is_null());
        assert_eq!(len, 0);
    }
}
