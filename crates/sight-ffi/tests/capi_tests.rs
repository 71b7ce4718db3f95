use sight_ffi::capi::*;
use std::ffi::{c_char, CStr, CString};
use std::ptr;

fn take_string(raw: *mut c_char) -> String {
    assert!(!raw.is_null());
    let text = unsafe { CStr::from_ptr(raw) }.to_str().unwrap().to_string();
    unsafe { sight_string_free(raw) };
    text
}

// The C API drives one process-wide core, so everything runs in one test
// to keep the last-error checks deterministic.
#[test]
fn test_error_paths_report_through_last_error() {
    assert!(!sight_is_model_loaded());
    assert_eq!(take_string(sight_loaded_model_path()), "");

    let missing = CString::new("/nonexistent/sight/model.onnx").unwrap();
    let message = take_string(unsafe { sight_load_model(missing.as_ptr()) });
    assert!(message.starts_with("Failed to load model"), "{message}");
    assert!(take_string(sight_last_error()).contains("model not found"));

    let message = take_string(unsafe { sight_load_model(ptr::null()) });
    assert!(message.starts_with("Failed to load model"));
    assert_eq!(take_string(sight_last_error()), "model path is null");

    let mut len = 7;
    let image = [0u8; 4];
    let output = unsafe { sight_run_inference(image.as_ptr(), image.len(), &mut len) };
    assert!(output.is_null());
    assert_eq!(len, 0);
    assert!(take_string(sight_last_error()).contains("no model loaded"));

    let output = unsafe { sight_run_inference(ptr::null(), 10, &mut len) };
    assert!(output.is_null());
    assert_eq!(take_string(sight_last_error()), "image data is null");

    let shape = unsafe { sight_output_shape(&mut len) };
    assert!(shape.is_null());
    assert!(!sight_is_classification());
    assert_eq!(take_string(sight_top_predictions_serialized()), "");
    assert!(sight_top_predictions_json().is_null());
    assert_eq!(sight_total_time_ms(), 0.0);
    assert_eq!(sight_inference_time_ms(), 0.0);

    let bad = CString::new(r#"{"top_k":0}"#).unwrap();
    assert!(take_string(unsafe { sight_configure(bad.as_ptr()) }).starts_with("Failed to apply configuration"));
    let good = CString::new(r#"{"top_k":3}"#).unwrap();
    assert_eq!(take_string(unsafe { sight_configure(good.as_ptr()) }), "Configuration applied");

    let labels = CString::new("/nonexistent/sight/labels.txt").unwrap();
    assert!(take_string(unsafe { sight_load_labels(labels.as_ptr()) }).starts_with("Failed to load labels"));

    let image_path = CString::new("/nonexistent/sight/frame.png").unwrap();
    assert!(take_string(unsafe { sight_probe_image(image_path.as_ptr()) }).starts_with("Failed to load image"));

    let report = take_string(sight_describe_backends());
    assert!(report.contains("\"backends\""));
    assert!(report.contains("\"cpu\""));

    assert!(!sight_unload_model());
}

#[test]
fn test_free_functions_accept_null() {
    unsafe {
        sight_string_free(ptr::null_mut());
        sight_floats_free(ptr::null_mut(), 0);
        sight_ints_free(ptr::null_mut(), 3);
    }
}
