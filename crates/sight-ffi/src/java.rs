//! JNI exports for `io.sight.SightNative`.
//!
//! Every method is static on the Java side. Strings and arrays that cannot
//! be produced come back as `null`; the reason is in `getLastError()`.

use jni::JNIEnv;
use jni::objects::{JByteArray, JClass, JString};
use jni::sys::{jboolean, jfloat, jfloatArray, jint, jintArray, jsize, jstring, JNI_FALSE, JNI_TRUE};
use sight_infer::{boundary, InferenceCore};
use std::ptr;

fn core() -> &'static InferenceCore {
    InferenceCore::global()
}

fn to_jboolean(value: bool) -> jboolean {
    if value { JNI_TRUE } else { JNI_FALSE }
}

fn read_string(env: &mut JNIEnv, value: &JString, what: &str) -> Option<String> {
    if value.is_null() {
        core().register().record_error(format!("{what} is null"));
        return None;
    }
    match env.get_string(value) {
        Ok(s) => Some(s.into()),
        Err(e) => {
            core().register().record_error(format!("cannot read {what} from JNI: {e}"));
            None
        }
    }
}

fn read_bytes(env: &JNIEnv, value: JByteArray) -> Option<Vec<u8>> {
    if value.is_null() {
        boundary::reject_inference(core(), "image data is null");
        return None;
    }
    match env.convert_byte_array(value) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            boundary::reject_inference(core(), format!("cannot read image data from JNI: {e}"));
            None
        }
    }
}

fn to_jstring(env: &JNIEnv, value: &str) -> jstring {
    match env.new_string(value) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            log::error!("cannot create Java string: {}", e);
            ptr::null_mut()
        }
    }
}

fn to_jfloat_array(env: &JNIEnv, values: Option<Vec<f32>>) -> jfloatArray {
    let Some(values) = values else {
        return ptr::null_mut();
    };
    let Ok(len) = jsize::try_from(values.len()) else {
        core().register().record_error("output is too large for a Java array");
        return ptr::null_mut();
    };
    match env.new_float_array(len) {
        Ok(array) if env.set_float_array_region(&array, 0, &values).is_ok() => array.into_raw(),
        _ => {
            core().register().record_error("cannot create Java float array");
            ptr::null_mut()
        }
    }
}

fn to_jint_array(env: &JNIEnv, values: Option<Vec<i32>>) -> jintArray {
    let Some(values) = values else {
        return ptr::null_mut();
    };
    let Ok(len) = jsize::try_from(values.len()) else {
        return ptr::null_mut();
    };
    match env.new_int_array(len) {
        Ok(array) if env.set_int_array_region(&array, 0, &values).is_ok() => array.into_raw(),
        _ => {
            core().register().record_error("cannot create Java int array");
            ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_initLogging<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    dir: JString<'local>,
) -> jboolean {
    let installed = if dir.is_null() {
        boundary::init_logging(core(), None)
    } else {
        match read_string(&mut env, &dir, "log directory") {
            Some(dir) => boundary::init_logging(core(), Some(&dir)),
            None => false,
        }
    };
    to_jboolean(installed)
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_loadModel<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    path: JString<'local>,
) -> jstring {
    let message = match read_string(&mut env, &path, "model path") {
        Some(path) => boundary::load_model(core(), &path),
        None => format!("{}: cannot read model path", sight_infer::constants::LOAD_FAILURE_PREFIX),
    };
    to_jstring(&env, &message)
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_unloadModel<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jboolean {
    to_jboolean(boundary::unload_model(core()))
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_isModelLoaded<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jboolean {
    to_jboolean(boundary::is_model_loaded(core()))
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_getLoadedModelPath<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jstring {
    to_jstring(&env, &boundary::loaded_model_path(core()))
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_runInference<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    image: JByteArray<'local>,
) -> jfloatArray {
    let output = read_bytes(&env, image).and_then(|bytes| boundary::run_inference(core(), &bytes));
    to_jfloat_array(&env, output)
}

/// Older hosts pass the model path on every call; it is ignored.
#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_runInferenceWithPath<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    path: JString<'local>,
    image: JByteArray<'local>,
) -> jfloatArray {
    let path = if path.is_null() {
        String::new()
    } else {
        env.get_string(&path).map(Into::into).unwrap_or_default()
    };
    let output =
        read_bytes(&env, image).and_then(|bytes| boundary::run_inference_with_path(core(), &path, &bytes));
    to_jfloat_array(&env, output)
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_getOutputShape<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jintArray {
    let shape = boundary::output_shape(core()).map(|shape| shape.into_iter().map(|d| d as jint).collect());
    to_jint_array(&env, shape)
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_isClassification<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jboolean {
    to_jboolean(boundary::is_classification(core()))
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_getTopPredictions<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jstring {
    to_jstring(&env, &boundary::top_predictions_serialized(core()))
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_getTopPredictionsJson<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jstring {
    match boundary::top_predictions_json(core()) {
        Some(json) => to_jstring(&env, &json),
        None => ptr::null_mut(),
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_getInferenceTime<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jfloat {
    boundary::inference_time_ms(core())
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_getPreprocessingTime<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jfloat {
    boundary::preprocessing_time_ms(core())
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_getPostprocessingTime<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jfloat {
    boundary::postprocessing_time_ms(core())
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_getTotalTime<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jfloat {
    boundary::total_time_ms(core())
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_getLastError<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jstring {
    to_jstring(&env, &boundary::last_error(core()))
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_loadLabels<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    path: JString<'local>,
) -> jstring {
    let message = match read_string(&mut env, &path, "labels path") {
        Some(path) => boundary::load_labels(core(), &path),
        None => "Failed to load labels: cannot read labels path".to_string(),
    };
    to_jstring(&env, &message)
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_configure<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    json: JString<'local>,
) -> jstring {
    let message = match read_string(&mut env, &json, "configuration") {
        Some(json) => boundary::configure(core(), &json),
        None => "Failed to apply configuration: cannot read configuration".to_string(),
    };
    to_jstring(&env, &message)
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_describeBackends<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jstring {
    to_jstring(&env, &boundary::describe_backends(core()))
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_io_sight_SightNative_probeImage<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    path: JString<'local>,
) -> jstring {
    let message = match read_string(&mut env, &path, "image path") {
        Some(path) => boundary::probe_image(core(), &path),
        None => "Failed to load image: cannot read image path".to_string(),
    };
    to_jstring(&env, &message)
}
