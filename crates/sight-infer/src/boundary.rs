//! Flat operations behind the host bindings.
//!
//! Nothing here returns `Result` or unwinds. Failures are written to the
//! core's register and surface as sentinels: an empty string, `None`,
//! `false` or zero. A panic inside any operation is caught and recorded the
//! same way.

use crate::classify::{encode_predictions, predictions_json};
use crate::constants::{LOAD_FAILURE_PREFIX, LOAD_SUCCESS_PREFIX};
use crate::inference::InferenceCore;
use crate::pipeline::StageTimings;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

fn catch<R>(op: &str, f: impl FnOnce() -> R) -> Result<R, String> {
    catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| format!("internal error in {op}: {}", panic_message(payload.as_ref())))
}

fn guarded<R>(core: &InferenceCore, op: &str, fallback: R, f: impl FnOnce() -> R) -> R {
    catch(op, f).unwrap_or_else(|message| {
        core.register().record_error(message);
        fallback
    })
}

pub fn load_model(core: &InferenceCore, path: &str) -> String {
    guarded(core, "load_model", format!("{LOAD_FAILURE_PREFIX}: internal error"), || {
        match core.load(path) {
            Ok(summary) => format!(
                "{LOAD_SUCCESS_PREFIX}: {} on {} backend (input {:?}, output {:?})",
                summary.identifier, summary.backend, summary.input_shape, summary.output_shape
            ),
            Err(e) => format!("{LOAD_FAILURE_PREFIX}: {e}"),
        }
    })
}

pub fn unload_model(core: &InferenceCore) -> bool {
    guarded(core, "unload_model", false, || core.unload())
}

pub fn is_model_loaded(core: &InferenceCore) -> bool {
    guarded(core, "is_model_loaded", false, || core.is_loaded())
}

/// Identifier of the loaded model, empty if none.
pub fn loaded_model_path(core: &InferenceCore) -> String {
    guarded(core, "loaded_model_path", String::new(), || {
        core.loaded_identifier().unwrap_or_default()
    })
}

/// Raw output of the model for one encoded image, `None` on failure.
pub fn run_inference(core: &InferenceCore, image: &[u8]) -> Option<Vec<f32>> {
    catch("run_inference", || core.run(image).ok().map(|outcome| outcome.data)).unwrap_or_else(|message| {
        reject_inference(core, message);
        None
    })
}

/// Record an inference attempt that produced nothing, e.g. a host passing
/// no image. The previous outcome is dropped and every timing reads 0.
pub fn reject_inference(core: &InferenceCore, message: impl Into<String>) {
    core.register().record_failure(message, StageTimings::default());
}

/// Older hosts pass the model path with every request. The cached session
/// is always used and `path` only shows up in the debug log.
pub fn run_inference_with_path(core: &InferenceCore, path: &str, image: &[u8]) -> Option<Vec<f32>> {
    log::debug!("run_inference_with_path: ignoring {}, using cached session", path);
    run_inference(core, image)
}

/// Shape of the last successful output.
pub fn output_shape(core: &InferenceCore) -> Option<Vec<i32>> {
    guarded(core, "output_shape", None, || {
        core.register().with_outcome(|outcome| {
            outcome.map(|o| o.shape.iter().map(|&d| i32::try_from(d).unwrap_or(i32::MAX)).collect())
        })
    })
}

pub fn is_classification(core: &InferenceCore) -> bool {
    guarded(core, "is_classification", false, || {
        core.register().with_outcome(|outcome| outcome.is_some_and(|o| o.is_classification))
    })
}

/// Top predictions of the last run in the `index|label|confidence;...` form.
pub fn top_predictions_serialized(core: &InferenceCore) -> String {
    guarded(core, "top_predictions_serialized", String::new(), || {
        core.register()
            .with_outcome(|outcome| outcome.map(|o| encode_predictions(&o.predictions)).unwrap_or_default())
    })
}

pub fn top_predictions_json(core: &InferenceCore) -> Option<String> {
    guarded(core, "top_predictions_json", None, || -> Option<String> {
        let json = core.register().with_outcome(|outcome| outcome.map(|o| predictions_json(&o.predictions)))?;
        match json {
            Ok(json) => Some(json),
            Err(e) => {
                core.register().record_error(format!("cannot encode predictions: {e}"));
                None
            }
        }
    })
}

pub fn inference_time_ms(core: &InferenceCore) -> f32 {
    guarded(core, "inference_time_ms", 0.0, || core.register().timings().inference_ms)
}

pub fn preprocessing_time_ms(core: &InferenceCore) -> f32 {
    guarded(core, "preprocessing_time_ms", 0.0, || core.register().timings().preprocess_ms)
}

pub fn postprocessing_time_ms(core: &InferenceCore) -> f32 {
    guarded(core, "postprocessing_time_ms", 0.0, || core.register().timings().postprocess_ms)
}

pub fn total_time_ms(core: &InferenceCore) -> f32 {
    guarded(core, "total_time_ms", 0.0, || core.register().timings().total_ms)
}

pub fn last_error(core: &InferenceCore) -> String {
    guarded(core, "last_error", String::new(), || core.register().last_error())
}

pub fn load_labels(core: &InferenceCore, path: &str) -> String {
    guarded(core, "load_labels", "Failed to load labels: internal error".to_string(), || {
        match core.load_labels(path) {
            Ok(count) => format!("Successfully loaded {count} labels"),
            Err(e) => format!("Failed to load labels: {e}"),
        }
    })
}

/// Apply a JSON `CoreConfig`. Fields left out keep their defaults.
pub fn configure(core: &InferenceCore, json: &str) -> String {
    guarded(core, "configure", "Failed to apply configuration: internal error".to_string(), || {
        match core.configure_json(json) {
            Ok(()) => "Configuration applied".to_string(),
            Err(e) => format!("Failed to apply configuration: {e}"),
        }
    })
}

/// JSON with the probed backends and the loaded session, if any.
pub fn describe_backends(core: &InferenceCore) -> String {
    guarded(core, "describe_backends", String::new(), || {
        let report = serde_json::json!({
            "backends": core.backends(),
            "session": core.summary(),
        });
        report.to_string()
    })
}

/// Decode the image at `path` and report its size, for host diagnostics.
pub fn probe_image(core: &InferenceCore, path: &str) -> String {
    guarded(core, "probe_image", "Failed to load image: internal error".to_string(), || {
        match sight_image::probe_image(path) {
            Ok(info) => format!("Image loaded successfully: {}x{} ({})", info.width, info.height, info.color),
            Err(e) => {
                let message = format!("Failed to load image: {e}");
                core.register().record_error(message.clone());
                message
            }
        }
    })
}

/// Install the log sink: a dated file in `dir`, or stdout when `dir` is
/// `None`. Returns false if a logger was already installed or the directory
/// cannot be used.
pub fn init_logging(core: &InferenceCore, dir: Option<&str>) -> bool {
    guarded(core, "init_logging", false, || {
        let level = core.config().log_level;
        match dir {
            None => sight_base::init_stdout_logger(level),
            Some(dir) => match sight_base::init_file_logger(dir, level) {
                Ok(installed) => installed,
                Err(e) => {
                    core.register().record_error(format!("cannot open log directory {dir}: {e}"));
                    false
                }
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
