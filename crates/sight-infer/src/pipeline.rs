//! Preprocess, execute and postprocess one image against a session.
//!
//! Each stage is timed with a monotonic clock. Failed runs keep the
//! timings they collected and report unreached stages as exactly zero.

use crate::backend::BackendKind;
use crate::classify::{classify, softmax, ClassificationResult};
use crate::config::{CoreConfig, OutputActivation};
use crate::error::InferenceError;
use crate::labels::LabelTable;
use crate::session::ModelSession;
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StageTimings {
    pub preprocess_ms: f32,
    pub inference_ms: f32,
    pub postprocess_ms: f32,
    pub total_ms: f32,
}

impl StageTimings {
    pub fn stage_sum_ms(&self) -> f32 {
        self.preprocess_ms + self.inference_ms + self.postprocess_ms
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceOutcome {
    pub identifier: String,
    pub backend: BackendKind,
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
    pub is_classification: bool,
    pub predictions: Vec<ClassificationResult>,
    pub timings: StageTimings,
}

/// A failed run together with the timings collected before it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineFailure {
    pub error: InferenceError,
    pub timings: StageTimings,
}

fn ms(duration: Duration) -> f32 {
    duration.as_secs_f32() * 1000.0
}

/// Run `image` through `session`. Callers hold the session lock, so the
/// total clock starts once the session is ours.
pub fn run(
    session: &mut ModelSession,
    image: &[u8],
    config: &CoreConfig,
    labels: Option<&LabelTable>,
) -> Result<InferenceOutcome, PipelineFailure> {
    let start = Instant::now();
    let mut timings = StageTimings::default();

    let fail = |error: InferenceError, mut timings: StageTimings| {
        timings.total_ms = ms(start.elapsed());
        PipelineFailure { error, timings }
    };

    let stage = Instant::now();
    let preprocess_config = config.preprocess_for(session.input());
    let input = sight_image::preprocess(image, &preprocess_config);
    timings.preprocess_ms = ms(stage.elapsed());
    let input = input.map_err(|e| fail(InferenceError::from(e), timings))?;

    let stage = Instant::now();
    let output = session.run(&input);
    timings.inference_ms = ms(stage.elapsed());
    let output = output.map_err(|e| fail(InferenceError::Backend(e), timings))?;

    let stage = Instant::now();
    let predictions = if session.is_classification() {
        match config.output_activation {
            OutputActivation::None => classify(&output.data, labels, config.top_k),
            OutputActivation::Softmax => classify(&softmax(&output.data), labels, config.top_k),
        }
    } else {
        Vec::new()
    };
    let (shape, data) = output.into_parts();
    timings.postprocess_ms = ms(stage.elapsed());

    timings.total_ms = ms(start.elapsed());
    log::debug!(
        "inference on {}: pre {:.2}ms, run {:.2}ms, post {:.2}ms, total {:.2}ms",
        session.identifier(),
        timings.preprocess_ms,
        timings.inference_ms,
        timings.postprocess_ms,
        timings.total_ms
    );

    Ok(InferenceOutcome {
        identifier: session.identifier().to_string(),
        backend: session.backend(),
        data,
        shape,
        is_classification: session.is_classification(),
        predictions,
        timings,
    })
}
