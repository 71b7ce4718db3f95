use crate::backend::{BackendAttempt, BackendKind, ComputeRunner};
use crate::backendregistry::Selection;
use crate::error::{BackendError, LoadError};
use crate::signature::{InputSpec, ModelSignature};
use serde::Serialize;
use sight_base::Tensor;

/// One loaded model bound to the runner that initialized it.
pub struct ModelSession {
    identifier: String,
    signature: ModelSignature,
    input: InputSpec,
    is_classification: bool,
    runner: Box<dyn ComputeRunner>,
    attempts: Vec<BackendAttempt>,
}

/// Host-facing description of a loaded session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub identifier: String,
    pub backend: BackendKind,
    pub input_shape: Vec<i64>,
    pub output_shape: Vec<i64>,
    pub is_classification: bool,
    pub attempts: Vec<BackendAttempt>,
}

impl ModelSession {
    /// Validate the runner's signature and wrap it. On error the runner is
    /// released.
    pub fn new(identifier: impl Into<String>, selection: Selection, default_size: u32) -> Result<Self, LoadError> {
        let Selection {
            mut runner,
            signature,
            attempts,
        } = selection;

        let input = match signature.resolve_input(default_size) {
            Ok(input) => input,
            Err(e) => {
                runner.release();
                return Err(e);
            }
        };

        Ok(Self {
            identifier: identifier.into(),
            is_classification: signature.is_classification(),
            signature,
            input,
            runner,
            attempts,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn signature(&self) -> &ModelSignature {
        &self.signature
    }

    pub fn input(&self) -> &InputSpec {
        &self.input
    }

    pub fn is_classification(&self) -> bool {
        self.is_classification
    }

    pub fn backend(&self) -> BackendKind {
        self.runner.kind()
    }

    pub fn run(&mut self, input: &Tensor<f32>) -> Result<Tensor<f32>, BackendError> {
        self.runner.run(input)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            identifier: self.identifier.clone(),
            backend: self.backend(),
            input_shape: self.signature.input().map(|s| s.shape.clone()).unwrap_or_default(),
            output_shape: self.signature.output().map(|s| s.shape.clone()).unwrap_or_default(),
            is_classification: self.is_classification,
            attempts: self.attempts.clone(),
        }
    }
}

impl Drop for ModelSession {
    fn drop(&mut self) {
        self.runner.release();
        log::debug!("session for {} dropped", self.identifier);
    }
}
