pub mod backend;
pub mod backendregistry;
pub mod backends;
pub mod boundary;
pub mod classify;
pub mod config;
pub mod constants;
pub mod error;
pub mod inference;
pub mod labels;
pub mod manager;
pub mod modelsource;
pub mod pipeline;
pub mod probe;
pub mod register;
pub mod session;
pub mod signature;

pub use backend::{BackendAttempt, BackendDescriptor, BackendKind, ComputeRunner};
pub use backendregistry::{create_registry, BackendRegistry, RunnerConfig, Selection};
pub use classify::{classify, encode_predictions, parse_predictions, predictions_json, softmax, ClassificationResult};
pub use config::{CoreConfig, OutputActivation};
pub use error::{BackendError, ConfigError, InferenceError, LabelError, LoadError, PredictionParseError};
pub use inference::InferenceCore;
pub use labels::LabelTable;
pub use manager::SessionManager;
pub use modelsource::{FsModelReader, MemoryModelReader, ModelBytes, ModelReader};
pub use pipeline::{InferenceOutcome, StageTimings};
pub use probe::{probe, probe_device, DeviceInfo};
pub use register::StateRegister;
pub use session::{ModelSession, SessionSummary};
pub use signature::{InputSpec, ModelSignature, TensorSpec};

pub use sight_base::Tensor;
