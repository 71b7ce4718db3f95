use crate::backend::{BackendAttempt, BackendKind};
use std::fmt;

/// Failure inside a compute runner, during initialization or execution.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendError {
    pub kind: BackendKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} backend: {}", self.kind, self.message)
    }
}

impl std::error::Error for BackendError {}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    NotFound(String),
    Unreadable { path: String, reason: String },
    InvalidSignature(String),
    /// Every candidate backend, scalar CPU included, failed to initialize.
    BackendExhausted(Vec<BackendAttempt>),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotFound(path) => write!(f, "model not found: {path}"),
            LoadError::Unreadable { path, reason } => write!(f, "cannot read model {path}: {reason}"),
            LoadError::InvalidSignature(msg) => write!(f, "unsupported model signature: {msg}"),
            LoadError::BackendExhausted(attempts) => {
                write!(f, "no backend could initialize the model")?;
                for (i, attempt) in attempts.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { "; " };
                    write!(f, "{sep}{} ({})", attempt.kind, attempt.error)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for LoadError {}

#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    NoModelLoaded,
    Preprocess(String),
    Backend(BackendError),
    /// Reserved; postprocessing after a successful execute cannot fail today.
    Postprocess(String),
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::NoModelLoaded => write!(f, "no model loaded, call load_model first"),
            InferenceError::Preprocess(msg) => write!(f, "preprocessing failed: {msg}"),
            InferenceError::Backend(err) => write!(f, "inference failed: {err}"),
            InferenceError::Postprocess(msg) => write!(f, "postprocessing failed: {msg}"),
        }
    }
}

impl std::error::Error for InferenceError {}

impl From<BackendError> for InferenceError {
    fn from(err: BackendError) -> Self {
        InferenceError::Backend(err)
    }
}

impl From<sight_image::ImageError> for InferenceError {
    fn from(err: sight_image::ImageError) -> Self {
        InferenceError::Preprocess(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LabelError {
    Io(String),
    Empty,
}

impl fmt::Display for LabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelError::Io(msg) => write!(f, "cannot read labels: {msg}"),
            LabelError::Empty => write!(f, "label file is empty"),
        }
    }
}

impl std::error::Error for LabelError {}

impl From<std::io::Error> for LabelError {
    fn from(err: std::io::Error) -> Self {
        LabelError::Io(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "cannot read config: {msg}"),
            ConfigError::Parse(msg) => write!(f, "cannot parse config: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Malformed text handed to [`crate::classify::parse_predictions`].
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionParseError {
    FieldCount { record: usize, found: usize },
    Index { record: usize, value: String },
    Confidence { record: usize, value: String },
    DanglingEscape,
}

impl fmt::Display for PredictionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionParseError::FieldCount { record, found } => {
                write!(f, "record {record}: expected 3 fields, found {found}")
            }
            PredictionParseError::Index { record, value } => {
                write!(f, "record {record}: bad class index {value:?}")
            }
            PredictionParseError::Confidence { record, value } => {
                write!(f, "record {record}: bad confidence {value:?}")
            }
            PredictionParseError::DanglingEscape => write!(f, "input ends inside an escape"),
        }
    }
}

impl std::error::Error for PredictionParseError {}
