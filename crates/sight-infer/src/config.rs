use crate::backend::BackendKind;
use crate::constants::{
    DEFAULT_INPUT_SIZE, DEFAULT_MEAN, DEFAULT_PAD_VALUE, DEFAULT_PIXEL_SCALE, DEFAULT_STD,
    DEFAULT_TOP_K,
};
use crate::error::ConfigError;
use crate::signature::InputSpec;
use serde::{Deserialize, Serialize};
use sight_base::LogLevel;
use sight_image::{ChannelOrder, PreprocessConfig, ResizeMode};
use std::path::Path;

/// Activation applied to classification outputs before ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputActivation {
    /// Outputs are already probabilities.
    #[default]
    None,
    /// Outputs are logits.
    Softmax,
}

/// Host-tunable settings. Every field has a default, so `{}` is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub preferred_backend: Option<BackendKind>,
    pub disabled_backends: Vec<BackendKind>,
    /// Intra-op threads for the SIMD backend; probed core count when unset.
    pub threads: Option<usize>,
    pub top_k: usize,
    pub default_input_size: u32,
    pub resize: ResizeMode,
    pub pad_value: u8,
    pub scale: f32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub channel_order: ChannelOrder,
    pub output_activation: OutputActivation,
    pub log_level: Option<LogLevel>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            preferred_backend: None,
            disabled_backends: Vec::new(),
            threads: None,
            top_k: DEFAULT_TOP_K,
            default_input_size: DEFAULT_INPUT_SIZE,
            resize: ResizeMode::Stretch,
            pad_value: DEFAULT_PAD_VALUE,
            scale: DEFAULT_PIXEL_SCALE,
            mean: DEFAULT_MEAN,
            std: DEFAULT_STD,
            channel_order: ChannelOrder::Rgb,
            output_activation: OutputActivation::None,
            log_level: None,
        }
    }
}

impl CoreConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be at least 1".to_string()));
        }
        if self.default_input_size == 0 {
            return Err(ConfigError::Invalid("default_input_size must be non-zero".to_string()));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Invalid("threads must be at least 1".to_string()));
        }
        if self.disabled_backends.contains(&BackendKind::Cpu) {
            return Err(ConfigError::Invalid("the cpu backend cannot be disabled".to_string()));
        }
        if let Some(preferred) = self.preferred_backend {
            if self.disabled_backends.contains(&preferred) {
                return Err(ConfigError::Invalid(format!(
                    "preferred backend {preferred} is also disabled"
                )));
            }
        }
        self.preprocess_for(&InputSpec {
            layout: Default::default(),
            height: self.default_input_size,
            width: self.default_input_size,
        })
        .validate()
        .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Preprocess settings for a session's resolved input.
    pub fn preprocess_for(&self, input: &InputSpec) -> PreprocessConfig {
        PreprocessConfig {
            width: input.width,
            height: input.height,
            resize: self.resize,
            pad_value: self.pad_value,
            scale: self.scale,
            mean: self.mean,
            std: self.std,
            channel_order: self.channel_order,
            layout: input.layout,
        }
    }
}
