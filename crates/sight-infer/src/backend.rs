use crate::error::BackendError;
use crate::signature::ModelSignature;
use serde::{Deserialize, Serialize};
use sight_base::Tensor;
use std::fmt;
use std::str::FromStr;

/// The fixed set of execution paths a model can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Cpu,
    CpuSimd,
    Gpu,
}

impl BackendKind {
    /// Probe priority order.
    pub const ALL: [BackendKind; 3] = [BackendKind::Gpu, BackendKind::CpuSimd, BackendKind::Cpu];

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Cpu => "cpu",
            BackendKind::CpuSimd => "cpu_simd",
            BackendKind::Gpu => "gpu",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(BackendKind::Cpu),
            "cpu_simd" | "simd" => Ok(BackendKind::CpuSimd),
            "gpu" => Ok(BackendKind::Gpu),
            other => Err(format!("unknown backend {other:?}")),
        }
    }
}

/// What the probe learned about one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendDescriptor {
    pub kind: BackendKind,
    pub available: bool,
    pub capabilities: Vec<String>,
}

impl BackendDescriptor {
    pub fn new(kind: BackendKind, available: bool, capabilities: Vec<String>) -> Self {
        Self {
            kind,
            available,
            capabilities,
        }
    }
}

/// One failed backend during selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendAttempt {
    pub kind: BackendKind,
    pub error: String,
}

/// An execution strategy that owns its execution context.
///
/// `initialize` may be called more than once; any previous context is
/// dropped first. `release` frees the context and leaves the runner
/// uninitialized.
pub trait ComputeRunner: Send {
    fn kind(&self) -> BackendKind;
    fn describe(&self) -> BackendDescriptor;
    fn initialize(&mut self, model: &[u8]) -> Result<ModelSignature, BackendError>;
    fn run(&mut self, input: &Tensor<f32>) -> Result<Tensor<f32>, BackendError>;
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parses_aliases() {
        assert_eq!("CPU".parse::<BackendKind>().unwrap(), BackendKind::Cpu);
        assert_eq!("simd".parse::<BackendKind>().unwrap(), BackendKind::CpuSimd);
        assert_eq!(" gpu ".parse::<BackendKind>().unwrap(), BackendKind::Gpu);
        assert!("tpu".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_kind_serde_matches_display() {
        for kind in BackendKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }
}
