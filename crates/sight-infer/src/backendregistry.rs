use crate::backend::{BackendAttempt, BackendDescriptor, BackendKind, ComputeRunner};
use crate::config::CoreConfig;
use crate::error::LoadError;
use crate::signature::ModelSignature;
use std::collections::HashMap;

/// Settings handed to runner factories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    pub threads: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { threads: 1 }
    }
}

pub type RunnerFactory = Box<dyn Fn(&RunnerConfig) -> Box<dyn ComputeRunner> + Send + Sync>;

/// An initialized runner plus what it took to get there.
pub struct Selection {
    pub runner: Box<dyn ComputeRunner>,
    pub signature: ModelSignature,
    /// Candidates that failed before `runner` succeeded.
    pub attempts: Vec<BackendAttempt>,
}

/// Runner factories keyed by backend kind, plus the probe results that
/// decide the fallback order.
pub struct BackendRegistry {
    factories: HashMap<BackendKind, RunnerFactory>,
    descriptors: Vec<BackendDescriptor>,
    disabled: Vec<BackendKind>,
    runner_config: RunnerConfig,
}

impl BackendRegistry {
    /// `descriptors` must be in priority order, as [`crate::probe::probe`]
    /// returns them.
    pub fn new(descriptors: Vec<BackendDescriptor>) -> Self {
        Self {
            factories: HashMap::new(),
            descriptors,
            disabled: Vec::new(),
            runner_config: RunnerConfig::default(),
        }
    }

    pub fn register<F>(&mut self, kind: BackendKind, factory: F)
    where
        F: Fn(&RunnerConfig) -> Box<dyn ComputeRunner> + Send + Sync + 'static,
    {
        self.factories.insert(kind, Box::new(factory));
    }

    pub fn list(&self) -> Vec<BackendKind> {
        BackendKind::ALL
            .into_iter()
            .filter(|kind| self.factories.contains_key(kind))
            .collect()
    }

    pub fn descriptors(&self) -> &[BackendDescriptor] {
        &self.descriptors
    }

    pub fn runner_config(&self) -> RunnerConfig {
        self.runner_config
    }

    /// Pick up disabled backends and thread count from the host config.
    pub fn apply_config(&mut self, config: &CoreConfig, default_threads: usize) {
        self.disabled = config
            .disabled_backends
            .iter()
            .copied()
            .filter(|kind| *kind != BackendKind::Cpu)
            .collect();
        self.runner_config = RunnerConfig {
            threads: config.threads.unwrap_or(default_threads).max(1),
        };
    }

    fn is_usable(&self, kind: BackendKind) -> bool {
        self.factories.contains_key(&kind)
            && !self.disabled.contains(&kind)
            && self.descriptors.iter().any(|d| d.kind == kind && d.available)
    }

    /// Backends to try, in order: `preferred` if usable, then the probe
    /// order without duplicates.
    pub fn candidates(&self, preferred: Option<BackendKind>) -> Vec<BackendKind> {
        let mut order = Vec::new();
        if let Some(kind) = preferred {
            if self.is_usable(kind) {
                order.push(kind);
            } else {
                log::debug!("preferred backend {} is not usable, using probe order", kind);
            }
        }
        for d in &self.descriptors {
            if !order.contains(&d.kind) && self.is_usable(d.kind) {
                order.push(d.kind);
            }
        }
        order
    }

    /// Construct and initialize runners down the fallback chain until one
    /// accepts the model.
    pub fn select(&self, preferred: Option<BackendKind>, model: &[u8]) -> Result<Selection, LoadError> {
        let mut attempts = Vec::new();

        for kind in self.candidates(preferred) {
            let Some(factory) = self.factories.get(&kind) else {
                continue;
            };
            let mut runner = factory(&self.runner_config);
            match runner.initialize(model) {
                Ok(signature) => {
                    log::info!("selected {} backend after {} failed attempt(s)", kind, attempts.len());
                    return Ok(Selection {
                        runner,
                        signature,
                        attempts,
                    });
                }
                Err(e) => {
                    log::warn!("{} backend failed to initialize: {}", kind, e.message);
                    runner.release();
                    attempts.push(BackendAttempt {
                        kind,
                        error: e.message,
                    });
                }
            }
        }

        log::error!("backend chain exhausted ({} attempts)", attempts.len());
        Err(LoadError::BackendExhausted(attempts))
    }
}

/// Registry over the probed device with one ONNX Runtime runner per kind.
pub fn create_registry() -> BackendRegistry {
    use crate::backends::OnnxRunner;

    let mut registry = BackendRegistry::new(crate::probe::probe().to_vec());
    registry.register(BackendKind::Cpu, |_| Box::new(OnnxRunner::cpu()));
    registry.register(BackendKind::CpuSimd, |config| Box::new(OnnxRunner::simd(config.threads)));
    registry.register(BackendKind::Gpu, |_| Box::new(OnnxRunner::gpu()));
    registry.runner_config = RunnerConfig {
        threads: crate::probe::device_info().logical_cores.max(1),
    };
    registry
}
