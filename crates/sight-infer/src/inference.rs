use crate::backend::BackendDescriptor;
use crate::backendregistry::{create_registry, BackendRegistry};
use crate::config::CoreConfig;
use crate::error::{ConfigError, InferenceError, LabelError, LoadError};
use crate::labels::LabelTable;
use crate::manager::SessionManager;
use crate::modelsource::{FsModelReader, ModelReader};
use crate::pipeline::{self, InferenceOutcome};
use crate::register::StateRegister;
use crate::session::SessionSummary;
use std::panic::{catch_unwind, UnwindSafe};
use std::path::Path;
use std::sync::{OnceLock, RwLock};

/// Everything the boundary talks to: config, the session manager, the
/// label table and the state register.
pub struct InferenceCore {
    config: RwLock<CoreConfig>,
    manager: SessionManager,
    labels: RwLock<Option<LabelTable>>,
    register: StateRegister,
    default_threads: usize,
}

/// Process-wide instance used by the host bindings. It lives until the
/// process exits; hosts share one model session per process.
static GLOBAL: OnceLock<InferenceCore> = OnceLock::new();

impl InferenceCore {
    pub fn new(config: CoreConfig, registry: BackendRegistry, reader: Box<dyn ModelReader>) -> Self {
        let default_threads = registry.runner_config().threads;
        let manager = SessionManager::new(registry, reader);
        manager.configure(&config, default_threads);
        Self {
            config: RwLock::new(config),
            manager,
            labels: RwLock::new(None),
            register: StateRegister::new(),
            default_threads,
        }
    }

    /// Probed ONNX Runtime backends reading models from the filesystem.
    pub fn with_defaults() -> Self {
        Self::new(CoreConfig::default(), create_registry(), Box::new(FsModelReader))
    }

    /// The process-wide core. Host bindings call this before anything else,
    /// so setup never unwinds out of it.
    pub fn global() -> &'static InferenceCore {
        GLOBAL.get_or_init(|| Self::build_or_degrade(Self::with_defaults))
    }

    /// Run `build`, or fall back to a core with no backends that reports
    /// every load as exhausted when `build` panics.
    pub(crate) fn build_or_degrade(build: impl FnOnce() -> Self + UnwindSafe) -> Self {
        match catch_unwind(build) {
            Ok(core) => core,
            Err(payload) => {
                let core = Self::new(CoreConfig::default(), BackendRegistry::new(Vec::new()), Box::new(FsModelReader));
                core.register.record_error(format!(
                    "backend setup failed: {}",
                    crate::boundary::panic_message(payload.as_ref())
                ));
                core
            }
        }
    }

    pub fn config(&self) -> CoreConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the configuration. Preprocess and postprocess settings apply
    /// to the next run, backend settings to the next load.
    pub fn configure(&self, config: CoreConfig) -> Result<(), ConfigError> {
        if let Err(e) = config.validate() {
            self.register.record_error(format!("Invalid configuration: {e}"));
            return Err(e);
        }
        if let Some(level) = config.log_level {
            sight_base::set_log_level(level);
        }
        self.manager.configure(&config, self.default_threads);
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        log::info!("configuration updated");
        Ok(())
    }

    pub fn configure_json(&self, json: &str) -> Result<(), ConfigError> {
        match CoreConfig::from_json(json) {
            Ok(config) => self.configure(config),
            Err(e) => {
                self.register.record_error(format!("Invalid configuration: {e}"));
                Err(e)
            }
        }
    }

    pub fn load(&self, identifier: &str) -> Result<SessionSummary, LoadError> {
        let config = self.config();
        let result = self.manager.load(identifier, &config);
        if let Err(e) = &result {
            self.register.record_error(format!("Failed to load model {identifier}: {e}"));
        }
        result
    }

    pub fn unload(&self) -> bool {
        self.manager.unload()
    }

    pub fn is_loaded(&self) -> bool {
        self.manager.is_loaded()
    }

    pub fn loaded_identifier(&self) -> Option<String> {
        self.manager.describe_loaded()
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        self.manager.summary()
    }

    pub fn backends(&self) -> Vec<BackendDescriptor> {
        self.manager.descriptors()
    }

    pub fn load_labels(&self, path: impl AsRef<Path>) -> Result<usize, LabelError> {
        match LabelTable::from_file(path) {
            Ok(table) => Ok(self.set_labels(table)),
            Err(e) => {
                self.register.record_error(format!("Failed to load labels: {e}"));
                Err(e)
            }
        }
    }

    /// Install a label table, returning its size.
    pub fn set_labels(&self, table: LabelTable) -> usize {
        let len = table.len();
        *self.labels.write().unwrap_or_else(|e| e.into_inner()) = Some(table);
        len
    }

    /// Run one encoded image through the active session. Success and
    /// failure both land in the register before the session lock drops.
    pub fn run(&self, image: &[u8]) -> Result<InferenceOutcome, InferenceError> {
        let config = self.config();
        let labels = self.labels.read().unwrap_or_else(|e| e.into_inner());

        self.manager.with_session(|session| {
            let Some(session) = session else {
                let error = InferenceError::NoModelLoaded;
                self.register.record_failure(error.to_string(), Default::default());
                return Err(error);
            };

            match pipeline::run(session, image, &config, labels.as_ref()) {
                Ok(outcome) => {
                    self.register.record_success(&outcome);
                    Ok(outcome)
                }
                Err(failure) => {
                    self.register.record_failure(failure.error.to_string(), failure.timings);
                    Err(failure.error)
                }
            }
        })
    }

    pub fn register(&self) -> &StateRegister {
        &self.register
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modelsource::MemoryModelReader;

    #[test]
    fn test_panicking_setup_degrades_to_empty_core() {
        let core = InferenceCore::build_or_degrade(|| panic!("probe crashed"));
        assert_eq!(core.register().last_error(), "backend setup failed: probe crashed");
        assert!(core.backends().is_empty());
        let manifest = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");
        assert!(matches!(core.load(manifest), Err(LoadError::BackendExhausted(attempts)) if attempts.is_empty()));
        assert!(!core.is_loaded());
    }

    #[test]
    fn test_setup_that_succeeds_is_kept() {
        let core = InferenceCore::build_or_degrade(|| {
            InferenceCore::new(CoreConfig::default(), BackendRegistry::new(Vec::new()), Box::new(MemoryModelReader::new()))
        });
        assert_eq!(core.register().last_error(), "");
    }
}
