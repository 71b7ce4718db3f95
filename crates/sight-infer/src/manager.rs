//! Owner of the single active model session.
//!
//! One coarse lock covers the session and the registry. `load`, `unload`
//! and every run made through [`SessionManager::with_session`] hold it for
//! their whole duration, so a run can never see a half-swapped session.

use crate::backend::BackendDescriptor;
use crate::backendregistry::BackendRegistry;
use crate::config::CoreConfig;
use crate::error::LoadError;
use crate::modelsource::ModelReader;
use crate::session::{ModelSession, SessionSummary};
use std::sync::{Mutex, MutexGuard};

struct ManagerState {
    session: Option<ModelSession>,
    registry: BackendRegistry,
}

pub struct SessionManager {
    state: Mutex<ManagerState>,
    reader: Box<dyn ModelReader>,
}

impl SessionManager {
    pub fn new(registry: BackendRegistry, reader: Box<dyn ModelReader>) -> Self {
        Self {
            state: Mutex::new(ManagerState {
                session: None,
                registry,
            }),
            reader,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Read, select a backend for, and validate the model at `identifier`,
    /// then swap it in. The previous session stays active if anything fails.
    pub fn load(&self, identifier: &str, config: &CoreConfig) -> Result<SessionSummary, LoadError> {
        let mut state = self.lock();
        log::info!("loading model {}", identifier);

        let bytes = self.reader.read(identifier)?;
        let selection = state.registry.select(config.preferred_backend, &bytes)?;
        drop(bytes);

        let session = ModelSession::new(identifier, selection, config.default_input_size)?;
        let summary = session.summary();

        if let Some(previous) = state.session.replace(session) {
            log::info!("replaced session for {}", previous.identifier());
        }
        log::info!(
            "model {} ready on {} backend (input {:?}, output {:?})",
            summary.identifier,
            summary.backend,
            summary.input_shape,
            summary.output_shape
        );
        Ok(summary)
    }

    /// Drop the active session. Returns false if none was loaded.
    pub fn unload(&self) -> bool {
        let mut state = self.lock();
        match state.session.take() {
            Some(session) => {
                log::info!("unloading model {}", session.identifier());
                true
            }
            None => false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().session.is_some()
    }

    pub fn describe_loaded(&self) -> Option<String> {
        self.lock().session.as_ref().map(|s| s.identifier().to_string())
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        self.lock().session.as_ref().map(ModelSession::summary)
    }

    pub fn descriptors(&self) -> Vec<BackendDescriptor> {
        self.lock().registry.descriptors().to_vec()
    }

    /// Apply host config to the registry; takes effect on the next load.
    pub fn configure(&self, config: &CoreConfig, default_threads: usize) {
        self.lock().registry.apply_config(config, default_threads);
    }

    /// Run `f` against the active session with the session lock held.
    pub fn with_session<R>(&self, f: impl FnOnce(Option<&mut ModelSession>) -> R) -> R {
        let mut state = self.lock();
        f(state.session.as_mut())
    }
}
