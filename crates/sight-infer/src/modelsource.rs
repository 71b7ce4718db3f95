use crate::error::LoadError;
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::ops::Deref;
use std::path::Path;
use std::sync::Mutex;

/// Model bytes, either mapped from disk or owned.
pub enum ModelBytes {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for ModelBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            ModelBytes::Mapped(mmap) => mmap,
            ModelBytes::Owned(bytes) => bytes,
        }
    }
}

/// Resolves a model identifier to its bytes.
pub trait ModelReader: Send + Sync {
    fn read(&self, identifier: &str) -> Result<ModelBytes, LoadError>;
}

/// Identifiers are filesystem paths; files are memory-mapped.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsModelReader;

impl ModelReader for FsModelReader {
    fn read(&self, identifier: &str) -> Result<ModelBytes, LoadError> {
        let path = Path::new(identifier);
        let unreadable = |reason: String| LoadError::Unreadable {
            path: identifier.to_string(),
            reason,
        };

        if identifier.is_empty() || !path.exists() {
            return Err(LoadError::NotFound(identifier.to_string()));
        }
        if path.is_dir() {
            return Err(unreadable("is a directory".to_string()));
        }

        let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
        let len = file.metadata().map_err(|e| unreadable(e.to_string()))?.len();
        if len == 0 {
            return Err(unreadable("file is empty".to_string()));
        }

        // SAFETY: the mapping is read-only and dropped once the runner has
        // copied the model; hosts do not rewrite model files in place while
        // a load is in progress.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| unreadable(format!("failed to memory-map model: {e}")))?;
        log::debug!("mapped {} bytes from {}", mmap.len(), identifier);
        Ok(ModelBytes::Mapped(mmap))
    }
}

/// Models held in memory, e.g. assets the host extracted itself.
#[derive(Default)]
pub struct MemoryModelReader {
    models: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryModelReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(self, identifier: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(identifier, bytes);
        self
    }

    /// Add or replace a model.
    pub fn insert(&self, identifier: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        let mut models = self.models.lock().unwrap_or_else(|e| e.into_inner());
        models.insert(identifier.into(), bytes.into());
    }
}

impl ModelReader for MemoryModelReader {
    fn read(&self, identifier: &str) -> Result<ModelBytes, LoadError> {
        let models = self.models.lock().unwrap_or_else(|e| e.into_inner());
        match models.get(identifier) {
            Some(bytes) if bytes.is_empty() => Err(LoadError::Unreadable {
                path: identifier.to_string(),
                reason: "model is empty".to_string(),
            }),
            Some(bytes) => Ok(ModelBytes::Owned(bytes.clone())),
            None => Err(LoadError::NotFound(identifier.to_string())),
        }
    }
}
