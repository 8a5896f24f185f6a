//! Backend registry and detection scan.

use crate::backend::BuildBackend;
use std::sync::Arc;
use tracing::{debug, info};

/// Ordered list of candidate backends.
#[derive(Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn BuildBackend>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a backend; detection tries backends in registration order.
    pub fn register(&mut self, backend: Arc<dyn BuildBackend>) {
        self.backends.push(backend);
    }

    /// Names of all registered backends.
    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Pick the backend to use for this session.
    ///
    /// `preferred` is tried first; otherwise the first backend whose probe
    /// succeeds wins. `None` means analysis-only mode.
    pub fn detect(&self, preferred: Option<&str>) -> Option<Arc<dyn BuildBackend>> {
        if let Some(name) = preferred {
            match self.backends.iter().find(|b| b.name() == name) {
                Some(backend) if backend.detect() => {
                    info!(backend = name, "Using configured build backend");
                    return Some(backend.clone());
                }
                Some(_) => info!(backend = name, "Configured build backend not available"),
                None => info!(backend = name, "Configured build backend is not registered"),
            }
        }

        for backend in &self.backends {
            if backend.detect() {
                info!(backend = backend.name(), "Detected build backend");
                return Some(backend.clone());
            }
            debug!(backend = backend.name(), "Backend not detected");
        }

        None
    }
}
