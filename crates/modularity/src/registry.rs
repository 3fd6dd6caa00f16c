//! Process-wide slot holding the published container.
//!
//! Library-mode bootstraps publish their container here so code outside the
//! bootstrap call chain can resolve services. Components that can take the
//! registry as a parameter should do so; [`SharedRegistry::global`] is the
//! default instance for everything else.

use crate::container::Container;
use crate::errors::ContainerError;
use once_cell::sync::Lazy;
use std::sync::{Arc, RwLock};

static GLOBAL_REGISTRY: Lazy<Arc<SharedRegistry>> = Lazy::new(|| {
    tracing::debug!("Initializing global shared registry");
    Arc::new(SharedRegistry::new())
});

/// Settable slot for one [`Container`]
#[derive(Debug, Default)]
pub struct SharedRegistry {
    container: RwLock<Option<Arc<Container>>>,
}

impl SharedRegistry {
    /// Create an empty registry, e.g. one per test
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, constructed on first access
    pub fn global() -> Arc<SharedRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Store `container`, replacing any previously published one
    pub fn publish(&self, container: Arc<Container>) -> Result<(), ContainerError> {
        let mut slot = self
            .container
            .write()
            .map_err(|_| ContainerError::lock("shared_registry"))?;

        if slot.replace(container).is_some() {
            tracing::info!("Replaced previously published container");
        } else {
            tracing::info!("Published container to shared registry");
        }
        Ok(())
    }

    /// The published container, if any
    pub fn container(&self) -> Option<Arc<Container>> {
        self.container.read().ok()?.clone()
    }

    /// Check if a container has been published
    pub fn is_published(&self) -> bool {
        self.container().is_some()
    }

    /// Resolve a service from the published container
    pub fn resolve<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.container()?.resolve::<T>()
    }

    /// Resolve a service that must be present in the published container
    pub fn require<T>(&self) -> Result<Arc<T>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.container()
            .ok_or_else(|| ContainerError::service_not_found("<no published container>"))?
            .require::<T>()
    }
}
