use thiserror::Error;

/// Errors raised by the container layer
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Service not found: {service_type}")]
    ServiceNotFound { service_type: String },

    #[error("Service '{service_type}' is registered but resolved to nothing")]
    ServiceUnavailable { service_type: String },

    #[error("Lock error on resource: {resource}")]
    LockError { resource: String },
}

impl ContainerError {
    /// Create a new service not found error
    pub fn service_not_found(service_type: impl Into<String>) -> Self {
        Self::ServiceNotFound {
            service_type: service_type.into(),
        }
    }

    /// Create a new service unavailable error
    pub fn service_unavailable(service_type: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            service_type: service_type.into(),
        }
    }

    /// Create a new lock error
    pub fn lock(resource: impl Into<String>) -> Self {
        Self::LockError {
            resource: resource.into(),
        }
    }

    /// Check if the error is a missing service
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ServiceNotFound { .. })
    }
}
