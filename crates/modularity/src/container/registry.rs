use crate::container::scope::ServiceScope;
use crate::container::Container;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

type ErasedService = Box<dyn Any + Send + Sync>;
type ErasedFactory = Box<dyn Fn(&Container) -> Option<ErasedService> + Send + Sync>;

/// Service entry in the registry
///
/// Both variants store an erased `Arc<T>` so that unsized capabilities such
/// as `dyn Shell` can be registered and resolved by the same key.
pub enum ServiceEntry {
    /// Single instance (singleton)
    Instance(ErasedService),
    /// Factory invoked on every resolution; may produce nothing
    Factory(ErasedFactory),
}

impl std::fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceEntry::Instance(_) => f.debug_tuple("Instance").field(&"<instance>").finish(),
            ServiceEntry::Factory(_) => f.debug_tuple("Factory").field(&"<factory>").finish(),
        }
    }
}

/// Descriptive information about one registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub type_name: &'static str,
    pub scope: ServiceScope,
}

#[derive(Debug)]
struct Registration {
    entry: ServiceEntry,
    info: ServiceInfo,
}

/// Type-keyed store of service registrations
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: HashMap<TypeId, Registration>,
}

impl ServiceRegistry {
    /// Create a new service registry
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Register a shared instance; replaces any earlier registration of `T`
    pub fn register_instance<T>(&mut self, instance: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.insert::<T>(ServiceEntry::Instance(Box::new(instance)), ServiceScope::Singleton);
    }

    /// Register a factory; replaces any earlier registration of `T`
    pub fn register_factory<T, F>(&mut self, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Option<Arc<T>> + Send + Sync + 'static,
    {
        let wrapped: ErasedFactory = Box::new(move |container: &Container| {
            factory(container).map(|instance| Box::new(instance) as ErasedService)
        });
        self.insert::<T>(ServiceEntry::Factory(wrapped), ServiceScope::Transient);
    }

    fn insert<T: ?Sized + 'static>(&mut self, entry: ServiceEntry, scope: ServiceScope) {
        let info = ServiceInfo {
            type_name: std::any::type_name::<T>(),
            scope,
        };
        tracing::debug!("Registering {} service: {}", scope, info.type_name);

        if self
            .services
            .insert(TypeId::of::<T>(), Registration { entry, info })
            .is_some()
        {
            tracing::debug!(
                "Replaced earlier registration of {}",
                std::any::type_name::<T>()
            );
        }
    }

    /// Resolve a service; `None` if absent or if its factory produced nothing
    pub fn resolve<T>(&self, container: &Container) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match &self.services.get(&TypeId::of::<T>())?.entry {
            // Clone the Arc itself, not the service
            ServiceEntry::Instance(instance) => instance.downcast_ref::<Arc<T>>().cloned(),
            ServiceEntry::Factory(factory) => factory(container)?
                .downcast::<Arc<T>>()
                .ok()
                .map(|boxed| *boxed),
        }
    }

    /// Check if a service type is registered
    pub fn contains<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Get the number of registered services
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Get information about every registration
    pub fn registered_services(&self) -> Vec<ServiceInfo> {
        self.services
            .values()
            .map(|registration| registration.info.clone())
            .collect()
    }
}
