use crate::bootstrap::Shell;
use crate::container::registry::{ServiceInfo, ServiceRegistry};
use crate::errors::ContainerError;
use crate::modules::ModuleMetadata;
use std::sync::Arc;

pub(crate) type ShellFactory = Box<dyn Fn(&Container) -> Option<Arc<dyn Shell>> + Send + Sync>;

/// The shell registration
///
/// Held outside the `TypeId`-keyed registry: a unit loaded from a dynamic
/// library links its own copy of this crate, and its `dyn Shell` has a
/// different `TypeId` than the host's.
pub(crate) enum ShellEntry {
    Instance(Arc<dyn Shell>),
    Factory(ShellFactory),
}

/// Immutable dependency container produced by [`ContainerBuilder`](crate::container::ContainerBuilder)
pub struct Container {
    registry: ServiceRegistry,
    modules: Vec<ModuleMetadata>,
    shell: Option<ShellEntry>,
}

impl Container {
    pub(crate) fn new(
        registry: ServiceRegistry,
        modules: Vec<ModuleMetadata>,
        shell: Option<ShellEntry>,
    ) -> Self {
        Self {
            registry,
            modules,
            shell,
        }
    }

    /// Check if a shell is registered, including one that resolves to nothing
    pub fn has_shell(&self) -> bool {
        self.shell.is_some()
    }

    /// Resolve the registered shell
    pub fn shell(&self) -> Option<Arc<dyn Shell>> {
        match self.shell.as_ref()? {
            ShellEntry::Instance(shell) => Some(Arc::clone(shell)),
            ShellEntry::Factory(factory) => factory(self),
        }
    }

    /// Resolve a service, returning `None` if it is absent or resolves to nothing
    pub fn resolve<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.registry.resolve::<T>(self)
    }

    /// Resolve a service that must be present
    pub fn require<T>(&self) -> Result<Arc<T>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();
        if !self.contains::<T>() {
            return Err(ContainerError::service_not_found(type_name));
        }
        self.resolve::<T>()
            .ok_or_else(|| ContainerError::service_unavailable(type_name))
    }

    /// Check if a service is registered
    pub fn contains<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.registry.contains::<T>()
    }

    /// Get the number of registered services
    pub fn service_count(&self) -> usize {
        self.registry.service_count()
    }

    /// Get information about every registered service
    pub fn registered_services(&self) -> Vec<ServiceInfo> {
        self.registry.registered_services()
    }

    /// Modules that contributed to this container, in registration order
    pub fn modules(&self) -> &[ModuleMetadata] {
        &self.modules
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.service_count())
            .field("modules", &self.modules.len())
            .field("has_shell", &self.has_shell())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::container::{ContainerBuilder, ServiceScope};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Counter {
        id: usize,
    }

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_singleton_arc_sharing() {
        let mut builder = ContainerBuilder::new();
        builder.register(Counter { id: 7 });
        let container = builder.build();

        let first = container.resolve::<Counter>().unwrap();
        let second = container.resolve::<Counter>().unwrap();

        assert_eq!(first.id, 7);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_transient_factory() {
        static NEXT: AtomicUsize = AtomicUsize::new(0);

        let mut builder = ContainerBuilder::new();
        builder.register_factory::<Counter, _>(|_| {
            Some(Arc::new(Counter {
                id: NEXT.fetch_add(1, Ordering::SeqCst),
            }))
        });
        let container = builder.build();

        let first = container.resolve::<Counter>().unwrap();
        let second = container.resolve::<Counter>().unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(
            container.registered_services()[0].scope,
            ServiceScope::Transient
        );
    }

    #[test]
    fn test_factory_resolves_dependencies() {
        let mut builder = ContainerBuilder::new();
        builder.register(String::from("base"));
        builder.register_factory::<Counter, _>(|container| {
            let base = container.resolve::<String>()?;
            Some(Arc::new(Counter { id: base.len() }))
        });
        let container = builder.build();

        assert_eq!(container.resolve::<Counter>().unwrap().id, 4);
    }

    #[test]
    fn test_trait_object_capability() {
        let mut builder = ContainerBuilder::new();
        builder.register_instance::<dyn Greeter>(Arc::new(English));
        let container = builder.build();

        assert!(container.contains::<dyn Greeter>());
        assert_eq!(container.resolve::<dyn Greeter>().unwrap().greet(), "hello");
    }

    #[test]
    fn test_registered_but_unavailable() {
        let mut builder = ContainerBuilder::new();
        builder.register_factory::<dyn Greeter, _>(|_| None);
        let container = builder.build();

        assert!(container.contains::<dyn Greeter>());
        assert!(container.resolve::<dyn Greeter>().is_none());

        let err = container.require::<dyn Greeter>().err().unwrap();
        assert!(!err.is_not_found());
        assert!(container.require::<Counter>().unwrap_err().is_not_found());
    }
}
