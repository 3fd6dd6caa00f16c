use crate::bootstrap::Shell;
use crate::container::container::ShellEntry;
use crate::container::{Container, ServiceRegistry};
use crate::modules::{Module, ModuleError, ModuleMetadata};
use crate::settings::Settings;
use std::sync::Arc;

/// Write-only accumulator of registrations, consumed once by [`build`](Self::build)
///
/// The builder also carries the settings snapshot that modules bind their
/// configurable properties from while they register.
pub struct ContainerBuilder {
    registry: ServiceRegistry,
    settings: Arc<Settings>,
    modules: Vec<ModuleMetadata>,
    shell: Option<ShellEntry>,
}

impl ContainerBuilder {
    /// Create a new container builder with empty settings
    pub fn new() -> Self {
        Self {
            registry: ServiceRegistry::new(),
            settings: Arc::new(Settings::default()),
            modules: Vec::new(),
            shell: None,
        }
    }

    /// Set the settings modules bind from during registration
    pub fn with_settings(mut self, settings: impl Into<Arc<Settings>>) -> Self {
        self.settings = settings.into();
        self
    }

    /// Settings visible to modules while they register
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Register a value as a singleton
    pub fn register<T>(&mut self, service: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        self.registry.register_instance(Arc::new(service));
        self
    }

    /// Register a shared instance, which may be an unsized capability like `dyn Shell`
    pub fn register_instance<T>(&mut self, instance: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.registry.register_instance(instance);
        self
    }

    /// Register a transient factory
    ///
    /// The factory may return `None`, in which case the capability counts as
    /// registered but resolves to nothing.
    pub fn register_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Option<Arc<T>> + Send + Sync + 'static,
    {
        self.registry.register_factory(factory);
        self
    }

    /// Register the shell that takes over the process when present
    ///
    /// Only one shell is held; a later registration replaces an earlier one.
    pub fn register_shell<S>(&mut self, shell: S) -> &mut Self
    where
        S: Shell + 'static,
    {
        self.set_shell(ShellEntry::Instance(Arc::new(shell)))
    }

    /// Register a shell produced on resolution; returning `None` leaves the
    /// shell registered but unresolvable
    pub fn register_shell_factory<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(&Container) -> Option<Arc<dyn Shell>> + Send + Sync + 'static,
    {
        self.set_shell(ShellEntry::Factory(Box::new(factory)))
    }

    /// Check if a shell has been registered
    pub fn has_shell(&self) -> bool {
        self.shell.is_some()
    }

    fn set_shell(&mut self, entry: ShellEntry) -> &mut Self {
        if self.shell.replace(entry).is_some() {
            tracing::debug!("Replaced earlier shell registration");
        } else {
            tracing::debug!("Registering shell");
        }
        self
    }

    /// Let a module contribute its registrations
    pub fn register_module<M>(&mut self, module: M) -> Result<&mut Self, ModuleError>
    where
        M: Module + 'static,
    {
        self.register_boxed_module(Box::new(module))
    }

    /// Let a type-erased module contribute its registrations
    ///
    /// The module is dropped afterwards; only its entries persist.
    pub fn register_boxed_module(
        &mut self,
        mut module: Box<dyn Module>,
    ) -> Result<&mut Self, ModuleError> {
        let metadata = ModuleMetadata::from_module(module.as_ref());
        tracing::info!("Loading module: {}", metadata.name);

        module.load(self)?;
        self.modules.push(metadata);
        Ok(self)
    }

    /// Build the container, consuming the builder
    pub fn build(self) -> Container {
        tracing::debug!(
            "Building container with {} services from {} modules",
            self.registry.service_count(),
            self.modules.len()
        );
        Container::new(self.registry, self.modules, self.shell)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("service_count", &self.registry.service_count())
            .field("settings", &self.settings.len())
            .field("modules", &self.modules)
            .field("has_shell", &self.has_shell())
            .finish()
    }
}
