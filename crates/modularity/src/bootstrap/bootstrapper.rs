//! The bootstrap lifecycle.
//!
//! A [`Bootstrapper`] drives a [`Bootstrap`] implementation through a fixed
//! sequence of hooks:
//!
//! 1. [`register_shell`](Bootstrap::register_shell)
//! 2. [`configure_container`](Bootstrap::configure_container)
//! 3. the container is built, consuming the builder
//! 4. [`post_configure_container`](Bootstrap::post_configure_container)
//! 5. mode dispatch: a registered shell that resolves is run and owns the
//!    process; otherwise the container is published to the
//!    [`SharedRegistry`] and [`run_as_shell_hook`](Bootstrap::run_as_shell_hook)
//!    runs.

use crate::bootstrap::{BootstrapState, Shell, ShellError};
use crate::container::{Container, ContainerBuilder};
use crate::errors::ContainerError;
use crate::modules::{ModuleError, ModuleMetadata};
use crate::registry::SharedRegistry;
use crate::settings::{Settings, SettingsError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Errors that abort a bootstrap run
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Module loading failed: {0}")]
    Module(#[from] ModuleError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Shell error: {0}")]
    Shell(#[from] ShellError),

    #[error("Bootstrap hook '{hook}' failed: {message}")]
    HookFailed { hook: &'static str, message: String },
}

impl BootstrapError {
    pub fn hook_failed(hook: &'static str, message: impl Into<String>) -> Self {
        Self::HookFailed {
            hook,
            message: message.into(),
        }
    }
}

pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Extension points of the bootstrap lifecycle; every hook defaults to a no-op
pub trait Bootstrap {
    /// Settings handed to the builder for modules to bind from
    fn settings(&mut self) -> BootstrapResult<Settings> {
        Ok(Settings::default())
    }

    /// Register a [`Shell`] to run as a standalone host
    fn register_shell(&mut self, _builder: &mut ContainerBuilder) -> BootstrapResult<()> {
        Ok(())
    }

    /// Register application modules, typically through a `ModuleLoader`
    fn configure_container(&mut self, _builder: &mut ContainerBuilder) -> BootstrapResult<()> {
        Ok(())
    }

    /// Inspect or initialize resolved services after the build
    fn post_configure_container(&mut self, _container: &Container) -> BootstrapResult<()> {
        Ok(())
    }

    /// Final step in library mode, after the container was published
    ///
    /// A failure here fails the run; the container stays published.
    fn run_as_shell_hook(&mut self, _container: &Arc<Container>) -> BootstrapResult<()> {
        Ok(())
    }
}

/// How a bootstrap run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// A shell owned the process
    Shell,
    /// The container was published for an enclosing process
    Library,
}

/// The mode decision, computed once from the built container
pub enum BuildResult {
    ShellMode {
        shell: Arc<dyn Shell>,
        container: Arc<Container>,
    },
    LibraryMode(Arc<Container>),
}

impl BuildResult {
    /// Decide the mode from the container's registration state
    ///
    /// A shell that is registered but resolves to nothing counts as absent.
    pub fn from_container(container: Arc<Container>) -> Self {
        if !container.has_shell() {
            return BuildResult::LibraryMode(container);
        }
        match container.shell() {
            Some(shell) => BuildResult::ShellMode { shell, container },
            None => {
                tracing::warn!("Shell is registered but resolved to nothing; running as library");
                BuildResult::LibraryMode(container)
            }
        }
    }

    pub fn mode(&self) -> RunMode {
        match self {
            BuildResult::ShellMode { .. } => RunMode::Shell,
            BuildResult::LibraryMode(_) => RunMode::Library,
        }
    }

    pub fn container(&self) -> &Arc<Container> {
        match self {
            BuildResult::ShellMode { container, .. } => container,
            BuildResult::LibraryMode(container) => container,
        }
    }
}

impl std::fmt::Debug for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildResult")
            .field("mode", &self.mode())
            .field("container", self.container())
            .finish()
    }
}

/// Summary of a completed bootstrap run
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub mode: RunMode,
    pub modules: Vec<ModuleMetadata>,
    pub container: Arc<Container>,
}

impl BootstrapReport {
    /// Serializable view of the run, without the container
    pub fn summary(&self) -> BootstrapSummary {
        BootstrapSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            elapsed_ms: self.elapsed.as_millis() as u64,
            mode: self.mode,
            services: self.container.service_count(),
            modules: self.modules.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub mode: RunMode,
    pub services: usize,
    pub modules: Vec<ModuleMetadata>,
}

/// Drives a [`Bootstrap`] through the lifecycle
pub struct Bootstrapper<B: Bootstrap> {
    bootstrap: B,
    registry: Arc<SharedRegistry>,
    state: BootstrapState,
}

impl<B: Bootstrap> Bootstrapper<B> {
    /// Bootstrapper publishing to the process-wide registry
    pub fn new(bootstrap: B) -> Self {
        Self::with_registry(bootstrap, SharedRegistry::global())
    }

    /// Bootstrapper publishing to an explicit registry
    pub fn with_registry(bootstrap: B, registry: Arc<SharedRegistry>) -> Self {
        Self {
            bootstrap,
            registry,
            state: BootstrapState::Created,
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    pub fn registry(&self) -> &Arc<SharedRegistry> {
        &self.registry
    }

    pub fn bootstrap(&self) -> &B {
        &self.bootstrap
    }

    pub fn bootstrap_mut(&mut self) -> &mut B {
        &mut self.bootstrap
    }

    pub fn into_inner(self) -> B {
        self.bootstrap
    }

    /// Run the lifecycle; a shell is invoked through [`Shell::run`]
    pub fn run(&mut self) -> BootstrapResult<BootstrapReport> {
        self.execute(None)
    }

    /// Run the lifecycle, forwarding `args` to [`Shell::run_with_args`]
    pub fn run_with_args<I, S>(&mut self, args: I) -> BootstrapResult<BootstrapReport>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        self.execute(Some(&args))
    }

    fn execute(&mut self, args: Option<&[String]>) -> BootstrapResult<BootstrapReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("bootstrap", %run_id);
        let _guard = span.enter();

        let started_at = Utc::now();
        let start_time = Instant::now();
        self.state = BootstrapState::Created;
        tracing::info!("Starting bootstrap");

        match self.drive(args) {
            Ok((mode, container)) => {
                let elapsed = start_time.elapsed();
                tracing::info!("Bootstrap completed in {:?} as {:?}", elapsed, mode);
                Ok(BootstrapReport {
                    run_id,
                    started_at,
                    elapsed,
                    mode,
                    modules: container.modules().to_vec(),
                    container,
                })
            }
            Err(e) => {
                tracing::error!("Bootstrap failed after {}: {}", self.state, e);
                self.transition(BootstrapState::Failed);
                Err(e)
            }
        }
    }

    fn drive(&mut self, args: Option<&[String]>) -> BootstrapResult<(RunMode, Arc<Container>)> {
        let settings = self.bootstrap.settings()?;
        let mut builder = ContainerBuilder::new().with_settings(settings);

        self.bootstrap.register_shell(&mut builder)?;
        self.transition(BootstrapState::ShellRegistered);

        self.bootstrap.configure_container(&mut builder)?;
        self.transition(BootstrapState::ContainerConfigured);

        let container = Arc::new(builder.build());
        self.transition(BootstrapState::Built);

        self.bootstrap.post_configure_container(&container)?;
        self.transition(BootstrapState::PostConfigured);

        match BuildResult::from_container(container) {
            BuildResult::ShellMode { shell, container } => {
                tracing::info!("Shell registered; handing over the process");
                match args {
                    Some(args) => shell.run_with_args(args)?,
                    None => shell.run()?,
                }
                self.transition(BootstrapState::ShellDispatched);
                Ok((RunMode::Shell, container))
            }
            BuildResult::LibraryMode(container) => {
                self.registry.publish(Arc::clone(&container))?;
                self.transition(BootstrapState::Published);
                self.bootstrap.run_as_shell_hook(&container)?;
                Ok((RunMode::Library, container))
            }
        }
    }

    fn transition(&mut self, next: BootstrapState) {
        tracing::debug!("Bootstrap state: {} -> {}", self.state, next);
        self.state = next;
    }
}

impl<B: Bootstrap + std::fmt::Debug> std::fmt::Debug for Bootstrapper<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrapper")
            .field("bootstrap", &self.bootstrap)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Empty;

    impl Bootstrap for Empty {}

    struct Greeter;

    impl Shell for Greeter {
        fn run(&self) -> Result<(), ShellError> {
            Ok(())
        }
    }

    struct WithShell;

    impl Bootstrap for WithShell {
        fn register_shell(&mut self, builder: &mut ContainerBuilder) -> BootstrapResult<()> {
            builder.register_shell(Greeter);
            Ok(())
        }
    }

    struct BrokenConfig;

    impl Bootstrap for BrokenConfig {
        fn configure_container(&mut self, _builder: &mut ContainerBuilder) -> BootstrapResult<()> {
            Err(BootstrapError::hook_failed("configure_container", "no modules"))
        }
    }

    #[test]
    fn test_default_hooks_publish_empty_container() {
        let registry = Arc::new(SharedRegistry::new());
        let mut bootstrapper = Bootstrapper::with_registry(Empty, Arc::clone(&registry));

        let report = bootstrapper.run().unwrap();

        assert_eq!(report.mode, RunMode::Library);
        assert_eq!(report.container.service_count(), 0);
        assert_eq!(bootstrapper.state(), BootstrapState::Published);
        assert!(Arc::ptr_eq(&registry.container().unwrap(), &report.container));

        let summary = serde_json::to_value(report.summary()).unwrap();
        assert_eq!(summary["mode"], "library");
        assert_eq!(summary["run_id"], report.run_id.to_string());
    }

    #[test]
    fn test_shell_mode_skips_registry() {
        let registry = Arc::new(SharedRegistry::new());
        let mut bootstrapper = Bootstrapper::with_registry(WithShell, Arc::clone(&registry));

        let report = bootstrapper.run().unwrap();

        assert_eq!(report.mode, RunMode::Shell);
        assert_eq!(bootstrapper.state(), BootstrapState::ShellDispatched);
        assert!(bootstrapper.state().is_terminal());
        assert!(!registry.is_published());
    }

    #[test]
    fn test_failed_hook_leaves_registry_unset() {
        let registry = Arc::new(SharedRegistry::new());
        let mut bootstrapper = Bootstrapper::with_registry(BrokenConfig, Arc::clone(&registry));

        let err = bootstrapper.run().unwrap_err();

        assert!(matches!(err, BootstrapError::HookFailed { hook: "configure_container", .. }));
        assert_eq!(bootstrapper.state(), BootstrapState::Failed);
        assert!(!registry.is_published());
    }

    #[test]
    fn test_build_result_modes() {
        let library = BuildResult::from_container(Arc::new(ContainerBuilder::new().build()));
        assert_eq!(library.mode(), RunMode::Library);

        let mut builder = ContainerBuilder::new();
        builder.register_shell(Greeter);
        let shell = BuildResult::from_container(Arc::new(builder.build()));
        assert_eq!(shell.mode(), RunMode::Shell);

        let mut builder = ContainerBuilder::new();
        builder.register_shell_factory(|_| None);
        let unresolved = BuildResult::from_container(Arc::new(builder.build()));
        assert_eq!(unresolved.mode(), RunMode::Library);
    }
}
