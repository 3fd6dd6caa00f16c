//! Modular application bootstrap for elif.rs.
//!
//! Plugin units are discovered by name, by file or by directory scan, and
//! their modules are registered into one [`Container`]. After the build a
//! [`Bootstrapper`] runs the registered [`Shell`] if there is one, or
//! publishes the container to the [`SharedRegistry`] for an enclosing
//! process to consume.

pub mod bootstrap;
pub mod container;
pub mod errors;
pub mod modules;
pub mod registry;
pub mod settings;

pub use bootstrap::{
    Bootstrap, BootstrapError, BootstrapOptions, BootstrapReport, BootstrapState, Bootstrapper,
    BootstrapSummary, BuildResult, DirectoryBootstrap, RunMode, Shell, ShellError,
};
pub use container::{Container, ContainerBuilder, ServiceScope};
pub use errors::ContainerError;
pub use modules::{
    LoadReport, Module, ModuleError, ModuleLoader, ModuleMetadata, PluginSource, UnitDescriptor,
    UnitLoader,
};
pub use registry::SharedRegistry;
pub use settings::{
    Configurable, PropertyTable, Settings, SettingsBinder, SettingsBuilder, SettingsError,
};

// Used by `export_unit!` and `inventory::submit!` in plugin crates
pub use inventory;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
