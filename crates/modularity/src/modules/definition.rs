use crate::container::ContainerBuilder;
use crate::errors::ContainerError;
use crate::settings::SettingsError;
use serde::Serialize;
use std::path::PathBuf;

/// Core module error type
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("Unit not found: {unit}")]
    UnitNotFound { unit: String },

    #[error("Failed to load unit '{unit}': {message}")]
    UnitLoad { unit: String, message: String },

    #[error("Unit '{unit}' was built for ABI version {found}, expected {expected}")]
    AbiMismatch { unit: String, expected: u32, found: u32 },

    #[error("Failed to scan plugin directory '{}': {source}", path.display())]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Module '{module}' failed to load: {message}")]
    LoadFailed { module: String, message: String },

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
}

impl ModuleError {
    /// Create a unit not found error
    pub fn unit_not_found(unit: impl Into<String>) -> Self {
        Self::UnitNotFound { unit: unit.into() }
    }

    /// Create a unit load error
    pub fn unit_load(unit: impl Into<String>, message: impl ToString) -> Self {
        Self::UnitLoad {
            unit: unit.into(),
            message: message.to_string(),
        }
    }

    /// Create a module load failure, for use by module implementations
    pub fn load_failed(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoadFailed {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Check if the error means a unit could not be located or opened
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::UnitNotFound { .. } | Self::UnitLoad { .. } | Self::AbiMismatch { .. } | Self::Directory { .. }
        )
    }
}

/// A registration unit that contributes entries to a container builder
///
/// Modules are loaded once: [`load`](Module::load) runs with the builder,
/// then the module itself is dropped and only its registrations remain.
/// Configurable modules bind their settings at the start of `load`:
///
/// ```ignore
/// fn load(&mut self, builder: &mut ContainerBuilder) -> Result<(), ModuleError> {
///     SettingsBinder::new(builder.settings()).bind(self)?;
///     builder.register(WidgetClient::new(self.timeout));
///     Ok(())
/// }
/// ```
pub trait Module: Send + Sync {
    /// Module name for identification
    fn name(&self) -> &str {
        crate::settings::short_type_name(std::any::type_name::<Self>())
    }

    /// Contribute registrations to the builder
    fn load(&mut self, builder: &mut ContainerBuilder) -> Result<(), ModuleError>;

    /// Module description
    fn description(&self) -> Option<&str> {
        None
    }
}

/// Module metadata for introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleMetadata {
    pub name: String,
    pub description: Option<String>,
}

impl ModuleMetadata {
    /// Create metadata from a module
    pub fn from_module<M: Module + ?Sized>(module: &M) -> Self {
        Self {
            name: module.name().to_string(),
            description: module.description().map(|d| d.to_string()),
        }
    }
}
