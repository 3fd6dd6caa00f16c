//! Plugin units: loadable bundles of modules.
//!
//! A unit is found either in the static catalog of units linked into the
//! binary (declared with `inventory::submit!`) or, with the `dylib` feature,
//! as a dynamic library exporting [`export_unit!`](crate::export_unit).

use crate::modules::{Module, ModuleError};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Version of the unit entry-point contract
pub const UNIT_ABI_VERSION: u32 = 1;

/// Produces the modules contained in a unit
pub type ModuleFactory = fn() -> Vec<Box<dyn Module>>;

/// Static declaration of a unit
///
/// ```ignore
/// elif_modularity::inventory::submit! {
///     UnitDescriptor::new("Billing", || vec![Box::new(BillingModule::default())])
/// }
/// ```
#[derive(Clone, Copy)]
pub struct UnitDescriptor {
    pub name: &'static str,
    pub modules: ModuleFactory,
}

impl UnitDescriptor {
    pub const fn new(name: &'static str, modules: ModuleFactory) -> Self {
        Self { name, modules }
    }
}

impl std::fmt::Debug for UnitDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitDescriptor")
            .field("name", &self.name)
            .finish()
    }
}

inventory::collect!(UnitDescriptor);

/// How a unit was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Linked into the binary
    Static,
    /// Opened from a dynamic library
    Dynamic,
}

/// A loaded unit and the modules it contains
pub struct Unit {
    id: String,
    kind: UnitKind,
    modules: Vec<Box<dyn Module>>,
}

impl Unit {
    pub fn new(id: impl Into<String>, kind: UnitKind, modules: Vec<Box<dyn Module>>) -> Self {
        Self {
            id: id.into(),
            kind,
            modules,
        }
    }

    /// The unit name or file path it was loaded by
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn into_modules(self) -> Vec<Box<dyn Module>> {
        self.modules
    }
}

impl std::fmt::Debug for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.modules.iter().map(|m| m.name()).collect();
        f.debug_struct("Unit")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("modules", &names)
            .finish()
    }
}

/// The host mechanism that turns unit names and files into [`Unit`]s
pub trait UnitLoader: Send + Sync {
    /// Load a unit by logical name
    fn load_by_name(&self, name: &str) -> Result<Unit, ModuleError>;

    /// Load a unit from an explicit file
    fn load_from_path(&self, path: &Path) -> Result<Unit, ModuleError>;

    /// Whether a file looks like a unit this loader can open
    fn accepts(&self, path: &Path) -> bool;
}

/// Catalog of units linked into the binary
///
/// By path, a drop-in file `<Name>.unit` activates the linked unit `<Name>`;
/// the file's content is not read.
#[derive(Debug, Clone)]
pub struct StaticUnitCatalog {
    units: HashMap<String, ModuleFactory>,
    extension: String,
}

impl StaticUnitCatalog {
    /// Default extension of unit marker files
    pub const DEFAULT_EXTENSION: &'static str = "unit";

    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            extension: Self::DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Create a catalog of every unit submitted through `inventory`
    pub fn discover() -> Self {
        let mut catalog = Self::new();
        for descriptor in inventory::iter::<UnitDescriptor> {
            tracing::debug!("Discovered linked unit: {}", descriptor.name);
            catalog.units.insert(descriptor.name.to_string(), descriptor.modules);
        }
        catalog
    }

    /// Add or replace a unit
    pub fn with_unit(mut self, name: impl Into<String>, modules: ModuleFactory) -> Self {
        self.units.insert(name.into(), modules);
        self
    }

    /// Change the marker file extension
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    fn instantiate(&self, name: &str, id: String) -> Result<Unit, ModuleError> {
        let factory = self
            .units
            .get(name)
            .ok_or_else(|| ModuleError::unit_not_found(id.clone()))?;
        Ok(Unit::new(id, UnitKind::Static, factory()))
    }
}

impl Default for StaticUnitCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitLoader for StaticUnitCatalog {
    fn load_by_name(&self, name: &str) -> Result<Unit, ModuleError> {
        self.instantiate(name, name.to_string())
    }

    fn load_from_path(&self, path: &Path) -> Result<Unit, ModuleError> {
        let id = path.display().to_string();
        if !path.is_file() {
            return Err(ModuleError::unit_not_found(id));
        }
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| ModuleError::unit_load(id.clone(), "file name is not valid UTF-8"))?;
        self.instantiate(stem, id)
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.extension)
    }
}

/// Default loader: linked units first, then dynamic libraries
#[derive(Debug, Clone)]
pub struct HostUnitLoader {
    catalog: StaticUnitCatalog,
    #[cfg(feature = "dylib")]
    dylib: crate::modules::DylibUnitLoader,
}

impl HostUnitLoader {
    pub fn new(catalog: StaticUnitCatalog) -> Self {
        Self {
            catalog,
            #[cfg(feature = "dylib")]
            dylib: crate::modules::DylibUnitLoader::new(),
        }
    }

    /// Loader over every unit linked into the binary
    pub fn discover() -> Self {
        Self::new(StaticUnitCatalog::discover())
    }

    #[cfg(feature = "dylib")]
    pub fn with_dylib_loader(mut self, dylib: crate::modules::DylibUnitLoader) -> Self {
        self.dylib = dylib;
        self
    }
}

impl UnitLoader for HostUnitLoader {
    fn load_by_name(&self, name: &str) -> Result<Unit, ModuleError> {
        if self.catalog.contains(name) {
            return self.catalog.load_by_name(name);
        }
        #[cfg(feature = "dylib")]
        let result = self.dylib.load_by_name(name);
        #[cfg(not(feature = "dylib"))]
        let result = Err(ModuleError::unit_not_found(name));
        result
    }

    fn load_from_path(&self, path: &Path) -> Result<Unit, ModuleError> {
        if self.catalog.accepts(path) {
            return self.catalog.load_from_path(path);
        }
        #[cfg(feature = "dylib")]
        if self.dylib.accepts(path) {
            return self.dylib.load_from_path(path);
        }
        Err(ModuleError::unit_load(
            path.display().to_string(),
            "unrecognized unit file type",
        ))
    }

    fn accepts(&self, path: &Path) -> bool {
        #[cfg(feature = "dylib")]
        if self.dylib.accepts(path) {
            return true;
        }
        self.catalog.accepts(path)
    }
}

/// Export a unit from a `cdylib` so [`DylibUnitLoader`](crate::modules::DylibUnitLoader) can open it
///
/// ```ignore
/// fn modules() -> Vec<Box<dyn Module>> {
///     vec![Box::new(BillingModule::default())]
/// }
///
/// elif_modularity::export_unit!("Billing", modules);
/// ```
#[macro_export]
macro_rules! export_unit {
    ($name:expr, $factory:path) => {
        #[no_mangle]
        pub extern "C" fn __elif_modularity_abi_version() -> u32 {
            $crate::modules::UNIT_ABI_VERSION
        }

        #[no_mangle]
        pub fn __elif_modularity_unit() -> $crate::modules::UnitDescriptor {
            $crate::modules::UnitDescriptor::new($name, $factory)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerBuilder;

    struct PingModule;

    impl Module for PingModule {
        fn load(&mut self, builder: &mut ContainerBuilder) -> Result<(), ModuleError> {
            builder.register(String::from("pong"));
            Ok(())
        }
    }

    fn ping_modules() -> Vec<Box<dyn Module>> {
        vec![Box::new(PingModule)]
    }

    #[test]
    fn test_catalog_by_name() {
        let catalog = StaticUnitCatalog::new().with_unit("Ping", ping_modules);

        let unit = catalog.load_by_name("Ping").unwrap();
        assert_eq!(unit.id(), "Ping");
        assert_eq!(unit.kind(), UnitKind::Static);
        assert_eq!(unit.module_count(), 1);

        let err = catalog.load_by_name("Pong").unwrap_err();
        assert!(matches!(err, ModuleError::UnitNotFound { .. }));
    }

    #[test]
    fn test_catalog_by_marker_file() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("Ping.unit");
        std::fs::write(&marker, b"").unwrap();
        let catalog = StaticUnitCatalog::new().with_unit("Ping", ping_modules);

        assert!(catalog.accepts(&marker));
        assert!(!catalog.accepts(&dir.path().join("Ping.txt")));

        let unit = catalog.load_from_path(&marker).unwrap();
        assert_eq!(unit.id(), marker.display().to_string());

        let missing = catalog.load_from_path(&dir.path().join("Absent.unit"));
        assert!(matches!(missing, Err(ModuleError::UnitNotFound { .. })));
    }

    #[test]
    fn test_host_loader_prefers_catalog() {
        let loader = HostUnitLoader::new(StaticUnitCatalog::new().with_unit("Ping", ping_modules));

        let unit = loader.load_by_name("Ping").unwrap();
        assert_eq!(unit.kind(), UnitKind::Static);

        let err = loader.load_by_name("definitely_not_a_unit_anywhere").unwrap_err();
        assert!(err.is_load_error());

        let err = loader.load_from_path(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, ModuleError::UnitLoad { .. }));
    }
}
