use crate::container::ContainerBuilder;
use crate::modules::{HostUnitLoader, ModuleError, Unit, UnitKind, UnitLoader};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Where plugin units come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    /// A unit resolved by logical name
    ByName(String),
    /// A unit opened from an explicit file
    ByPath(PathBuf),
    /// Every unit file in a directory whose file name contains `include`
    /// and does not contain `exclude`; an empty `exclude` excludes nothing
    ByDirectory {
        directory: PathBuf,
        include: String,
        exclude: String,
    },
}

impl PluginSource {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self::ByName(name.into())
    }

    pub fn by_path(path: impl Into<PathBuf>) -> Self {
        Self::ByPath(path.into())
    }

    pub fn by_directory(
        directory: impl Into<PathBuf>,
        include: impl Into<String>,
        exclude: impl Into<String>,
    ) -> Self {
        Self::ByDirectory {
            directory: directory.into(),
            include: include.into(),
            exclude: exclude.into(),
        }
    }
}

/// Record of one unit registered into a builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedUnit {
    pub id: String,
    pub kind: UnitKind,
    pub modules: Vec<String>,
}

/// Units registered by a [`ModuleLoader`], in registration order
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub units: Vec<LoadedUnit>,
    pub total_time: std::time::Duration,
}

impl LoadReport {
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn module_count(&self) -> usize {
        self.units.iter().map(|unit| unit.modules.len()).sum()
    }

    pub fn unit_ids(&self) -> Vec<&str> {
        self.units.iter().map(|unit| unit.id.as_str()).collect()
    }
}

/// Discovers plugin units and registers their modules into a builder
///
/// Loading is fail-fast: the first unit that cannot be found or loaded
/// aborts the call, and units registered before it stay registered.
pub struct ModuleLoader {
    loader: Arc<dyn UnitLoader>,
    report: LoadReport,
}

impl ModuleLoader {
    /// Create a module loader over a specific unit loader
    pub fn new<L: UnitLoader + 'static>(loader: L) -> Self {
        Self::with_loader(Arc::new(loader))
    }

    /// Create a module loader sharing a unit loader
    pub fn with_loader(loader: Arc<dyn UnitLoader>) -> Self {
        Self {
            loader,
            report: LoadReport::default(),
        }
    }

    /// Module loader over linked units and dynamic libraries
    pub fn host() -> Self {
        Self::new(HostUnitLoader::discover())
    }

    /// Register the unit with the given logical name
    pub fn register_module(
        &mut self,
        builder: &mut ContainerBuilder,
        unit_name: &str,
    ) -> Result<(), ModuleError> {
        self.register_module_with_callback(builder, unit_name, |_| {})
    }

    /// Register a unit by name, then report its name to `callback`
    pub fn register_module_with_callback<F>(
        &mut self,
        builder: &mut ContainerBuilder,
        unit_name: &str,
        callback: F,
    ) -> Result<(), ModuleError>
    where
        F: FnOnce(&str),
    {
        let unit = self.loader.load_by_name(unit_name)?;
        self.register_unit(builder, unit)?;
        callback(unit_name);
        Ok(())
    }

    /// Register the unit stored in `file_path`
    pub fn register_module_from_file(
        &mut self,
        builder: &mut ContainerBuilder,
        file_path: impl AsRef<Path>,
    ) -> Result<(), ModuleError> {
        self.register_module_from_file_with_callback(builder, file_path, |_| {})
    }

    /// Register a unit from a file, then report the path to `callback`
    pub fn register_module_from_file_with_callback<F>(
        &mut self,
        builder: &mut ContainerBuilder,
        file_path: impl AsRef<Path>,
        callback: F,
    ) -> Result<(), ModuleError>
    where
        F: FnOnce(&str),
    {
        let file_path = file_path.as_ref();
        let unit = self.loader.load_from_path(file_path)?;
        self.register_unit(builder, unit)?;
        callback(&file_path.display().to_string());
        Ok(())
    }

    /// Register every matching unit file in `directory`
    ///
    /// Files are visited in the order the filesystem returns them. Returns
    /// the number of units registered; no match is not an error.
    pub fn register_modules_from_directory(
        &mut self,
        builder: &mut ContainerBuilder,
        directory: impl AsRef<Path>,
        include: &str,
        exclude: &str,
    ) -> Result<usize, ModuleError> {
        self.register_modules_from_directory_with_callback(builder, directory, include, exclude, |_| {})
    }

    /// Register matching units from a directory, reporting each path to `callback`
    pub fn register_modules_from_directory_with_callback<F>(
        &mut self,
        builder: &mut ContainerBuilder,
        directory: impl AsRef<Path>,
        include: &str,
        exclude: &str,
        mut callback: F,
    ) -> Result<usize, ModuleError>
    where
        F: FnMut(&str),
    {
        let candidates = self.scan_directory(directory.as_ref(), include, exclude)?;
        tracing::info!(
            "Found {} unit files in {}",
            candidates.len(),
            directory.as_ref().display()
        );

        for path in &candidates {
            self.register_module_from_file_with_callback(builder, path, &mut callback)?;
        }
        Ok(candidates.len())
    }

    /// Register every unit described by `source`
    pub fn register(
        &mut self,
        builder: &mut ContainerBuilder,
        source: &PluginSource,
    ) -> Result<usize, ModuleError> {
        self.register_with_callback(builder, source, |_| {})
    }

    /// Register every unit described by `source`, reporting each to `callback`
    pub fn register_with_callback<F>(
        &mut self,
        builder: &mut ContainerBuilder,
        source: &PluginSource,
        mut callback: F,
    ) -> Result<usize, ModuleError>
    where
        F: FnMut(&str),
    {
        match source {
            PluginSource::ByName(name) => {
                self.register_module_with_callback(builder, name, &mut callback)?;
                Ok(1)
            }
            PluginSource::ByPath(path) => {
                self.register_module_from_file_with_callback(builder, path, &mut callback)?;
                Ok(1)
            }
            PluginSource::ByDirectory {
                directory,
                include,
                exclude,
            } => self.register_modules_from_directory_with_callback(
                builder, directory, include, exclude, callback,
            ),
        }
    }

    /// Units registered so far
    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Start a fresh report, returning the one collected so far
    pub fn take_report(&mut self) -> LoadReport {
        std::mem::take(&mut self.report)
    }

    fn scan_directory(
        &self,
        directory: &Path,
        include: &str,
        exclude: &str,
    ) -> Result<Vec<PathBuf>, ModuleError> {
        let to_error = |source| ModuleError::Directory {
            path: directory.to_path_buf(),
            source,
        };

        let mut candidates = Vec::new();
        for entry in std::fs::read_dir(directory).map_err(to_error)? {
            let path = entry.map_err(to_error)?.path();
            if !path.is_file() || !self.loader.accepts(&path) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if matches_filter(file_name, include, exclude) {
                candidates.push(path);
            } else {
                tracing::debug!("Skipping unit file {}", file_name);
            }
        }
        Ok(candidates)
    }

    fn register_unit(
        &mut self,
        builder: &mut ContainerBuilder,
        unit: Unit,
    ) -> Result<(), ModuleError> {
        let start_time = Instant::now();
        let id = unit.id().to_string();
        let kind = unit.kind();

        let mut modules = Vec::with_capacity(unit.module_count());
        for module in unit.into_modules() {
            modules.push(module.name().to_string());
            builder.register_boxed_module(module)?;
        }

        tracing::info!("Registered unit {} ({} modules)", id, modules.len());
        self.report.units.push(LoadedUnit { id, kind, modules });
        self.report.total_time += start_time.elapsed();
        Ok(())
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::host()
    }
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("report", &self.report)
            .finish()
    }
}

/// Include/exclude rule applied to unit file names
///
/// An empty `exclude` excludes nothing. A plain substring test would match
/// the empty pattern against every file and so exclude the whole directory.
pub fn matches_filter(file_name: &str, include: &str, exclude: &str) -> bool {
    file_name.contains(include) && (exclude.is_empty() || !file_name.contains(exclude))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{Module, StaticUnitCatalog};

    struct NamedModule(&'static str);

    impl Module for NamedModule {
        fn name(&self) -> &str {
            self.0
        }

        fn load(&mut self, builder: &mut ContainerBuilder) -> Result<(), ModuleError> {
            builder.register(self.0.to_string());
            Ok(())
        }
    }

    fn alpha() -> Vec<Box<dyn Module>> {
        vec![Box::new(NamedModule("alpha"))]
    }

    fn beta() -> Vec<Box<dyn Module>> {
        vec![Box::new(NamedModule("beta-1")), Box::new(NamedModule("beta-2"))]
    }

    fn catalog() -> StaticUnitCatalog {
        StaticUnitCatalog::new()
            .with_unit("Alpha", alpha)
            .with_unit("Beta", beta)
    }

    #[test]
    fn test_matches_filter() {
        assert!(matches_filter("FooA.unit", "Foo", "Bar"));
        assert!(!matches_filter("FooBar.unit", "Foo", "Bar"));
        assert!(!matches_filter("Baz.unit", "Foo", "Bar"));
        assert!(matches_filter("Baz.unit", "", ""));
    }

    #[test]
    fn test_empty_exclude_keeps_every_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Alpha.unit"), b"").unwrap();
        std::fs::write(dir.path().join("Beta.unit"), b"").unwrap();

        let mut loader = ModuleLoader::new(catalog());
        let mut builder = ContainerBuilder::new();
        let count = loader
            .register_modules_from_directory(&mut builder, dir.path(), "", "")
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(loader.report().module_count(), 3);
    }

    #[test]
    fn test_take_report_starts_fresh() {
        let mut loader = ModuleLoader::new(catalog());
        let mut builder = ContainerBuilder::new();
        loader.register_module(&mut builder, "Alpha").unwrap();

        let taken = loader.take_report();

        assert_eq!(taken.unit_ids(), vec!["Alpha"]);
        assert_eq!(loader.report().unit_count(), 0);
    }

    #[test]
    fn test_register_by_name_with_callback() {
        let mut loader = ModuleLoader::new(catalog());
        let mut builder = ContainerBuilder::new();
        let mut seen = Vec::new();

        loader
            .register_module_with_callback(&mut builder, "Beta", |id| seen.push(id.to_string()))
            .unwrap();

        assert_eq!(seen, vec!["Beta".to_string()]);
        assert_eq!(loader.report().module_count(), 2);
        assert_eq!(builder.build().modules().len(), 2);
    }

    #[test]
    fn test_missing_unit_skips_callback() {
        let mut loader = ModuleLoader::new(catalog());
        let mut builder = ContainerBuilder::new();
        let mut called = false;

        let err = loader
            .register_module_with_callback(&mut builder, "Gamma", |_| called = true)
            .unwrap_err();

        assert!(err.is_load_error());
        assert!(!called);
        assert_eq!(loader.report().unit_count(), 0);
    }

    #[test]
    fn test_register_plugin_sources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Alpha.unit"), b"").unwrap();

        let mut loader = ModuleLoader::new(catalog());
        let mut builder = ContainerBuilder::new();

        let count = loader
            .register(&mut builder, &PluginSource::by_name("Beta"))
            .unwrap();
        assert_eq!(count, 1);

        let count = loader
            .register(&mut builder, &PluginSource::by_path(dir.path().join("Alpha.unit")))
            .unwrap();
        assert_eq!(count, 1);

        let count = loader
            .register(&mut builder, &PluginSource::by_directory(dir.path(), "Nothing", ""))
            .unwrap();
        assert_eq!(count, 0);

        assert_eq!(loader.report().unit_count(), 2);
        assert_eq!(loader.report().units[1].kind, UnitKind::Static);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = ModuleLoader::new(catalog());
        let mut builder = ContainerBuilder::new();

        let err = loader
            .register_modules_from_directory(&mut builder, dir.path().join("absent"), "", "")
            .unwrap_err();

        assert!(matches!(err, ModuleError::Directory { .. }));
    }
}
