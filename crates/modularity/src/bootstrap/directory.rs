use crate::bootstrap::{Bootstrap, BootstrapResult};
use crate::container::ContainerBuilder;
use crate::modules::{LoadReport, ModuleLoader, PluginSource};
use crate::settings::{EnvSource, FileSource, Settings, SettingsBuilder};
use std::path::PathBuf;

/// What a [`DirectoryBootstrap`] loads and where its settings come from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapOptions {
    pub plugin_directory: Option<PathBuf>,
    pub include: String,
    pub exclude: String,
    pub units: Vec<String>,
    pub settings_files: Vec<PathBuf>,
    pub env_prefix: Option<String>,
}

impl BootstrapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.plugin_directory = Some(directory.into());
        self
    }

    pub fn with_include(mut self, include: impl Into<String>) -> Self {
        self.include = include.into();
        self
    }

    pub fn with_exclude(mut self, exclude: impl Into<String>) -> Self {
        self.exclude = exclude.into();
        self
    }

    /// Load a linked unit by name in addition to the directory scan
    pub fn with_unit(mut self, name: impl Into<String>) -> Self {
        self.units.push(name.into());
        self
    }

    /// Layer a YAML or JSON settings file; later files override earlier ones
    pub fn with_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_files.push(path.into());
        self
    }

    /// Read `PREFIX_Widget__Timeout` style variables on top of the files
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Plugin sources in load order: named units first, then the directory
    pub fn plugin_sources(&self) -> Vec<PluginSource> {
        let mut sources: Vec<PluginSource> =
            self.units.iter().map(|name| PluginSource::by_name(name.as_str())).collect();
        if let Some(directory) = &self.plugin_directory {
            sources.push(PluginSource::by_directory(
                directory.clone(),
                self.include.as_str(),
                self.exclude.as_str(),
            ));
        }
        sources
    }
}

/// A [`Bootstrap`] that registers every plugin unit named by its options
///
/// It registers no shell itself; a plugin may contribute one.
#[derive(Debug)]
pub struct DirectoryBootstrap {
    options: BootstrapOptions,
    loader: ModuleLoader,
}

impl DirectoryBootstrap {
    pub fn new(options: BootstrapOptions) -> Self {
        Self::with_loader(options, ModuleLoader::host())
    }

    pub fn with_loader(options: BootstrapOptions, loader: ModuleLoader) -> Self {
        Self { options, loader }
    }

    pub fn options(&self) -> &BootstrapOptions {
        &self.options
    }

    pub fn load_report(&self) -> &LoadReport {
        self.loader.report()
    }
}

impl Bootstrap for DirectoryBootstrap {
    fn settings(&mut self) -> BootstrapResult<Settings> {
        let mut builder = SettingsBuilder::new();
        for path in &self.options.settings_files {
            builder = builder.add_source(FileSource::new(path.clone()));
        }
        if let Some(prefix) = &self.options.env_prefix {
            builder = builder.add_source(EnvSource::new(prefix.clone()));
        }
        Ok(builder.build()?)
    }

    fn configure_container(&mut self, builder: &mut ContainerBuilder) -> BootstrapResult<()> {
        self.loader.take_report();
        for source in self.options.plugin_sources() {
            let count = self.loader.register_with_callback(builder, &source, |unit| {
                tracing::info!("Loaded plugin unit {}", unit);
            })?;
            tracing::debug!("{:?} contributed {} units", source, count);
        }

        let report = self.loader.report();
        tracing::info!(
            "Registered {} modules from {} units in {:?}",
            report.module_count(),
            report.unit_count(),
            report.total_time
        );
        Ok(())
    }
}
