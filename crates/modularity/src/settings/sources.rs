use crate::settings::{SettingSource, Settings, SettingsError};
use std::path::{Path, PathBuf};

/// A source of flat settings
pub trait SettingsSource: Send + Sync {
    /// Human-readable name for diagnostics
    fn name(&self) -> String;

    /// Load all settings this source provides
    fn load(&self) -> Result<Settings, SettingsError>;
}

/// Settings supplied programmatically
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    settings: Settings,
}

impl MapSource {
    pub fn new<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            settings: pairs.into_iter().collect(),
        }
    }
}

impl SettingsSource for MapSource {
    fn name(&self) -> String {
        "programmatic".to_string()
    }

    fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.settings.clone())
    }
}

/// Settings read from a YAML or JSON file
///
/// Nested mappings are flattened into dotted keys, so
///
/// ```yaml
/// Widget:
///   Timeout: 30
/// ```
///
/// yields `Widget.Timeout = "30"`. Null values are skipped and sequence
/// items are keyed by their index.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: true,
        }
    }

    /// A missing optional file yields no settings instead of an error
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, content: &str) -> Result<Vec<(String, String)>, SettingsError> {
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let mut pairs = Vec::new();
        match extension.as_deref() {
            Some("yaml") | Some("yml") => {
                let root: serde_yaml::Value = serde_yaml::from_str(content)
                    .map_err(|e| SettingsError::parse(&self.path, e))?;
                match root {
                    serde_yaml::Value::Null => {}
                    serde_yaml::Value::Mapping(_) => flatten_yaml("", &root, &mut pairs),
                    _ => return Err(SettingsError::parse(&self.path, "expected a mapping at the top level")),
                }
            }
            Some("json") => {
                let root: serde_json::Value = serde_json::from_str(content)
                    .map_err(|e| SettingsError::parse(&self.path, e))?;
                match root {
                    serde_json::Value::Object(_) => flatten_json("", &root, &mut pairs),
                    _ => return Err(SettingsError::parse(&self.path, "expected an object at the top level")),
                }
            }
            _ => {
                return Err(SettingsError::UnsupportedFormat {
                    path: self.path.clone(),
                })
            }
        }
        Ok(pairs)
    }
}

impl SettingsSource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Settings, SettingsError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if !self.required && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Optional settings file not found: {}", self.path.display());
                return Ok(Settings::new());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let origin = self.name();
        let mut settings = Settings::new();
        for (key, value) in self.parse(&content)? {
            settings.insert(key, value, SettingSource::File(origin.clone()));
        }
        Ok(settings)
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_yaml::Value::Null => {}
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                match yaml_scalar(key) {
                    Some(key) => flatten_yaml(&join_key(prefix, &key), value, out),
                    None => tracing::warn!("Ignoring non-scalar settings key under '{}'", prefix),
                }
            }
        }
        serde_yaml::Value::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_yaml(&join_key(prefix, &index.to_string()), item, out);
            }
        }
        serde_yaml::Value::Tagged(tagged) => flatten_yaml(prefix, &tagged.value, out),
        scalar => {
            if let Some(value) = yaml_scalar(scalar) {
                out.push((prefix.to_string(), value));
            }
        }
    }
}

fn flatten_json(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Null => {}
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                flatten_json(&join_key(prefix, key), value, out);
            }
        }
        serde_json::Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_json(&join_key(prefix, &index.to_string()), item, out);
            }
        }
        serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}

/// Settings read from environment variables
///
/// `APP_WidgetModule__Timeout=30` with prefix `APP_` yields
/// `WidgetModule.Timeout = "30"`. Key case is preserved.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load from an explicit set of variables instead of the process environment
    pub fn load_from<I, K, V>(&self, vars: I) -> Settings
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut settings = Settings::new();
        for (name, value) in vars {
            let name = name.as_ref();
            let Some(stripped) = name.strip_prefix(&self.prefix) else {
                continue;
            };
            if stripped.is_empty() {
                continue;
            }
            settings.insert(
                stripped.replace("__", "."),
                value,
                SettingSource::EnvVar(name.to_string()),
            );
        }
        settings
    }
}

impl SettingsSource for EnvSource {
    fn name(&self) -> String {
        format!("env:{}*", self.prefix)
    }

    fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.load_from(std::env::vars()))
    }
}

/// Layers settings sources; later sources override earlier ones
#[derive(Default)]
pub struct SettingsBuilder {
    sources: Vec<Box<dyn SettingsSource>>,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source on top of the ones already added
    pub fn add_source<S: SettingsSource + 'static>(mut self, source: S) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Load and merge every source in order
    pub fn build(self) -> Result<Settings, SettingsError> {
        let mut settings = Settings::new();
        for source in &self.sources {
            let loaded = source.load()?;
            tracing::debug!("Loaded {} settings from {}", loaded.len(), source.name());
            settings.merge(loaded);
        }
        Ok(settings)
    }
}

impl std::fmt::Debug for SettingsBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("SettingsBuilder")
            .field("sources", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_yaml_file_is_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "settings.yaml",
            "Widget:\n  Timeout: 30\n  Enabled: true\n  Name: gadget\n  Hosts: [a, b]\n  Missing: ~\n",
        );

        let settings = FileSource::new(&path).load().unwrap();

        assert_eq!(settings.get("Widget.Timeout"), Some("30"));
        assert_eq!(settings.get("Widget.Enabled"), Some("true"));
        assert_eq!(settings.get("Widget.Name"), Some("gadget"));
        assert_eq!(settings.get("Widget.Hosts.1"), Some("b"));
        assert_eq!(settings.get("Widget.Missing"), None);
        assert!(matches!(
            settings.source_of("Widget.Timeout"),
            Some(SettingSource::File(_))
        ));
    }

    #[test]
    fn test_json_file_is_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "settings.json",
            r#"{"Widget": {"Timeout": 30, "Label": "x"}, "Flat.Key": "v"}"#,
        );

        let settings = FileSource::new(&path).load().unwrap();

        assert_eq!(settings.get("Widget.Timeout"), Some("30"));
        assert_eq!(settings.get("Widget.Label"), Some("x"));
        assert_eq!(settings.get("Flat.Key"), Some("v"));
    }

    #[test]
    fn test_file_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = FileSource::new(dir.path().join("absent.yaml")).load();
        assert!(matches!(missing, Err(SettingsError::Io { .. })));

        let optional = FileSource::new(dir.path().join("absent.yaml")).optional().load().unwrap();
        assert!(optional.is_empty());

        let ini = write_file(&dir, "settings.ini", "a=b");
        assert!(matches!(
            FileSource::new(ini).load(),
            Err(SettingsError::UnsupportedFormat { .. })
        ));

        let scalar = write_file(&dir, "scalar.yaml", "just a string");
        assert!(matches!(
            FileSource::new(scalar).load(),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_source_from_vars() {
        let source = EnvSource::new("APP_");
        let settings = source.load_from([
            ("APP_WidgetModule__Timeout", "30"),
            ("OTHER_WidgetModule__Timeout", "99"),
            ("APP_", "ignored"),
        ]);

        assert_eq!(settings.len(), 1);
        assert_eq!(settings.get("WidgetModule.Timeout"), Some("30"));
    }

    #[test]
    #[serial]
    fn test_env_source_reads_process_environment() {
        std::env::set_var("MODULARITY_TEST_Cache__Size", "64");

        let settings = EnvSource::new("MODULARITY_TEST_").load().unwrap();

        std::env::remove_var("MODULARITY_TEST_Cache__Size");
        assert_eq!(settings.get("Cache.Size"), Some("64"));
    }

    #[test]
    fn test_builder_layers_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "base.yaml", "Cache:\n  Size: 16\n  Ttl: 60\n");

        let settings = SettingsBuilder::new()
            .add_source(FileSource::new(path))
            .add_source(MapSource::new([("Cache.Size", "32")]))
            .build()
            .unwrap();

        assert_eq!(settings.get("Cache.Size"), Some("32"));
        assert_eq!(settings.get("Cache.Ttl"), Some("60"));
        assert_eq!(settings.source_of("Cache.Size"), Some(&SettingSource::Programmatic));
    }
}
