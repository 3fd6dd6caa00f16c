//! Settings binding through explicit per-type property tables.
//!
//! A key `"<Prefix>.<Property>"` applies to a target whose type name is
//! `<Prefix>Module`, or whose full type name is `<Prefix>`. The property is
//! looked up in the target's [`PropertyTable`] and its raw value converted
//! with `FromStr`.

use crate::settings::{Settings, SettingsError};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

/// Suffix appended to a key prefix to form the target type name
pub const MODULE_SUFFIX: &str = "Module";

type Setter<T> = Box<dyn Fn(&mut T, &str) -> Result<(), String> + Send + Sync>;

/// Map of property name to typed setter, built once per configurable type
pub struct PropertyTable<T> {
    setters: HashMap<&'static str, Setter<T>>,
}

impl<T: 'static> PropertyTable<T> {
    pub fn new() -> Self {
        Self {
            setters: HashMap::new(),
        }
    }

    /// Declare a writable property parsed from its string form
    pub fn property<V, F>(mut self, name: &'static str, setter: F) -> Self
    where
        V: FromStr + 'static,
        V::Err: Display,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let setter: Setter<T> = Box::new(move |target: &mut T, raw: &str| {
            // Surrounding whitespace is only dropped when the raw value does not parse
            let value = raw
                .parse::<V>()
                .or_else(|e| match raw.trim() {
                    trimmed if trimmed != raw => trimmed.parse::<V>().map_err(|_| e),
                    _ => Err(e),
                })
                .map_err(|e| format!("{} ({})", std::any::type_name::<V>(), e))?;
            setter(target, value);
            Ok(())
        });
        self.setters.insert(name, setter);
        self
    }

    /// Check if a property is declared
    pub fn contains(&self, name: &str) -> bool {
        self.setters.contains_key(name)
    }

    /// Declared property names
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.setters.keys().copied()
    }

    fn apply(&self, target: &mut T, name: &str, raw: &str) -> Option<Result<(), String>> {
        self.setters.get(name).map(|setter| setter(target, raw))
    }
}

impl<T: 'static> Default for PropertyTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for PropertyTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.setters.keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("PropertyTable")
            .field("properties", &names)
            .finish()
    }
}

/// An entity whose properties may be bound from settings
///
/// ```ignore
/// impl Configurable for WidgetModule {
///     fn properties() -> &'static PropertyTable<Self> {
///         static TABLE: Lazy<PropertyTable<WidgetModule>> = Lazy::new(|| {
///             PropertyTable::new().property("Timeout", |m: &mut WidgetModule, v: u64| m.timeout = v)
///         });
///         &TABLE
///     }
/// }
/// ```
pub trait Configurable: Sized + 'static {
    /// Name matched against `<Prefix>Module`; defaults to the unqualified type name
    fn type_name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// The property table for this type
    fn properties() -> &'static PropertyTable<Self>;
}

/// Strip module path and generic arguments from a type name
pub fn short_type_name(full: &str) -> &str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

/// Whether a key prefix addresses the given type name
pub fn addresses(prefix: &str, type_name: &str) -> bool {
    prefix == type_name || type_name.strip_suffix(MODULE_SUFFIX) == Some(prefix)
}

/// Outcome of a bind call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    /// Keys whose values were assigned
    pub applied: Vec<String>,
    /// Keys addressed to the target but naming no known property
    pub skipped: Vec<String>,
}

impl BindReport {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.skipped.is_empty()
    }
}

/// Applies settings onto [`Configurable`] targets
#[derive(Debug, Clone, Copy)]
pub struct SettingsBinder<'a> {
    settings: &'a Settings,
}

impl<'a> SettingsBinder<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Bind every matching key onto `target`
    ///
    /// Keys naming an undeclared property are skipped with a diagnostic.
    ///
    /// # Errors
    /// Returns [`SettingsError::Conversion`] on the first value that cannot be
    /// parsed into its property's type; properties bound before it keep their
    /// new values.
    pub fn bind<C: Configurable>(&self, target: &mut C) -> Result<BindReport, SettingsError> {
        let type_name = target.type_name().to_string();
        let table = C::properties();
        let mut report = BindReport::default();

        for (key, raw) in self.settings.iter() {
            let mut parts = key.split('.');
            if !parts.next().is_some_and(|prefix| addresses(prefix, &type_name)) {
                continue;
            }

            let Some(property) = parts.next() else {
                tracing::debug!("Setting '{}' names no property of {}", key, type_name);
                report.skipped.push(key.to_string());
                continue;
            };

            match table.apply(target, property, raw) {
                Some(Ok(())) => {
                    tracing::debug!("Bound {}.{} from '{}'", type_name, property, key);
                    report.applied.push(key.to_string());
                }
                Some(Err(expected)) => {
                    return Err(SettingsError::conversion(key, raw, expected));
                }
                None => {
                    tracing::warn!("Could not find property {} in {}", property, type_name);
                    report.skipped.push(key.to_string());
                }
            }
        }

        Ok(report)
    }
}
