//! Units loaded from dynamic libraries (`.so`, `.dylib`, `.dll`).
//!
//! Libraries are never unloaded: registered entries may point into their
//! code, so every opened library is retained for the process lifetime.

use crate::modules::{Unit, UnitDescriptor, UnitKind, UnitLoader, ModuleError, UNIT_ABI_VERSION};
use libloading::{Library, Symbol};
use once_cell::sync::Lazy;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Symbol exporting the unit ABI version
pub const UNIT_ABI_SYMBOL: &[u8] = b"__elif_modularity_abi_version\0";

/// Symbol exporting the unit descriptor
pub const UNIT_ENTRY_SYMBOL: &[u8] = b"__elif_modularity_unit\0";

static RETAINED_LIBRARIES: Lazy<Mutex<Vec<Library>>> = Lazy::new(|| Mutex::new(Vec::new()));

fn retain(library: Library) {
    match RETAINED_LIBRARIES.lock() {
        Ok(mut libraries) => libraries.push(library),
        Err(poisoned) => poisoned.into_inner().push(library),
    }
}

/// Number of dynamic libraries kept open by this process
pub fn retained_library_count() -> usize {
    match RETAINED_LIBRARIES.lock() {
        Ok(libraries) => libraries.len(),
        Err(poisoned) => poisoned.into_inner().len(),
    }
}

/// Loads units from dynamic libraries built with [`export_unit!`](crate::export_unit)
#[derive(Debug, Clone, Default)]
pub struct DylibUnitLoader {
    search_paths: Vec<PathBuf>,
}

impl DylibUnitLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory searched before the platform library path when loading by name
    pub fn with_search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_paths.push(dir.into());
        self
    }

    fn open(&self, target: &OsStr, id: &str) -> Result<Unit, ModuleError> {
        // SAFETY: loading runs the library's initializers; units are trusted
        // plugins built against this crate.
        let library = unsafe { Library::new(target) }.map_err(|e| ModuleError::unit_load(id, e))?;

        let descriptor = {
            // SAFETY: the symbol type matches the one emitted by `export_unit!`.
            let abi: Symbol<'_, extern "C" fn() -> u32> = unsafe { library.get(UNIT_ABI_SYMBOL) }
                .map_err(|e| ModuleError::unit_load(id, e))?;
            let found = abi();
            if found != UNIT_ABI_VERSION {
                return Err(ModuleError::AbiMismatch {
                    unit: id.to_string(),
                    expected: UNIT_ABI_VERSION,
                    found,
                });
            }

            // SAFETY: ABI version checked above.
            let entry: Symbol<'_, fn() -> UnitDescriptor> = unsafe { library.get(UNIT_ENTRY_SYMBOL) }
                .map_err(|e| ModuleError::unit_load(id, e))?;
            entry()
        };

        let modules = (descriptor.modules)();
        tracing::info!(
            "Opened dynamic unit '{}' from {} with {} modules",
            descriptor.name,
            id,
            modules.len()
        );
        retain(library);

        Ok(Unit::new(id, UnitKind::Dynamic, modules))
    }
}

impl UnitLoader for DylibUnitLoader {
    fn load_by_name(&self, name: &str) -> Result<Unit, ModuleError> {
        let file_name = libloading::library_filename(name);
        for dir in &self.search_paths {
            let candidate = dir.join(&file_name);
            if candidate.is_file() {
                return self.open(candidate.as_os_str(), name);
            }
        }
        self.open(&file_name, name)
    }

    fn load_from_path(&self, path: &Path) -> Result<Unit, ModuleError> {
        let id = path.display().to_string();
        if !path.is_file() {
            return Err(ModuleError::unit_not_found(id));
        }
        self.open(path.as_os_str(), &id)
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext == std::env::consts::DLL_EXTENSION)
    }
}
