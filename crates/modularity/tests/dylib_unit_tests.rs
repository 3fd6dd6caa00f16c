//! Integration tests loading a unit built as a dynamic library
//!
//! The `elif-unit-fixture` crate is compiled on first use, once as a
//! current unit and once exporting a stale ABI version.

#![cfg(feature = "dylib")]

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use elif_modularity::modules::{
    retained_library_count, DylibUnitLoader, UnitKind, UNIT_ABI_VERSION,
};
use elif_modularity::{
    BootstrapError, BootstrapOptions, Bootstrapper, ContainerBuilder, DirectoryBootstrap,
    ModuleError, ModuleLoader, RunMode, SharedRegistry, ShellError, UnitLoader,
};
use once_cell::sync::Lazy;
use serial_test::serial;
use tempfile::TempDir;

struct Fixtures {
    _dir: TempDir,
    current: PathBuf,
    stale: PathBuf,
}

static FIXTURES: Lazy<Fixtures> = Lazy::new(|| {
    let dir = TempDir::new().unwrap();
    let current = copy_into(&build_fixture(&[]), &dir.path().join("current"));
    let stale = copy_into(&build_fixture(&["stale-abi"]), &dir.path().join("stale"));
    Fixtures {
        _dir: dir,
        current,
        stale,
    }
});

fn fixture_file_name(name: &str) -> String {
    format!("{}{}{}", DLL_PREFIX, name, DLL_SUFFIX)
}

fn build_fixture(features: &[&str]) -> PathBuf {
    let workspace = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let target_dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("unit-fixture");
    let profile = if cfg!(debug_assertions) { "debug" } else { "release" };

    let mut command = Command::new(env!("CARGO"));
    command
        .current_dir(&workspace)
        .args(["build", "--quiet", "-p", "elif-unit-fixture", "--target-dir"])
        .arg(&target_dir);
    if profile == "release" {
        command.arg("--release");
    }
    if !features.is_empty() {
        command.arg("--features").arg(features.join(","));
    }
    let status = command.status().unwrap();
    assert!(status.success(), "building elif-unit-fixture failed: {}", status);

    target_dir
        .join(profile)
        .join(fixture_file_name("elif_unit_fixture"))
}

fn copy_into(library: &Path, dir: &Path) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let target = dir.join(fixture_file_name("console"));
    fs::copy(library, &target).unwrap();
    target
}

fn current_dir() -> &'static Path {
    FIXTURES.current.parent().unwrap()
}

#[test]
#[serial]
fn test_exported_unit_registers_modules_and_shell() {
    let before = retained_library_count();
    let mut loader = ModuleLoader::new(DylibUnitLoader::new());
    let mut builder = ContainerBuilder::new();

    loader
        .register_module_from_file(&mut builder, &FIXTURES.current)
        .unwrap();

    assert_eq!(retained_library_count(), before + 1);
    let unit = &loader.report().units[0];
    assert_eq!(unit.kind, UnitKind::Dynamic);
    assert_eq!(unit.modules, vec!["ConsoleModule"]);

    let container = builder.build();
    assert_eq!(
        container.resolve::<String>().as_deref().map(String::as_str),
        Some("console")
    );
    assert_eq!(
        container.modules()[0].description.as_deref(),
        Some("Interactive console shell")
    );

    let shell = container.shell().unwrap();
    shell.run().unwrap();
    let err = shell.run_with_args(&["fail".to_string()]).unwrap_err();
    assert!(matches!(err, ShellError::Failed { .. }));
}

#[test]
#[serial]
fn test_load_by_name_from_search_path() {
    let loader = DylibUnitLoader::new().with_search_path(current_dir());

    let unit = loader.load_by_name("console").unwrap();

    assert_eq!(unit.id(), "console");
    assert_eq!(unit.kind(), UnitKind::Dynamic);
    assert_eq!(unit.module_count(), 1);
}

#[test]
#[serial]
fn test_bootstrap_hands_process_to_unit_shell() {
    let registry = Arc::new(SharedRegistry::new());
    let options = BootstrapOptions::new().with_plugin_directory(current_dir());
    let mut bootstrapper = Bootstrapper::with_registry(
        DirectoryBootstrap::with_loader(options, ModuleLoader::new(DylibUnitLoader::new())),
        Arc::clone(&registry),
    );

    let report = bootstrapper.run_with_args(["console"]).unwrap();

    assert_eq!(report.mode, RunMode::Shell);
    assert_eq!(bootstrapper.bootstrap().load_report().unit_count(), 1);
    assert!(!registry.is_published());

    let err = bootstrapper.run_with_args(["fail"]).unwrap_err();
    assert!(matches!(err, BootstrapError::Shell(ShellError::Failed { .. })));
    assert!(!registry.is_published());
}

#[test]
#[serial]
fn test_stale_abi_is_rejected_and_not_retained() {
    let before = retained_library_count();

    let err = DylibUnitLoader::new()
        .load_from_path(&FIXTURES.stale)
        .unwrap_err();

    match err {
        ModuleError::AbiMismatch {
            expected, found, ..
        } => {
            assert_eq!(expected, UNIT_ABI_VERSION);
            assert_eq!(found, UNIT_ABI_VERSION + 1);
        }
        other => panic!("expected an ABI mismatch, got {}", other),
    }
    assert_eq!(retained_library_count(), before);
}
