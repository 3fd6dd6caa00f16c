//! A unit contributing a console shell, built as a dynamic library.

#![cfg_attr(feature = "stale-abi", allow(dead_code))]

use elif_modularity::{ContainerBuilder, Module, ModuleError, Shell, ShellError};

struct ConsoleShell;

impl Shell for ConsoleShell {
    fn run(&self) -> Result<(), ShellError> {
        Ok(())
    }

    fn run_with_args(&self, args: &[String]) -> Result<(), ShellError> {
        match args.first().map(String::as_str) {
            Some("fail") => Err(ShellError::failed("console asked to fail")),
            _ => self.run(),
        }
    }
}

struct ConsoleModule;

impl Module for ConsoleModule {
    fn load(&mut self, builder: &mut ContainerBuilder) -> Result<(), ModuleError> {
        builder
            .register(String::from("console"))
            .register_shell(ConsoleShell);
        Ok(())
    }

    fn description(&self) -> Option<&str> {
        Some("Interactive console shell")
    }
}

fn modules() -> Vec<Box<dyn Module>> {
    vec![Box::new(ConsoleModule)]
}

#[cfg(not(feature = "stale-abi"))]
elif_modularity::export_unit!("Console", modules);

#[cfg(feature = "stale-abi")]
#[no_mangle]
pub extern "C" fn __elif_modularity_abi_version() -> u32 {
    elif_modularity::modules::UNIT_ABI_VERSION + 1
}
