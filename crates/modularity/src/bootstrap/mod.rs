//! Bootstrap lifecycle and shell-vs-library dispatch.

pub mod bootstrapper;
pub mod directory;
pub mod lifecycle;
pub mod shell;

pub use bootstrapper::*;
pub use directory::*;
pub use lifecycle::BootstrapState;
pub use shell::{Shell, ShellError};
