pub mod definition;
#[cfg(feature = "dylib")]
pub mod dylib;
pub mod loader;
pub mod unit;

pub use definition::*;
#[cfg(feature = "dylib")]
pub use dylib::*;
pub use loader::*;
pub use unit::*;
