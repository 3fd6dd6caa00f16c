#[allow(clippy::module_inception)]
pub mod container;
pub mod builder;
pub mod registry;
pub mod scope;

pub use builder::ContainerBuilder;
pub use container::Container;
pub use registry::{ServiceEntry, ServiceInfo, ServiceRegistry};
pub use scope::ServiceScope;
