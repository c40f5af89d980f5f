/*!

`container-agents` provides the [`Provider`](resource_agent::Provider) implementations for
container groups and container services: how each typed document expands into the management
API's wire object, how a wire object flattens back into the document, and which field changes
force the object to be replaced.

!*/

pub mod container_group;
pub mod container_service;
pub mod error;

pub use container_group::ContainerGroupProvider;
pub use container_service::ContainerServiceProvider;
