/*!

Clients for the management API. [`ManagementClient`] is the seam that resource bindings program
against; [`ArmClient`] implements it over HTTP and [`MemoryClient`] implements it in memory.

!*/

mod arm_client;
mod error;
mod http_status_code;
mod management_client;
mod memory_client;

pub use arm_client::{ArmClient, ArmClientConfig};
pub use error::{Error, Result};
pub use http_status_code::{HttpStatusCode, StatusCode};
pub use management_client::ManagementClient;
pub use memory_client::MemoryClient;
