/*!

This library provides the shared data model for reconciling declarative resource documents against
a cloud management API: the `Configuration` trait for typed documents, validation reports,
resource identifiers, provisioning states, the wire types of the remote objects and the clients
that read and write them.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use configuration::Configuration;
pub use error::{Error, Result};
pub use remote::RemoteObject;
pub use resource_id::{NaturalKey, ResourceId};
pub use state::ProvisioningState;
pub use validation::{FieldError, ValidationReport};

pub mod clients;
mod configuration;
pub mod constants;
mod error;
pub mod remote;
mod resource_id;
mod state;
mod validation;

/// Normalize a location the way the management API does, e.g. `West Europe` becomes
/// `westeurope`.
pub fn normalize_location<S>(location: S) -> String
where
    S: AsRef<str>,
{
    location.as_ref().replace(' ', "").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::normalize_location;

    #[test]
    fn location_is_normalized() {
        assert_eq!(normalize_location("West Europe"), "westeurope");
        assert_eq!(normalize_location("eastus2"), "eastus2");
    }
}
