/*!

Wire types for the objects held by the management API. These mirror the JSON that the API accepts
and returns: camelCase field names with most of the content nested under `properties`. Nearly
everything is optional because the API may omit any field in a response.

!*/

pub mod container_group;
pub mod container_service;

use crate::{NaturalKey, ProvisioningState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Implemented by each top-level object type that the management API manages.
pub trait RemoteObject:
    Serialize + DeserializeOwned + Clone + Debug + Default + Send + Sync + Sized + 'static
{
    /// The namespaced type used in resource ids and URLs, e.g.
    /// `Microsoft.ContainerInstance/containerGroups`.
    const RESOURCE_TYPE: &'static str;

    /// The `api-version` query parameter for requests about this type.
    const API_VERSION: &'static str;

    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: String);

    fn provisioning_state(&self) -> Option<ProvisioningState>;

    fn set_provisioning_state(&mut self, state: ProvisioningState);

    /// Fill in the fields that the remote side assigns on creation. Only a simulated management
    /// plane calls this; a real one does it on its own.
    fn populate_computed(&mut self, _key: &NaturalKey) {}

    /// Remove the fields that the remote side accepts but never echoes back (secrets).
    fn scrub_write_only(&mut self) {}
}
