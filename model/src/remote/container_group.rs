use crate::constants::{CONTAINER_GROUP_API_VERSION, CONTAINER_GROUP_RESOURCE_TYPE};
use crate::remote::RemoteObject;
use crate::{NaturalKey, ProvisioningState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ContainerGroupProperties>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerGroupProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_registry_credentials: Option<Vec<ImageRegistryCredential>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Vec<Volume>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: Option<String>,
    pub properties: Option<ContainerProperties>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerProperties {
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<ContainerPort>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<Vec<EnvironmentVariable>>,
    pub resources: Option<ResourceRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_mounts: Option<Vec<VolumeMount>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentVariable {
    pub name: Option<String>,
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    pub requests: Option<ResourceRequests>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequests {
    #[serde(rename = "memoryInGB")]
    pub memory_in_gb: Option<f64>,
    pub cpu: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: Option<String>,
    pub mount_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

/// A group-level port. The protocol of a container's port is only known here.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddress {
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(rename = "type")]
    pub address_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_name_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_file: Option<AzureFileVolume>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureFileVolume {
    pub share_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    pub storage_account_name: Option<String>,
    /// Accepted on write, never returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_account_key: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRegistryCredential {
    pub server: Option<String>,
    pub username: Option<String>,
    /// Accepted on write, never returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl RemoteObject for ContainerGroup {
    const RESOURCE_TYPE: &'static str = CONTAINER_GROUP_RESOURCE_TYPE;
    const API_VERSION: &'static str = CONTAINER_GROUP_API_VERSION;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id)
    }

    fn provisioning_state(&self) -> Option<ProvisioningState> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.clone())
    }

    fn set_provisioning_state(&mut self, state: ProvisioningState) {
        self.properties
            .get_or_insert_with(Default::default)
            .provisioning_state = Some(state)
    }

    fn populate_computed(&mut self, key: &NaturalKey) {
        let location = self.location.clone().unwrap_or_default();
        if let Some(address) = self
            .properties
            .as_mut()
            .and_then(|p| p.ip_address.as_mut())
        {
            address.ip = Some(simulated_ip(key));
            address.fqdn = address
                .dns_name_label
                .as_ref()
                .map(|label| format!("{}.{}.azurecontainer.io", label, location));
        }
    }

    fn scrub_write_only(&mut self) {
        if let Some(properties) = self.properties.as_mut() {
            for volume in properties.volumes.iter_mut().flatten() {
                if let Some(azure_file) = volume.azure_file.as_mut() {
                    azure_file.storage_account_key = None;
                }
            }
            for credential in properties.image_registry_credentials.iter_mut().flatten() {
                credential.password = None;
            }
        }
    }
}

/// A stable, made-up public address for a simulated group.
fn simulated_ip(key: &NaturalKey) -> String {
    let sum: u32 = key
        .scope
        .bytes()
        .chain(key.name.bytes())
        .map(u32::from)
        .sum();
    format!("20.{}.{}.{}", (sum >> 16) % 256, (sum >> 8) % 256, sum % 256)
}
