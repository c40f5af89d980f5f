use crate::constants::{CONTAINER_SERVICE_API_VERSION, CONTAINER_SERVICE_RESOURCE_TYPE};
use crate::remote::RemoteObject;
use crate::{NaturalKey, ProvisioningState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerService {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ContainerServiceProperties>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerServiceProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
    pub orchestrator_profile: Option<OrchestratorProfile>,
    pub master_profile: Option<MasterProfile>,
    #[serde(default)]
    pub agent_pool_profiles: Vec<AgentPoolProfile>,
    pub linux_profile: Option<LinuxProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_principal_profile: Option<ServicePrincipalProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics_profile: Option<DiagnosticsProfile>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorProfile {
    pub orchestrator_type: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterProfile {
    pub count: Option<u32>,
    pub dns_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolProfile {
    pub name: Option<String>,
    pub count: Option<u32>,
    pub vm_size: Option<String>,
    pub dns_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinuxProfile {
    pub admin_username: Option<String>,
    pub ssh: Option<SshConfiguration>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfiguration {
    #[serde(default)]
    pub public_keys: Vec<SshPublicKey>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshPublicKey {
    pub key_data: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipalProfile {
    pub client_id: Option<String>,
    /// Accepted on write; usually not returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsProfile {
    pub vm_diagnostics: Option<VmDiagnostics>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmDiagnostics {
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_uri: Option<String>,
}

impl RemoteObject for ContainerService {
    const RESOURCE_TYPE: &'static str = CONTAINER_SERVICE_RESOURCE_TYPE;
    const API_VERSION: &'static str = CONTAINER_SERVICE_API_VERSION;

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
        let properties = match self.properties.as_mut() {
            Some(some) => some,
            None => return,
        };
        if let Some(master) = properties.master_profile.as_mut() {
            master.fqdn = master
                .dns_prefix
                .as_ref()
                .map(|prefix| format!("{}mgmt.{}.cloudapp.azure.com", prefix, location));
        }
        for pool in properties.agent_pool_profiles.iter_mut() {
            pool.fqdn = pool
                .dns_prefix
                .as_ref()
                .map(|prefix| format!("{}agents.{}.cloudapp.azure.com", prefix, location));
        }
        if let Some(diagnostics) = properties
            .diagnostics_profile
            .as_mut()
            .and_then(|d| d.vm_diagnostics.as_mut())
        {
            diagnostics.storage_uri = match diagnostics.enabled {
                Some(true) => Some(format!(
                    "https://{}diag.blob.core.windows.net/",
                    key.name.replace('-', "")
                )),
                _ => None,
            };
        }
    }

    fn scrub_write_only(&mut self) {
        if let Some(principal) = self
            .properties
            .as_mut()
            .and_then(|p| p.service_principal_profile.as_mut())
        {
            principal.secret = None;
        }
    }
}
