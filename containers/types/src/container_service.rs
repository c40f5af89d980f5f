use crate::string_enum;
use configuration_derive::Configuration;
use reconcile_model::ValidationReport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

string_enum!(
    OrchestrationPlatform, "orchestration platform", default = Kubernetes,
    { Dcos => "DCOS", Kubernetes => "Kubernetes", Swarm => "Swarm" }
);

/// Master counts the platform can run with quorum.
pub const MASTER_COUNTS: [u32; 3] = [1, 3, 5];
pub const MAX_AGENT_COUNT: u32 = 100;

/// A managed orchestrator cluster: one master profile, one agent pool and the Linux admin
/// credentials for both.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Configuration)]
pub struct ContainerServiceConfig {
    pub name: String,
    pub location: String,
    pub resource_group_name: String,
    pub orchestration_platform: OrchestrationPlatform,
    pub master_profile: MasterProfile,
    pub linux_profile: LinuxProfile,
    pub agent_pool_profile: AgentPoolProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_principal: Option<ServicePrincipal>,
    #[serde(default)]
    pub diagnostics_profile: DiagnosticsProfile,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MasterProfile {
    #[serde(default = "default_count")]
    pub count: u32,
    pub dns_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LinuxProfile {
    pub admin_username: String,
    pub ssh_key: SshKey,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SshKey {
    pub key_data: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentPoolProfile {
    pub name: String,
    #[serde(default = "default_count")]
    pub count: u32,
    pub dns_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    /// Compared without regard to case; the API does not preserve it.
    pub vm_size: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePrincipal {
    pub client_id: String,
    /// Write-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsProfile {
    #[serde(default)]
    pub enabled: bool,
    /// Assigned by the platform when diagnostics are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_uri: Option<String>,
}

fn default_count() -> u32 {
    1
}

impl Default for MasterProfile {
    fn default() -> Self {
        Self {
            count: default_count(),
            dns_prefix: String::new(),
            fqdn: None,
        }
    }
}

impl Default for AgentPoolProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            count: default_count(),
            dns_prefix: String::new(),
            fqdn: None,
            vm_size: String::new(),
        }
    }
}

impl ContainerServiceConfig {
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.require_non_empty("name", &self.name);
        report.require_non_empty("location", &self.location);
        report.require_non_empty("resource_group_name", &self.resource_group_name);
        report.merge_nested("master_profile", self.master_profile.validate());
        report.merge_nested("linux_profile", self.linux_profile.validate());
        report.merge_nested("agent_pool_profile", self.agent_pool_profile.validate());
        if let Some(principal) = &self.service_principal {
            report.merge_nested("service_principal", principal.validate());
        }
        report
    }
}

impl MasterProfile {
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.check(
            MASTER_COUNTS.contains(&self.count),
            "count",
            format!("{} is not one of 1, 3 or 5", self.count),
        );
        report.require_non_empty("dns_prefix", &self.dns_prefix);
        report
    }
}

impl LinuxProfile {
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.require_non_empty("admin_username", &self.admin_username);
        report.require_non_empty("ssh_key.key_data", &self.ssh_key.key_data);
        report
    }
}

impl AgentPoolProfile {
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.require_non_empty("name", &self.name);
        report.check(
            (1..=MAX_AGENT_COUNT).contains(&self.count),
            "count",
            format!("{} is not between 1 and {}", self.count, MAX_AGENT_COUNT),
        );
        report.require_non_empty("dns_prefix", &self.dns_prefix);
        report.require_non_empty("vm_size", &self.vm_size);
        report
    }
}

impl ServicePrincipal {
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.require_non_empty("client_id", &self.client_id);
        report.require_non_empty(
            "client_secret",
            self.client_secret.as_deref().unwrap_or_default(),
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile_model::Configuration;
    use serde_json::json;

    fn document() -> ContainerServiceConfig {
        ContainerServiceConfig::from_value(json!({
            "name": "acs",
            "location": "westeurope",
            "resource_group_name": "rg",
            "orchestration_platform": "kubernetes",
            "master_profile": { "dns_prefix": "acsmaster" },
            "linux_profile": {
                "admin_username": "acctestuser",
                "ssh_key": { "key_data": "ssh-rsa AAAA" }
            },
            "agent_pool_profile": {
                "name": "default",
                "dns_prefix": "acsagent",
                "vm_size": "Standard_A0"
            },
            "service_principal": { "client_id": "00000000", "client_secret": "hunter2" }
        }))
        .unwrap()
    }

    #[test]
    fn counts_default_to_one() {
        let config = document();
        assert_eq!(config.master_profile.count, 1);
        assert_eq!(config.agent_pool_profile.count, 1);
        assert!(!config.diagnostics_profile.enabled);
        assert_eq!(
            config.orchestration_platform,
            OrchestrationPlatform::Kubernetes
        );
        assert!(config.validate().is_valid(), "{}", config.validate());
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let mut value = document().into_value().unwrap();
        value["orchestration_platform"] = json!("Nomad");
        assert!(ContainerServiceConfig::from_value(value).is_err());
    }

    #[test]
    fn counts_are_range_checked() {
        let mut config = document();
        config.master_profile.count = 2;
        config.agent_pool_profile.count = 101;
        let fields: Vec<_> = config
            .validate()
            .errors
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec!["master_profile.count", "agent_pool_profile.count"]
        );

        config.master_profile.count = 5;
        config.agent_pool_profile.count = 100;
        assert!(config.validate().is_valid());
    }

    #[test]
    fn service_principal_needs_a_secret() {
        let mut config = document();
        config.service_principal = Some(ServicePrincipal {
            client_id: "00000000".into(),
            client_secret: None,
        });
        assert_eq!(
            config.validate().errors[0].field,
            "service_principal.client_secret"
        );
        config.service_principal = None;
        assert!(config.validate().is_valid());
    }

    #[test]
    fn platform_serializes_in_api_casing() {
        let value = document().into_value().unwrap();
        assert_eq!(value["orchestration_platform"], json!("Kubernetes"));
        assert_eq!(OrchestrationPlatform::Dcos.to_string(), "DCOS");
    }
}
