use crate::error::{self, Result};
use container_types::container_service::{
    AgentPoolProfile, ContainerServiceConfig, DiagnosticsProfile, LinuxProfile, MasterProfile,
    OrchestrationPlatform, ServicePrincipal, SshKey,
};
use reconcile_model::remote::container_service::{
    AgentPoolProfile as RemoteAgentPool, ContainerService, ContainerServiceProperties,
    DiagnosticsProfile as RemoteDiagnostics, LinuxProfile as RemoteLinuxProfile,
    MasterProfile as RemoteMasterProfile, OrchestratorProfile, ServicePrincipalProfile,
    SshConfiguration, SshPublicKey, VmDiagnostics,
};
use reconcile_model::ProvisioningState::{Creating, Succeeded, Updating};
use reconcile_model::{normalize_location, NaturalKey, ValidationReport};
use resource_agent::provider::{Diff, Operation, Provider, ProviderResult};
use resource_agent::wait::StateChange;
use resource_agent::Timeouts;
use snafu::{OptionExt, ResultExt};
use std::time::Duration;

/// Counts, sizes, credentials and tags of a container service change in place. Its identity,
/// platform and agent pool naming do not.
pub struct ContainerServiceProvider;

impl Provider for ContainerServiceProvider {
    type Config = ContainerServiceConfig;
    type Object = ContainerService;

    fn kind(&self) -> &'static str {
        "container service"
    }

    fn natural_key(&self, config: &Self::Config) -> NaturalKey {
        NaturalKey::new(&config.resource_group_name, &config.name)
    }

    fn validate(&self, config: &Self::Config) -> ValidationReport {
        config.validate()
    }

    fn expand(&self, config: &Self::Config) -> ProviderResult<Self::Object> {
        Ok(expand(config))
    }

    fn flatten(
        &self,
        key: &NaturalKey,
        object: &Self::Object,
        prior: Option<&Self::Config>,
    ) -> ProviderResult<Self::Config> {
        Ok(flatten(key, object, prior)?)
    }

    fn diff(&self, current: &Self::Config, desired: &Self::Config) -> Diff {
        diff(current, desired)
    }

    fn supports_update(&self) -> bool {
        true
    }

    fn state_change(&self, _operation: Operation) -> StateChange {
        StateChange::new(vec![Creating, Updating], vec![Succeeded])
    }

    fn default_timeouts(&self) -> Timeouts {
        Timeouts::uniform(Duration::from_secs(60 * 60))
    }
}

fn expand(config: &ContainerServiceConfig) -> ContainerService {
    let master = &config.master_profile;
    let pool = &config.agent_pool_profile;
    ContainerService {
        id: None,
        name: Some(config.name.clone()),
        location: Some(config.location.clone()),
        tags: (!config.tags.is_empty()).then(|| config.tags.clone()),
        properties: Some(ContainerServiceProperties {
            provisioning_state: None,
            orchestrator_profile: Some(OrchestratorProfile {
                orchestrator_type: Some(config.orchestration_platform.to_string()),
            }),
            master_profile: Some(RemoteMasterProfile {
                count: Some(master.count),
                dns_prefix: Some(master.dns_prefix.clone()),
                fqdn: None,
            }),
            agent_pool_profiles: vec![RemoteAgentPool {
                name: Some(pool.name.clone()),
                count: Some(pool.count),
                vm_size: Some(pool.vm_size.clone()),
                dns_prefix: Some(pool.dns_prefix.clone()),
                fqdn: None,
            }],
            linux_profile: Some(RemoteLinuxProfile {
                admin_username: Some(config.linux_profile.admin_username.clone()),
                ssh: Some(SshConfiguration {
                    public_keys: vec![SshPublicKey {
                        key_data: Some(config.linux_profile.ssh_key.key_data.clone()),
                    }],
                }),
            }),
            service_principal_profile: config.service_principal.as_ref().map(|principal| {
                ServicePrincipalProfile {
                    client_id: Some(principal.client_id.clone()),
                    secret: principal.client_secret.clone(),
                }
            }),
            diagnostics_profile: Some(RemoteDiagnostics {
                vm_diagnostics: Some(VmDiagnostics {
                    enabled: Some(config.diagnostics_profile.enabled),
                    storage_uri: None,
                }),
            }),
        }),
    }
}

fn flatten(
    key: &NaturalKey,
    service: &ContainerService,
    prior: Option<&ContainerServiceConfig>,
) -> Result<ContainerServiceConfig> {
    let properties = service
        .properties
        .as_ref()
        .context(error::MissingFieldSnafu {
            field: "properties",
        })?;

    let orchestration_platform = properties
        .orchestrator_profile
        .as_ref()
        .and_then(|o| o.orchestrator_type.as_deref())
        .context(error::MissingFieldSnafu {
            field: "orchestratorProfile.orchestratorType",
        })?
        .parse::<OrchestrationPlatform>()
        .context(error::UnknownValueSnafu {
            what: "orchestrator type",
        })?;

    let master = properties
        .master_profile
        .as_ref()
        .context(error::MissingFieldSnafu {
            field: "masterProfile",
        })?;
    // Only one agent pool is managed.
    let pool = properties
        .agent_pool_profiles
        .first()
        .context(error::MissingFieldSnafu {
            field: "agentPoolProfiles",
        })?;
    let linux = properties
        .linux_profile
        .as_ref()
        .context(error::MissingFieldSnafu {
            field: "linuxProfile",
        })?;
    let key_data = linux
        .ssh
        .as_ref()
        .and_then(|ssh| ssh.public_keys.first())
        .and_then(|k| k.key_data.clone())
        .context(error::MissingFieldSnafu {
            field: "linuxProfile.ssh.publicKeys",
        })?;

    let service_principal = properties
        .service_principal_profile
        .as_ref()
        .map(|principal| flatten_principal(principal, prior));
    let diagnostics = properties
        .diagnostics_profile
        .as_ref()
        .and_then(|d| d.vm_diagnostics.as_ref());

    Ok(ContainerServiceConfig {
        name: key.name.clone(),
        location: normalize_location(service.location.as_deref().unwrap_or_default()),
        resource_group_name: key.scope.clone(),
        orchestration_platform,
        master_profile: MasterProfile {
            count: master.count.unwrap_or(1),
            dns_prefix: master.dns_prefix.clone().unwrap_or_default(),
            fqdn: master.fqdn.clone(),
        },
        linux_profile: LinuxProfile {
            admin_username: linux.admin_username.clone().unwrap_or_default(),
            ssh_key: SshKey { key_data },
        },
        agent_pool_profile: AgentPoolProfile {
            name: pool.name.clone().unwrap_or_default(),
            count: pool.count.unwrap_or(1),
            dns_prefix: pool.dns_prefix.clone().unwrap_or_default(),
            fqdn: pool.fqdn.clone(),
            vm_size: pool.vm_size.clone().unwrap_or_default(),
        },
        service_principal,
        diagnostics_profile: DiagnosticsProfile {
            enabled: diagnostics.and_then(|d| d.enabled).unwrap_or(false),
            storage_uri: diagnostics.and_then(|d| d.storage_uri.clone()),
        },
        tags: service.tags.clone().unwrap_or_default(),
    })
}

/// The secret is usually not echoed back. It is kept from `prior` while the client id is the same.
fn flatten_principal(
    principal: &ServicePrincipalProfile,
    prior: Option<&ContainerServiceConfig>,
) -> ServicePrincipal {
    let client_id = principal.client_id.clone().unwrap_or_default();
    let client_secret = principal.secret.clone().or_else(|| {
        prior
            .and_then(|p| p.service_principal.as_ref())
            .filter(|old| old.client_id == client_id)
            .and_then(|old| old.client_secret.clone())
    });
    ServicePrincipal {
        client_id,
        client_secret,
    }
}

fn diff(current: &ContainerServiceConfig, desired: &ContainerServiceConfig) -> Diff {
    let mut diff = Diff::default();
    diff.replace_if_changed("name", &current.name, &desired.name);
    diff.replace_if_changed(
        "location",
        &normalize_location(&current.location),
        &normalize_location(&desired.location),
    );
    diff.replace_if_changed(
        "resource_group_name",
        &current.resource_group_name,
        &desired.resource_group_name,
    );
    diff.replace_if_changed(
        "orchestration_platform",
        &current.orchestration_platform,
        &desired.orchestration_platform,
    );
    diff.replace_if_changed(
        "agent_pool_profile.name",
        &current.agent_pool_profile.name,
        &desired.agent_pool_profile.name,
    );
    diff.replace_if_changed(
        "agent_pool_profile.dns_prefix",
        &current.agent_pool_profile.dns_prefix,
        &desired.agent_pool_profile.dns_prefix,
    );

    diff.update_if_changed(
        "master_profile.count",
        &current.master_profile.count,
        &desired.master_profile.count,
    );
    diff.update_if_changed(
        "master_profile.dns_prefix",
        &current.master_profile.dns_prefix,
        &desired.master_profile.dns_prefix,
    );
    diff.update_if_changed(
        "linux_profile.admin_username",
        &current.linux_profile.admin_username,
        &desired.linux_profile.admin_username,
    );
    diff.update_if_changed(
        "linux_profile.ssh_key.key_data",
        &current.linux_profile.ssh_key.key_data,
        &desired.linux_profile.ssh_key.key_data,
    );
    diff.update_if_changed(
        "agent_pool_profile.count",
        &current.agent_pool_profile.count,
        &desired.agent_pool_profile.count,
    );
    diff.update_if_changed(
        "agent_pool_profile.vm_size",
        &current.agent_pool_profile.vm_size.to_lowercase(),
        &desired.agent_pool_profile.vm_size.to_lowercase(),
    );
    match (&current.service_principal, &desired.service_principal) {
        (Some(c), Some(d)) => {
            diff.update_if_changed("service_principal.client_id", &c.client_id, &d.client_id);
            if c.client_secret.is_some() {
                diff.update_if_changed(
                    "service_principal.client_secret",
                    &c.client_secret,
                    &d.client_secret,
                );
            }
        }
        (None, None) => {}
        _ => diff.update.push("service_principal".to_string()),
    }
    diff.update_if_changed(
        "diagnostics_profile.enabled",
        &current.diagnostics_profile.enabled,
        &desired.diagnostics_profile.enabled,
    );
    diff.update_if_changed("tags", &current.tags, &desired.tags);
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;
    use reconcile_model::clients::MemoryClient;
    use reconcile_model::RemoteObject;
    use resource_agent::{Plan, Reconciler};

    fn desired() -> ContainerServiceConfig {
        serde_yaml::from_str(
            r#"
name: a
location: westeurope
resource_group_name: rg
orchestration_platform: kubernetes
master_profile:
  count: 1
  dns_prefix: x
linux_profile:
  admin_username: azureuser
  ssh_key:
    key_data: ssh-rsa AAAAB3NzaC1yc2E
agent_pool_profile:
  name: default
  count: 2
  dns_prefix: xagents
  vm_size: Standard_D2_v2
service_principal:
  client_id: 00000000-0000-0000-0000-000000000001
  client_secret: principal-secret
diagnostics_profile:
  enabled: true
tags:
  environment: testing
"#,
        )
        .unwrap()
    }

    fn key() -> NaturalKey {
        NaturalKey::new("rg", "a")
    }

    fn stored(mut object: ContainerService) -> ContainerService {
        object.populate_computed(&key());
        object.scrub_write_only();
        object
    }

    #[test]
    fn flatten_of_expand_fills_computed_fields_and_drops_the_secret() {
        let config = desired();
        let flattened = flatten(&key(), &stored(expand(&config)), None).unwrap();

        assert_eq!(flattened.orchestration_platform, OrchestrationPlatform::Kubernetes);
        assert_eq!(
            flattened.master_profile.fqdn.as_deref(),
            Some("xmgmt.westeurope.cloudapp.azure.com")
        );
        assert_eq!(
            flattened.diagnostics_profile.storage_uri.as_deref(),
            Some("https://adiag.blob.core.windows.net/")
        );
        assert_eq!(
            flattened.service_principal.as_ref().unwrap().client_secret,
            None
        );

        let mut expected = config;
        expected.master_profile.fqdn = flattened.master_profile.fqdn.clone();
        expected.agent_pool_profile.fqdn = flattened.agent_pool_profile.fqdn.clone();
        expected.diagnostics_profile.storage_uri =
            flattened.diagnostics_profile.storage_uri.clone();
        expected.service_principal.as_mut().unwrap().client_secret = None;
        assert_eq!(flattened, expected);
    }

    #[test]
    fn client_secret_is_kept_while_the_client_id_matches() {
        let config = desired();
        let flattened = flatten(&key(), &stored(expand(&config)), Some(&config)).unwrap();
        assert_eq!(flattened.service_principal, config.service_principal);
        assert!(diff(&flattened, &config).is_empty());

        let mut rotated = config.clone();
        rotated.service_principal.as_mut().unwrap().client_id = "other".into();
        let flattened = flatten(&key(), &stored(expand(&config)), Some(&rotated)).unwrap();
        assert_eq!(
            flattened.service_principal.as_ref().unwrap().client_secret,
            None
        );
    }

    #[test]
    fn missing_agent_pool_is_an_error() {
        let mut service = stored(expand(&desired()));
        service.properties.as_mut().unwrap().agent_pool_profiles.clear();
        let err = flatten(&key(), &service, None).unwrap_err();
        assert!(err.to_string().contains("agentPoolProfiles"), "{}", err);
    }

    #[test]
    fn diff_splits_replacement_from_in_place_fields() {
        let current = desired();
        let mut desired = current.clone();
        desired.agent_pool_profile.count = 5;
        desired.agent_pool_profile.vm_size = "standard_d2_v2".into();
        desired.tags = btreemap! { "environment".to_string() => "production".to_string() };
        let diff = diff(&current, &desired);
        assert!(!diff.requires_replacement());
        assert_eq!(diff.update, vec!["agent_pool_profile.count", "tags"]);

        let mut desired = current.clone();
        desired.orchestration_platform = OrchestrationPlatform::Swarm;
        desired.master_profile.count = 3;
        let diff = super::diff(&current, &desired);
        assert_eq!(diff.replace, vec!["orchestration_platform"]);
        assert_eq!(diff.update, vec!["master_profile.count"]);
    }

    /// A minimal document goes through create, poll and read against the simulated plane.
    #[tokio::test(start_paused = true)]
    async fn create_then_read_reports_the_server_assigned_fqdn() {
        let client = MemoryClient::new().with_states(vec![
            Creating,
            Creating,
            Creating,
            Succeeded,
        ]);
        let r = Reconciler::new(ContainerServiceProvider, client);
        let mut config = desired();
        config.service_principal = None;

        let applied = r.apply(None, &config, None).await.unwrap();
        assert_eq!(applied.plan, Plan::Create);
        assert_eq!(applied.configuration.master_profile.count, 1);
        assert_eq!(applied.configuration.master_profile.dns_prefix, "x");
        assert_eq!(
            applied.configuration.master_profile.fqdn.as_deref(),
            Some("xmgmt.westeurope.cloudapp.azure.com")
        );

        let mut scaled = config.clone();
        scaled.agent_pool_profile.count = 4;
        let updated = r
            .apply(Some(applied.id.as_str()), &scaled, Some(&applied.configuration))
            .await
            .unwrap();
        assert_eq!(
            updated.plan,
            Plan::Update {
                fields: vec!["agent_pool_profile.count".to_string()]
            }
        );
        assert_eq!(updated.id, applied.id);
        assert_eq!(updated.configuration.agent_pool_profile.count, 4);
    }
}
