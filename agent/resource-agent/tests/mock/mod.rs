/*!

This test module provides a small [`Provider`] over the container service wire object so that the
[`Reconciler`] can be exercised against a
[`MemoryClient`](reconcile_model::clients::MemoryClient) without any real management API.

The document has one master pool: `count` can change in place, `dns_prefix` cannot, and `fqdn` is
assigned by the remote side.

!*/

use configuration_derive::Configuration;
use reconcile_model::remote::container_service::{
    ContainerService, ContainerServiceProperties, MasterProfile,
};
use reconcile_model::{NaturalKey, ValidationReport};
use resource_agent::provider::{Diff, Operation, Provider, ProviderError, ProviderResult, Resources};
use resource_agent::wait::StateChange;
use resource_agent::ProvisioningState::{Creating, Succeeded, Updating};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, Configuration)]
pub struct PoolConfig {
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub count: u32,
    pub dns_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
}

/// PoolProvider maps a [`PoolConfig`] to and from a [`ContainerService`].
pub struct PoolProvider;

impl Provider for PoolProvider {
    type Config = PoolConfig;
    type Object = ContainerService;

    fn kind(&self) -> &'static str {
        "pool"
    }

    fn natural_key(&self, config: &Self::Config) -> NaturalKey {
        NaturalKey::new(&config.resource_group, &config.name)
    }

    fn validate(&self, config: &Self::Config) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.require_non_empty("name", &config.name);
        report.require_non_empty("dns_prefix", &config.dns_prefix);
        report.check(config.count > 0, "count", "must be greater than zero");
        report
    }

    fn expand(&self, config: &Self::Config) -> ProviderResult<Self::Object> {
        if config.dns_prefix.contains(' ') {
            return Err(ProviderError::new_with_source(
                Resources::Clear,
                "dns_prefix may not contain spaces",
            ));
        }
        Ok(ContainerService {
            name: Some(config.name.clone()),
            location: Some(config.location.clone()),
            properties: Some(ContainerServiceProperties {
                master_profile: Some(MasterProfile {
                    count: Some(config.count),
                    dns_prefix: Some(config.dns_prefix.clone()),
                    fqdn: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn flatten(
        &self,
        key: &NaturalKey,
        object: &Self::Object,
        _prior: Option<&Self::Config>,
    ) -> ProviderResult<Self::Config> {
        let master = object
            .properties
            .as_ref()
            .and_then(|p| p.master_profile.as_ref())
            .ok_or_else(|| {
                ProviderError::new_with_source(
                    Resources::Remaining,
                    "master profile missing from response",
                )
            })?;
        Ok(PoolConfig {
            name: key.name.clone(),
            resource_group: key.scope.clone(),
            location: object.location.clone().unwrap_or_default(),
            count: master.count.unwrap_or_default(),
            dns_prefix: master.dns_prefix.clone().unwrap_or_default(),
            fqdn: master.fqdn.clone(),
        })
    }

    fn diff(&self, current: &Self::Config, desired: &Self::Config) -> Diff {
        let mut diff = Diff::default();
        diff.replace_if_changed("name", &current.name, &desired.name);
        diff.replace_if_changed("dns_prefix", &current.dns_prefix, &desired.dns_prefix);
        diff.update_if_changed("count", &current.count, &desired.count);
        diff
    }

    fn supports_update(&self) -> bool {
        true
    }

    fn state_change(&self, _operation: Operation) -> StateChange {
        StateChange::new(vec![Creating, Updating], vec![Succeeded])
    }
}

pub fn pool(name: &str, count: u32, dns_prefix: &str) -> PoolConfig {
    PoolConfig {
        name: name.to_string(),
        resource_group: "rg".to_string(),
        location: "westeurope".to_string(),
        count,
        dns_prefix: dns_prefix.to_string(),
        fqdn: None,
    }
}
