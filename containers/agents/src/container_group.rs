use crate::error::{self, Result};
use container_types::container_group::{
    ContainerConfig, ContainerGroupConfig, ImageRegistryCredential, IpAddressType, OsType,
    Protocol, RestartPolicy, VolumeConfig,
};
use log::debug;
use reconcile_model::remote::container_group::{
    AzureFileVolume, Container, ContainerGroup, ContainerGroupProperties, ContainerPort,
    ContainerProperties, EnvironmentVariable, ImageRegistryCredential as RemoteCredential,
    IpAddress, Port, ResourceRequests, ResourceRequirements, Volume, VolumeMount,
};
use reconcile_model::ProvisioningState::{Creating, Pending, Repairing, Succeeded, Updating};
use reconcile_model::{normalize_location, NaturalKey, ValidationReport};
use resource_agent::provider::{Diff, Operation, Provider, ProviderResult};
use resource_agent::wait::StateChange;
use resource_agent::Timeouts;
use snafu::{OptionExt, ResultExt};
use std::time::Duration;

/// Container groups cannot be changed in place; every difference replaces the group.
pub struct ContainerGroupProvider;

impl Provider for ContainerGroupProvider {
    type Config = ContainerGroupConfig;
    type Object = ContainerGroup;

    fn kind(&self) -> &'static str {
        "container group"
    }

    fn natural_key(&self, config: &Self::Config) -> NaturalKey {
        NaturalKey::new(&config.resource_group_name, &config.name)
    }

    fn validate(&self, config: &Self::Config) -> ValidationReport {
        config.validate()
    }

    fn expand(&self, config: &Self::Config) -> ProviderResult<Self::Object> {
        Ok(expand(config)?)
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

    fn state_change(&self, _operation: Operation) -> StateChange {
        StateChange::new(vec![Pending, Creating, Updating, Repairing], vec![Succeeded])
    }

    fn default_timeouts(&self) -> Timeouts {
        Timeouts::uniform(Duration::from_secs(30 * 60))
    }
}

fn expand(config: &ContainerGroupConfig) -> Result<ContainerGroup> {
    let mut containers = Vec::with_capacity(config.containers.len());
    let mut group_ports = Vec::new();
    let mut group_volumes: Vec<Volume> = Vec::new();

    for container in &config.containers {
        let port = container
            .port
            .map(|port| {
                u16::try_from(port).context(error::PortRangeSnafu {
                    container: &container.name,
                    port,
                })
            })
            .transpose()?;
        if let Some(port) = port {
            group_ports.push(Port {
                protocol: container.protocol.map(|p| p.to_string()),
                port: Some(port),
            });
        }

        let mut mounts = Vec::with_capacity(container.volumes.len());
        for volume in &container.volumes {
            mounts.push(VolumeMount {
                name: Some(volume.name.clone()),
                mount_path: Some(volume.mount_path.clone()),
                read_only: Some(volume.read_only),
            });
            // Containers that share a volume declare it identically; the group lists it once.
            if !group_volumes
                .iter()
                .any(|v| v.name.as_deref() == Some(volume.name.as_str()))
            {
                group_volumes.push(expand_volume(volume));
            }
        }

        containers.push(Container {
            name: Some(container.name.clone()),
            properties: Some(ContainerProperties {
                image: Some(container.image.clone()),
                command: container.command_args(),
                ports: port.map(|port| vec![ContainerPort { port: Some(port) }]),
                environment_variables: non_empty(
                    container
                        .environment_variables
                        .iter()
                        .map(|(name, value)| EnvironmentVariable {
                            name: Some(name.clone()),
                            value: Some(value.clone()),
                        })
                        .collect(),
                ),
                resources: Some(ResourceRequirements {
                    requests: Some(ResourceRequests {
                        memory_in_gb: Some(container.memory),
                        cpu: Some(container.cpu),
                    }),
                }),
                volume_mounts: non_empty(mounts),
            }),
        });
    }

    Ok(ContainerGroup {
        id: None,
        name: Some(config.name.clone()),
        location: Some(config.location.clone()),
        tags: (!config.tags.is_empty()).then(|| config.tags.clone()),
        properties: Some(ContainerGroupProperties {
            provisioning_state: None,
            containers,
            image_registry_credentials: non_empty(
                config
                    .image_registry_credentials
                    .iter()
                    .map(|c| RemoteCredential {
                        server: Some(c.server.clone()),
                        username: Some(c.username.clone()),
                        password: c.password.clone(),
                    })
                    .collect(),
            ),
            restart_policy: Some(config.restart_policy.to_string()),
            ip_address: Some(IpAddress {
                ports: group_ports,
                address_type: Some(config.ip_address_type.to_string()),
                ip: None,
                dns_name_label: config.dns_name_label.clone(),
                fqdn: None,
            }),
            os_type: Some(config.os_type.to_string()),
            volumes: non_empty(group_volumes),
        }),
    })
}

fn expand_volume(volume: &VolumeConfig) -> Volume {
    Volume {
        name: Some(volume.name.clone()),
        azure_file: Some(AzureFileVolume {
            share_name: Some(volume.share_name.clone()),
            read_only: Some(volume.read_only),
            storage_account_name: Some(volume.storage_account_name.clone()),
            storage_account_key: volume.storage_account_key.clone(),
        }),
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then(|| items)
}

fn flatten(
    key: &NaturalKey,
    group: &ContainerGroup,
    prior: Option<&ContainerGroupConfig>,
) -> Result<ContainerGroupConfig> {
    let properties = group
        .properties
        .as_ref()
        .context(error::MissingFieldSnafu {
            field: "properties",
        })?;
    let address = properties.ip_address.as_ref();
    let group_ports = address.map(|a| a.ports.as_slice()).unwrap_or_default();
    let group_volumes = properties.volumes.as_deref().unwrap_or_default();

    let ip_address_type = match address.and_then(|a| a.address_type.as_deref()) {
        Some(value) => value.parse::<IpAddressType>().context(error::UnknownValueSnafu {
            what: "ip address type",
        })?,
        None => IpAddressType::default(),
    };
    let os_type = properties
        .os_type
        .as_deref()
        .context(error::MissingFieldSnafu { field: "osType" })?
        .parse::<OsType>()
        .context(error::UnknownValueSnafu { what: "os type" })?;
    let restart_policy = match properties.restart_policy.as_deref() {
        Some(value) => value.parse::<RestartPolicy>().context(error::UnknownValueSnafu {
            what: "restart policy",
        })?,
        None => RestartPolicy::default(),
    };

    let mut containers = Vec::with_capacity(properties.containers.len());
    for container in &properties.containers {
        let prior_container = prior.and_then(|p| {
            p.containers
                .iter()
                .find(|c| Some(c.name.as_str()) == container.name.as_deref())
        });
        containers.push(flatten_container(
            container,
            group_ports,
            group_volumes,
            prior_container,
        )?);
    }

    Ok(ContainerGroupConfig {
        name: key.name.clone(),
        location: normalize_location(group.location.as_deref().unwrap_or_default()),
        resource_group_name: key.scope.clone(),
        ip_address_type,
        os_type,
        restart_policy,
        dns_name_label: address.and_then(|a| a.dns_name_label.clone()),
        ip_address: address.and_then(|a| a.ip.clone()),
        fqdn: address.and_then(|a| a.fqdn.clone()),
        tags: group.tags.clone().unwrap_or_default(),
        image_registry_credentials: flatten_credentials(
            properties.image_registry_credentials.as_deref().unwrap_or_default(),
            prior.map(|p| p.image_registry_credentials.as_slice()),
        ),
        containers,
    })
}

/// A container's protocol lives in the group's port list and its volume details in the group's
/// volume list. Both are matched by exact key, and a mount with no matching volume is dropped.
fn flatten_container(
    container: &Container,
    group_ports: &[Port],
    group_volumes: &[Volume],
    prior: Option<&ContainerConfig>,
) -> Result<ContainerConfig> {
    let name = container.name.clone().context(error::MissingFieldSnafu {
        field: "container name",
    })?;
    let properties = container
        .properties
        .as_ref()
        .context(error::MissingFieldSnafu {
            field: format!("properties of container '{}'", name),
        })?;
    let requests = properties.resources.as_ref().and_then(|r| r.requests.as_ref());

    let port = properties
        .ports
        .as_ref()
        .and_then(|ports| ports.first())
        .and_then(|p| p.port);
    let protocol = group_ports
        .iter()
        .find(|p| port.is_some() && p.port == port)
        .and_then(|p| p.protocol.as_deref())
        .map(str::parse::<Protocol>)
        .transpose()
        .context(error::UnknownValueSnafu { what: "protocol" })?;

    let mut volumes = Vec::new();
    for mount in properties.volume_mounts.iter().flatten() {
        let mount_name = match &mount.name {
            Some(some) => some,
            None => continue,
        };
        let azure_file = match group_volumes
            .iter()
            .find(|v| v.name.as_ref() == Some(mount_name))
            .and_then(|v| v.azure_file.as_ref())
        {
            Some(some) => some,
            None => {
                debug!(
                    "Dropping mount '{}' of container '{}', the group has no such volume",
                    mount_name, name
                );
                continue;
            }
        };
        volumes.push(VolumeConfig {
            name: mount_name.clone(),
            mount_path: mount.mount_path.clone().unwrap_or_default(),
            read_only: mount.read_only.unwrap_or(false),
            share_name: azure_file.share_name.clone().unwrap_or_default(),
            storage_account_name: azure_file.storage_account_name.clone().unwrap_or_default(),
            storage_account_key: prior
                .and_then(|p| p.volumes.iter().find(|v| &v.name == mount_name))
                .and_then(|v| v.storage_account_key.clone()),
        });
    }

    Ok(ContainerConfig {
        name,
        image: properties.image.clone().unwrap_or_default(),
        cpu: requests.and_then(|r| r.cpu).unwrap_or_default(),
        memory: requests.and_then(|r| r.memory_in_gb).unwrap_or_default(),
        port: port.map(u32::from),
        protocol,
        environment_variables: properties
            .environment_variables
            .iter()
            .flatten()
            .filter_map(|v| Some((v.name.clone()?, v.value.clone().unwrap_or_default())))
            .collect(),
        command: properties.command.as_ref().map(|argv| argv.join(" ")),
        volumes,
    })
}

/// Passwords are never returned. One is carried over from `prior` when the credential at the
/// same position names the same server.
fn flatten_credentials(
    credentials: &[RemoteCredential],
    prior: Option<&[ImageRegistryCredential]>,
) -> Vec<ImageRegistryCredential> {
    credentials
        .iter()
        .enumerate()
        .map(|(i, credential)| {
            let server = credential.server.clone().unwrap_or_default();
            let password = prior
                .and_then(|p| p.get(i))
                .filter(|old| old.server == server)
                .and_then(|old| old.password.clone());
            ImageRegistryCredential {
                server,
                username: credential.username.clone().unwrap_or_default(),
                password,
            }
        })
        .collect()
}

fn diff(current: &ContainerGroupConfig, desired: &ContainerGroupConfig) -> Diff {
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
        "ip_address_type",
        &current.ip_address_type,
        &desired.ip_address_type,
    );
    diff.replace_if_changed("os_type", &current.os_type, &desired.os_type);
    diff.replace_if_changed(
        "restart_policy",
        &current.restart_policy,
        &desired.restart_policy,
    );
    diff.replace_if_changed(
        "dns_name_label",
        &current.dns_name_label,
        &desired.dns_name_label,
    );
    diff.replace_if_changed("tags", &current.tags, &desired.tags);

    if current.image_registry_credentials.len() != desired.image_registry_credentials.len() {
        diff.replace.push("image_registry_credential".to_string());
    } else {
        for (i, (c, d)) in current
            .image_registry_credentials
            .iter()
            .zip(&desired.image_registry_credentials)
            .enumerate()
        {
            let prefix = format!("image_registry_credential.{}", i);
            diff.replace_if_changed(format!("{}.server", prefix), &c.server, &d.server);
            diff.replace_if_changed(format!("{}.username", prefix), &c.username, &d.username);
            if c.password.is_some() {
                diff.replace_if_changed(format!("{}.password", prefix), &c.password, &d.password);
            }
        }
    }

    if current.containers.len() != desired.containers.len() {
        diff.replace.push("container".to_string());
    } else {
        for (i, (c, d)) in current.containers.iter().zip(&desired.containers).enumerate() {
            diff_container(&mut diff, &format!("container.{}", i), c, d);
        }
    }
    diff
}

fn diff_container(
    diff: &mut Diff,
    prefix: &str,
    current: &ContainerConfig,
    desired: &ContainerConfig,
) {
    let field = |name: &str| format!("{}.{}", prefix, name);
    diff.replace_if_changed(field("name"), &current.name, &desired.name);
    diff.replace_if_changed(field("image"), &current.image, &desired.image);
    diff.replace_if_changed(field("cpu"), &current.cpu, &desired.cpu);
    diff.replace_if_changed(field("memory"), &current.memory, &desired.memory);
    diff.replace_if_changed(field("port"), &current.port, &desired.port);
    diff.replace_if_changed(field("protocol"), &current.protocol, &desired.protocol);
    diff.replace_if_changed(
        field("environment_variables"),
        &current.environment_variables,
        &desired.environment_variables,
    );
    diff.replace_if_changed(field("command"), &current.command, &desired.command);

    if current.volumes.len() != desired.volumes.len() {
        diff.replace.push(field("volume"));
        return;
    }
    for (j, (c, d)) in current.volumes.iter().zip(&desired.volumes).enumerate() {
        let volume = |name: &str| format!("{}.volume.{}.{}", prefix, j, name);
        diff.replace_if_changed(volume("name"), &c.name, &d.name);
        diff.replace_if_changed(volume("mount_path"), &c.mount_path, &d.mount_path);
        diff.replace_if_changed(volume("read_only"), &c.read_only, &d.read_only);
        diff.replace_if_changed(volume("share_name"), &c.share_name, &d.share_name);
        diff.replace_if_changed(
            volume("storage_account_name"),
            &c.storage_account_name,
            &d.storage_account_name,
        );
        if c.storage_account_key.is_some() {
            diff.replace_if_changed(
                volume("storage_account_key"),
                &c.storage_account_key,
                &d.storage_account_key,
            );
        }
    }
}
