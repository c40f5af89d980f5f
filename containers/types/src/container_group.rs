use crate::string_enum;
use configuration_derive::Configuration;
use reconcile_model::ValidationReport;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

string_enum!(
    /// The only address type the management API accepts for a container group.
    IpAddressType, "ip address type", default = Public,
    { Public => "Public" }
);

string_enum!(
    OsType, "os type", default = Linux,
    { Linux => "Linux", Windows => "Windows" }
);

string_enum!(
    /// What the platform does when a container in the group exits.
    RestartPolicy, "restart policy", default = Always,
    { Always => "Always", Never => "Never", OnFailure => "OnFailure" }
);

string_enum!(
    Protocol, "protocol", default = Tcp,
    { Tcp => "TCP", Udp => "UDP" }
);

/// A set of containers scheduled together on one host, sharing a public address and a restart
/// policy. Changing any field replaces the group.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Configuration)]
pub struct ContainerGroupConfig {
    pub name: String,
    pub location: String,
    pub resource_group_name: String,
    #[serde(default)]
    pub ip_address_type: IpAddressType,
    pub os_type: OsType,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_name_label: Option<String>,
    /// Assigned by the platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Assigned by the platform when `dns_name_label` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(
        default,
        rename = "image_registry_credential",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub image_registry_credentials: Vec<ImageRegistryCredential>,
    #[serde(rename = "container")]
    pub containers: Vec<ContainerConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub name: String,
    pub image: String,
    pub cpu: f64,
    /// Memory in GB.
    pub memory: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment_variables: BTreeMap<String, String>,
    /// A command line; split on spaces into the argument vector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, rename = "volume", skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeConfig>,
}

/// An Azure File share mounted into a container.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub name: String,
    pub mount_path: String,
    #[serde(default)]
    pub read_only: bool,
    pub share_name: String,
    pub storage_account_name: String,
    /// Write-only. Never returned by a read, so a refreshed document only carries it when the
    /// caller supplied the previous document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_account_key: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRegistryCredential {
    pub server: String,
    pub username: String,
    /// Write-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ContainerGroupConfig {
    /// Check everything that can be checked without asking the management API.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.require_non_empty("name", &self.name);
        report.require_non_empty("location", &self.location);
        report.require_non_empty("resource_group_name", &self.resource_group_name);
        if let Some(label) = &self.dns_name_label {
            report.require_non_empty("dns_name_label", label);
        }

        for (i, credential) in self.image_registry_credentials.iter().enumerate() {
            report.merge_nested(
                format!("image_registry_credential.{}", i),
                credential.validate(),
            );
        }

        report.check(
            !self.containers.is_empty(),
            "container",
            "at least one container is required",
        );
        let mut names = BTreeSet::new();
        let mut ports = BTreeMap::new();
        let mut volumes: BTreeMap<&str, (&str, &VolumeConfig)> = BTreeMap::new();
        for (i, container) in self.containers.iter().enumerate() {
            let prefix = format!("container.{}", i);
            report.merge_nested(&prefix, container.validate());
            if !names.insert(container.name.as_str()) {
                report.push(
                    format!("{}.name", prefix),
                    format!("container name '{}' is used more than once", container.name),
                );
            }
            // The platform reports protocols per port number, so a number is used only once.
            if let Some(port) = container.port {
                if let Some(other) = ports.insert(port, container.name.as_str()) {
                    report.push(
                        format!("{}.port", prefix),
                        format!("port {} is already exposed by container '{}'", port, other),
                    );
                }
            }
            // Volumes become group-level objects keyed by name, so containers may only share a
            // name when they describe the same share.
            for (j, volume) in container.volumes.iter().enumerate() {
                match volumes.get(volume.name.as_str()) {
                    Some((owner, existing)) if *owner != container.name => {
                        if !volume.same_share(existing) {
                            report.push(
                                format!("{}.volume.{}.name", prefix, j),
                                format!(
                                    "volume '{}' is defined differently by container '{}'",
                                    volume.name, owner
                                ),
                            );
                        }
                    }
                    _ => {
                        volumes.insert(volume.name.as_str(), (container.name.as_str(), volume));
                    }
                }
            }
        }
        report
    }
}

impl ContainerConfig {
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.require_non_empty("name", &self.name);
        report.require_non_empty("image", &self.image);
        report.check(self.cpu > 0.0, "cpu", "must be greater than zero");
        report.check(self.memory > 0.0, "memory", "must be greater than zero");
        if let Some(port) = self.port {
            report.check(
                (1..=65535).contains(&port),
                "port",
                format!("{} is not between 1 and 65535", port),
            );
        }
        report.check(
            self.protocol.is_none() || self.port.is_some(),
            "protocol",
            "may only be set together with port",
        );
        if let Some(command) = &self.command {
            report.require_non_empty("command", command);
        }
        for name in self.environment_variables.keys() {
            report.check(
                !name.trim().is_empty(),
                "environment_variables",
                "variable names must not be empty",
            );
        }

        let mut names = BTreeSet::new();
        for (i, volume) in self.volumes.iter().enumerate() {
            let prefix = format!("volume.{}", i);
            report.merge_nested(&prefix, volume.validate());
            if !names.insert(volume.name.as_str()) {
                report.push(
                    format!("{}.name", prefix),
                    format!("volume name '{}' is used more than once", volume.name),
                );
            }
        }
        report
    }

    /// The command line as the argument vector sent to the platform.
    pub fn command_args(&self) -> Option<Vec<String>> {
        self.command
            .as_ref()
            .map(|command| command.split(' ').map(str::to_string).collect())
    }
}

impl VolumeConfig {
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.require_non_empty("name", &self.name);
        report.require_non_empty("mount_path", &self.mount_path);
        report.require_non_empty("share_name", &self.share_name);
        report.require_non_empty("storage_account_name", &self.storage_account_name);
        report.require_non_empty(
            "storage_account_key",
            self.storage_account_key.as_deref().unwrap_or_default(),
        );
        report
    }

    fn same_share(&self, other: &VolumeConfig) -> bool {
        self.share_name == other.share_name
            && self.storage_account_name == other.storage_account_name
            && self.storage_account_key == other.storage_account_key
    }
}

impl ImageRegistryCredential {
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.require_non_empty("server", &self.server);
        report.require_non_empty("username", &self.username);
        report.require_non_empty("password", self.password.as_deref().unwrap_or_default());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    const DOCUMENT: &str = r#"
name: web
location: westeurope
resource_group_name: rg
os_type: linux
dns_name_label: web-demo
tags:
  environment: testing
container:
  - name: hello
    image: microsoft/aci-helloworld:latest
    cpu: 0.5
    memory: 1.5
    port: 80
    protocol: tcp
    environment_variables:
      NODE_ENV: production
    command: /bin/bash -c ls
    volume:
      - name: logs
        mount_path: /aci/logs
        share_name: acishare
        storage_account_name: acistorage
        storage_account_key: secret
  - name: sidecar
    image: microsoft/aci-tutorial-sidecar
    cpu: 0.5
    memory: 1.5
"#;

    fn document() -> ContainerGroupConfig {
        serde_yaml::from_str(DOCUMENT).unwrap()
    }

    #[test]
    fn parse_applies_defaults_and_ignores_case() {
        let config = document();
        assert_eq!(config.os_type, OsType::Linux);
        assert_eq!(config.ip_address_type, IpAddressType::Public);
        assert_eq!(config.restart_policy, RestartPolicy::Always);
        assert_eq!(config.containers[0].protocol, Some(Protocol::Tcp));
        assert!(!config.containers[0].volumes[0].read_only);
        assert_eq!(config.tags, btreemap! {"environment".into() => "testing".into()});
        assert!(config.validate().is_valid(), "{}", config.validate());
    }

    #[test]
    fn enums_serialize_in_api_casing() {
        assert_eq!(
            serde_json::to_value(RestartPolicy::OnFailure).unwrap(),
            serde_json::json!("OnFailure")
        );
        assert_eq!("udp".parse::<Protocol>().unwrap(), Protocol::Udp);
        let err = "Private".parse::<IpAddressType>().unwrap_err();
        assert!(err.to_string().contains("expected one of: Public"));
    }

    #[test]
    fn unknown_os_type_is_a_parse_error() {
        let document = DOCUMENT.replace("os_type: linux", "os_type: plan9");
        assert!(serde_yaml::from_str::<ContainerGroupConfig>(&document).is_err());
    }

    #[test]
    fn missing_required_field_is_a_parse_error() {
        let document = DOCUMENT.replace("resource_group_name: rg\n", "");
        assert!(serde_yaml::from_str::<ContainerGroupConfig>(&document).is_err());
    }

    #[test]
    fn command_is_split_on_spaces() {
        assert_eq!(
            document().containers[0].command_args().unwrap(),
            vec!["/bin/bash", "-c", "ls"]
        );
    }

    #[test]
    fn every_problem_is_reported() {
        let mut config = document();
        config.containers[0].port = Some(70000);
        config.containers[0].memory = 0.0;
        config.containers[1].protocol = Some(Protocol::Udp);
        config.containers[0].volumes[0].storage_account_key = None;
        let fields: Vec<_> = config
            .validate()
            .errors
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                "container.0.memory",
                "container.0.port",
                "container.0.volume.0.storage_account_key",
                "container.1.protocol",
            ]
        );
    }

    #[test]
    fn containers_are_required_and_unique() {
        let mut config = document();
        config.containers.clear();
        assert_eq!(config.validate().errors[0].field, "container");

        let mut config = document();
        config.containers[1].name = "hello".into();
        let report = config.validate();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field, "container.1.name");
    }

    #[test]
    fn duplicate_ports_are_rejected() {
        let mut config = document();
        config.containers[1].port = Some(80);
        let report = config.validate();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field, "container.1.port");

        config.containers[1].protocol = Some(Protocol::Udp);
        assert!(!config.validate().is_valid());

        config.containers[1].port = Some(8080);
        assert!(config.validate().is_valid());
    }

    #[test]
    fn shared_volumes_must_match() {
        let mut config = document();
        let mut volume = config.containers[0].volumes[0].clone();
        volume.mount_path = "/sidecar/logs".into();
        config.containers[1].volumes.push(volume.clone());
        assert!(config.validate().is_valid());

        volume.share_name = "othershare".into();
        config.containers[1].volumes[0] = volume;
        assert_eq!(
            config.validate().errors[0].field,
            "container.1.volume.0.name"
        );
    }

    #[test]
    fn registry_password_is_required() {
        let mut config = document();
        config
            .image_registry_credentials
            .push(ImageRegistryCredential {
                server: "registry.example".into(),
                username: "user".into(),
                password: None,
            });
        assert_eq!(
            config.validate().errors[0].field,
            "image_registry_credential.0.password"
        );
    }
}
