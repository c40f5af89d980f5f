use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The natural key of a remote object: the resource group that scopes it and its name. Two
/// objects of the same type with the same natural key are the same object.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NaturalKey {
    pub scope: String,
    pub name: String,
}

impl NaturalKey {
    pub fn new<S1, S2>(scope: S1, name: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }
}

impl Display for NaturalKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' (resource group '{}')", self.name, self.scope)
    }
}

/// A parsed management API identifier of the form
/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    /// The namespaced type, e.g. `Microsoft.ContainerInstance/containerGroups`.
    pub resource_type: String,
    pub name: String,
}

impl ResourceId {
    pub fn new<S1, S2>(subscription_id: S1, resource_type: S2, key: &NaturalKey) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: key.scope.clone(),
            resource_type: resource_type.into(),
            name: key.name.clone(),
        }
    }

    pub fn parse(id: &str) -> Result<Self> {
        let invalid = |reason: &str| -> crate::Error {
            error::InvalidResourceIdSnafu {
                id,
                reason: reason.to_string(),
            }
            .build()
            .into()
        };

        let segments: Vec<&str> = id.trim_matches('/').split('/').collect();
        if segments.len() != 8 {
            return Err(invalid("expected 8 path segments"));
        }
        if !segments[0].eq_ignore_ascii_case("subscriptions") {
            return Err(invalid("missing 'subscriptions' segment"));
        }
        if !segments[2].eq_ignore_ascii_case("resourceGroups") {
            return Err(invalid("missing 'resourceGroups' segment"));
        }
        if !segments[4].eq_ignore_ascii_case("providers") {
            return Err(invalid("missing 'providers' segment"));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("empty path segment"));
        }

        Ok(Self {
            subscription_id: segments[1].to_string(),
            resource_group: segments[3].to_string(),
            resource_type: format!("{}/{}", segments[5], segments[6]),
            name: segments[7].to_string(),
        })
    }

    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(&self.resource_group, &self.name)
    }

    /// Whether this id refers to an object of `resource_type`. The comparison ignores case in the
    /// same way the management API does.
    pub fn is_type(&self, resource_type: &str) -> bool {
        self.resource_type.eq_ignore_ascii_case(resource_type)
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
            self.subscription_id, self.resource_group, self.resource_type, self.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{NaturalKey, ResourceId};

    const ID: &str = "/subscriptions/1234/resourceGroups/my-rg/providers/Microsoft.ContainerInstance/containerGroups/web";

    #[test]
    fn parse_and_display() {
        let id = ResourceId::parse(ID).unwrap();
        assert_eq!(id.subscription_id, "1234");
        assert_eq!(id.natural_key(), NaturalKey::new("my-rg", "web"));
        assert!(id.is_type("microsoft.containerinstance/containergroups"));
        assert_eq!(id.to_string(), ID);
    }

    #[test]
    fn segment_keys_are_case_insensitive() {
        let id = ResourceId::parse(
            "/subscriptions/1234/resourcegroups/my-rg/providers/Microsoft.ContainerService/containerServices/acs",
        )
        .unwrap();
        assert_eq!(id.resource_group, "my-rg");
        assert_eq!(id.name, "acs");
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!(ResourceId::parse("").is_err());
        assert!(ResourceId::parse("/subscriptions/1234/resourceGroups/my-rg").is_err());
        assert!(ResourceId::parse(
            "/subscriptions/1234/groups/my-rg/providers/Microsoft.ContainerInstance/containerGroups/web"
        )
        .is_err());
    }
}
