use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// The provisioning state label that the management API reports for an object. Labels are matched
/// without regard to case; anything unrecognized is kept verbatim in `Other`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ProvisioningState {
    Pending,
    Creating,
    Updating,
    Deleting,
    Repairing,
    Succeeded,
    Failed,
    Canceled,
    Other(String),
}

impl ProvisioningState {
    pub fn as_str(&self) -> &str {
        match self {
            ProvisioningState::Pending => "Pending",
            ProvisioningState::Creating => "Creating",
            ProvisioningState::Updating => "Updating",
            ProvisioningState::Deleting => "Deleting",
            ProvisioningState::Repairing => "Repairing",
            ProvisioningState::Succeeded => "Succeeded",
            ProvisioningState::Failed => "Failed",
            ProvisioningState::Canceled => "Canceled",
            ProvisioningState::Other(label) => label,
        }
    }
}

impl From<&str> for ProvisioningState {
    fn from(label: &str) -> Self {
        [
            ProvisioningState::Pending,
            ProvisioningState::Creating,
            ProvisioningState::Updating,
            ProvisioningState::Deleting,
            ProvisioningState::Repairing,
            ProvisioningState::Succeeded,
            ProvisioningState::Failed,
            ProvisioningState::Canceled,
        ]
        .into_iter()
        .find(|known| known.as_str().eq_ignore_ascii_case(label))
        .unwrap_or_else(|| ProvisioningState::Other(label.to_string()))
    }
}

impl Display for ProvisioningState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self.as_str(), f)
    }
}

impl Serialize for ProvisioningState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProvisioningState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(ProvisioningState::from(label.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::ProvisioningState;

    #[test]
    fn labels_parse_without_case() {
        assert_eq!(
            ProvisioningState::from("succeeded"),
            ProvisioningState::Succeeded
        );
        assert_eq!(
            ProvisioningState::from("CREATING"),
            ProvisioningState::Creating
        );
    }

    #[test]
    fn unknown_labels_are_kept() {
        let state = ProvisioningState::from("Migrating");
        assert_eq!(state, ProvisioningState::Other("Migrating".into()));
        assert_eq!(state.to_string(), "Migrating");
    }

    #[test]
    fn serde_uses_the_label() {
        let json = serde_json::to_string(&ProvisioningState::Updating).unwrap();
        assert_eq!(json, r#""Updating""#);
        let state: ProvisioningState = serde_json::from_str(r#""failed""#).unwrap();
        assert_eq!(state, ProvisioningState::Failed);
    }
}
