use anyhow::{Context, Result};
use reconcile_model::Configuration;
use std::fs;
use std::path::Path;

/// Read a Desired Document from a YAML or JSON file.
pub(crate) fn read_document<C>(path: &Path) -> Result<C>
where
    C: Configuration,
{
    let data = fs::read_to_string(path)
        .with_context(|| format!("Unable to read document '{}'", path.display()))?;
    // JSON is a subset of YAML, so one parser covers both.
    let value: serde_json::Value = serde_yaml::from_str(&data)
        .with_context(|| format!("Unable to parse document '{}'", path.display()))?;
    C::from_value(value).with_context(|| format!("Malformed document '{}'", path.display()))
}
