use anyhow::{Context, Result};
use reconcile_model::Configuration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What the caller keeps between runs: the resource id and the last Canonical Document. The
/// document carries write-only fields so that they survive the next read.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct State<C> {
    pub(crate) id: String,
    pub(crate) configuration: C,
}

impl<C> State<C>
where
    C: Configuration,
{
    /// A missing file means nothing has been applied yet.
    pub(crate) fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("Unable to read state file '{}'", path.display()))?;
        let state = serde_json::from_str(&data)
            .with_context(|| format!("Unable to parse state file '{}'", path.display()))?;
        Ok(Some(state))
    }

    pub(crate) fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize state")?;
        fs::write(path, data)
            .with_context(|| format!("Unable to write state file '{}'", path.display()))
    }
}

pub(crate) fn remove_state(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Unable to remove state file '{}'", path.display()))?;
    }
    Ok(())
}
