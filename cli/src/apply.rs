use crate::document::read_document;
use crate::remote::RemoteArgs;
use crate::state::State;
use crate::Kind;
use anyhow::{Context, Result};
use clap::{value_parser, Parser};
use reconcile_model::clients::ManagementClient;
use resource_agent::{Provider, Reconciler};
use serde_json::json;
use std::path::PathBuf;

/// Bring the remote object in line with a document and record the result in the state file.
#[derive(Debug, Parser)]
pub(crate) struct Apply {
    /// The resource type the document describes.
    #[clap(long, value_enum)]
    pub(crate) kind: Kind,

    /// Path to the YAML or JSON document.
    #[clap(long, value_parser = value_parser!(PathBuf))]
    file: PathBuf,

    #[clap(flatten)]
    pub(crate) remote: RemoteArgs,
}

impl Apply {
    pub(crate) async fn run<P, C>(&self, reconciler: &Reconciler<P, C>) -> Result<()>
    where
        P: Provider,
        C: ManagementClient<Object = P::Object>,
    {
        let desired: P::Config = read_document(&self.file)?;
        let state = State::<P::Config>::load(&self.remote.state)?;
        let applied = match reconciler
            .apply(
                state.as_ref().map(|s| s.id.as_str()),
                &desired,
                state.as_ref().map(|s| &s.configuration),
            )
            .await
        {
            Ok(applied) => applied,
            Err(e) => {
                // The state file is not touched, so say what may need cleaning up by hand.
                let resources = e.resources();
                return Err(e).with_context(|| {
                    format!("Unable to apply '{}', {}", self.file.display(), resources)
                });
            }
        };

        let summary = json!({ "id": applied.id, "plan": applied.plan });
        State {
            id: applied.id,
            configuration: applied.configuration,
        }
        .save(&self.remote.state)?;
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Unable to serialize result")?
        );
        Ok(())
    }
}
