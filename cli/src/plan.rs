use crate::document::read_document;
use crate::remote::RemoteArgs;
use crate::state::State;
use crate::Kind;
use anyhow::{Context, Result};
use clap::{value_parser, Parser};
use reconcile_model::clients::ManagementClient;
use resource_agent::{Provider, Reconciler};
use std::path::PathBuf;

/// Compare a document with the remote object recorded in the state file and print the plan.
#[derive(Debug, Parser)]
pub(crate) struct Plan {
    /// The resource type the document describes.
    #[clap(long, value_enum)]
    pub(crate) kind: Kind,

    /// Path to the YAML or JSON document.
    #[clap(long, value_parser = value_parser!(PathBuf))]
    file: PathBuf,

    #[clap(flatten)]
    pub(crate) remote: RemoteArgs,
}

impl Plan {
    pub(crate) async fn run<P, C>(&self, reconciler: &Reconciler<P, C>) -> Result<()>
    where
        P: Provider,
        C: ManagementClient<Object = P::Object>,
    {
        let desired: P::Config = read_document(&self.file)?;
        let state = State::<P::Config>::load(&self.remote.state)?;
        let plan = reconciler
            .plan(
                state.as_ref().map(|s| s.id.as_str()),
                &desired,
                state.as_ref().map(|s| &s.configuration),
            )
            .await
            .context("Unable to plan")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&plan).context("Unable to serialize plan")?
        );
        Ok(())
    }
}
