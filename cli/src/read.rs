use crate::remote::RemoteArgs;
use crate::state::{remove_state, State};
use crate::Kind;
use anyhow::{Context, Result};
use clap::Parser;
use reconcile_model::clients::ManagementClient;
use resource_agent::{Provider, Reconciler};

/// Read the remote object recorded in the state file and rewrite the state file with it. The
/// state file is removed if the object no longer exists.
#[derive(Debug, Parser)]
pub(crate) struct Read {
    /// The resource type recorded in the state file.
    #[clap(long, value_enum)]
    pub(crate) kind: Kind,

    #[clap(flatten)]
    pub(crate) remote: RemoteArgs,
}

impl Read {
    pub(crate) async fn run<P, C>(&self, reconciler: &Reconciler<P, C>) -> Result<()>
    where
        P: Provider,
        C: ManagementClient<Object = P::Object>,
    {
        let state = State::<P::Config>::load(&self.remote.state)?.with_context(|| {
            format!("Nothing is recorded in '{}'", self.remote.state.display())
        })?;
        let current = reconciler
            .read(&state.id, Some(&state.configuration))
            .await
            .with_context(|| format!("Unable to read '{}'", state.id))?;
        match current {
            Some(configuration) => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&configuration)
                        .context("Unable to serialize document")?
                );
                State {
                    id: state.id,
                    configuration,
                }
                .save(&self.remote.state)
            }
            None => {
                println!("'{}' no longer exists.", state.id);
                remove_state(&self.remote.state)
            }
        }
    }
}
