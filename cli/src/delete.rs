use crate::remote::RemoteArgs;
use crate::state::{remove_state, State};
use crate::Kind;
use anyhow::{Context, Result};
use clap::Parser;
use reconcile_model::clients::ManagementClient;
use resource_agent::{Provider, Reconciler};

/// Delete the remote object recorded in the state file, then remove the state file.
#[derive(Debug, Parser)]
pub(crate) struct Delete {
    /// The resource type recorded in the state file.
    #[clap(long, value_enum)]
    pub(crate) kind: Kind,

    #[clap(flatten)]
    pub(crate) remote: RemoteArgs,
}

impl Delete {
    pub(crate) async fn run<P, C>(&self, reconciler: &Reconciler<P, C>) -> Result<()>
    where
        P: Provider,
        C: ManagementClient<Object = P::Object>,
    {
        let state = State::<P::Config>::load(&self.remote.state)?.with_context(|| {
            format!("Nothing is recorded in '{}'", self.remote.state.display())
        })?;
        reconciler
            .delete(&state.id)
            .await
            .with_context(|| format!("Unable to delete '{}'", state.id))?;
        remove_state(&self.remote.state)?;
        println!("Deleted '{}'.", state.id);
        Ok(())
    }
}
