use crate::state::State;
use anyhow::{Context, Result};
use clap::{value_parser, Parser};
use log::info;
use reconcile_model::clients::{ArmClient, ArmClientConfig, MemoryClient};
use reconcile_model::{ProvisioningState, RemoteObject};
use resource_agent::{Provider, Timeouts};
use std::path::PathBuf;
use std::time::Duration;

/// Options shared by every command that talks to the management API.
#[derive(Debug, Parser)]
pub(crate) struct RemoteArgs {
    /// Path to the JSON state file that records the resource id and the last Canonical Document.
    #[clap(long, value_parser = value_parser!(PathBuf))]
    pub(crate) state: PathBuf,

    /// Use an in-memory management plane instead of the real API. It starts out holding the
    /// object recorded in the state file, if any.
    #[clap(long)]
    pub(crate) simulate: bool,

    /// The management API base URL.
    #[clap(
        long,
        env = "ARM_ENDPOINT",
        default_value = "https://management.azure.com"
    )]
    endpoint: String,

    /// The subscription to create objects in.
    #[clap(long, env = "ARM_SUBSCRIPTION_ID")]
    subscription_id: Option<String>,

    /// The bearer token for the management API. Prefer the environment variable so that the token
    /// stays out of the process list.
    #[clap(long, env = "ARM_ACCESS_TOKEN", hide = true, hide_env_values = true)]
    access_token: Option<String>,

    /// Seconds to wait for the remote object to settle, for every operation. Defaults to the
    /// resource type's own timeouts.
    #[clap(long)]
    timeout: Option<u64>,

    /// Seconds between provisioning state polls.
    #[clap(long)]
    poll_interval: Option<u64>,
}

impl RemoteArgs {
    pub(crate) fn timeouts(&self, defaults: Timeouts) -> Timeouts {
        let timeouts = match self.timeout {
            Some(secs) => Timeouts::uniform(Duration::from_secs(secs)),
            None => defaults,
        };
        match self.poll_interval {
            Some(secs) => timeouts.with_poll_interval(Duration::from_secs(secs)),
            None => timeouts,
        }
    }

    pub(crate) fn arm_client<T>(&self) -> Result<ArmClient<T>>
    where
        T: RemoteObject,
    {
        let config = ArmClientConfig {
            endpoint: self.endpoint.clone(),
            subscription_id: self.subscription_id.clone().context(
                "A subscription id is required, use '--subscription-id' or 'ARM_SUBSCRIPTION_ID'",
            )?,
            access_token: self.access_token.clone().context(
                "An access token is required, use '--access-token' or 'ARM_ACCESS_TOKEN'",
            )?,
        };
        ArmClient::new(config).context("Unable to create the management API client")
    }

    /// Each run is a fresh process, so the simulated plane is seeded with the object the state
    /// file says exists.
    pub(crate) async fn simulated_client<P>(&self, provider: &P) -> Result<MemoryClient<P::Object>>
    where
        P: Provider,
    {
        let client = MemoryClient::new();
        let state = match State::<P::Config>::load(&self.state)? {
            Some(state) => state,
            None => return Ok(client),
        };
        let key = provider.natural_key(&state.configuration);
        let mut object = provider
            .expand(&state.configuration)
            .context("Unable to rebuild the simulated object from the state file")?;
        object.populate_computed(&key);
        object.scrub_write_only();
        object.set_provisioning_state(ProvisioningState::Succeeded);
        let id = client.insert(key, object).await;
        if id != state.id {
            info!(
                "The state file records '{}' but the simulated object is '{}'",
                state.id, id
            );
        }
        Ok(client)
    }
}

