/*!

This is the command line interface for reconciling a container group or container service with a
document on disk. The caller owns a small JSON state file that carries the resource id and the last
Canonical Document from one run to the next.

!*/

mod apply;
mod delete;
mod document;
mod plan;
mod read;
mod remote;
mod state;
mod validate;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use container_agents::{ContainerGroupProvider, ContainerServiceProvider};
use env_logger::Builder;
use log::LevelFilter;
use reconcile_model::clients::ManagementClient;
use remote::RemoteArgs;
use resource_agent::{Provider, Reconciler};

/// Reconcile declarative container resource documents with the cloud management API.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Check a document without contacting the management API.
    Validate(validate::Validate),
    /// Show what `apply` would do.
    Plan(plan::Plan),
    /// Create, update or replace the remote object and record it in the state file.
    Apply(apply::Apply),
    /// Refresh the state file from the remote object.
    Read(read::Read),
    /// Delete the remote object recorded in the state file.
    Delete(delete::Delete),
}

/// The resource types this tool knows about.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum Kind {
    ContainerGroup,
    ContainerService,
}

impl Command {
    fn kind(&self) -> Kind {
        match self {
            Command::Validate(validate) => validate.kind,
            Command::Plan(plan) => plan.kind,
            Command::Apply(apply) => apply.kind,
            Command::Read(read) => read.kind,
            Command::Delete(delete) => delete.kind,
        }
    }

    async fn execute<P, C>(&self, reconciler: &Reconciler<P, C>) -> Result<()>
    where
        P: Provider,
        C: ManagementClient<Object = P::Object>,
    {
        match self {
            Command::Validate(validate) => validate.run(reconciler.provider()),
            Command::Plan(plan) => plan.run(reconciler).await,
            Command::Apply(apply) => apply.run(reconciler).await,
            Command::Read(read) => read.run(reconciler).await,
            Command::Delete(delete) => delete.run(reconciler).await,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    match args.command.kind() {
        Kind::ContainerGroup => run_with(ContainerGroupProvider, &args.command).await,
        Kind::ContainerService => run_with(ContainerServiceProvider, &args.command).await,
    }
}

async fn run_with<P>(provider: P, command: &Command) -> Result<()>
where
    P: Provider,
{
    let remote: &RemoteArgs = match command {
        // Validation never needs a client.
        Command::Validate(validate) => return validate.run(&provider),
        Command::Plan(plan) => &plan.remote,
        Command::Apply(apply) => &apply.remote,
        Command::Read(read) => &read.remote,
        Command::Delete(delete) => &delete.remote,
    };
    let timeouts = remote.timeouts(provider.default_timeouts());
    if remote.simulate {
        let client = remote.simulated_client(&provider).await?;
        let reconciler = Reconciler::new(provider, client).with_timeouts(timeouts);
        command.execute(&reconciler).await
    } else {
        let client = remote.arm_client::<P::Object>()?;
        let reconciler = Reconciler::new(provider, client).with_timeouts(timeouts);
        command.execute(&reconciler).await
    }
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use default log level for this tool and the libraries that
            // do the work.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .filter(Some("resource_agent"), level)
                .filter(Some("container_agents"), level)
                .filter(Some("reconcile_model"), level)
                .init();
        }
    }
}
