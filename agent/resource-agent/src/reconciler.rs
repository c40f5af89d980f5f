/*!

The `reconciler` module defines the [`Reconciler`] which drives a [`Provider`] and a
[`ManagementClient`] through create, read, update, delete, plan and apply.

The reconciler holds no state between calls. The resource id returned by `create` is the only thing
a caller needs to keep, along with the last Canonical Document if write-only fields should survive
a read.

!*/

use crate::error::{self, Error, Result};
use crate::provider::{Diff, Operation, Provider};
use crate::wait::{await_terminal_state, StateChange, WaitState, DEFAULT_MIN_INTERVAL};
use log::{debug, info, trace};
use reconcile_model::clients::{Error as ClientError, ManagementClient};
use reconcile_model::{NaturalKey, ProvisioningState, RemoteObject, ResourceId};
use serde::Serialize;
use snafu::{ensure, OptionExt, ResultExt};
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

/// How long each kind of operation may wait for the remote object.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
    pub poll_interval: Duration,
}

impl Timeouts {
    /// The same `timeout` for every operation, with the default poll interval.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            update: timeout,
            delete: timeout,
            poll_interval: DEFAULT_MIN_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(Duration::from_secs(30 * 60))
    }
}

/// What [`Reconciler::apply`] would do to bring the remote object in line with a document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Plan {
    /// There is no remote object yet.
    Create,
    /// The remote object already matches.
    NoOp,
    /// The listed fields will be changed in place.
    Update { fields: Vec<String> },
    /// The listed fields differ and at least one of them cannot be changed in place, so the object
    /// will be deleted and created again.
    Replace { fields: Vec<String> },
}

/// The outcome of [`Reconciler::apply`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Applied<C> {
    pub id: String,
    pub plan: Plan,
    /// The Canonical Document read after the plan was carried out.
    pub configuration: C,
}

/// The `Reconciler` drives the end-to-end lifecycle of one remote object type.
///
/// ## Dependency Injection for Testing
///
/// The `C` type is the management client. In practice it is an
/// [`ArmClient`](reconcile_model::clients::ArmClient); tests inject a
/// [`MemoryClient`](reconcile_model::clients::MemoryClient) to script provisioning states.
pub struct Reconciler<P, C>
where
    P: Provider,
    C: ManagementClient<Object = P::Object>,
{
    provider: P,
    client: C,
    timeouts: Timeouts,
}

impl<P, C> Reconciler<P, C>
where
    P: Provider,
    C: ManagementClient<Object = P::Object>,
{
    pub fn new(provider: P, client: C) -> Self {
        let timeouts = provider.default_timeouts();
        Self {
            provider,
            client,
            timeouts,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Create the remote object described by `desired` and wait for it to finish provisioning.
    /// Returns the new object's id. Fails with a conflict if an object with the same natural key
    /// already exists; it is never adopted.
    pub async fn create(&self, desired: &P::Config) -> Result<String> {
        let kind = self.provider.kind();
        self.validate(desired)?;
        let key = self.provider.natural_key(desired);

        match self.client.get(&key.scope, &key.name).await {
            Ok(existing) => {
                return error::AlreadyExistsSnafu {
                    kind,
                    key,
                    id: existing.id().unwrap_or_default(),
                }
                .fail()
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return Err(e).context(error::RemoteSnafu {
                    kind,
                    key,
                    operation: "check for existing",
                })
            }
        }

        let object = self.provider.expand(desired).context(error::ProviderSnafu {
            kind,
            key: key.clone(),
            operation: "expand",
        })?;
        info!("Creating {} {}", kind, key);
        self.write(&key, &object).await?;
        let id = self.read_back_id(&key).await?;
        info!("Waiting for {} '{}' to finish provisioning", kind, id);

        let change = self
            .provider
            .state_change(Operation::Create)
            .with_timeout(self.timeouts.create)
            .with_min_interval(self.timeouts.poll_interval);
        let state = self.await_terminal_state(&key, &change).await?;
        info!("Created {} '{}' ({})", kind, id, state);
        Ok(id)
    }

    /// Poll the remote object identified by `key` until `change` reaches a terminal state. A
    /// failed state and a timeout are reported as different errors.
    pub async fn await_terminal_state(
        &self,
        key: &NaturalKey,
        change: &StateChange,
    ) -> Result<ProvisioningState> {
        let kind = self.provider.kind();
        let refresh = |remaining: Duration| async move {
            trace!(
                "Polling {} {}, {:?} left before the deadline",
                kind,
                key,
                remaining
            );
            let object = self.client.get(&key.scope, &key.name).await?;
            // An object without a provisioning state has nothing left to do.
            Ok::<_, ClientError>(
                object
                    .provisioning_state()
                    .unwrap_or(ProvisioningState::Succeeded),
            )
        };

        let wait_state = await_terminal_state(change, refresh)
            .await
            .context(error::RemoteSnafu {
                kind,
                key: key.clone(),
                operation: "poll",
            })?;

        match wait_state {
            WaitState::Succeeded(state) => Ok(state),
            WaitState::Failed(state) => error::ProvisioningFailedSnafu {
                kind,
                key: key.clone(),
                state,
                expected: change.expected(),
            }
            .fail(),
            WaitState::TimedOut(last_state) => error::TimeoutSnafu {
                kind,
                key: key.clone(),
                operation: "finish provisioning",
                timeout: change.timeout,
                last_state,
            }
            .fail(),
            // `await_terminal_state` only returns terminal states.
            WaitState::Pending => error::TimeoutSnafu {
                kind,
                key: key.clone(),
                operation: "finish provisioning",
                timeout: change.timeout,
                last_state: Option::<ProvisioningState>::None,
            }
            .fail(),
        }
    }

    /// Read the remote object and return its Canonical Document, or `None` if it no longer
    /// exists. `prior` is the caller's last document and is only used to fill in write-only
    /// fields.
    pub async fn read(&self, id: &str, prior: Option<&P::Config>) -> Result<Option<P::Config>> {
        let kind = self.provider.kind();
        let key = self.parse_id(id)?;
        let object = match self.client.get(&key.scope, &key.name).await {
            Ok(object) => object,
            Err(e) if e.is_not_found() => {
                info!("{} '{}' no longer exists", kind, id);
                return Ok(None);
            }
            Err(e) => {
                return Err(e).context(error::RemoteSnafu {
                    kind,
                    key,
                    operation: "read",
                })
            }
        };
        let configuration = self
            .provider
            .flatten(&key, &object, prior)
            .context(error::ProviderSnafu {
                kind,
                key,
                operation: "flatten",
            })?;
        Ok(Some(configuration))
    }

    /// Change the remote object identified by `id` in place to match `desired`, and wait for it to
    /// finish provisioning.
    pub async fn update(&self, id: &str, desired: &P::Config) -> Result<String> {
        let kind = self.provider.kind();
        ensure!(
            self.provider.supports_update(),
            error::UpdateNotSupportedSnafu { kind }
        );
        self.validate(desired)?;
        let key = self.parse_id(id)?;
        let document_key = self.provider.natural_key(desired);
        ensure!(
            key == document_key,
            error::KeyMismatchSnafu {
                id,
                id_key: key,
                document_key,
            }
        );

        let object = self.provider.expand(desired).context(error::ProviderSnafu {
            kind,
            key: key.clone(),
            operation: "expand",
        })?;
        info!("Updating {} '{}'", kind, id);
        self.write(&key, &object).await?;

        let change = self
            .provider
            .state_change(Operation::Update)
            .with_timeout(self.timeouts.update)
            .with_min_interval(self.timeouts.poll_interval);
        let state = self.await_terminal_state(&key, &change).await?;
        info!("Updated {} '{}' ({})", kind, id, state);
        Ok(id.to_string())
    }

    /// Delete the remote object identified by `id` and wait until it is gone. Deleting an object
    /// that does not exist succeeds.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let kind = self.provider.kind();
        let key = self.parse_id(id)?;
        info!("Deleting {} '{}'", kind, id);
        match self.client.delete(&key.scope, &key.name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                info!("{} '{}' was already deleted", kind, id);
                return Ok(());
            }
            Err(e) => {
                return Err(e).context(error::RemoteSnafu {
                    kind,
                    key,
                    operation: "delete",
                })
            }
        }

        // Each read is bounded by what is left of the deadline, as in `await_terminal_state`.
        let deadline = Instant::now() + self.timeouts.delete;
        let mut last_state = None;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match timeout(remaining, self.client.get(&key.scope, &key.name)).await {
                Err(_) => break,
                Ok(Err(e)) if e.is_not_found() => {
                    info!("Deleted {} '{}'", kind, id);
                    return Ok(());
                }
                Ok(Err(e)) => {
                    return Err(e).context(error::RemoteSnafu {
                        kind,
                        key,
                        operation: "wait for deletion of",
                    })
                }
                Ok(Ok(object)) => {
                    last_state = object.provisioning_state();
                    trace!(
                        "{} '{}' still exists in state '{}'",
                        kind,
                        id,
                        last_state.as_ref().map(|s| s.as_str()).unwrap_or("none")
                    );
                }
            }
            sleep(self.timeouts.poll_interval.min(remaining)).await;
        }
        error::TimeoutSnafu {
            kind,
            key,
            operation: "be deleted",
            timeout: self.timeouts.delete,
            last_state,
        }
        .fail()
    }

    /// Work out what [`apply`](Self::apply) would do. `id` is the caller's id from a previous
    /// apply, if any.
    pub async fn plan(
        &self,
        id: Option<&str>,
        desired: &P::Config,
        prior: Option<&P::Config>,
    ) -> Result<Plan> {
        self.validate(desired)?;
        let id = match id {
            Some(id) => id,
            None => return Ok(Plan::Create),
        };
        let current = match self.read(id, prior).await? {
            Some(current) => current,
            None => return Ok(Plan::Create),
        };

        let diff = self.provider.diff(&current, desired);
        debug!("Diff for {} '{}': {:?}", self.provider.kind(), id, diff);
        Ok(self.plan_for(&diff))
    }

    fn plan_for(&self, diff: &Diff) -> Plan {
        if diff.is_empty() {
            Plan::NoOp
        } else if diff.requires_replacement() || !self.provider.supports_update() {
            Plan::Replace {
                fields: diff.fields(),
            }
        } else {
            Plan::Update {
                fields: diff.update.clone(),
            }
        }
    }

    /// Bring the remote object in line with `desired`: create it, change it in place, replace it,
    /// or leave it alone. Returns the id and the Canonical Document read afterwards.
    pub async fn apply(
        &self,
        id: Option<&str>,
        desired: &P::Config,
        prior: Option<&P::Config>,
    ) -> Result<Applied<P::Config>> {
        let kind = self.provider.kind();
        let plan = self.plan(id, desired, prior).await?;
        info!("Plan for {} {}: {:?}", kind, self.provider.natural_key(desired), plan);
        let id = match (&plan, id) {
            (Plan::NoOp, Some(id)) => id.to_string(),
            (Plan::Update { .. }, Some(id)) => self.update(id, desired).await?,
            (Plan::Replace { .. }, Some(id)) => {
                self.delete(id).await?;
                self.create(desired).await?
            }
            _ => self.create(desired).await?,
        };

        // The desired document carries the write-only fields that were just sent.
        let configuration = self
            .read(&id, Some(desired))
            .await?
            .context(error::VanishedSnafu {
                kind,
                key: self.provider.natural_key(desired),
            })?;
        Ok(Applied {
            id,
            plan,
            configuration,
        })
    }

    fn validate(&self, desired: &P::Config) -> Result<()> {
        self.provider
            .validate(desired)
            .into_result()
            .map_err(|report| Error::Validation {
                kind: self.provider.kind(),
                report,
            })
    }

    fn parse_id(&self, id: &str) -> Result<NaturalKey> {
        let kind = self.provider.kind();
        let resource_id = ResourceId::parse(id).context(error::InvalidIdSnafu { kind })?;
        ensure!(
            resource_id.is_type(<P::Object as RemoteObject>::RESOURCE_TYPE),
            error::WrongTypeSnafu { kind, id }
        );
        Ok(resource_id.natural_key())
    }

    async fn write(&self, key: &NaturalKey, object: &P::Object) -> Result<()> {
        // Secrets stay out of the log.
        let mut shown = object.clone();
        shown.scrub_write_only();
        debug!(
            "Sending {} {}:\n{}",
            self.provider.kind(),
            key,
            serde_json::to_string_pretty(&shown)
                .unwrap_or_else(|e| format!("Serialization failed: {}", e))
        );
        self.client
            .create_or_update(&key.scope, &key.name, object)
            .await
            .context(error::RemoteSnafu {
                kind: self.provider.kind(),
                key: key.clone(),
                operation: "create or update",
            })?;
        Ok(())
    }

    /// Read the object straight after writing it. The id is needed for every later operation, so
    /// an object that cannot be found or carries no id is an internal error rather than a remote
    /// one.
    async fn read_back_id(&self, key: &NaturalKey) -> Result<String> {
        let kind = self.provider.kind();
        let object = match self.client.get(&key.scope, &key.name).await {
            Ok(object) => object,
            Err(e) if e.is_not_found() => {
                return error::VanishedSnafu {
                    kind,
                    key: key.clone(),
                }
                .fail()
            }
            Err(e) => {
                return Err(e).context(error::RemoteSnafu {
                    kind,
                    key: key.clone(),
                    operation: "read back",
                })
            }
        };
        object
            .id()
            .map(str::to_string)
            .context(error::MissingIdSnafu {
                kind,
                key: key.clone(),
            })
    }
}
