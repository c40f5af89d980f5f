use crate::clients::error::{self, Result};
use crate::clients::ManagementClient;
use crate::constants::SIMULATED_SUBSCRIPTION_ID;
use crate::remote::RemoteObject;
use crate::{NaturalKey, ProvisioningState, ResourceId};
use log::trace;
use snafu::ensure;
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::Mutex;

/// An in-memory management plane. It stores objects by natural key, assigns ids and computed
/// fields on write, drops write-only fields the way the real API does, and reports provisioning
/// states from a script.
///
/// Each `get` of an existing object takes the next state from the script and stores it on the
/// object. The last scripted state repeats. With an empty script every write immediately succeeds.
///
/// # Example
///
/// ```
///# use reconcile_model::clients::{ManagementClient, MemoryClient};
///# use reconcile_model::remote::container_service::ContainerService;
///# use reconcile_model::ProvisioningState;
///# #[tokio::main(flavor = "current_thread")]
///# async fn main() {
/// let client = MemoryClient::<ContainerService>::new()
///     .with_states(vec![ProvisioningState::Creating, ProvisioningState::Succeeded]);
/// client.create_or_update("rg", "acs", &ContainerService::default()).await.unwrap();
/// let first = client.get("rg", "acs").await.unwrap();
/// assert_eq!(first.properties.unwrap().provisioning_state, Some(ProvisioningState::Creating));
///# }
/// ```
pub struct MemoryClient<T> {
    subscription_id: String,
    inner: Mutex<MemoryState<T>>,
}

struct MemoryState<T> {
    objects: BTreeMap<NaturalKey, T>,
    script: VecDeque<ProvisioningState>,
    reject_writes: Option<String>,
    gets: usize,
}

impl<T> Default for MemoryClient<T>
where
    T: RemoteObject,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemoryClient<T>
where
    T: RemoteObject,
{
    pub fn new() -> Self {
        Self {
            subscription_id: SIMULATED_SUBSCRIPTION_ID.to_string(),
            inner: Mutex::new(MemoryState {
                objects: BTreeMap::new(),
                script: VecDeque::new(),
                reject_writes: None,
                gets: 0,
            }),
        }
    }

    /// Script the provisioning states reported by successive `get` calls.
    pub fn with_states<I>(self, states: I) -> Self
    where
        I: IntoIterator<Item = ProvisioningState>,
    {
        let mut inner = self.inner.into_inner();
        inner.script = states.into_iter().collect();
        Self {
            subscription_id: self.subscription_id,
            inner: Mutex::new(inner),
        }
    }

    /// Make every `create_or_update` fail with `message`.
    pub fn rejecting_writes<S>(self, message: S) -> Self
    where
        S: Into<String>,
    {
        let mut inner = self.inner.into_inner();
        inner.reject_writes = Some(message.into());
        Self {
            subscription_id: self.subscription_id,
            inner: Mutex::new(inner),
        }
    }

    /// Place an object in the store as if someone else had created it.
    pub async fn insert(&self, key: NaturalKey, mut object: T) -> String {
        let id = self.id_for(&key);
        object.set_id(id.clone());
        self.inner.lock().await.objects.insert(key, object);
        id
    }

    /// The stored object, without advancing the state script.
    pub async fn peek(&self, scope: &str, name: &str) -> Option<T> {
        self.inner
            .lock()
            .await
            .objects
            .get(&NaturalKey::new(scope, name))
            .cloned()
    }

    /// How many times `get` has been called.
    pub async fn get_count(&self) -> usize {
        self.inner.lock().await.gets
    }

    fn id_for(&self, key: &NaturalKey) -> String {
        ResourceId::new(&self.subscription_id, T::RESOURCE_TYPE, key).to_string()
    }

    fn what(key: &NaturalKey) -> String {
        format!("{} {}", T::RESOURCE_TYPE, key)
    }
}

#[async_trait::async_trait]
impl<T> ManagementClient for MemoryClient<T>
where
    T: RemoteObject,
{
    type Object = T;

    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn get(&self, scope: &str, name: &str) -> Result<T> {
        let key = NaturalKey::new(scope, name);
        let mut inner = self.inner.lock().await;
        inner.gets += 1;
        ensure!(
            inner.objects.contains_key(&key),
            error::NotFoundSnafu {
                what: Self::what(&key)
            }
        );
        let next_state = if inner.script.len() > 1 {
            inner.script.pop_front()
        } else {
            inner.script.front().cloned()
        };
        let object = inner
            .objects
            .get_mut(&key)
            .ok_or_else(|| error::NotFoundSnafu { what: Self::what(&key) }.build())?;
        if let Some(state) = next_state {
            trace!("{} reports state '{}'", Self::what(&key), state);
            object.set_provisioning_state(state);
        }
        Ok(object.clone())
    }

    async fn create_or_update(&self, scope: &str, name: &str, object: &T) -> Result<T> {
        let key = NaturalKey::new(scope, name);
        let id = self.id_for(&key);
        let mut inner = self.inner.lock().await;
        if let Some(message) = &inner.reject_writes {
            return error::RejectedSnafu {
                method: "create or update",
                what: Self::what(&key),
                message,
            }
            .fail()
            .map_err(Into::into);
        }

        let exists = inner.objects.contains_key(&key);
        let mut stored = object.clone();
        stored.set_id(id);
        stored.populate_computed(&key);
        stored.scrub_write_only();
        stored.set_provisioning_state(match (inner.script.is_empty(), exists) {
            (true, _) => ProvisioningState::Succeeded,
            (false, false) => ProvisioningState::Creating,
            (false, true) => ProvisioningState::Updating,
        });
        inner.objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, scope: &str, name: &str) -> Result<()> {
        let key = NaturalKey::new(scope, name);
        match self.inner.lock().await.objects.remove(&key) {
            Some(_) => Ok(()),
            None => error::NotFoundSnafu {
                what: Self::what(&key),
            }
            .fail()
            .map_err(Into::into),
        }
    }
}
