pub(crate) mod mock;

use mock::{pool, PoolProvider};
use reconcile_model::clients::{ManagementClient, MemoryClient, Result as ClientResult};
use reconcile_model::remote::container_service::ContainerService;
use reconcile_model::NaturalKey;
use reconcile_model::ProvisioningState::{Creating, Deleting, Failed, Succeeded};
use resource_agent::provider::Resources;
use resource_agent::{ErrorKind, Plan, Reconciler, Timeouts};
use std::time::Duration;
use tokio::time::Instant;

const POLL: Duration = Duration::from_secs(15);

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn reconciler(
    client: MemoryClient<ContainerService>,
) -> Reconciler<PoolProvider, MemoryClient<ContainerService>> {
    init_logger();
    Reconciler::new(PoolProvider, client)
        .with_timeouts(Timeouts::uniform(Duration::from_secs(60)).with_poll_interval(POLL))
}

const MISSING_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/\
    providers/Microsoft.ContainerService/containerServices/missing";

/// The remote object reports `Creating` three times before `Succeeded`, and the Canonical
/// Document read afterwards carries the server-assigned fqdn.
#[tokio::test(start_paused = true)]
async fn create_waits_for_success_then_reads_back() {
    let r = reconciler(
        MemoryClient::new().with_states(vec![Creating, Creating, Creating, Succeeded]),
    );
    let start = Instant::now();
    let id = r.create(&pool("a", 1, "x")).await.unwrap();
    assert!(
        id.ends_with("/resourceGroups/rg/providers/Microsoft.ContainerService/containerServices/a")
    );
    // Read-back sees the first `Creating`, the polls see `Creating`, `Creating`, `Succeeded`.
    assert_eq!(r.client().get_count().await, 1 + 1 + 3);
    assert_eq!(start.elapsed(), POLL * 2);

    let canonical = r.read(&id, None).await.unwrap().unwrap();
    assert_eq!(canonical.count, 1);
    assert_eq!(canonical.dns_prefix, "x");
    assert_eq!(
        canonical.fqdn.as_deref(),
        Some("xmgmt.westeurope.cloudapp.azure.com")
    );
}

#[tokio::test(start_paused = true)]
async fn failed_state_is_not_a_timeout() {
    let r = reconciler(MemoryClient::new().with_states(vec![Creating, Failed]));
    let start = Instant::now();
    let err = r.create(&pool("a", 1, "x")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TerminalFailure);
    assert!(matches!(err.resources(), Resources::Remaining));
    assert!(err.to_string().contains("'Failed'"), "{}", err);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn stuck_creating_times_out() {
    let r = reconciler(MemoryClient::new().with_states(vec![Creating]));
    let start = Instant::now();
    let err = r.create(&pool("a", 1, "x")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.to_string().contains("last observed state: Creating"), "{}", err);
    assert_eq!(start.elapsed(), Duration::from_secs(60));
}

#[tokio::test]
async fn invalid_document_never_reaches_the_api() {
    let r = reconciler(MemoryClient::new());
    let err = r.create(&pool("a", 0, "")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(matches!(err.resources(), Resources::Clear));
    assert!(err.to_string().contains("dns_prefix: must not be empty"));
    assert_eq!(r.client().get_count().await, 0);
}

#[tokio::test]
async fn existing_object_is_a_conflict() {
    let r = reconciler(MemoryClient::new());
    let existing = r
        .client()
        .insert(NaturalKey::new("rg", "a"), ContainerService::default())
        .await;
    let err = r.create(&pool("a", 1, "x")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains(&existing));
    // The existing object was not overwritten.
    assert_eq!(
        r.client().peek("rg", "a").await.unwrap(),
        ContainerService {
            id: Some(existing),
            ..Default::default()
        }
    );
}

#[tokio::test]
async fn rejected_write_is_a_remote_error() {
    let r = reconciler(MemoryClient::new().rejecting_writes("quota exceeded"));
    let err = r.create(&pool("a", 1, "x")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert!(matches!(err.resources(), Resources::Unknown));
    assert!(err.to_string().contains("quota exceeded"));
    assert!(err.to_string().contains("'a' (resource group 'rg')"));
}

#[tokio::test]
async fn expand_failure_leaves_nothing_behind() {
    let r = reconciler(MemoryClient::new());
    let err = r.create(&pool("a", 1, "has space")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(matches!(err.resources(), Resources::Clear));
    assert!(r.client().peek("rg", "a").await.is_none());
}

/// Accepts every write but never lets the written object be read.
struct WriteOnlyClient {
    writes: MemoryClient<ContainerService>,
    reads: MemoryClient<ContainerService>,
}

#[async_trait::async_trait]
impl ManagementClient for WriteOnlyClient {
    type Object = ContainerService;

    fn subscription_id(&self) -> &str {
        self.writes.subscription_id()
    }

    async fn get(&self, scope: &str, name: &str) -> ClientResult<ContainerService> {
        self.reads.get(scope, name).await
    }

    async fn create_or_update(
        &self,
        scope: &str,
        name: &str,
        object: &ContainerService,
    ) -> ClientResult<ContainerService> {
        self.writes.create_or_update(scope, name, object).await
    }

    async fn delete(&self, scope: &str, name: &str) -> ClientResult<()> {
        self.writes.delete(scope, name).await
    }
}

#[tokio::test]
async fn object_missing_after_create_is_internal() {
    init_logger();
    let r = Reconciler::new(
        PoolProvider,
        WriteOnlyClient {
            writes: MemoryClient::new(),
            reads: MemoryClient::new(),
        },
    );
    let err = r.create(&pool("a", 1, "x")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(matches!(err.resources(), Resources::Unknown));
    assert!(err.to_string().contains("could not be read back"), "{}", err);
    assert!(r.client().writes.peek("rg", "a").await.is_some());
}

/// Accepts deletes without removing anything.
struct IgnoresDeletes(MemoryClient<ContainerService>);

#[async_trait::async_trait]
impl ManagementClient for IgnoresDeletes {
    type Object = ContainerService;

    fn subscription_id(&self) -> &str {
        self.0.subscription_id()
    }

    async fn get(&self, scope: &str, name: &str) -> ClientResult<ContainerService> {
        self.0.get(scope, name).await
    }

    async fn create_or_update(
        &self,
        scope: &str,
        name: &str,
        object: &ContainerService,
    ) -> ClientResult<ContainerService> {
        self.0.create_or_update(scope, name, object).await
    }

    async fn delete(&self, _scope: &str, _name: &str) -> ClientResult<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn delete_times_out_while_the_object_lingers() {
    init_logger();
    let client = IgnoresDeletes(MemoryClient::new().with_states(vec![Deleting]));
    let id = client
        .0
        .insert(NaturalKey::new("rg", "a"), ContainerService::default())
        .await;
    let r = Reconciler::new(PoolProvider, client)
        .with_timeouts(Timeouts::uniform(Duration::from_secs(60)).with_poll_interval(POLL));

    let start = Instant::now();
    let err = r.delete(&id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(matches!(err.resources(), Resources::Remaining));
    assert!(err.to_string().contains("to be deleted"), "{}", err);
    assert!(err.to_string().contains("last observed state: Deleting"), "{}", err);
    assert_eq!(start.elapsed(), Duration::from_secs(60));
    // Polled at 0, 15, 30 and 45 seconds.
    assert_eq!(r.client().0.get_count().await, 4);
}

#[tokio::test]
async fn read_missing_object_is_absent() {
    let r = reconciler(MemoryClient::new());
    assert_eq!(r.read(MISSING_ID, None).await.unwrap(), None);
}

#[tokio::test]
async fn malformed_ids_are_validation_errors() {
    let r = reconciler(MemoryClient::new());
    let err = r.read("not-an-id", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let wrong_type = MISSING_ID.replace(
        "Microsoft.ContainerService/containerServices",
        "Microsoft.ContainerInstance/containerGroups",
    );
    let err = r.delete(&wrong_type).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let r = reconciler(MemoryClient::new());
    let id = r.create(&pool("a", 1, "x")).await.unwrap();
    r.delete(&id).await.unwrap();
    r.delete(&id).await.unwrap();
    assert_eq!(r.read(&id, None).await.unwrap(), None);
}

#[tokio::test]
async fn update_refuses_a_different_object() {
    let r = reconciler(MemoryClient::new());
    let id = r.create(&pool("a", 1, "x")).await.unwrap();
    let err = r.update(&id, &pool("b", 1, "x")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn plan_detects_drift() {
    let r = reconciler(MemoryClient::new());
    let desired = pool("a", 1, "x");
    assert_eq!(r.plan(None, &desired, None).await.unwrap(), Plan::Create);

    let id = r.create(&desired).await.unwrap();
    assert_eq!(
        r.plan(Some(id.as_str()), &desired, None).await.unwrap(),
        Plan::NoOp
    );
    assert_eq!(
        r.plan(Some(id.as_str()), &pool("a", 3, "x"), None).await.unwrap(),
        Plan::Update {
            fields: vec!["count".to_string()]
        }
    );
    assert_eq!(
        r.plan(Some(id.as_str()), &pool("a", 3, "y"), None).await.unwrap(),
        Plan::Replace {
            fields: vec!["dns_prefix".to_string(), "count".to_string()]
        }
    );

    r.delete(&id).await.unwrap();
    assert_eq!(
        r.plan(Some(id.as_str()), &desired, None).await.unwrap(),
        Plan::Create
    );
}

#[tokio::test]
async fn apply_updates_in_place_and_replaces() {
    let r = reconciler(MemoryClient::new());
    let created = r.apply(None, &pool("a", 1, "x"), None).await.unwrap();
    assert_eq!(created.plan, Plan::Create);
    assert_eq!(
        created.configuration.fqdn.as_deref(),
        Some("xmgmt.westeurope.cloudapp.azure.com")
    );

    let unchanged = r
        .apply(Some(created.id.as_str()), &pool("a", 1, "x"), Some(&created.configuration))
        .await
        .unwrap();
    assert_eq!(unchanged.plan, Plan::NoOp);

    let updated = r
        .apply(Some(created.id.as_str()), &pool("a", 3, "x"), Some(&created.configuration))
        .await
        .unwrap();
    assert!(matches!(updated.plan, Plan::Update { .. }));
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.configuration.count, 3);

    let replaced = r
        .apply(Some(updated.id.as_str()), &pool("a", 3, "y"), Some(&updated.configuration))
        .await
        .unwrap();
    assert!(matches!(replaced.plan, Plan::Replace { .. }));
    assert_eq!(
        replaced.configuration.fqdn.as_deref(),
        Some("ymgmt.westeurope.cloudapp.azure.com")
    );
}
