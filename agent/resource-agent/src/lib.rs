/*!

The `resource-agent` library reconciles a declarative document with a remote object held by a
cloud management API. You describe one object type by implementing the [`Provider`] trait, then
hand it to a [`Reconciler`] along with a
[`ManagementClient`](reconcile_model::clients::ManagementClient).

Data flows Desired Document → expand → create or update → wait for a terminal provisioning state
→ read → flatten → Canonical Document.

!*/

pub mod error;
pub mod provider;
mod reconciler;
pub mod wait;

pub use error::{Error, ErrorKind, Result};
pub use provider::{Diff, Operation, Provider};
pub use reconciler::{Applied, Plan, Reconciler, Timeouts};
pub use reconcile_model::{Configuration, NaturalKey, ProvisioningState};
