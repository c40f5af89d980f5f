use crate::clients::error::Result;
use crate::remote::RemoteObject;

/// The management API as seen by a resource binding: get, create-or-update and delete of a single
/// object addressed by its resource group (`scope`) and `name`.
///
/// A missing object is reported as an error for which [`Error::is_not_found`] returns `true`, so
/// that callers can tell it apart from every other failure.
///
/// [`Error::is_not_found`]: crate::clients::Error::is_not_found
#[async_trait::async_trait]
pub trait ManagementClient: Send + Sync {
    type Object: RemoteObject;

    /// The subscription that objects are created in. Part of every resource id.
    fn subscription_id(&self) -> &str;

    async fn get(&self, scope: &str, name: &str) -> Result<Self::Object>;

    async fn create_or_update(
        &self,
        scope: &str,
        name: &str,
        object: &Self::Object,
    ) -> Result<Self::Object>;

    async fn delete(&self, scope: &str, name: &str) -> Result<()>;
}
