use crate::clients::error::{self, Result};
use crate::clients::ManagementClient;
use crate::constants::{
    DEFAULT_ARM_ENDPOINT, ENV_ARM_ACCESS_TOKEN, ENV_ARM_ENDPOINT, ENV_ARM_SUBSCRIPTION_ID,
};
use crate::remote::RemoteObject;
use http::StatusCode;
use log::{debug, trace};
use reqwest::{RequestBuilder, Response};
use snafu::{ensure, ResultExt};
use std::marker::PhantomData;

/// Settings for talking to the management API over HTTP.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArmClientConfig {
    /// Base URL, e.g. `https://management.azure.com`.
    pub endpoint: String,
    pub subscription_id: String,
    /// A bearer token that has already been acquired by the caller.
    pub access_token: String,
}

impl ArmClientConfig {
    /// Read the settings from `ARM_ENDPOINT` (optional), `ARM_SUBSCRIPTION_ID` and
    /// `ARM_ACCESS_TOKEN`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            endpoint: std::env::var(ENV_ARM_ENDPOINT)
                .unwrap_or_else(|_| DEFAULT_ARM_ENDPOINT.to_string()),
            subscription_id: std::env::var(ENV_ARM_SUBSCRIPTION_ID).context(
                error::EnvReadSnafu {
                    key: ENV_ARM_SUBSCRIPTION_ID,
                },
            )?,
            access_token: std::env::var(ENV_ARM_ACCESS_TOKEN).context(error::EnvReadSnafu {
                key: ENV_ARM_ACCESS_TOKEN,
            })?,
        })
    }
}

/// A [`ManagementClient`] that speaks the management REST API.
///
/// # Example
///
/// ```no_run
///# use reconcile_model::clients::{ArmClient, ArmClientConfig, ManagementClient};
///# use reconcile_model::remote::container_group::ContainerGroup;
///# async fn no_run() {
/// let client = ArmClient::<ContainerGroup>::new(ArmClientConfig::from_env().unwrap()).unwrap();
/// let group = client.get("my-resource-group", "my-group").await.unwrap();
///# }
/// ```
pub struct ArmClient<T> {
    http: reqwest::Client,
    config: ArmClientConfig,
    _object: PhantomData<fn() -> T>,
}

impl<T> ArmClient<T>
where
    T: RemoteObject,
{
    pub fn new(config: ArmClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context(error::InitializationSnafu)?;
        Ok(Self {
            http,
            config,
            _object: PhantomData,
        })
    }

    fn url(&self, scope: &str, name: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/{}/{}?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.subscription_id,
            scope,
            T::RESOURCE_TYPE,
            name,
            T::API_VERSION
        )
    }

    fn what(scope: &str, name: &str) -> String {
        format!("{} '{}' (resource group '{}')", T::RESOURCE_TYPE, name, scope)
    }

    /// Send the request and turn any non-success status into an error. A `404` becomes the
    /// not-found error.
    async fn send(&self, method: &str, what: &str, request: RequestBuilder) -> Result<Response> {
        trace!("{} {}", method, what);
        let response = request
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .context(error::ApiCallSnafu { method, what })?;
        let status = response.status();
        ensure!(
            status != StatusCode::NOT_FOUND,
            error::NotFoundSnafu { what }
        );
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return error::ApiStatusSnafu {
                method,
                what,
                status,
                body,
            }
            .fail()
            .map_err(Into::into);
        }
        Ok(response)
    }

    async fn parse(what: &str, response: Response) -> Result<T> {
        let bytes = response
            .bytes()
            .await
            .context(error::ApiCallSnafu {
                method: "read response for",
                what,
            })?;
        Ok(serde_json::from_slice(&bytes).context(error::SerdeSnafu { what })?)
    }
}

#[async_trait::async_trait]
impl<T> ManagementClient for ArmClient<T>
where
    T: RemoteObject,
{
    type Object = T;

    fn subscription_id(&self) -> &str {
        &self.config.subscription_id
    }

    async fn get(&self, scope: &str, name: &str) -> Result<T> {
        let what = Self::what(scope, name);
        let response = self
            .send("get", &what, self.http.get(self.url(scope, name)))
            .await?;
        Self::parse(&what, response).await
    }

    async fn create_or_update(&self, scope: &str, name: &str, object: &T) -> Result<T> {
        let what = Self::what(scope, name);
        let mut shown = object.clone();
        shown.scrub_write_only();
        debug!(
            "PUT {}:\n{}",
            what,
            serde_json::to_string_pretty(&shown)
                .unwrap_or_else(|e| format!("Serialization failed: {}", e))
        );
        let response = self
            .send(
                "create or update",
                &what,
                self.http.put(self.url(scope, name)).json(object),
            )
            .await?;
        Self::parse(&what, response).await
    }

    async fn delete(&self, scope: &str, name: &str) -> Result<()> {
        let what = Self::what(scope, name);
        let response = self
            .send("delete", &what, self.http.delete(self.url(scope, name)))
            .await?;
        // `204 No Content` means there was nothing to delete.
        if response.status() == StatusCode::NO_CONTENT {
            return error::NotFoundSnafu { what }.fail().map_err(Into::into);
        }
        Ok(())
    }
}
