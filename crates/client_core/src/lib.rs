use std::{marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{Delivery, Package},
    error::ApiError,
    protocol::{
        CollectionQuery, CreateDeliveryRequest, CreatePackageRequest, PaginatedResult,
        PaginationState,
    },
};
use tracing::{debug, info};
use url::Url;

pub mod error;
pub mod forms;
pub mod location;
pub mod mount_guard;
pub mod pagination;

pub use error::ClientError;
pub use location::{
    run_lookup, CoordinatePicker, FixedGeolocation, GeolocationProvider, LocationUnavailable,
    NoGeolocation,
};
pub use mount_guard::MountGuard;
pub use pagination::{CollectionSource, PaginatedList, PaginationController};

/// Collections exposed by the admin API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Package,
    Delivery,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Package => "api/package",
            Self::Delivery => "api/delivery",
        }
    }
}

/// HTTP collaborator for the package/delivery admin API.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    api_url: Url,
}

impl AdminClient {
    pub fn new(api_url: &str) -> Result<Self, ClientError> {
        let mut api_url = Url::parse(api_url.trim())?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            api_url,
        })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn endpoint(&self, resource: Resource) -> Result<Url, ClientError> {
        Ok(self.api_url.join(resource.path())?)
    }

    pub async fn list_page<T: DeserializeOwned>(
        &self,
        resource: Resource,
        state: PaginationState,
    ) -> Result<PaginatedResult<T>, ClientError> {
        let url = self.endpoint(resource)?;
        debug!(%url, page = state.page, limit = state.limit, "fetching collection page");
        let res = self
            .http
            .get(url)
            .query(&CollectionQuery::from(state))
            .send()
            .await?;
        read_json(res).await
    }

    pub async fn list_packages(
        &self,
        state: PaginationState,
    ) -> Result<PaginatedResult<Package>, ClientError> {
        self.list_page(Resource::Package, state).await
    }

    pub async fn list_deliveries(
        &self,
        state: PaginationState,
    ) -> Result<PaginatedResult<Delivery>, ClientError> {
        self.list_page(Resource::Delivery, state).await
    }

    /// Unpaginated package list, used to populate selects.
    pub async fn all_packages(&self) -> Result<Vec<Package>, ClientError> {
        let res = self.http.get(self.endpoint(Resource::Package)?).send().await?;
        read_json(res).await
    }

    pub async fn create_package(
        &self,
        request: &CreatePackageRequest,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        let created = self.post_json(Resource::Package, request).await?;
        info!(description = %request.description, "package created");
        Ok(created)
    }

    pub async fn create_delivery(
        &self,
        request: &CreateDeliveryRequest,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        let created = self.post_json(Resource::Delivery, request).await?;
        info!(package_id = %request.package_id, "delivery created");
        Ok(created)
    }

    /// Success bodies are optional; anything that is not JSON counts as empty.
    async fn post_json<B: Serialize + ?Sized>(
        &self,
        resource: Resource,
        body: &B,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        let res = self
            .http
            .post(self.endpoint(resource)?)
            .json(body)
            .send()
            .await?;
        let res = check_status(res).await?;
        let text = res.text().await?;
        Ok(serde_json::from_str(&text).ok())
    }
}

async fn check_status(res: Response) -> Result<Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let text = res.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status: status.as_u16(),
        body: ApiError::from_body(&text),
    })
}

async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, ClientError> {
    let res = check_status(res).await?;
    let bytes = res.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// [`CollectionSource`] over one admin API collection.
pub struct RemoteCollection<T> {
    client: Arc<AdminClient>,
    resource: Resource,
    _item: PhantomData<fn() -> T>,
}

impl<T> RemoteCollection<T> {
    pub fn new(client: Arc<AdminClient>, resource: Resource) -> Self {
        Self {
            client,
            resource,
            _item: PhantomData,
        }
    }
}

impl RemoteCollection<Package> {
    pub fn packages(client: Arc<AdminClient>) -> Self {
        Self::new(client, Resource::Package)
    }
}

impl RemoteCollection<Delivery> {
    pub fn deliveries(client: Arc<AdminClient>) -> Self {
        Self::new(client, Resource::Delivery)
    }
}

#[async_trait]
impl<T> CollectionSource<T> for RemoteCollection<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_page(&self, state: PaginationState) -> anyhow::Result<PaginatedResult<T>> {
        Ok(self.client.list_page(self.resource, state).await?)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
