//! HttpCatalogApi - REST transport for the catalog collection.
//!
//! Routes: `GET /products`, `GET /products/search?q=`, `POST /products/add`,
//! `PUT /products/{id}`, `DELETE /products/{id}`. Requests carry the stored
//! token as a bearer credential; a 401 runs the registered unauthorized hook
//! before the error is returned.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{ApiError, CatalogApi};
use crate::model::{DeletedItem, Item, ItemDraft, ItemId, ItemPatch, ListResult};
use crate::query::QueryKey;

type Hook = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub struct HttpCatalogApi {
    client: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
    on_unauthorized: Arc<RwLock<Option<Hook>>>,
}

impl HttpCatalogApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        HttpCatalogApi {
            client: Client::new(),
            base_url,
            token: Arc::new(RwLock::new(None)),
            on_unauthorized: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_token(Some(token.into()));
        self
    }

    pub fn with_unauthorized_hook<F>(self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.set_unauthorized_hook(hook);
        self
    }

    /// Replace the stored credential, e.g. after signing in again.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    pub fn set_unauthorized_hook<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_unauthorized.write() = Some(Arc::new(hook));
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read().as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|err| ApiError::Network(format!("invalid response body: {}", err)));
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status.as_u16(), error_message(&body, status));
        debug!(status = status.as_u16(), error = %err, "request rejected");
        if err.is_unauthorized() {
            warn!("credential rejected by catalog service");
            let hook = self.on_unauthorized.read().clone();
            if let Some(hook) = hook {
                hook();
            }
        }
        Err(err)
    }
}

/// The service's `{"message": ...}` body, or the status text.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.to_string())
}

impl CatalogApi for HttpCatalogApi {
    async fn fetch_list(&self, key: &QueryKey) -> Result<ListResult, ApiError> {
        let path = if key.search().is_some() {
            "/products/search"
        } else {
            "/products"
        };
        let request = self.client.get(self.url(path)).query(&key.params());
        self.send(request).await
    }

    async fn create_item(&self, draft: &ItemDraft) -> Result<Item, ApiError> {
        let request = self.client.post(self.url("/products/add")).json(draft);
        self.send(request).await
    }

    async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item, ApiError> {
        let request = self
            .client
            .put(self.url(&format!("/products/{}", id)))
            .json(patch);
        self.send(request).await
    }

    async fn delete_item(&self, id: ItemId) -> Result<DeletedItem, ApiError> {
        let request = self.client.delete(self.url(&format!("/products/{}", id)));
        self.send(request).await
    }
}
