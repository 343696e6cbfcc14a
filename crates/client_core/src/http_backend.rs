use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{OrderId, SortKey},
    error::ApiError,
    protocol::{AckResponse, CreateOrderRequest, ListOrdersQuery, OrderRecord, UpdateOrderRequest},
};
use tracing::debug;
use url::Url;

use crate::{error::BackendError, OrderBackend};

/// `OrderBackend` speaking the order routes over HTTP.
#[derive(Debug, Clone)]
pub struct HttpOrderBackend {
    http: Client,
    base_url: Url,
}

impl HttpOrderBackend {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let http = Client::builder().timeout(timeout).build()?;
        Self::with_client(http, base_url)
    }

    fn with_client(http: Client, base_url: &str) -> Result<Self, BackendError> {
        let mut base_url = Url::parse(base_url).map_err(|err| BackendError::InvalidUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|err| BackendError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                reason: err.to_string(),
            })
    }

    async fn check_status(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiError>(&body) {
            Ok(api_error) => api_error.message,
            Err(_) => body,
        };
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| BackendError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl OrderBackend for HttpOrderBackend {
    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<AckResponse, BackendError> {
        let url = self.endpoint("create_order")?;
        debug!(%url, "creating order");
        let response = self.http.post(url).json(request).send().await?;
        Self::read_json(response).await
    }

    async fn update_order(
        &self,
        order_id: OrderId,
        request: &UpdateOrderRequest,
    ) -> Result<AckResponse, BackendError> {
        let url = self.endpoint(&format!("update_order/{}", order_id.0))?;
        debug!(%url, order_id = order_id.0, "updating order");
        let response = self.http.post(url).json(request).send().await?;
        Self::read_json(response).await
    }

    async fn remove_order(&self, order_id: OrderId) -> Result<AckResponse, BackendError> {
        let url = self.endpoint(&format!("remove_order/{}", order_id.0))?;
        debug!(%url, order_id = order_id.0, "soft removing order");
        let response = self.http.delete(url).send().await?;
        Self::read_json(response).await
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("delete_order/{}", order_id.0))?;
        debug!(%url, order_id = order_id.0, "hard deleting order");
        let response = self.http.delete(url).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// `GET orders?sort_by=` returning JSON records. The order shop's own
    /// server only renders this listing as HTML at `order_management`, so
    /// this route must be added to the backend before `list_orders` works.
    async fn list_orders(&self, sort: SortKey) -> Result<Vec<OrderRecord>, BackendError> {
        let url = self.endpoint("orders")?;
        debug!(%url, sort_by = sort.as_str(), "listing orders");
        let response = self
            .http
            .get(url)
            .query(&ListOrdersQuery { sort_by: sort })
            .send()
            .await?;
        Self::read_json(response).await
    }
}

#[cfg(test)]
#[path = "tests/http_backend_tests.rs"]
mod tests;
