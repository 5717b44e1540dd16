use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use url::Url;
use tracker_core::{
    Alarm, AlarmId, NewProduct, Order, OrderDetail, OrderId, OrderRow, Page, PageQuery,
    Pagination, Product, ProductId, User, UserId, UserRequest,
};

use crate::domain::{
    AlarmStatusUpdater, FetchError, OrderReader, PageFetcher, ProductRepository, UserRepository,
};

#[derive(Error, Debug)]
pub enum RestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {msg}")]
    Api { status: u16, msg: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Convert infrastructure RestError to domain FetchError
impl From<RestError> for FetchError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Http(e) => FetchError::Network(e.to_string()),
            RestError::Api { status, msg } => FetchError::Api {
                status,
                message: msg,
            },
            RestError::Parse(msg) => FetchError::Parse(msg),
            RestError::InvalidRequest(msg) => FetchError::InvalidRequest(msg),
        }
    }
}

/// REST API client for the order-tracking backend
/// Infrastructure component - handles HTTP communication
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        RestClient {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` on every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================================================
    // Orders
    // ========================================================================

    pub async fn get_orders(&self, query: &PageQuery) -> Result<Page<OrderRow>, RestError> {
        let mut params = page_params(query);
        params.extend(query.filter.iter().map(|f| ("filter", f.clone())));

        let envelope: PageEnvelope<OrderRow> = self.get("/orders", &params).await?;
        Ok(envelope.into_page(query))
    }

    pub async fn get_order(&self, id: &OrderId) -> Result<Order, RestError> {
        let id = require_order(Some(id))?;
        self.get(&format!("/orders/{}", id), &[]).await
    }

    pub async fn get_conciliation_pdf(&self, id: &OrderId) -> Result<Bytes, RestError> {
        let id = require_order(Some(id))?;
        let url = self.url(&format!("/orders/{}/conciliation", id));
        let resp = self
            .authorized(self.client.get(&url))
            .header("Accept", "application/pdf")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(api_error(status.as_u16(), &text));
        }
        Ok(resp.bytes().await?)
    }

    // ========================================================================
    // Order details
    // ========================================================================

    pub async fn get_order_details(&self, query: &PageQuery) -> Result<Page<OrderDetail>, RestError> {
        let id = require_order(query.scope_id())?;
        let mut params = vec![("idOrder", id.to_string())];
        params.extend(page_params(query));

        let envelope: PageEnvelope<OrderDetail> = self.get("/details", &params).await?;
        Ok(envelope.into_page(query))
    }

    /// Complete sample history of an order, for charts
    pub async fn get_all_details(&self, id: &OrderId) -> Result<Vec<OrderDetail>, RestError> {
        let id = require_order(Some(id))?;
        self.get("/details/all", &[("idOrder", id.to_string())]).await
    }

    // ========================================================================
    // Alarms
    // ========================================================================

    pub async fn get_alarms(&self, query: &PageQuery) -> Result<Page<Alarm>, RestError> {
        let id = require_order(query.scope_id())?;
        let mut params = vec![("idOrder", id.to_string())];
        params.extend(page_params(query));

        let envelope: PageEnvelope<Alarm> = self.get("/alarms", &params).await?;
        Ok(envelope.into_page(query))
    }

    pub async fn set_alarm_status(
        &self,
        id: AlarmId,
        new_status: &str,
        observation: &str,
    ) -> Result<Alarm, RestError> {
        if new_status.trim().is_empty() {
            return Err(RestError::InvalidRequest("new alarm status is required".into()));
        }
        let body = AlarmStatusRequest { id, observation };
        let url = self.segment_url("/alarms/status", new_status)?;
        self.put_to(url, &body).await
    }

    // ========================================================================
    // Products and users
    // ========================================================================

    pub async fn list_products(&self) -> Result<Vec<Product>, RestError> {
        self.get("/products", &[]).await
    }

    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, RestError> {
        self.post("/products", product).await
    }

    pub async fn update_product(&self, product: &Product) -> Result<Product, RestError> {
        self.put("/products", product).await
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<(), RestError> {
        self.delete(&format!("/products/{}", id)).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, RestError> {
        self.get("/users", &[]).await
    }

    pub async fn create_user(&self, user: &UserRequest) -> Result<User, RestError> {
        self.post("/users", user).await
    }

    pub async fn update_user(&self, user: &UserRequest) -> Result<User, RestError> {
        if user.id.is_none() {
            return Err(RestError::InvalidRequest("user id is required for updates".into()));
        }
        self.put("/users", user).await
    }

    pub async fn delete_user(&self, id: UserId) -> Result<(), RestError> {
        self.delete(&format!("/users/{}", id)).await
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `path` with `segment` appended as one percent-encoded path segment
    fn segment_url(&self, path: &str, segment: &str) -> Result<String, RestError> {
        let mut url = Url::parse(&self.url(path))
            .map_err(|e| RestError::InvalidRequest(format!("invalid base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| RestError::InvalidRequest("base url cannot take path segments".into()))?
            .push(segment);
        Ok(url.into())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, RestError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let resp = self
            .authorized(self.client.get(&url))
            .query(params)
            .send()
            .await?;

        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RestError> {
        let url = self.url(path);
        let resp = self
            .authorized(self.client.post(&url))
            .json(body)
            .send()
            .await?;

        self.handle_response(resp).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RestError> {
        self.put_to(self.url(path), body).await
    }

    async fn put_to<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: String,
        body: &B,
    ) -> Result<T, RestError> {
        let resp = self
            .authorized(self.client.put(&url))
            .json(body)
            .send()
            .await?;

        self.handle_response(resp).await
    }

    async fn delete(&self, path: &str) -> Result<(), RestError> {
        let url = self.url(path);
        let resp = self.authorized(self.client.delete(&url)).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(api_error(status.as_u16(), &text));
        }
        Ok(())
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, RestError> {
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &text));
        }

        serde_json::from_str(&text).map_err(|e| RestError::Parse(e.to_string()))
    }
}

fn page_params(query: &PageQuery) -> Vec<(&'static str, String)> {
    vec![
        ("page", query.page.to_string()),
        ("size", query.size.to_string()),
        ("sort", query.sort.clone()),
    ]
}

/// Fail before any request when no order is selected
fn require_order(id: Option<&OrderId>) -> Result<&OrderId, RestError> {
    id.filter(|id| !id.is_empty())
        .ok_or_else(|| RestError::InvalidRequest("idOrder is required".into()))
}

fn api_error(status: u16, text: &str) -> RestError {
    let msg = serde_json::from_str::<ApiError>(text)
        .map(|err| err.message)
        .unwrap_or_else(|_| text.to_string());
    RestError::Api { status, msg }
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Serialize)]
struct AlarmStatusRequest<'a> {
    id: AlarmId,
    observation: &'a str,
}

/// Paged response. Orders arrive under `items`, samples under `details` and
/// alarms under `alarms`.
#[derive(Deserialize)]
struct PageEnvelope<T> {
    #[serde(alias = "details", alias = "alarms")]
    items: Vec<T>,
    pagination: WirePagination,
}

impl<T> PageEnvelope<T> {
    fn into_page(self, query: &PageQuery) -> Page<T> {
        let current_page = self
            .pagination
            .current_page
            .or(self.pagination.pageable.map(|p| p.page_number))
            .unwrap_or(query.page);
        Page::new(
            self.items,
            Pagination::new(
                current_page,
                self.pagination.total_elements,
                self.pagination.total_pages,
            ),
        )
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePagination {
    #[serde(default)]
    current_page: Option<u32>,
    #[serde(default)]
    pageable: Option<Pageable>,
    total_elements: u64,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pageable {
    page_number: u32,
}

// ============================================================================
// Domain ports
// ============================================================================

#[async_trait]
impl PageFetcher<OrderRow> for RestClient {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Page<OrderRow>, FetchError> {
        Ok(self.get_orders(query).await?)
    }
}

#[async_trait]
impl PageFetcher<OrderDetail> for RestClient {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Page<OrderDetail>, FetchError> {
        Ok(self.get_order_details(query).await?)
    }
}

#[async_trait]
impl PageFetcher<Alarm> for RestClient {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Page<Alarm>, FetchError> {
        Ok(self.get_alarms(query).await?)
    }
}

#[async_trait]
impl AlarmStatusUpdater for RestClient {
    async fn set_alarm_status(
        &self,
        id: AlarmId,
        new_status: &str,
        observation: &str,
    ) -> Result<Alarm, FetchError> {
        Ok(RestClient::set_alarm_status(self, id, new_status, observation).await?)
    }
}

#[async_trait]
impl OrderReader for RestClient {
    async fn get_order(&self, id: &OrderId) -> Result<Order, FetchError> {
        Ok(RestClient::get_order(self, id).await?)
    }

    async fn get_all_details(&self, id: &OrderId) -> Result<Vec<OrderDetail>, FetchError> {
        Ok(RestClient::get_all_details(self, id).await?)
    }

    async fn get_conciliation_pdf(&self, id: &OrderId) -> Result<Bytes, FetchError> {
        Ok(RestClient::get_conciliation_pdf(self, id).await?)
    }
}

#[async_trait]
impl ProductRepository for RestClient {
    async fn list_products(&self) -> Result<Vec<Product>, FetchError> {
        Ok(RestClient::list_products(self).await?)
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, FetchError> {
        Ok(RestClient::create_product(self, product).await?)
    }

    async fn update_product(&self, product: &Product) -> Result<Product, FetchError> {
        Ok(RestClient::update_product(self, product).await?)
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), FetchError> {
        Ok(RestClient::delete_product(self, id).await?)
    }
}

#[async_trait]
impl UserRepository for RestClient {
    async fn list_users(&self) -> Result<Vec<User>, FetchError> {
        Ok(RestClient::list_users(self).await?)
    }

    async fn create_user(&self, user: &UserRequest) -> Result<User, FetchError> {
        Ok(RestClient::create_user(self, user).await?)
    }

    async fn update_user(&self, user: &UserRequest) -> Result<User, FetchError> {
        Ok(RestClient::update_user(self, user).await?)
    }

    async fn delete_user(&self, id: UserId) -> Result<(), FetchError> {
        Ok(RestClient::delete_user(self, id).await?)
    }
}
