//! HTTP client for the LabTrac backend
//!
//! Every request except `/login` carries `Authorization: Bearer <token>`,
//! with the token read from the shared session store at send time.

use common::{StoreHandle, keys};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::models::{
    CurrentUser, DefaultPrinter, LabelPayload, LoginRequest, LoginResponse, PrintItemRequest,
    UpdateDefaultPrinter,
};

/// Endpoints called without a bearer token
const UNAUTHENTICATED_PATHS: [&str; 1] = ["/login"];

/// REST client shared by the session and print services
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: StoreHandle,
}

impl ApiClient {
    /// Create a client for the given base URL (e.g. "https://host/api")
    pub fn new(base_url: impl Into<String>, store: StoreHandle) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url, store)
    }

    pub fn with_http_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        store: StoreHandle,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            store,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method, url);

        if !UNAUTHENTICATED_PATHS.contains(&path) {
            match self.store.get(keys::TOKEN).await? {
                Some(token) => builder = builder.bearer_auth(token),
                None => debug!("No session token stored, calling {} anonymously", path),
            }
        }

        Ok(builder)
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> ApiResult<Response> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        warn!("Request to {} failed with status {}", path, status);
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized { status });
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status { status, body })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let builder = self.request(Method::GET, path).await?;
        let response = self.send(builder, path).await?;
        Ok(response.json().await?)
    }

    /// Exchange credentials for a bearer token
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let path = "/login";
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let builder = self.request(Method::POST, path).await?.json(&body);
        let response = self.send(builder, path).await?;
        Ok(response.json().await?)
    }

    /// Fetch the user the stored token belongs to
    pub async fn current_user(&self) -> ApiResult<CurrentUser> {
        self.get_json("/system/user/current-user").await
    }

    /// Fetch the configured default printer
    pub async fn default_printer(&self) -> ApiResult<DefaultPrinter> {
        self.get_json("/system/print/default-printer").await
    }

    /// Save a new default printer
    pub async fn set_default_printer(&self, uid: &str) -> ApiResult<()> {
        let path = "/system/print/default-printer";
        let body = UpdateDefaultPrinter {
            default_printer_uid: uid.to_string(),
        };
        let builder = self.request(Method::PATCH, path).await?.json(&body);
        self.send(builder, path).await?;
        Ok(())
    }

    /// Ask the backend to render a label for an inventory item
    pub async fn print_item(&self, request: &PrintItemRequest) -> ApiResult<LabelPayload> {
        let path = "/system/print/item";
        let builder = self.request(Method::POST, path).await?.json(request);
        let response = self.send(builder, path).await?;
        Ok(response.json().await?)
    }
}
