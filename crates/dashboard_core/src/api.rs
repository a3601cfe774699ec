//! REST client for the dashboard backend.

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{AccountId, AggregateStatus, UserDetail, UserSummary},
    error::ApiError,
    protocol::{UserDetailResponse, UsersResponse},
};
use tracing::debug;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:4567/api/v1/dashboard";

#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn list_users(&self, auth_token: &str) -> Result<Vec<UserSummary>, ApiError>;
    async fn user_status(&self, auth_token: &str) -> Result<AggregateStatus, ApiError>;
    async fn user_detail(
        &self,
        auth_token: &str,
        account_id: &AccountId,
    ) -> Result<UserDetail, ApiError>;
}

pub struct MissingDashboardApi;

#[async_trait]
impl DashboardApi for MissingDashboardApi {
    async fn list_users(&self, _auth_token: &str) -> Result<Vec<UserSummary>, ApiError> {
        Err(ApiError::Transport("dashboard api is unavailable".into()))
    }

    async fn user_status(&self, _auth_token: &str) -> Result<AggregateStatus, ApiError> {
        Err(ApiError::Transport("dashboard api is unavailable".into()))
    }

    async fn user_detail(
        &self,
        _auth_token: &str,
        _account_id: &AccountId,
    ) -> Result<UserDetail, ApiError> {
        Err(ApiError::Transport("dashboard api is unavailable".into()))
    }
}

pub struct HttpDashboardApi {
    http: Client,
    base_url: Url,
}

impl HttpDashboardApi {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ApiError::Transport(format!("base url cannot carry a path: {}", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        auth_token: &str,
    ) -> Result<T, ApiError> {
        debug!(%url, "dashboard api request");
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, auth_token)
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        let response = ensure_success(response)?;
        response
            .json::<T>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(ApiError::status(
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status"),
    ))
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn list_users(&self, auth_token: &str) -> Result<Vec<UserSummary>, ApiError> {
        let url = self.endpoint(&["users"])?;
        let body: UsersResponse = self.get_json(url, auth_token).await?;
        Ok(body.users)
    }

    async fn user_status(&self, auth_token: &str) -> Result<AggregateStatus, ApiError> {
        let url = self.endpoint(&["userStatus"])?;
        self.get_json(url, auth_token).await
    }

    async fn user_detail(
        &self,
        auth_token: &str,
        account_id: &AccountId,
    ) -> Result<UserDetail, ApiError> {
        let url = self.endpoint(&["users", account_id.as_str()])?;
        let body: UserDetailResponse = self.get_json(url, auth_token).await?;
        Ok(body.into())
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
