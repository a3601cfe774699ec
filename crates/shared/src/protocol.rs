use serde::{Deserialize, Serialize};

use crate::domain::{UserDetail, UserSummary};

pub const DASHBOARD_API_PREFIX: &str = "/api/v1/dashboard";

/// Body of `GET /users`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersResponse {
    #[serde(default)]
    pub users: Vec<UserSummary>,
}

/// Body of `GET /users/{accountId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailResponse {
    pub user: UserSummary,
    #[serde(default)]
    pub connected_devices: u32,
}

impl From<UserDetailResponse> for UserDetail {
    fn from(value: UserDetailResponse) -> Self {
        Self {
            user: value.user,
            connected_device_count: value.connected_devices,
        }
    }
}
