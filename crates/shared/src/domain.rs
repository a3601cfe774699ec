use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(AccountId);

/// One row of the user list, in the order the backend returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub account_id: AccountId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Seconds since the unix epoch; negative when the account was never seen.
    #[serde(default = "never_accessed")]
    pub last_access_timestamp_seconds: i64,
}

fn never_accessed() -> i64 {
    -1
}

impl UserSummary {
    pub fn last_access(&self) -> Option<DateTime<Utc>> {
        if self.last_access_timestamp_seconds < 0 {
            return None;
        }
        DateTime::from_timestamp(self.last_access_timestamp_seconds, 0)
    }

    pub fn has_avatar(&self) -> bool {
        self.avatar_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetail {
    pub user: UserSummary,
    pub connected_device_count: u32,
}

impl UserDetail {
    pub fn is_connected(&self) -> bool {
        self.connected_device_count > 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStatus {
    pub total_users: u64,
    pub total_connected_users: u64,
    #[serde(default)]
    pub total_connected_devices: u64,
}

/// Profile of the operator signed in through the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_backend_user_record() {
        let user: UserSummary = serde_json::from_str(
            r#"{"accountId":"u1","email":"a@example.com","avatarUrl":null,"lastAccessTimestampSeconds":1500000000}"#,
        )
        .expect("decode user");

        assert_eq!(user.account_id, AccountId::from("u1"));
        assert!(!user.has_avatar());
        assert_eq!(
            user.last_access().map(|at| at.timestamp()),
            Some(1_500_000_000)
        );
    }

    #[test]
    fn negative_timestamp_means_never_accessed() {
        let user: UserSummary =
            serde_json::from_str(r#"{"accountId":"u2","email":"b@example.com"}"#)
                .expect("decode user");
        assert_eq!(user.last_access_timestamp_seconds, -1);
        assert!(user.last_access().is_none());
    }

    #[test]
    fn status_without_device_total_defaults_to_zero() {
        let status: AggregateStatus =
            serde_json::from_str(r#"{"totalUsers":5,"totalConnectedUsers":2}"#)
                .expect("decode status");
        assert_eq!(
            status,
            AggregateStatus {
                total_users: 5,
                total_connected_users: 2,
                total_connected_devices: 0,
            }
        );
    }
}
