use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized - Please sign in.";

/// Failure of a dashboard REST call, as surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiError {
    #[error("Unauthorized - Please sign in.")]
    Unauthorized,
    #[error("{status} : {status_text}")]
    Status { status: u16, status_text: String },
    #[error("network error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(status: u16, status_text: impl Into<String>) -> Self {
        Self::Status {
            status,
            status_text: status_text.into(),
        }
    }

    /// Short label for degraded detail views, e.g. `"Not Found"`.
    pub fn status_text(&self) -> String {
        match self {
            Self::Unauthorized => "Unauthorized".to_string(),
            Self::Status { status_text, .. } => status_text.clone(),
            Self::Transport(message) | Self::Decode(message) => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_renders_status_and_reason() {
        assert_eq!(
            ApiError::status(503, "Service Unavailable").to_string(),
            "503 : Service Unavailable"
        );
    }

    #[test]
    fn unauthorized_matches_operator_message() {
        assert_eq!(ApiError::Unauthorized.to_string(), UNAUTHORIZED_MESSAGE);
    }
}
