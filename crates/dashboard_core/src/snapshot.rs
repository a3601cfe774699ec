//! Read-only views of controller state handed to the rendering layer.

use shared::domain::{AccountId, AggregateStatus, Identity, UserDetail, UserSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    SignedOut,
    SignedIn,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub status: SessionStatus,
    pub auth_token: Option<String>,
    pub identity: Option<Identity>,
}

impl Session {
    pub fn is_signed_in(&self) -> bool {
        self.status == SessionStatus::SignedIn
    }
}

/// Latest known aggregate status. `Unavailable` renders as "N/A".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusReading {
    #[default]
    Pending,
    Loaded(AggregateStatus),
    Unavailable,
}

/// State of the open user detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailView {
    /// The list row the view was opened from.
    pub summary: UserSummary,
    /// `None` until the first successful poll.
    pub detail: Option<UserDetail>,
    pub connected_device_count: u32,
    pub poll_error: Option<String>,
}

impl DetailView {
    pub fn new(summary: UserSummary) -> Self {
        Self {
            summary,
            detail: None,
            connected_device_count: 0,
            poll_error: None,
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.summary.account_id
    }

    pub fn is_loading(&self) -> bool {
        self.detail.is_none()
    }

    pub fn is_connected(&self) -> bool {
        self.connected_device_count > 0
    }

    /// Freshest user record: the polled one when available.
    pub fn user(&self) -> &UserSummary {
        self.detail
            .as_ref()
            .map(|detail| &detail.user)
            .unwrap_or(&self.summary)
    }
}

/// The single dialog the rendering layer should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    None,
    Error(String),
    SignOutConfirm,
    UserDetail(DetailView),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub session: Session,
    pub users: Vec<UserSummary>,
    pub status: StatusReading,
    /// True while a list or status load issued by a refresh is outstanding.
    pub loading: bool,
    pub selected_user_id: Option<AccountId>,
    pub detail: Option<DetailView>,
    pub error_message: Option<String>,
    pub sign_out_dialog_visible: bool,
    /// Debounced signed-in marker; lags `session` by the debounce window.
    pub signed_in_marker: bool,
}

impl DashboardSnapshot {
    /// Errors take precedence over the sign-out prompt, which takes
    /// precedence over the detail view.
    pub fn dialog(&self) -> Dialog {
        if let Some(message) = &self.error_message {
            return Dialog::Error(message.clone());
        }
        if self.sign_out_dialog_visible {
            return Dialog::SignOutConfirm;
        }
        match &self.detail {
            Some(detail) => Dialog::UserDetail(detail.clone()),
            None => Dialog::None,
        }
    }
}
