//! Identity-provider seam.
//!
//! A provider reports sign-in activity as [`ProviderEvent`]s on the sender it
//! is handed in [`IdentityProvider::init`]; there is no global callback target.

use std::sync::Mutex;

use async_trait::async_trait;
use shared::domain::Identity;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

pub const DEFAULT_SCOPE: &str = "profile email";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub client_id: String,
    pub scope: String,
}

impl ProviderConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }
}

/// Handle to the provider's notion of the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUser {
    signed_in: bool,
    profile: Option<Identity>,
    auth_token: Option<String>,
}

impl ProviderUser {
    pub fn signed_in(profile: Identity, auth_token: impl Into<String>) -> Self {
        Self {
            signed_in: true,
            profile: Some(profile),
            auth_token: Some(auth_token.into()),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            signed_in: false,
            profile: None,
            auth_token: None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    pub fn profile(&self) -> Option<&Identity> {
        self.profile.as_ref()
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    SignInStateChanged(bool),
    CurrentUserChanged(ProviderUser),
    SignInButtonSucceeded(ProviderUser),
    SignInButtonFailed(String),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("identity provider is unavailable")]
    Unavailable,
    #[error("identity provider initialization failed: {0}")]
    Init(String),
    #[error("{0}")]
    SignOut(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Registers `events` as the callback target. Implementations report the
    /// current user once after setup so an existing session is picked up.
    async fn init(
        &self,
        config: &ProviderConfig,
        events: UnboundedSender<ProviderEvent>,
    ) -> Result<(), ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;
}

pub struct MissingIdentityProvider;

#[async_trait]
impl IdentityProvider for MissingIdentityProvider {
    async fn init(
        &self,
        _config: &ProviderConfig,
        _events: UnboundedSender<ProviderEvent>,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable)
    }
}

/// Provider backed by a pre-issued identity token, for consoles and tests.
pub struct StaticTokenProvider {
    user: Mutex<ProviderUser>,
    events: Mutex<Option<UnboundedSender<ProviderEvent>>>,
}

impl StaticTokenProvider {
    pub fn new(identity: Identity, auth_token: impl Into<String>) -> Self {
        Self::from_user(ProviderUser::signed_in(identity, auth_token))
    }

    pub fn signed_out() -> Self {
        Self::from_user(ProviderUser::signed_out())
    }

    fn from_user(user: ProviderUser) -> Self {
        Self {
            user: Mutex::new(user),
            events: Mutex::new(None),
        }
    }

    fn current_user(&self) -> Result<ProviderUser, ProviderError> {
        self.user
            .lock()
            .map(|user| user.clone())
            .map_err(|_| ProviderError::Init("provider state poisoned".into()))
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn init(
        &self,
        config: &ProviderConfig,
        events: UnboundedSender<ProviderEvent>,
    ) -> Result<(), ProviderError> {
        info!(
            client_id = %config.client_id,
            scope = %config.scope,
            "static identity provider ready"
        );
        let user = self.current_user()?;
        events
            .send(ProviderEvent::CurrentUserChanged(user))
            .map_err(|_| ProviderError::Init("event receiver closed".into()))?;
        let mut registered = self
            .events
            .lock()
            .map_err(|_| ProviderError::Init("provider state poisoned".into()))?;
        *registered = Some(events);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        {
            let mut user = self
                .user
                .lock()
                .map_err(|_| ProviderError::SignOut("provider state poisoned".into()))?;
            *user = ProviderUser::signed_out();
        }
        let registered = self
            .events
            .lock()
            .map_err(|_| ProviderError::SignOut("provider state poisoned".into()))?
            .clone();
        if let Some(events) = registered {
            let _ = events.send(ProviderEvent::SignInStateChanged(false));
        }
        Ok(())
    }
}
