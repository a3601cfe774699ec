//! Session/refresh controller: the single owner of dashboard state.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use shared::{
    domain::{AccountId, AggregateStatus, Identity, UserDetail, UserSummary},
    error::ApiError,
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    api::DashboardApi,
    debounce::Debouncer,
    poll::{spawn_poll_loop, PollHandle},
    provider::{IdentityProvider, ProviderConfig, ProviderError, ProviderEvent},
    snapshot::{DashboardSnapshot, DetailView, Session, SessionStatus, StatusReading},
};

pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Completion of the list and status loads started by a refresh.
pub type LoadHandle = JoinHandle<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub debounce_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            debounce_delay: DEFAULT_DEBOUNCE_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DashboardEvent {
    StateChanged(DashboardSnapshot),
    SignedInMarkerChanged(bool),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("no user with account id {0} in the current list")]
    UnknownUser(AccountId),
    #[error("no identity provider attached")]
    NoProvider,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

struct ActiveDetail {
    poll_id: u64,
    applied_seq: u64,
    view: DetailView,
    poll: PollHandle,
}

#[derive(Default)]
struct DashboardState {
    session: Session,
    /// Bumped on every sign-in/out; loads issued under an older epoch are dropped.
    session_epoch: u64,
    users: Vec<UserSummary>,
    status: StatusReading,
    loads_in_flight: u32,
    detail: Option<ActiveDetail>,
    next_poll_id: u64,
    error_message: Option<String>,
    sign_out_dialog_visible: bool,
}

impl DashboardState {
    fn close_detail(&mut self) -> bool {
        match self.detail.take() {
            Some(active) => {
                active.poll.stop();
                true
            }
            None => false,
        }
    }

    fn active_detail(&mut self, poll_id: u64) -> Option<&mut ActiveDetail> {
        self.detail
            .as_mut()
            .filter(|active| active.poll_id == poll_id)
    }
}

pub struct DashboardController {
    api: Arc<dyn DashboardApi>,
    settings: ControllerSettings,
    inner: Mutex<DashboardState>,
    provider: Mutex<Option<Arc<dyn IdentityProvider>>>,
    provider_task: Mutex<Option<JoinHandle<()>>>,
    signed_in_marker: Arc<AtomicBool>,
    marker_debouncer: Debouncer<bool>,
    events: broadcast::Sender<DashboardEvent>,
}

impl DashboardController {
    pub fn new(api: Arc<dyn DashboardApi>, settings: ControllerSettings) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let signed_in_marker = Arc::new(AtomicBool::new(false));

        let marker = Arc::clone(&signed_in_marker);
        let marker_events = events.clone();
        let marker_debouncer = Debouncer::new(settings.debounce_delay, move |signed_in: bool| {
            marker.store(signed_in, Ordering::SeqCst);
            debug!(signed_in, "signed-in marker applied");
            let _ = marker_events.send(DashboardEvent::SignedInMarkerChanged(signed_in));
        });

        Arc::new(Self {
            api,
            settings,
            inner: Mutex::new(DashboardState::default()),
            provider: Mutex::new(None),
            provider_task: Mutex::new(None),
            signed_in_marker,
            marker_debouncer,
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let state = self.inner.lock().await;
        self.build_snapshot(&state)
    }

    fn build_snapshot(&self, state: &DashboardState) -> DashboardSnapshot {
        DashboardSnapshot {
            session: state.session.clone(),
            users: state.users.clone(),
            status: state.status,
            loading: state.loads_in_flight > 0,
            selected_user_id: state
                .detail
                .as_ref()
                .map(|active| active.view.account_id().clone()),
            detail: state.detail.as_ref().map(|active| active.view.clone()),
            error_message: state.error_message.clone(),
            sign_out_dialog_visible: state.sign_out_dialog_visible,
            signed_in_marker: self.signed_in_marker.load(Ordering::SeqCst),
        }
    }

    fn publish(&self, state: &DashboardState) {
        let _ = self
            .events
            .send(DashboardEvent::StateChanged(self.build_snapshot(state)));
    }

    /// Registers `provider` as the session source and starts dispatching its
    /// events. Replaces any previously attached provider.
    pub async fn attach_provider(
        self: &Arc<Self>,
        provider: Arc<dyn IdentityProvider>,
        config: ProviderConfig,
    ) -> Result<(), ControllerError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let controller = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                controller.handle_provider_event(event).await;
            }
        });

        if let Some(previous) = self.provider_task.lock().await.replace(task) {
            previous.abort();
        }
        *self.provider.lock().await = Some(Arc::clone(&provider));

        if let Err(err) = provider.init(&config, tx).await {
            error!(client_id = %config.client_id, error = %err, "identity provider init failed");
            if let Some(task) = self.provider_task.lock().await.take() {
                task.abort();
            }
            *self.provider.lock().await = None;
            return Err(err.into());
        }

        info!(client_id = %config.client_id, "identity provider attached");
        Ok(())
    }

    async fn handle_provider_event(self: &Arc<Self>, event: ProviderEvent) {
        match event {
            ProviderEvent::SignInStateChanged(false) => {
                self.on_provider_sign_out().await;
            }
            ProviderEvent::SignInStateChanged(true) => {
                debug!("provider reports signed in; waiting for current user");
            }
            ProviderEvent::CurrentUserChanged(user) => {
                match (user.is_signed_in(), user.profile(), user.auth_token()) {
                    (true, Some(identity), Some(token)) => {
                        self.on_provider_sign_in(identity.clone(), token.to_string())
                            .await;
                    }
                    _ => {
                        self.on_provider_sign_out().await;
                    }
                }
            }
            ProviderEvent::SignInButtonSucceeded(user) => {
                let display_name = user
                    .profile()
                    .map(|identity| identity.display_name.as_str())
                    .unwrap_or_default();
                info!(display_name, "sign-in button succeeded");
            }
            ProviderEvent::SignInButtonFailed(reason) => {
                error!(%reason, "sign-in button failed");
            }
        }
    }

    pub async fn on_provider_sign_in(
        self: &Arc<Self>,
        identity: Identity,
        auth_token: String,
    ) -> Option<LoadHandle> {
        info!(
            id = %identity.id,
            display_name = %identity.display_name,
            email = %identity.email,
            "operator signed in"
        );
        {
            let mut state = self.inner.lock().await;
            state.session = Session {
                status: SessionStatus::SignedIn,
                auth_token: Some(auth_token),
                identity: Some(identity),
            };
            state.session_epoch += 1;
            state.loads_in_flight = 0;
            state.error_message = None;
            self.publish(&state);
        }
        self.marker_debouncer.trigger(true);
        self.refresh_all().await
    }

    pub async fn on_provider_sign_out(self: &Arc<Self>) -> Option<LoadHandle> {
        info!("operator signed out");
        {
            let mut state = self.inner.lock().await;
            state.session = Session::default();
            state.session_epoch += 1;
            state.loads_in_flight = 0;
            state.users.clear();
            state.sign_out_dialog_visible = false;
            state.close_detail();
            self.publish(&state);
        }
        self.marker_debouncer.trigger(false);
        self.refresh_all().await
    }

    /// Asks the provider to end its session. Local state only changes once
    /// the provider has confirmed.
    pub async fn request_sign_out(self: &Arc<Self>) -> Result<Option<LoadHandle>, ControllerError> {
        let provider = self
            .provider
            .lock()
            .await
            .clone()
            .ok_or(ControllerError::NoProvider)?;

        match provider.sign_out().await {
            Ok(()) => Ok(self.on_provider_sign_out().await),
            Err(err) => {
                warn!(error = %err, "provider sign-out failed");
                let mut state = self.inner.lock().await;
                state.error_message = Some(format!("Sign-out failed: {err}"));
                self.publish(&state);
                Err(err.into())
            }
        }
    }

    /// Reloads the user list and aggregate status. Without a token nothing is
    /// fetched and the list is cleared. Otherwise both loads run concurrently
    /// and the returned handle resolves once both have been applied.
    pub async fn refresh_all(self: &Arc<Self>) -> Option<LoadHandle> {
        let (auth_token, epoch) = {
            let mut state = self.inner.lock().await;
            let Some(auth_token) = state.session.auth_token.clone() else {
                warn!("refresh requested without an auth token");
                state.users.clear();
                state.error_message = Some(ApiError::Unauthorized.to_string());
                self.publish(&state);
                return None;
            };
            state.error_message = None;
            state.loads_in_flight += 2;
            self.publish(&state);
            (auth_token, state.session_epoch)
        };

        let controller = Arc::clone(self);
        Some(tokio::spawn(async move {
            controller.load_all(auth_token, epoch).await;
        }))
    }

    async fn load_all(&self, auth_token: String, epoch: u64) {
        let users = async {
            let result = self.api.list_users(&auth_token).await;
            self.apply_user_list(epoch, result).await;
        };
        let status = async {
            let result = self.api.user_status(&auth_token).await;
            self.apply_status(epoch, result).await;
        };
        futures::join!(users, status);
    }

    async fn apply_user_list(&self, epoch: u64, result: Result<Vec<UserSummary>, ApiError>) {
        let mut state = self.inner.lock().await;
        if state.session_epoch != epoch {
            debug!(
                epoch,
                current = state.session_epoch,
                "discarding user list from a previous session"
            );
            return;
        }
        state.loads_in_flight = state.loads_in_flight.saturating_sub(1);
        match result {
            Ok(users) => {
                info!(count = users.len(), "user list loaded");
                state.users = users;
            }
            Err(err) => {
                warn!(error = %err, "user list load failed");
                state.users.clear();
                state.error_message = Some(err.to_string());
            }
        }
        self.publish(&state);
    }

    async fn apply_status(&self, epoch: u64, result: Result<AggregateStatus, ApiError>) {
        let mut state = self.inner.lock().await;
        if state.session_epoch != epoch {
            debug!(
                epoch,
                current = state.session_epoch,
                "discarding status from a previous session"
            );
            return;
        }
        state.loads_in_flight = state.loads_in_flight.saturating_sub(1);
        match result {
            Ok(status) => {
                info!(
                    total_users = status.total_users,
                    total_connected_users = status.total_connected_users,
                    "user status loaded"
                );
                state.status = StatusReading::Loaded(status);
            }
            Err(err) => {
                warn!(error = %err, "user status load failed");
                state.status = StatusReading::Unavailable;
                state.error_message = Some(err.to_string());
            }
        }
        self.publish(&state);
    }

    /// Opens the detail view for a listed user and starts polling it,
    /// replacing any view that was already open.
    pub async fn select_user(
        self: &Arc<Self>,
        account_id: &AccountId,
    ) -> Result<(), ControllerError> {
        let mut state = self.inner.lock().await;
        let summary = state
            .users
            .iter()
            .find(|user| &user.account_id == account_id)
            .cloned()
            .ok_or_else(|| ControllerError::UnknownUser(account_id.clone()))?;

        state.close_detail();
        state.next_poll_id += 1;
        let poll_id = state.next_poll_id;

        let controller = Arc::downgrade(self);
        let polled_account = summary.account_id.clone();
        let poll = spawn_poll_loop(self.settings.poll_interval, move |seq| {
            let controller = controller.clone();
            let account_id = polled_account.clone();
            async move {
                if let Some(controller) = controller.upgrade() {
                    controller.poll_detail(poll_id, account_id, seq).await;
                }
            }
        });

        info!(account_id = %summary.account_id, poll_id, "detail view opened");
        state.detail = Some(ActiveDetail {
            poll_id,
            applied_seq: 0,
            view: DetailView::new(summary),
            poll,
        });
        self.publish(&state);
        Ok(())
    }

    pub async fn clear_selection(&self) {
        let mut state = self.inner.lock().await;
        if state.close_detail() {
            info!("detail view closed");
            self.publish(&state);
        }
    }

    async fn poll_detail(&self, poll_id: u64, account_id: AccountId, seq: u64) {
        // Sign-out closes the view under the same lock that clears the token,
        // so an open view always has one.
        let auth_token = {
            let mut state = self.inner.lock().await;
            if state.active_detail(poll_id).is_none() {
                return;
            }
            match state.session.auth_token.clone() {
                Some(auth_token) => auth_token,
                None => return,
            }
        };

        let outcome = self.api.user_detail(&auth_token, &account_id).await;
        self.apply_detail(poll_id, seq, outcome).await;
    }

    async fn apply_detail(&self, poll_id: u64, seq: u64, outcome: Result<UserDetail, ApiError>) {
        let mut state = self.inner.lock().await;
        let Some(active) = state.active_detail(poll_id) else {
            debug!(poll_id, seq, "dropping detail response for a closed view");
            return;
        };
        if seq <= active.applied_seq {
            debug!(
                poll_id,
                seq,
                applied = active.applied_seq,
                "dropping out-of-order detail response"
            );
            return;
        }
        active.applied_seq = seq;

        match outcome {
            Ok(detail) => {
                debug!(
                    account_id = %detail.user.account_id,
                    connected_devices = detail.connected_device_count,
                    "detail refreshed"
                );
                active.view.connected_device_count = detail.connected_device_count;
                active.view.detail = Some(detail);
                active.view.poll_error = None;
            }
            Err(err) => {
                warn!(account_id = %active.view.account_id(), error = %err, "detail poll failed");
                active.view.connected_device_count = 0;
                active.view.poll_error = Some(err.status_text());
            }
        }
        self.publish(&state);
    }

    pub async fn toggle_sign_out_dialog(&self, visible: bool) {
        let mut state = self.inner.lock().await;
        state.sign_out_dialog_visible = visible;
        self.publish(&state);
    }

    pub async fn dismiss_error(&self) {
        let mut state = self.inner.lock().await;
        state.error_message = None;
        self.publish(&state);
    }

    /// Teardown: stops the detail poll, the pending marker update and the
    /// provider event dispatch.
    pub async fn shutdown(&self) {
        self.inner.lock().await.close_detail();
        self.marker_debouncer.cancel();
        if let Some(task) = self.provider_task.lock().await.take() {
            task.abort();
        }
        info!("dashboard controller shut down");
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
