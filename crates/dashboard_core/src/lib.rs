//! Session and data-refresh core of the operator dashboard.
//!
//! The [`DashboardController`] owns every piece of mutable dashboard state. It
//! reacts to identity-provider callbacks, timer ticks and REST completions,
//! and publishes snapshots for whatever renders them.

pub mod api;
pub mod controller;
pub mod debounce;
pub mod poll;
pub mod provider;
pub mod snapshot;

pub use api::{DashboardApi, HttpDashboardApi, MissingDashboardApi};
pub use controller::{ControllerError, ControllerSettings, DashboardController, DashboardEvent};
pub use debounce::Debouncer;
pub use poll::{spawn_poll_loop, PollHandle};
pub use provider::{
    IdentityProvider, MissingIdentityProvider, ProviderConfig, ProviderError, ProviderEvent,
    ProviderUser, StaticTokenProvider,
};
pub use snapshot::{DashboardSnapshot, DetailView, Dialog, Session, SessionStatus, StatusReading};
