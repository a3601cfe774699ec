use std::{
    future::Future,
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use dashboard_core::{
    DashboardController, DashboardEvent, DashboardSnapshot, HttpDashboardApi, ProviderConfig,
    StaticTokenProvider, StatusReading,
};
use shared::domain::AccountId;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::load_settings;

const INITIAL_LOAD_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Parser, Debug)]
#[command(about = "Operator console for the user dashboard API")]
struct Args {
    /// Settings file; defaults to ./dashboard.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_base_url: Option<String>,
    /// Identity token sent as the Authorization header.
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the user list and aggregate status once.
    Users,
    /// Follow one user's connected device count until Ctrl+C.
    Watch { account_id: String },
    /// Sign in, then sign out through the identity provider.
    SignOut,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(url) = args.api_base_url {
        settings.api_base_url = url;
    }
    if let Some(token) = args.token {
        settings.id_token = Some(token);
    }

    let api = HttpDashboardApi::new(settings.api_base_url()?);
    info!(base_url = %api.base_url(), "dashboard api configured");
    let controller = DashboardController::new(Arc::new(api), settings.controller_settings());

    let provider = match settings.id_token.clone() {
        Some(token) => StaticTokenProvider::new(settings.operator_identity(), token),
        None => {
            warn!("no identity token configured; starting signed out");
            StaticTokenProvider::signed_out()
        }
    };

    let mut events = controller.subscribe();
    controller
        .attach_provider(Arc::new(provider), ProviderConfig::new(settings.client_id.clone()))
        .await
        .context("failed to attach identity provider")?;
    let loaded = wait_for_initial_load(&mut events).await?;

    let outcome = match args.command {
        Command::Users => {
            print!("{}", render::render_dashboard(&loaded));
            Ok(())
        }
        Command::Watch { account_id } => watch_user(&controller, &mut events, account_id).await,
        Command::SignOut => sign_out(&controller).await,
    };

    controller.shutdown().await;
    outcome
}

fn load_settled(snapshot: &DashboardSnapshot) -> bool {
    !snapshot.loading
        && (snapshot.error_message.is_some() || snapshot.status != StatusReading::Pending)
}

async fn wait_for_initial_load(
    events: &mut broadcast::Receiver<DashboardEvent>,
) -> Result<DashboardSnapshot> {
    tokio::time::timeout(INITIAL_LOAD_TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(DashboardEvent::StateChanged(snapshot)) if load_settled(&snapshot) => {
                    return Ok(snapshot);
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return Err(anyhow!("controller event stream closed")),
            }
        }
    })
    .await
    .context("timed out waiting for the initial load")?
}

async fn watch_user(
    controller: &Arc<DashboardController>,
    events: &mut broadcast::Receiver<DashboardEvent>,
    account_id: String,
) -> Result<()> {
    let account_id = AccountId::from(account_id);
    controller
        .select_user(&account_id)
        .await
        .with_context(|| format!("cannot watch {account_id}"))?;
    println!("watching {account_id}; Ctrl+C to stop");

    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    follow_detail(events, ctrl_c, &mut io::stdout()).await?;

    controller.clear_selection().await;
    Ok(())
}

/// Writes each new detail line until `shutdown` resolves, the session ends
/// or the controller goes away.
async fn follow_detail(
    events: &mut broadcast::Receiver<DashboardEvent>,
    shutdown: impl Future<Output = ()>,
    out: &mut impl Write,
) -> Result<()> {
    tokio::pin!(shutdown);
    let mut last_line = String::new();
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Ok(DashboardEvent::StateChanged(snapshot)) => match snapshot.detail {
                    Some(view) => {
                        let line = render::render_detail(&view);
                        if line != last_line {
                            writeln!(out, "{line}")?;
                            last_line = line;
                        }
                    }
                    None if !snapshot.session.is_signed_in() => {
                        warn!("session ended while watching");
                        break;
                    }
                    None => {}
                },
                Ok(DashboardEvent::SignedInMarkerChanged(_)) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

async fn sign_out(controller: &Arc<DashboardController>) -> Result<()> {
    controller.toggle_sign_out_dialog(true).await;
    if let Some(load) = controller.request_sign_out().await? {
        load.await.context("reload after sign-out failed")?;
    }
    print!("{}", render::render_dashboard(&controller.snapshot().await));
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
