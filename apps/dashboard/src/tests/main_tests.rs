use super::*;
use dashboard_core::{DetailView, Session, SessionStatus};
use shared::domain::{UserDetail, UserSummary};
use tokio::sync::oneshot;

fn user(id: &str) -> UserSummary {
    UserSummary {
        account_id: AccountId::from(id),
        email: format!("{id}@example.com"),
        avatar_url: None,
        last_access_timestamp_seconds: -1,
    }
}

fn signed_in_session() -> Session {
    Session {
        status: SessionStatus::SignedIn,
        auth_token: Some("tok".into()),
        identity: None,
    }
}

fn watching(view: DetailView) -> DashboardEvent {
    DashboardEvent::StateChanged(DashboardSnapshot {
        session: signed_in_session(),
        selected_user_id: Some(view.account_id().clone()),
        detail: Some(view),
        ..DashboardSnapshot::default()
    })
}

fn polled(id: &str, devices: u32) -> DetailView {
    let mut view = DetailView::new(user(id));
    view.detail = Some(UserDetail {
        user: user(id),
        connected_device_count: devices,
    });
    view.connected_device_count = devices;
    view
}

#[tokio::test]
async fn follow_detail_prints_changes_and_stops_when_signed_out() {
    let (tx, mut rx) = broadcast::channel(16);
    tx.send(watching(DetailView::new(user("u1")))).expect("send");
    tx.send(watching(DetailView::new(user("u1")))).expect("send");
    tx.send(watching(polled("u1", 2))).expect("send");
    tx.send(DashboardEvent::SignedInMarkerChanged(true))
        .expect("send");
    tx.send(DashboardEvent::StateChanged(DashboardSnapshot::default()))
        .expect("send");

    let mut out = Vec::new();
    follow_detail(&mut rx, std::future::pending(), &mut out)
        .await
        .expect("follow");

    let out = String::from_utf8(out).expect("utf8");
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2, "output: {out}");
    assert_eq!(lines[0], "u1: Loading...");
    assert!(lines[1].contains("[connected: 2]"));
}

#[tokio::test]
async fn follow_detail_honours_shutdown_that_fires_between_events() {
    let (tx, mut rx) = broadcast::channel(16);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let follower = tokio::spawn(async move {
        let mut out = Vec::new();
        let shutdown = async {
            let _ = stop_rx.await;
        };
        follow_detail(&mut rx, shutdown, &mut out).await?;
        Ok::<_, anyhow::Error>(out)
    });

    tx.send(watching(polled("u1", 1))).expect("send");
    tokio::task::yield_now().await;
    stop_tx.send(()).expect("stop");
    let _ = tx.send(watching(polled("u1", 3)));

    // The sender stays open, so only the shutdown signal can end the loop.
    let out = tokio::time::timeout(Duration::from_secs(5), follower)
        .await
        .expect("follower stops after shutdown")
        .expect("task")
        .expect("follow");

    let out = String::from_utf8(out).expect("utf8");
    assert!(out.lines().all(|line| line.starts_with("u1 <")), "output: {out}");
    assert_eq!(tx.receiver_count(), 0);
}
