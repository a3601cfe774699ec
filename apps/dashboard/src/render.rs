//! Plain-text rendering of dashboard snapshots for the console.

use std::fmt::Write as _;

use chrono::Datelike;
use dashboard_core::{DashboardSnapshot, DetailView, Dialog, StatusReading};
use shared::domain::UserSummary;

/// Time of day after the "July 14th 2017, " date part; always UTC.
const LAST_ACCESS_TIME_FORMAT: &str = "%Y, %-I:%M:%S %P";

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 100, day % 10) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    }
}

pub fn format_last_access(user: &UserSummary) -> String {
    match user.last_access() {
        Some(at) => format!(
            "{} {}{} {}",
            at.format("%B"),
            at.day(),
            ordinal_suffix(at.day()),
            at.format(LAST_ACCESS_TIME_FORMAT)
        ),
        None => "never".to_string(),
    }
}

pub fn render_user_row(user: &UserSummary) -> String {
    format!(
        "{:<32} {:<24} {}",
        user.email,
        user.account_id,
        format_last_access(user)
    )
}

pub fn render_status_bar(status: &StatusReading) -> String {
    let (users, connected, devices) = match status {
        StatusReading::Loaded(status) => (
            status.total_users.to_string(),
            status.total_connected_users.to_string(),
            status.total_connected_devices.to_string(),
        ),
        StatusReading::Pending => ("0".into(), "0".into(), "0".into()),
        StatusReading::Unavailable => ("N/A".into(), "N/A".into(), "N/A".into()),
    };
    format!("Total Users: {users} | Connected Users: {connected} | Connected Devices: {devices}")
}

pub fn render_detail(view: &DetailView) -> String {
    if view.is_loading() {
        return format!("{}: Loading...", view.account_id());
    }
    let user = view.user();
    let marker = if view.is_connected() {
        "connected"
    } else {
        "disconnected"
    };
    let mut line = format!(
        "{} <{}> [{marker}: {}] last access {}",
        user.account_id,
        user.email,
        view.connected_device_count,
        format_last_access(user)
    );
    if let Some(error) = &view.poll_error {
        let _ = write!(line, " (last poll failed: {error})");
    }
    line
}

pub fn render_dashboard(snapshot: &DashboardSnapshot) -> String {
    let mut out = String::new();
    match &snapshot.session.identity {
        Some(identity) if snapshot.session.is_signed_in() => {
            let _ = writeln!(out, "Users  (signed in as {})", identity.email);
        }
        _ => {
            let _ = writeln!(out, "Users  (signed out)");
        }
    }
    for user in &snapshot.users {
        let _ = writeln!(out, "  {}", render_user_row(user));
    }
    let _ = writeln!(out, "{}", render_status_bar(&snapshot.status));

    match snapshot.dialog() {
        Dialog::None => {}
        Dialog::Error(message) => {
            let _ = writeln!(out, "Error: {message}");
        }
        Dialog::SignOutConfirm => {
            let _ = writeln!(out, "Sign out? (pending confirmation)");
        }
        Dialog::UserDetail(view) => {
            let _ = writeln!(out, "Detail: {}", render_detail(&view));
        }
    }
    out
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
