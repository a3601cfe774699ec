use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use dashboard_core::{api::DEFAULT_API_BASE_URL, ControllerSettings};
use serde::Deserialize;
use shared::domain::Identity;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub client_id: String,
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
    pub id_token: Option<String>,
    pub operator_name: String,
    pub operator_email: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            client_id: "dashboard-console".into(),
            poll_interval_ms: 2000,
            debounce_ms: 500,
            id_token: None,
            operator_name: "Operator".into(),
            operator_email: "operator@localhost".into(),
        }
    }
}

/// Keys accepted in `dashboard.toml`; all optional.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    client_id: Option<String>,
    poll_interval_ms: Option<u64>,
    debounce_ms: Option<u64>,
    id_token: Option<String>,
    operator_name: Option<String>,
    operator_email: Option<String>,
}

impl Settings {
    pub fn api_base_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.api_base_url)
            .with_context(|| format!("invalid api base url '{}'", self.api_base_url))
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            debounce_delay: Duration::from_millis(self.debounce_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }

    pub fn operator_identity(&self) -> Identity {
        Identity {
            id: self.operator_email.clone(),
            display_name: self.operator_name.clone(),
            email: self.operator_email.clone(),
            avatar_url: None,
        }
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = file.client_id {
            self.client_id = v;
        }
        if let Some(v) = file.poll_interval_ms {
            self.poll_interval_ms = v;
        }
        if let Some(v) = file.debounce_ms {
            self.debounce_ms = v;
        }
        if let Some(v) = file.id_token {
            self.id_token = Some(v);
        }
        if let Some(v) = file.operator_name {
            self.operator_name = v;
        }
        if let Some(v) = file.operator_email {
            self.operator_email = v;
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("DASHBOARD_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = var("APP__API_BASE_URL") {
            self.api_base_url = v;
        }

        if let Some(v) = var("DASHBOARD_CLIENT_ID") {
            self.client_id = v;
        }

        if let Some(v) = var("DASHBOARD_ID_TOKEN") {
            self.id_token = Some(v);
        }

        if let Some(v) = var("APP__POLL_INTERVAL_MS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.poll_interval_ms = parsed;
            }
        }
        if let Some(v) = var("APP__DEBOUNCE_MS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.debounce_ms = parsed;
            }
        }
    }
}

/// Defaults, then the config file, then environment variables. An explicit
/// `path` must exist; the default `dashboard.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with_env(path, |key| std::env::var(key).ok())
}

fn load_settings_with_env(
    path: Option<&Path>,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (config_path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    match fs::read_to_string(&config_path) {
        Ok(raw) => {
            let file_cfg = toml::from_str::<FileSettings>(&raw).with_context(|| {
                format!("failed to parse config file '{}'", config_path.display())
            })?;
            settings.apply_file(file_cfg);
        }
        Err(err) if required => {
            return Err(err).with_context(|| {
                format!("failed to read config file '{}'", config_path.display())
            });
        }
        Err(_) => {}
    }

    settings.apply_env(var);
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
