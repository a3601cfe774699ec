use super::*;

use std::collections::HashMap;

use tempfile::TempDir;

fn temp_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("dashboard.toml");
    fs::write(&path, contents).expect("write config");
    (dir, path)
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn defaults_match_dashboard_backend() {
    let settings = Settings::default();
    assert_eq!(
        settings.api_base_url,
        "http://localhost:4567/api/v1/dashboard"
    );

    let controller = settings.controller_settings();
    assert_eq!(controller.poll_interval, Duration::from_millis(2000));
    assert_eq!(controller.debounce_delay, Duration::from_millis(500));
}

#[test]
fn file_values_override_defaults() {
    let (_dir, path) = temp_config(
        r#"
api_base_url = "https://dash.example.com/api/v1/dashboard"
poll_interval_ms = 5000
id_token = "from-file"
"#,
    );

    let settings = load_settings_with_env(Some(path.as_path()), no_env).expect("load");

    assert_eq!(
        settings.api_base_url,
        "https://dash.example.com/api/v1/dashboard"
    );
    assert_eq!(settings.poll_interval_ms, 5000);
    assert_eq!(settings.debounce_ms, 500);
    assert_eq!(settings.id_token.as_deref(), Some("from-file"));

}

#[test]
fn env_overrides_file_and_ignores_unparsable_numbers() {
    let (_dir, path) = temp_config("poll_interval_ms = 5000\n");
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DASHBOARD_API_BASE_URL", "http://legacy/api/v1/dashboard"),
        ("APP__API_BASE_URL", "http://app/api/v1/dashboard"),
        ("APP__POLL_INTERVAL_MS", "not-a-number"),
        ("APP__DEBOUNCE_MS", "250"),
        ("DASHBOARD_ID_TOKEN", "env-token"),
    ]);

    let settings = load_settings_with_env(Some(path.as_path()), |key| {
        vars.get(key).map(|v| v.to_string())
    })
    .expect("load");

    assert_eq!(settings.api_base_url, "http://app/api/v1/dashboard");
    assert_eq!(settings.poll_interval_ms, 5000);
    assert_eq!(settings.debounce_ms, 250);
    assert_eq!(settings.id_token.as_deref(), Some("env-token"));

}

#[test]
fn explicit_missing_config_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing.toml");
    let err = load_settings_with_env(Some(path.as_path()), no_env).expect_err("missing file");
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn malformed_config_is_an_error() {
    let (_dir, path) = temp_config("poll_interval_ms = \"fast\"\n");
    let err = load_settings_with_env(Some(path.as_path()), no_env).expect_err("bad toml");
    assert!(err.to_string().contains("failed to parse config file"));
}

#[test]
fn invalid_base_url_is_reported() {
    let settings = Settings {
        api_base_url: "not a url".into(),
        ..Settings::default()
    };
    assert!(settings.api_base_url().is_err());
}
