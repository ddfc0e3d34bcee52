use serial_test::serial;

use super::*;

fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("IDP_SYNC_") {
            std::env::remove_var(key);
        }
    }
}

fn minimal_overrides() -> ConfigOverrides {
    ConfigOverrides {
        directory_base_url: Some("https://directory.example.com".into()),
        directory_token_url: Some("https://directory.example.com/oauth/token".into()),
        directory_client_id: Some("client".into()),
        directory_client_secret: Some("secret".into()),
        idp_base_url: Some("https://idp.example.com".into()),
        idp_api_token: Some("token".into()),
        bus_url: Some("nats://localhost:4222".into()),
        ..Default::default()
    }
}

#[test]
#[serial]
fn missing_mandatory_field_is_a_fatal_config_error() {
    clear_env();
    let err = load(None, ConfigOverrides::default()).unwrap_err();
    assert!(matches!(err, ConfigError::Missing("directory_base_url")));
}

#[test]
#[serial]
fn defaults_fill_in_everything_else() {
    clear_env();
    let config = load(None, minimal_overrides()).unwrap();
    assert_eq!(config.bus.subject_prefix, idp_sync_wire::DEFAULT_SUBJECT_PREFIX);
    assert_eq!(config.reconciler_interval, Duration::from_secs(300));
    assert_eq!(config.cold_start_lookback, chrono::Duration::hours(6));
    assert!(!config.dry_run);
    assert!(config.lock.enabled);
}

#[test]
#[serial]
fn cli_overrides_win_over_env_which_wins_over_defaults() {
    clear_env();
    std::env::set_var("IDP_SYNC_DRY_RUN", "true");
    std::env::set_var("IDP_SYNC_RECONCILER_INTERVAL", "10m");

    let mut overrides = minimal_overrides();
    // CLI flag explicitly sets dry_run back to false, overriding the env var.
    overrides.dry_run = Some(false);

    let config = load(None, overrides).unwrap();
    assert!(!config.dry_run, "CLI override must win over env");
    assert_eq!(config.reconciler_interval, Duration::from_secs(600), "env must win over default");

    std::env::remove_var("IDP_SYNC_DRY_RUN");
    std::env::remove_var("IDP_SYNC_RECONCILER_INTERVAL");
}

#[test]
#[serial]
fn toml_file_layer_is_overridden_by_env() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
directory_base_url = "https://from-file.example.com"
directory_token_url = "https://from-file.example.com/oauth/token"
directory_client_id = "file-client"
directory_client_secret = "file-secret"
idp_base_url = "https://idp.example.com"
idp_api_token = "file-token"
bus_url = "nats://localhost:4222"
selector_prefix = "eng-"
"#,
    )
    .unwrap();

    std::env::set_var("IDP_SYNC_DIRECTORY_CLIENT_ID", "env-client");

    let config = load(Some(&path), ConfigOverrides::default()).unwrap();
    assert_eq!(config.directory.client_id, "env-client", "env must win over file");
    assert_eq!(config.selector_prefix, Some("eng-".to_string()), "file-only field still applies");

    std::env::remove_var("IDP_SYNC_DIRECTORY_CLIENT_ID");
}

#[test]
fn invalid_duration_string_is_a_config_error() {
    let mut overrides = minimal_overrides();
    overrides.reconciler_interval = Some("not-a-duration".into());
    let err = load(None, overrides).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "reconciler_interval", .. }));
}

#[test]
fn resolve_config_path_prefers_cli_flag_over_env() {
    std::env::set_var("IDP_SYNC_CONFIG", "/env/path.toml");
    let resolved = resolve_config_path(Some(PathBuf::from("/cli/path.toml")));
    assert_eq!(resolved, Some(PathBuf::from("/cli/path.toml")));
    std::env::remove_var("IDP_SYNC_CONFIG");
}
