//! Configuration store behaviour on a real filesystem.

use tempfile::TempDir;

use relay_console::config::{envfile, ConfigSource, ConfigStore, ConfigValue, EnvironmentMode, RelayConfig};
use relay_console::{Console, ConsoleError};

mod common;

fn store_in(dir: &TempDir) -> ConfigStore {
    ConfigStore::from_settings(&common::settings_in(dir.path(), EnvironmentMode::Direct, None))
}

#[test]
fn test_fresh_deployment_generates_defaults() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let (config, source) = store.load_with_source();

    assert_eq!(source, ConfigSource::Generated);
    assert_eq!(config.get_i64("HEALTH_PORT"), Some(8000));
    assert!(config.is_complete());
    assert!(dir.path().join("app/config/config.toml").is_file());

    let env = std::fs::read_to_string(dir.path().join("app/config/.env")).unwrap();
    assert!(env.contains("HEALTH_PORT=8000"));
    assert!(env.contains("RELAY_PORT=8000"));
    assert!(env.contains("UI_PORT=8501"));
}

#[test]
fn test_load_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let first = store.load();
    let second = store.load();
    assert_eq!(first, second);
    assert!(matches!(store.load_with_source().1, ConfigSource::Document(_)));
}

#[test]
fn test_env_file_used_when_document_missing() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("app")).unwrap();
    std::fs::write(
        dir.path().join("app/.env"),
        "# relay\nBATCH_SIZE=42\nWS_URI=wss://feed.example/ws\nRELAY_PORT=9000\nnot a setting\nCUSTOM_FLAG=on\n",
    )
    .unwrap();

    let (config, source) = store_in(&dir).load_with_source();

    assert_eq!(source, ConfigSource::EnvFile(dir.path().join("app/.env")));
    assert_eq!(config.get("BATCH_SIZE"), Some(&ConfigValue::Integer(42)));
    assert_eq!(config.get_text("WS_URI"), "wss://feed.example/ws");
    assert_eq!(config.get_text("CUSTOM_FLAG"), "on");
    assert!(config.get("RELAY_PORT").is_none());
    // Missing keys come from defaults
    assert_eq!(config.get_i64("BATCH_TIMEOUT"), Some(30));
}

#[test]
fn test_save_then_load_round_trips_types() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let mut config = RelayConfig::defaults();
    config.set("BATCH_SIZE", 50i64);
    config.set("BAD_NAMES_PATTERN", "scam|rug");
    config.set("EXPERIMENTAL_MODE", "shadow");
    let report = store.save(&config).unwrap();
    assert!(report.propagated());

    assert_eq!(store.load(), config);

    let env = std::fs::read_to_string(report.env_file.unwrap()).unwrap();
    let reparsed = envfile::parse(&env);
    assert_eq!(reparsed.get("BATCH_SIZE"), Some(&ConfigValue::Integer(50)));
    assert_eq!(reparsed.get_text("EXPERIMENTAL_MODE"), "shadow");
}

#[test]
fn test_save_succeeds_when_no_env_file_is_writable() {
    let dir = TempDir::new().unwrap();
    // A regular file where the env file directories should be
    std::fs::write(dir.path().join("blocker"), "").unwrap();
    let store = ConfigStore::new(
        dir.path().join("config.toml"),
        vec![],
        vec![dir.path().join("blocker/one/.env"), dir.path().join("blocker/two/.env")],
    );

    let mut config = RelayConfig::defaults();
    config.set("BATCH_SIZE", 77i64);
    let report = store.save(&config).unwrap();

    let warning = report.env_file.as_ref().unwrap_err();
    assert_eq!(warning.attempts.attempts.len(), 2);
    assert!(warning.to_string().contains("blocker/one/.env"));
    assert_eq!(store.load().get_i64("BATCH_SIZE"), Some(77));
}

#[test]
fn test_console_set_value_validates_before_saving() {
    let dir = TempDir::new().unwrap();
    let console = Console::new(common::settings_in(dir.path(), EnvironmentMode::Direct, None)).unwrap();

    let err = console.set_value("BAD_NAMES_PATTERN", "scam(").unwrap_err();
    assert!(matches!(err, ConsoleError::Invalid(ref errors) if errors[0].field == "BAD_NAMES_PATTERN"));

    let err = console.set_value("HEALTH_PORT", "70000").unwrap_err();
    assert!(err.to_string().contains("HEALTH_PORT"));

    console.set_value("N8N_WEBHOOK_URL", "https://n8n.example/webhook/coins").unwrap();
    assert_eq!(console.load_config().0.get_text("N8N_WEBHOOK_URL"), "https://n8n.example/webhook/coins");
}

#[test]
fn test_showing_a_broken_document_leaves_it_in_place() {
    let dir = TempDir::new().unwrap();
    let document = dir.path().join("app/config/config.toml");
    std::fs::create_dir_all(document.parent().unwrap()).unwrap();
    std::fs::write(&document, "BATCH_SIZE = 42\nstarted = 1979-05-27T07:32:00Z\n[extra]\nx = 1\n").unwrap();
    let before = std::fs::read_to_string(&document).unwrap();

    let console = Console::new(common::settings_in(dir.path(), EnvironmentMode::Direct, None)).unwrap();
    let (config, source) = console.load_config();

    assert_eq!(source, ConfigSource::Defaults);
    assert_eq!(config, RelayConfig::defaults());
    assert_eq!(std::fs::read_to_string(&document).unwrap(), before);
    assert!(!dir.path().join("app/config/.env").exists());
}
