use super::{normalize_database_url, prepare_database_url, settings_from, Settings};

use std::{collections::HashMap, time::Duration};

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn empty_database_url_falls_back_to_default() {
    assert_eq!(normalize_database_url("   "), Settings::default().database_url);
}

#[test]
fn keeps_windows_absolute_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("sqlite:C:\\Users\\alice\\test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[test]
fn normalizes_windows_plain_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("C:\\Users\\alice\\test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[test]
fn converts_sqlite_double_slash_windows_path() {
    assert_eq!(
        normalize_database_url("sqlite://C:/Users/alice/test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[test]
fn creates_parent_dir_for_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.path().join("data").exists());
}

#[tokio::test]
async fn prepared_database_url_creates_openable_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("server.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    let storage = storage::Storage::new(&prepared).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = settings_from(None, env_of(&[]));
    assert_eq!(settings.server_bind, "127.0.0.1:3333");
    assert_eq!(settings.mail_max_attempts, 3);
    assert_eq!(
        settings.mail_queue_config().retry_delay,
        Duration::from_millis(1000)
    );
}

#[test]
fn file_values_are_overridden_by_env() {
    let file = r#"
        bind_addr = "0.0.0.0:8080"
        database_url = "sqlite://./file.db"
        mail_from = "ops@file.test"
        mail_max_attempts = "5"
    "#;
    let settings = settings_from(
        Some(file),
        env_of(&[
            ("APP__DATABASE_URL", "sqlite://./env.db"),
            ("APP__MAIL_RETRY_DELAY_MS", "250"),
            ("APP__MAIL_MAX_ATTEMPTS", "not-a-number"),
        ]),
    );

    assert_eq!(settings.server_bind, "0.0.0.0:8080");
    assert_eq!(settings.database_url, "sqlite://./env.db");
    assert_eq!(settings.mail_from, "ops@file.test");
    assert_eq!(settings.mail_max_attempts, 5);

    let mail = settings.mail_queue_config();
    assert_eq!(mail.from_address, "ops@file.test");
    assert_eq!(mail.retry_delay, Duration::from_millis(250));
}

#[test]
fn app_prefixed_bind_wins_over_plain_env() {
    let settings = settings_from(
        None,
        env_of(&[("SERVER_BIND", "127.0.0.1:1"), ("APP__BIND_ADDR", "127.0.0.1:2")]),
    );
    assert_eq!(settings.server_bind, "127.0.0.1:2");
}
