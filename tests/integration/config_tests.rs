use dupfinder::config::{ConfigError, Settings, ENV_PREFIX};
use figment::providers::{Env, Serialized};
use figment::Figment;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_settings_load_from_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
min_file_size = 1
partial_hash_bytes = 4096
exclude_terms = ["node_modules", "target"]
quote_paths = false
"#,
    )
    .unwrap();

    let settings = Settings::load(Some(&path)).unwrap();

    assert_eq!(settings.min_file_size, 1);
    assert_eq!(settings.partial_hash_bytes, 4_096);
    assert_eq!(settings.exclude_terms, vec!["node_modules", "target"]);
    assert!(!settings.quote_paths);
    // Untouched fields keep their defaults.
    assert_eq!(settings.max_simple_reads, 12);
}

#[test]
fn test_settings_reject_invalid_toml_value() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "min_copies = 1\n").unwrap();

    let result = Settings::load(Some(&path));

    assert!(matches!(
        result,
        Err(ConfigError::Invalid {
            field: "min_copies",
            ..
        })
    ));
}

#[test]
fn test_settings_reject_wrong_type() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "max_full_reads = \"lots\"\n").unwrap();

    assert!(matches!(
        Settings::load(Some(&path)),
        Err(ConfigError::Load(_))
    ));
}

#[test]
fn test_settings_env_overrides_defaults() {
    std::env::set_var("DUPFINDER_PROGRESS_INTERVAL_MS", "250");

    // Figment directly, so other tests calling Settings::load are unaffected
    // by the assertion below.
    let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .unwrap();

    std::env::remove_var("DUPFINDER_PROGRESS_INTERVAL_MS");
    assert_eq!(settings.progress_interval_ms, 250);
}

#[test]
fn test_settings_roundtrip_through_toml_defaults() {
    let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
        .extract()
        .unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_settings_missing_explicit_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(matches!(
        Settings::load(Some(&path)),
        Err(ConfigError::FileNotFound(p)) if p == path
    ));
}
