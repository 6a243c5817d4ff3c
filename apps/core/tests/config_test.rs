use std::time::{SystemTime, UNIX_EPOCH};

fn temp_config_path(label: &str) -> std::path::PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir()
        .join("steamcount")
        .join(format!("{label}-{unique}.toml"))
}

#[test]
fn accepts_default_config() {
    let cfg = steamcount_core::config::Config::default();
    assert_eq!(cfg.suggestion_page_size, 12);
    assert_eq!(cfg.history_limit, 20);
    assert_eq!(cfg.interactive_timeout_secs, 10);
    assert_eq!(cfg.background_timeout_secs, 5);
    assert_eq!(cfg.refresh_interval_secs, 0);
    assert!(cfg.catalog_cache_path.to_string_lossy().contains("steamcount"));
    assert!(cfg.session_path.to_string_lossy().contains("steamcount"));
    assert!(steamcount_core::config::validate(&cfg).is_ok());
}

#[test]
fn rejects_out_of_range_values() {
    let zero_timeout = steamcount_core::config::Config {
        interactive_timeout_secs: 0,
        ..Default::default()
    };
    assert!(steamcount_core::config::validate(&zero_timeout).is_err());

    let huge_refresh = steamcount_core::config::Config {
        refresh_interval_secs: 100_000,
        ..Default::default()
    };
    assert!(steamcount_core::config::validate(&huge_refresh).is_err());

    let display_over_limit = steamcount_core::config::Config {
        history_limit: 5,
        history_display_limit: 10,
        ..Default::default()
    };
    assert!(steamcount_core::config::validate(&display_over_limit).is_err());

    let no_url = steamcount_core::config::Config {
        count_url: "  ".into(),
        ..Default::default()
    };
    assert!(steamcount_core::config::validate(&no_url).is_err());
}

#[test]
fn missing_config_file_yields_defaults() {
    let path = temp_config_path("missing");

    let cfg = steamcount_core::config::load(Some(&path)).unwrap();

    assert_eq!(cfg.config_path, path);
    assert_eq!(cfg.suggestion_page_size, 12);
}

#[test]
fn partial_config_keeps_defaults_for_missing_keys() {
    let path = temp_config_path("partial");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "suggestion_page_size = 25\nrefresh_interval_secs = 60\n").unwrap();

    let cfg = steamcount_core::config::load(Some(&path)).unwrap();

    assert_eq!(cfg.suggestion_page_size, 25);
    assert_eq!(cfg.refresh_interval_secs, 60);
    assert_eq!(cfg.history_limit, 20);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn invalid_config_file_is_rejected() {
    let path = temp_config_path("invalid");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "worker_threads = 0\n").unwrap();

    let result = steamcount_core::config::load(Some(&path));

    assert!(matches!(
        result,
        Err(steamcount_core::config::ConfigError::Invalid(_))
    ));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn save_then_load_preserves_values() {
    let path = temp_config_path("roundtrip");
    let cfg = steamcount_core::config::Config {
        background_timeout_secs: 8,
        refresh_interval_secs: 300,
        config_path: path.clone(),
        ..Default::default()
    };

    steamcount_core::config::save(&cfg).unwrap();
    let loaded = steamcount_core::config::load(Some(&path)).unwrap();

    assert_eq!(loaded, cfg);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn opens_catalog_cache_from_config_path() {
    let mut cfg = steamcount_core::config::Config::default();
    cfg.catalog_cache_path = std::env::temp_dir()
        .join("steamcount")
        .join(format!("cfg-open-{}.sqlite3", std::process::id()));

    let db = steamcount_core::index_store::open_from_config(&cfg).unwrap();
    assert_eq!(steamcount_core::index_store::cached_entry_count(&db).unwrap(), 0);

    drop(db);
    std::fs::remove_file(&cfg.catalog_cache_path).unwrap();
}
